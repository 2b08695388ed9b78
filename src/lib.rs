// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod common;
pub mod config;
pub mod lowmem;
pub mod meminfo;
pub mod monitor;
pub mod proc;
