// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::Path;

use anyhow::Result;
use log::error;
use log::info;
use reclaimd::monitor;
use tokio::runtime::Builder;

fn main() -> Result<()> {
    stderrlog::new()
        .module(module_path!())
        .verbosity(2)
        .init()?;

    info!("Starting reclaimd");

    let rt = Builder::new_current_thread().enable_all().build()?;
    if let Err(err) = rt.block_on(monitor::monitor_main(Path::new("/"))) {
        error!("The reclaim monitor returned error: {:?}", err);
    }

    Ok(())
}
