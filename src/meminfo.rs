// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;

use crate::common::get_page_size;

/// Parsed /proc/meminfo data, only the fields the reclaim engine needs.
/// All values are in KiB as reported by the kernel.
#[derive(Default, Clone)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    pub buffers: u64,
    pub cached: u64,
    pub shmem: u64,
    pub active_anon: u64,
    pub inactive_anon: u64,
    pub active_file: u64,
    pub inactive_file: u64,
}

impl MemInfo {
    /// Load /proc/meminfo and parse it.
    pub fn load() -> io::Result<Self> {
        let reader = File::open("/proc/meminfo")?;
        let reader = BufReader::new(reader);
        Self::parse(reader)
    }

    fn parse<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut result = Self::default();
        for line in reader.lines() {
            let line = line?;
            let mut tokens = line.split_whitespace();
            let Some(key) = tokens.next() else {
                continue;
            };
            let field = match key {
                "MemTotal:" => &mut result.total,
                "MemFree:" => &mut result.free,
                "Buffers:" => &mut result.buffers,
                "Cached:" => &mut result.cached,
                "Shmem:" => &mut result.shmem,
                "Active(anon):" => &mut result.active_anon,
                "Inactive(anon):" => &mut result.inactive_anon,
                "Active(file):" => &mut result.active_file,
                "Inactive(file):" => &mut result.inactive_file,
                _ => continue,
            };
            let Some(value) = tokens.next() else {
                continue;
            };
            let Ok(value) = value.parse::<u64>() else {
                continue;
            };
            *field = value;
        }
        Ok(result)
    }
}

/// Page-denominated pressure view consumed by the reclaim engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemStats {
    /// Free pages.
    pub free_pages: u64,
    /// Droppable file-backed cache pages. Shmem is file-backed on paper
    /// but not droppable, so it is excluded.
    pub file_pages: u64,
    /// Total evictable LRU pages, the baseline reclaimable estimate a
    /// pass reports.
    pub lru_pages: u64,
}

impl From<&MemInfo> for MemStats {
    fn from(info: &MemInfo) -> Self {
        let file_kb = info
            .cached
            .saturating_add(info.buffers)
            .saturating_sub(info.shmem);
        let lru_kb = info
            .active_anon
            .saturating_add(info.inactive_anon)
            .saturating_add(info.active_file)
            .saturating_add(info.inactive_file);
        MemStats {
            free_pages: kb_to_pages(info.free),
            file_pages: kb_to_pages(file_kb),
            lru_pages: kb_to_pages(lru_kb),
        }
    }
}

fn kb_to_pages(kb: u64) -> u64 {
    kb.saturating_mul(1024) / get_page_size()
}
