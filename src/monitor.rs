// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::Path;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use log::error;
use log::info;

use crate::config::Tunables;
use crate::lowmem::ReclaimEngine;
use crate::meminfo::MemInfo;
use crate::meminfo::MemStats;
use crate::proc::ProcWorkloadSource;

/// Scan budget handed to every timed pass. Matches the batch size the
/// kernel hands its shrinkers.
const SCAN_BATCH: i64 = 128;

/// Poll period per unit of the cost tunable.
const POLL_INTERVAL_PER_COST: Duration = Duration::from_millis(100);

fn poll_interval(cost: u32) -> Duration {
    POLL_INTERVAL_PER_COST * cost.max(1)
}

/// Drive timed reclaim passes until the process exits. Owns the engine
/// and the workload source, so passes are naturally serialized.
pub async fn monitor_main(root: &Path) -> Result<()> {
    let tunables = Tunables::load_or_init(root)?;
    let mut engine = ReclaimEngine::new(tunables);
    let mut source = ProcWorkloadSource::new();
    info!(
        "Monitoring with minfree {:?}, adj {:?}",
        engine.tunables().minfree(),
        engine.tunables().adj()
    );

    loop {
        engine.tunables_mut().refresh_from(root);
        match MemInfo::load() {
            Ok(meminfo) => {
                let stats = MemStats::from(&meminfo);
                engine.run_pass(Instant::now(), SCAN_BATCH, &stats, &mut source);
            }
            Err(e) => error!("Couldn't sample /proc/meminfo: {}", e),
        }
        tokio::time::sleep(poll_interval(engine.tunables().cost())).await;
    }
}
