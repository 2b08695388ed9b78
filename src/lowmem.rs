// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod guard;
mod scanner;
mod thresholds;

use std::time::Instant;

use anyhow::Result;
use log::info;
use log::warn;

pub use self::guard::DeathPendingGuard;
pub use self::guard::DEATH_PENDING_TIMEOUT;
pub use self::scanner::ScanOutcome;
pub use self::scanner::SelectedVictim;
pub use self::scanner::WorkloadSnapshot;
pub use self::thresholds::ThresholdTable;
use crate::config::Tunables;
use crate::meminfo::MemStats;

/// Source of live workloads and the termination primitive, provided by
/// the execution environment.
pub trait WorkloadSource {
    /// Snapshot every live workload. Taken once per pass; snapshots are
    /// never reused across passes.
    fn workloads(&mut self) -> Result<Vec<WorkloadSnapshot>>;

    /// Request termination of |victim| and mark it terminating before
    /// returning, so snapshots taken by later passes report it as
    /// exiting. Termination is a fire-and-forget signal, never a wait
    /// for exit completion.
    fn terminate(&mut self, victim: &SelectedVictim) -> Result<()>;
}

/// All mutable reclaim-policy state. One instance per system; passes
/// run by exclusive reference, so at most one pass is ever in flight.
pub struct ReclaimEngine {
    tunables: Tunables,
    guard: DeathPendingGuard,
}

impl ReclaimEngine {
    pub fn new(tunables: Tunables) -> Self {
        ReclaimEngine {
            tunables,
            guard: DeathPendingGuard::new(),
        }
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn tunables_mut(&mut self) -> &mut Tunables {
        &mut self.tunables
    }

    /// Run one reclaim pass. Returns the estimated evictable pages
    /// remaining, minus the footprint of the victim killed this pass if
    /// any, or 0 if the scan aborted because an earlier kill is still
    /// draining. A non-positive |nr_to_scan| probes current pressure
    /// without scanning. At most one workload is terminated per pass.
    pub fn run_pass(
        &mut self,
        now: Instant,
        nr_to_scan: i64,
        stats: &MemStats,
        source: &mut dyn WorkloadSource,
    ) -> u64 {
        let debug_level = self.tunables.debug_level();
        let cutoff = ThresholdTable::new(self.tunables.minfree(), self.tunables.adj())
            .resolve_cutoff(stats.free_pages, stats.file_pages);

        if nr_to_scan > 0 && debug_level >= 3 {
            info!(
                "reclaim pass {}, free {}, file {}, cutoff {:?}",
                nr_to_scan, stats.free_pages, stats.file_pages, cutoff
            );
        }

        let lru_pages = stats.lru_pages;
        let cutoff = match cutoff {
            Some(cutoff) if nr_to_scan > 0 => cutoff,
            _ => {
                if debug_level >= 5 {
                    info!("reclaim pass {}, return {}", nr_to_scan, lru_pages);
                }
                return lru_pages;
            }
        };

        let workloads = match source.workloads() {
            Ok(workloads) => workloads,
            Err(e) => {
                warn!("Couldn't enumerate workloads: {:#}", e);
                return lru_pages;
            }
        };

        let outcome = scanner::scan_workloads(workloads, cutoff, &self.guard, now, debug_level);
        let ScanOutcome::Finished(selected) = outcome else {
            if debug_level >= 2 {
                info!("reclaim pass aborted, earlier kill still draining");
            }
            return 0;
        };

        let rem = match selected {
            None => lru_pages,
            Some(victim) => {
                if debug_level >= 1 {
                    info!(
                        "send sigkill to {} ({}), adj {}, size {}",
                        victim.pid, victim.name, victim.score, victim.rss_pages
                    );
                }
                match source.terminate(&victim) {
                    Ok(()) => {
                        self.guard.record_kill(now, DEATH_PENDING_TIMEOUT);
                        lru_pages.saturating_sub(victim.rss_pages as u64)
                    }
                    Err(e) => {
                        // The target is likely already gone; the next
                        // pass re-evaluates under fresh pressure.
                        warn!("Couldn't terminate {} ({}): {:#}", victim.pid, victim.name, e);
                        lru_pages
                    }
                }
            }
        };

        if debug_level >= 4 {
            info!("reclaim pass {}, return {}", nr_to_scan, rem);
        }
        rem
    }
}
