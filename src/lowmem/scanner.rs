// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::time::Instant;

use log::info;

use super::guard::DeathPendingGuard;

/// One schedulable unit of execution at the instant of scanning. Taken
/// fresh every pass, never cached by the engine.
#[derive(Clone, Debug)]
pub struct WorkloadSnapshot {
    pub pid: i32,
    pub name: String,
    /// Badness score; higher means more acceptable to terminate.
    pub score: i16,
    /// Resident footprint in pages. `None` when the workload has no
    /// resolvable memory-owning context, e.g. it already exited.
    pub rss_pages: Option<i64>,
    pub kernel_thread: bool,
    /// Marked terminating by an earlier kill.
    pub exiting: bool,
}

/// The best candidate found in a scan pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedVictim {
    pub pid: i32,
    pub name: String,
    pub score: i16,
    pub rss_pages: i64,
}

/// Per-candidate verdict. `Abort` short-circuits the whole scan.
enum ScanVerdict {
    Skip,
    Select(i64),
    Abort,
}

/// Result of folding over all live workloads.
#[derive(Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A previous kill is still draining; no victim may be chosen.
    Aborted,
    /// The scan ran to completion, possibly with no eligible candidate.
    Finished(Option<SelectedVictim>),
}

fn assess(
    workload: &WorkloadSnapshot,
    cutoff: i16,
    guard: &DeathPendingGuard,
    now: Instant,
    best: Option<&SelectedVictim>,
) -> ScanVerdict {
    if workload.kernel_thread {
        return ScanVerdict::Skip;
    }
    let Some(rss_pages) = workload.rss_pages else {
        return ScanVerdict::Skip;
    };
    if guard.should_abort(now, workload) {
        return ScanVerdict::Abort;
    }
    if workload.score < cutoff {
        return ScanVerdict::Skip;
    }
    if rss_pages <= 0 {
        return ScanVerdict::Skip;
    }
    if let Some(best) = best {
        if workload.score < best.score {
            return ScanVerdict::Skip;
        }
        if workload.score == best.score && rss_pages <= best.rss_pages {
            return ScanVerdict::Skip;
        }
    }
    ScanVerdict::Select(rss_pages)
}

/// Fold the live workloads into the single best victim. An incumbent is
/// only replaced by a strictly higher score, or an equal score with a
/// strictly larger footprint, so the fold is deterministic for a fixed
/// snapshot sequence.
pub fn scan_workloads<I>(
    workloads: I,
    cutoff: i16,
    guard: &DeathPendingGuard,
    now: Instant,
    debug_level: u32,
) -> ScanOutcome
where
    I: IntoIterator<Item = WorkloadSnapshot>,
{
    let mut selected: Option<SelectedVictim> = None;
    for workload in workloads {
        match assess(&workload, cutoff, guard, now, selected.as_ref()) {
            ScanVerdict::Skip => continue,
            ScanVerdict::Abort => return ScanOutcome::Aborted,
            ScanVerdict::Select(rss_pages) => {
                if debug_level >= 2 {
                    info!(
                        "select {} ({}), adj {}, size {}, to kill",
                        workload.pid, workload.name, workload.score, rss_pages
                    );
                }
                selected = Some(SelectedVictim {
                    pid: workload.pid,
                    name: workload.name,
                    score: workload.score,
                    rss_pages,
                });
            }
        }
    }
    ScanOutcome::Finished(selected)
}
