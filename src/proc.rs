// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;
use procfs::process::Process;

use crate::common::read_from_file;
use crate::lowmem::SelectedVictim;
use crate::lowmem::WorkloadSnapshot;
use crate::lowmem::WorkloadSource;

/// Live-process view over /proc plus the SIGKILL termination
/// primitive. Pids this source has killed are remembered so later
/// snapshots report them as exiting, until they disappear from /proc.
#[derive(Default)]
pub struct ProcWorkloadSource {
    dying: HashMap<i32, Instant>,
}

impl ProcWorkloadSource {
    pub fn new() -> Self {
        Default::default()
    }

    fn snapshot(&self, process: &Process) -> Option<WorkloadSnapshot> {
        let pid = process.pid();
        let status = process.status().ok()?;
        // Kernel threads report no virtual address space; there is
        // nothing user-visible to reclaim from them.
        let kernel_thread = status.vmsize.is_none();
        let rss_pages = process
            .statm()
            .ok()
            .map(|statm| statm.resident as i64);
        let score = read_from_file(&format!("/proc/{}/oom_score_adj", pid)).ok()?;
        Some(WorkloadSnapshot {
            pid,
            name: status.name,
            score,
            rss_pages,
            kernel_thread,
            exiting: self.dying.contains_key(&pid),
        })
    }
}

impl WorkloadSource for ProcWorkloadSource {
    fn workloads(&mut self) -> Result<Vec<WorkloadSnapshot>> {
        let mut snapshots = Vec::new();
        for process in procfs::process::all_processes().context("Couldn't enumerate /proc")? {
            // A process may exit between readdir and the per-pid reads;
            // whatever can't be snapshotted anymore is left out.
            let Ok(process) = process else {
                continue;
            };
            if let Some(snapshot) = self.snapshot(&process) {
                snapshots.push(snapshot);
            }
        }
        self.dying
            .retain(|pid, _| snapshots.iter().any(|snapshot| snapshot.pid == *pid));
        Ok(snapshots)
    }

    fn terminate(&mut self, victim: &SelectedVictim) -> Result<()> {
        // SAFETY: kill(2) with a valid signal number is memory safe.
        let ret = unsafe { libc::kill(victim.pid, libc::SIGKILL) };
        if ret != 0 {
            return Err(std::io::Error::last_os_error())
                .with_context(|| format!("Couldn't signal pid {}", victim.pid));
        }
        self.dying.insert(victim.pid, Instant::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshots_include_self() {
        let mut source = ProcWorkloadSource::new();
        let snapshots = source.workloads().unwrap();

        let own_pid = std::process::id() as i32;
        let own = snapshots
            .iter()
            .find(|snapshot| snapshot.pid == own_pid)
            .unwrap();
        assert!(!own.kernel_thread);
        assert!(!own.exiting);
        assert!(own.rss_pages.unwrap() > 0);
        assert!(!own.name.is_empty());
    }

    #[test]
    fn test_dying_mark_sets_exiting_flag() {
        let mut source = ProcWorkloadSource::new();
        let own_pid = std::process::id() as i32;
        source.dying.insert(own_pid, Instant::now());

        let snapshots = source.workloads().unwrap();
        let own = snapshots
            .iter()
            .find(|snapshot| snapshot.pid == own_pid)
            .unwrap();
        assert!(own.exiting);
        // Still alive, so the mark survives the prune.
        assert!(source.dying.contains_key(&own_pid));
    }

    #[test]
    fn test_dead_pids_are_pruned() {
        let mut source = ProcWorkloadSource::new();
        // No process ever has pid -1.
        source.dying.insert(-1, Instant::now());

        source.workloads().unwrap();
        assert!(source.dying.is_empty());
    }
}
