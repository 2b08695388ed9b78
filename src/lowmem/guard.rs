// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::time::Duration;
use std::time::Instant;

use super::scanner::WorkloadSnapshot;

/// How long after a kill the engine assumes the victim may still be
/// exiting. This bounds how long a slow-to-exit victim can hold off
/// further kills; it is not an exit-confirmation mechanism.
pub const DEATH_PENDING_TIMEOUT: Duration = Duration::from_secs(1);

/// Cooldown window after a kill while the victim drains.
///
/// idle -> (kill recorded) -> pending -> (deadline elapses) -> idle.
#[derive(Default)]
pub struct DeathPendingGuard {
    deadline: Option<Instant>,
}

impl DeathPendingGuard {
    pub fn new() -> Self {
        Default::default()
    }

    /// True while a previous kill may still be draining.
    pub fn is_pending(&self, now: Instant) -> bool {
        self.deadline.map_or(false, |deadline| now <= deadline)
    }

    /// Whether observing |workload| must abort the current scan. A
    /// workload still marked terminating inside the cooldown window
    /// aborts the whole pass, not just this entry: the amount of memory
    /// its kill will free is unknown until it completes.
    pub fn should_abort(&self, now: Instant, workload: &WorkloadSnapshot) -> bool {
        workload.exiting && self.is_pending(now)
    }

    /// Start the cooldown window for a freshly killed victim.
    pub fn record_kill(&mut self, now: Instant, cooldown: Duration) {
        self.deadline = Some(now + cooldown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exiting_workload() -> WorkloadSnapshot {
        WorkloadSnapshot {
            pid: 100,
            name: "victim".to_string(),
            score: 10,
            rss_pages: Some(64),
            kernel_thread: false,
            exiting: true,
        }
    }

    #[test]
    fn test_idle_guard_never_aborts() {
        let guard = DeathPendingGuard::new();
        let now = Instant::now();
        assert!(!guard.is_pending(now));
        assert!(!guard.should_abort(now, &exiting_workload()));
    }

    #[test]
    fn test_pending_within_cooldown() {
        let mut guard = DeathPendingGuard::new();
        let now = Instant::now();
        guard.record_kill(now, DEATH_PENDING_TIMEOUT);

        assert!(guard.is_pending(now));
        assert!(guard.is_pending(now + Duration::from_millis(500)));
        // The deadline itself is still pending.
        assert!(guard.is_pending(now + DEATH_PENDING_TIMEOUT));
        assert!(!guard.is_pending(now + DEATH_PENDING_TIMEOUT + Duration::from_millis(1)));
    }

    #[test]
    fn test_abort_needs_exiting_flag() {
        let mut guard = DeathPendingGuard::new();
        let now = Instant::now();
        guard.record_kill(now, DEATH_PENDING_TIMEOUT);

        let mut workload = exiting_workload();
        assert!(guard.should_abort(now, &workload));
        workload.exiting = false;
        assert!(!guard.should_abort(now, &workload));
    }

    #[test]
    fn test_deadline_expiry_returns_to_idle() {
        let mut guard = DeathPendingGuard::new();
        let now = Instant::now();
        guard.record_kill(now, DEATH_PENDING_TIMEOUT);

        let later = now + DEATH_PENDING_TIMEOUT + Duration::from_millis(1);
        assert!(!guard.should_abort(later, &exiting_workload()));
    }
}
