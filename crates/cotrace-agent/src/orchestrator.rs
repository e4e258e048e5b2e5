//! Status orchestration.
//!
//! Owns the user's current exposure state: loads it once at startup,
//! applies external events through the pure state machine, persists after
//! every transition, and hands raised notices to the notifier.
//!
//! A corrupt persisted state fails the load loudly instead of silently
//! reverting to the default state.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::info;

use cotrace_core::{
    serialization, transition, CoreError, ExternalEvent, Result, StateWindows, Storage, UserState,
};

use crate::notifier::Notifier;

/// Holder of the current user state.
pub struct StatusOrchestrator<N> {
    storage: Storage,
    windows: StateWindows,
    notifier: N,
    state: Mutex<UserState>,
}

impl<N: Notifier> StatusOrchestrator<N> {
    /// Load the persisted state, or start fresh in the default state.
    ///
    /// # Errors
    ///
    /// Propagates storage errors, and deserialization errors when the
    /// persisted blob is unreadable. The caller decides how to surface
    /// that; it is never masked here.
    pub fn load(
        storage: Storage,
        windows: StateWindows,
        notifier: N,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let state = match storage.load_user_state()? {
            Some(blob) => serialization::deserialize(&blob)?,
            None => {
                let state = UserState::Default {
                    until: now + windows.default,
                };
                storage.save_user_state(&serialization::serialize(&state))?;
                state
            }
        };
        Ok(Self {
            storage,
            windows,
            notifier,
            state: Mutex::new(state),
        })
    }

    /// The current state.
    pub fn current(&self) -> Result<UserState> {
        Ok(self.lock()?.clone())
    }

    /// Apply one external event, persist the result, deliver any notice.
    pub fn apply(&self, event: &ExternalEvent, now: DateTime<Utc>) -> Result<UserState> {
        let mut state = self.lock()?;
        let outcome = transition(&state, event, now, &self.windows);

        if outcome.state != *state {
            info!(from = ?*state, to = ?outcome.state, "user state transition");
            self.storage
                .save_user_state(&serialization::serialize(&outcome.state))?;
            *state = outcome.state.clone();
        }
        if let Some(notice) = &outcome.notice {
            self.notifier.notify(notice);
        }
        Ok(outcome.state)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, UserState>> {
        self.state
            .lock()
            .map_err(|_| CoreError::Storage("user state mutex poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::TimeZone;

    use cotrace_core::{Notice, Symptom, TestResult};

    #[derive(Default, Clone)]
    struct CountingNotifier(Arc<AtomicUsize>);

    impl Notifier for CountingNotifier {
        fn notify(&self, _notice: &Notice) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap()
    }

    fn load(dir: &tempfile::TempDir) -> StatusOrchestrator<CountingNotifier> {
        StatusOrchestrator::load(
            Storage::new(dir.path().to_path_buf()),
            StateWindows::default(),
            CountingNotifier::default(),
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_first_run_starts_default_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = load(&dir);
        assert!(matches!(
            orchestrator.current().unwrap(),
            UserState::Default { .. }
        ));
        // Persisted on first run, so a reload sees the same state.
        let reloaded = load(&dir);
        assert_eq!(
            reloaded.current().unwrap(),
            orchestrator.current().unwrap()
        );
    }

    #[test]
    fn test_transitions_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = load(&dir);
        orchestrator
            .apply(
                &ExternalEvent::SymptomsReported(BTreeSet::from([Symptom::Temperature])),
                now(),
            )
            .unwrap();

        let reloaded = load(&dir);
        assert!(matches!(
            reloaded.current().unwrap(),
            UserState::Symptomatic { .. }
        ));
    }

    #[test]
    fn test_corrupt_state_fails_loudly_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage
            .save_user_state(r#"{"type":"Purple","until":0}"#)
            .unwrap();

        let err = StatusOrchestrator::load(
            storage,
            StateWindows::default(),
            CountingNotifier::default(),
            now(),
        )
        .err()
        .unwrap();
        assert!(err.is_deserialization_error());
    }

    #[test]
    fn test_notice_delivered_once() {
        let dir = tempfile::tempdir().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let orchestrator = StatusOrchestrator::load(
            Storage::new(dir.path().to_path_buf()),
            StateWindows::default(),
            CountingNotifier(Arc::clone(&counter)),
            now(),
        )
        .unwrap();

        orchestrator
            .apply(
                &ExternalEvent::TestResultReceived(TestResult::Positive),
                now(),
            )
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // A timer tick raises no further notices.
        orchestrator
            .apply(&ExternalEvent::TimerElapsed, now())
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
