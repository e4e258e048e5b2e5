//! Exposure state machine.
//!
//! Pure transition logic converting external signals into the user's
//! current health state. The four states form a tagged union with an
//! exhaustive-match transition function, so totality is checked at compile
//! time. Every state carries an `until` timestamp marking when it is due
//! for re-evaluation.
//!
//! Transition precedence, highest first: positive test result, symptom
//! onset, exposure, timer expiry, symptom clearing.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::config::WindowsConfig;

/// A self-reportable symptom. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symptom {
    /// Persistent cough.
    Cough,
    /// High temperature.
    Temperature,
    /// Loss of smell or taste.
    Anosmia,
    /// Nausea.
    Nausea,
}

impl Symptom {
    /// Canonical name used by the persistence codec.
    #[must_use]
    pub const fn canonical_name(self) -> &'static str {
        match self {
            Self::Cough => "cough",
            Self::Temperature => "temperature",
            Self::Anosmia => "anosmia",
            Self::Nausea => "nausea",
        }
    }

    /// Parse a canonical name back into a symptom.
    #[must_use]
    pub fn from_canonical_name(name: &str) -> Option<Self> {
        match name {
            "cough" => Some(Self::Cough),
            "temperature" => Some(Self::Temperature),
            "anosmia" => Some(Self::Anosmia),
            "nausea" => Some(Self::Nausea),
            _ => None,
        }
    }
}

/// Outcome of a lab test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    /// Infection confirmed.
    Positive,
    /// Infection not detected.
    Negative,
    /// The sample could not be processed.
    Invalid,
}

/// The user's current health state. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserState {
    /// No known exposure or symptoms.
    Default {
        /// When this state is due for re-evaluation.
        until: DateTime<Utc>,
    },
    /// A qualifying proximity exposure was recorded; no symptoms reported.
    Exposed {
        /// When this state is due for re-evaluation.
        until: DateTime<Utc>,
    },
    /// The user self-reported symptoms.
    Symptomatic {
        /// When this state is due for re-evaluation.
        until: DateTime<Utc>,
        /// The reported symptoms. Never empty.
        symptoms: BTreeSet<Symptom>,
    },
    /// A prior observation window elapsed without escalation.
    Recovery {
        /// When this state is due for re-evaluation.
        until: DateTime<Utc>,
    },
}

impl UserState {
    /// The timestamp at which this state is due for re-evaluation.
    #[must_use]
    pub const fn until(&self) -> DateTime<Utc> {
        match self {
            Self::Default { until }
            | Self::Exposed { until }
            | Self::Symptomatic { until, .. }
            | Self::Recovery { until } => *until,
        }
    }

    /// Whether the re-evaluation timestamp has been reached.
    #[must_use]
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.until()
    }
}

/// An external signal driving the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalEvent {
    /// A qualifying proximity exposure was detected.
    ExposureDetected,
    /// The user reported symptoms.
    SymptomsReported(BTreeSet<Symptom>),
    /// The user reported their symptoms have cleared.
    SymptomsCleared,
    /// A lab test result arrived.
    TestResultReceived(TestResult),
    /// The current state's `until` timestamp may have elapsed.
    TimerElapsed,
}

/// Fixed transition windows, resolved from configuration.
#[derive(Debug, Clone, Copy)]
pub struct StateWindows {
    /// Window applied on exposure.
    pub exposure: Duration,
    /// Window applied on symptom onset.
    pub symptomatic: Duration,
    /// Isolation window applied on a positive test result.
    pub positive_isolation: Duration,
    /// Observation window after expiry of an exposed/symptomatic period.
    pub recovery: Duration,
    /// Re-evaluation interval in the default state.
    pub default: Duration,
}

impl StateWindows {
    /// Resolve windows from the application configuration.
    #[must_use]
    pub fn from_config(config: &WindowsConfig) -> Self {
        Self {
            exposure: Duration::days(config.exposure_days),
            symptomatic: Duration::days(config.symptomatic_days),
            positive_isolation: Duration::days(config.positive_isolation_days),
            recovery: Duration::days(config.recovery_days),
            default: Duration::days(config.default_days),
        }
    }
}

impl Default for StateWindows {
    fn default() -> Self {
        Self::from_config(&WindowsConfig::default())
    }
}

/// A one-time user-visible notice raised by a transition.
///
/// Consumed by the notification-delivery collaborator; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// A test result arrived and should be surfaced once.
    TestResult(TestResult),
}

/// Result of applying one external event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The next state.
    pub state: UserState,
    /// A one-time notice, if the transition raised one.
    pub notice: Option<Notice>,
}

impl Outcome {
    fn next(state: UserState) -> Self {
        Self {
            state,
            notice: None,
        }
    }

    fn with_notice(state: UserState, notice: Notice) -> Self {
        Self {
            state,
            notice: Some(notice),
        }
    }
}

/// Apply one external event to the current state.
///
/// Total over every (state, event) pair. Re-applying `TimerElapsed` after a
/// transition has already fired is safe and never regresses the state.
#[must_use]
pub fn transition(
    current: &UserState,
    event: &ExternalEvent,
    now: DateTime<Utc>,
    windows: &StateWindows,
) -> Outcome {
    match event {
        ExternalEvent::TestResultReceived(result) => on_test_result(current, *result, now, windows),
        ExternalEvent::SymptomsReported(symptoms) if symptoms.is_empty() => {
            // An empty report carries the same meaning as clearing.
            on_symptoms_cleared(current, now, windows)
        }
        ExternalEvent::SymptomsReported(symptoms) => Outcome::next(UserState::Symptomatic {
            until: now + windows.symptomatic,
            symptoms: symptoms.clone(),
        }),
        ExternalEvent::ExposureDetected => on_exposure(current, now, windows),
        ExternalEvent::TimerElapsed => on_timer(current, now, windows),
        ExternalEvent::SymptomsCleared => on_symptoms_cleared(current, now, windows),
    }
}

fn on_test_result(
    current: &UserState,
    result: TestResult,
    now: DateTime<Utc>,
    windows: &StateWindows,
) -> Outcome {
    let notice = Notice::TestResult(result);
    match result {
        // A positive result extends the current period to the isolation
        // window but preserves the variant: symptom knowledge is never
        // invented or discarded by a lab result.
        TestResult::Positive => {
            let until = now + windows.positive_isolation;
            let state = match current {
                UserState::Symptomatic { symptoms, .. } => UserState::Symptomatic {
                    until,
                    symptoms: symptoms.clone(),
                },
                UserState::Default { .. } => UserState::Default { until },
                UserState::Exposed { .. } => UserState::Exposed { until },
                UserState::Recovery { .. } => UserState::Recovery { until },
            };
            Outcome::with_notice(state, notice)
        }
        // Negative and invalid results are surfaced but change nothing.
        TestResult::Negative | TestResult::Invalid => {
            Outcome::with_notice(current.clone(), notice)
        }
    }
}

fn on_exposure(current: &UserState, now: DateTime<Utc>, windows: &StateWindows) -> Outcome {
    let window_end = now + windows.exposure;
    let state = match current {
        UserState::Default { .. } | UserState::Recovery { .. } => {
            UserState::Exposed { until: window_end }
        }
        // Never shorten an existing window.
        UserState::Exposed { until } => UserState::Exposed {
            until: window_end.max(*until),
        },
        UserState::Symptomatic { until, symptoms } => UserState::Symptomatic {
            until: window_end.max(*until),
            symptoms: symptoms.clone(),
        },
    };
    Outcome::next(state)
}

fn on_timer(current: &UserState, now: DateTime<Utc>, windows: &StateWindows) -> Outcome {
    if !current.has_expired(now) {
        return Outcome::next(current.clone());
    }
    let state = match current {
        UserState::Exposed { .. } | UserState::Symptomatic { .. } => UserState::Recovery {
            until: now + windows.recovery,
        },
        UserState::Recovery { .. } | UserState::Default { .. } => UserState::Default {
            until: now + windows.default,
        },
    };
    Outcome::next(state)
}

fn on_symptoms_cleared(current: &UserState, now: DateTime<Utc>, windows: &StateWindows) -> Outcome {
    match current {
        // Clearing ends the symptomatic period immediately instead of
        // waiting for expiry.
        UserState::Symptomatic { .. } => Outcome::next(UserState::Recovery {
            until: now + windows.recovery,
        }),
        _ => Outcome::next(current.clone()),
    }
}
