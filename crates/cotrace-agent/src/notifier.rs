//! Notification delivery seam.
//!
//! State transitions that require user-visible guidance raise a
//! [`Notice`](cotrace_core::Notice). Delivery itself is a platform concern;
//! the agent only hands notices to whatever implementation it was wired
//! with.

use cotrace_core::{Notice, TestResult};
use tracing::info;

/// Consumer of one-time user-visible notices.
pub trait Notifier: Send + Sync {
    /// Deliver one notice.
    fn notify(&self, notice: &Notice);
}

/// Notifier that records notices in the log stream only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::TestResult(TestResult::Positive) => {
                info!("surfacing positive test result to the user");
            }
            Notice::TestResult(result) => {
                info!(?result, "surfacing test result to the user");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_notifier_accepts_all_results() {
        let notifier = LogNotifier;
        for result in [TestResult::Positive, TestResult::Negative, TestResult::Invalid] {
            notifier.notify(&Notice::TestResult(result));
        }
    }
}
