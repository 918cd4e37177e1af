//! Engine configuration.

use std::time::Duration;

/// What to do when a commit arrives while another is awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingCommitPolicy {
    /// The new commit applies against the unconfirmed state and takes over
    /// the confirmation window; the original pre-window configuration
    /// remains the revert target.
    #[default]
    ReplaceWindow,
    /// Reject new commits until the open window is confirmed or expires.
    /// A plain commit with no confirmation timeout is still accepted, since
    /// that is the confirmation path.
    Reject,
}

/// Configuration for opening a [`ConfigEngine`].
///
/// [`ConfigEngine`]: crate::ConfigEngine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Policy for commits arriving during an open confirmation window.
    pub pending_policy: PendingCommitPolicy,

    /// Delay between retries when recording a timer-driven reversion fails.
    pub revert_retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pending_policy: PendingCommitPolicy::ReplaceWindow,
            revert_retry_backoff: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pending-commit policy.
    #[must_use]
    pub const fn pending_policy(mut self, policy: PendingCommitPolicy) -> Self {
        self.pending_policy = policy;
        self
    }

    /// Sets the retry backoff for failed timer-driven reversions.
    #[must_use]
    pub const fn revert_retry_backoff(mut self, backoff: Duration) -> Self {
        self.revert_retry_backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.pending_policy, PendingCommitPolicy::ReplaceWindow);
        assert_eq!(config.revert_retry_backoff, Duration::from_secs(1));
    }

    #[test]
    fn builder_pattern() {
        let config = EngineConfig::new()
            .pending_policy(PendingCommitPolicy::Reject)
            .revert_retry_backoff(Duration::from_millis(50));
        assert_eq!(config.pending_policy, PendingCommitPolicy::Reject);
        assert_eq!(config.revert_retry_backoff, Duration::from_millis(50));
    }
}
