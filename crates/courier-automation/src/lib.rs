mod command;
mod runner;

pub use command::{AutomationCommand, escape_applescript};
pub use runner::{OsaRunner, ScriptRunner};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

/// Retrying wrapper around the OS automation channel.  Holds no state
/// across calls beyond configuration; concurrent use for different
/// recipients is safe, ordering for one recipient is the caller's job.
#[derive(Clone)]
pub struct Automation {
    runner: Arc<dyn ScriptRunner>,
    max_retries: u32,
    base_delay: Duration,
}

impl Automation {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self::with_runner(Arc::new(OsaRunner), max_retries, base_delay)
    }

    pub fn with_runner(runner: Arc<dyn ScriptRunner>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            runner,
            max_retries,
            base_delay,
        }
    }

    /// Run a command with bounded retries and exponential backoff.  Returns
    /// `true` on the first success, `false` once attempts are exhausted.
    /// Failures never propagate past this boundary.
    pub async fn execute(&self, command: &AutomationCommand) -> bool {
        let source = command.to_script();

        for attempt in 0..self.max_retries {
            let runner = self.runner.clone();
            let script = source.clone();

            match tokio::task::spawn_blocking(move || runner.run(&script)).await {
                Ok(Ok(())) => {
                    debug!(
                        "Automation ok: {} (attempt {}/{})",
                        command.describe(),
                        attempt + 1,
                        self.max_retries
                    );
                    return true;
                }
                Ok(Err(e)) => warn!(
                    "Automation failed: {} (attempt {}/{}): {:#}",
                    command.describe(),
                    attempt + 1,
                    self.max_retries,
                    e
                ),
                Err(e) => warn!(
                    "Automation task aborted: {} (attempt {}/{}): {}",
                    command.describe(),
                    attempt + 1,
                    self.max_retries,
                    e
                ),
            }

            if attempt + 1 < self.max_retries {
                let delay = backoff_delay(self.base_delay, attempt);
                debug!("Retrying {} after {:?}", command.describe(), delay);
                tokio::time::sleep(delay).await;
            }
        }

        false
    }

    pub async fn send_message(&self, recipient: &str, text: &str) -> bool {
        self.execute(&AutomationCommand::SendMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
        })
        .await
    }

    pub async fn show_typing_indicator(&self, recipient: &str) -> bool {
        self.execute(&AutomationCommand::ShowTypingIndicator {
            recipient: recipient.to_string(),
        })
        .await
    }

    pub async fn clear_compose(&self) -> bool {
        self.execute(&AutomationCommand::ClearCompose).await
    }
}

/// delay(attempt) = base * 2^attempt, zero-based.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `fail_first` invocations, then succeeds.
    struct FlakyRunner {
        fail_first: u32,
        calls: AtomicU32,
    }

    impl FlakyRunner {
        fn new(fail_first: u32) -> Self {
            Self {
                fail_first,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl ScriptRunner for FlakyRunner {
        fn run(&self, _source: &str) -> anyhow::Result<()> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                bail!("automation target rejected the command");
            }
            Ok(())
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_return_false_after_full_backoff() {
        let runner = Arc::new(FlakyRunner::new(u32::MAX));
        let automation =
            Automation::with_runner(runner.clone(), 3, Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        let ok = automation.clear_compose().await;

        assert!(!ok);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
        // Two backoff sleeps: 1s + 2s
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_second_attempt() {
        let runner = Arc::new(FlakyRunner::new(1));
        let automation =
            Automation::with_runner(runner.clone(), 3, Duration::from_secs(1));

        let ok = automation.send_message("+15551234567", "hello").await;

        assert!(ok);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn first_attempt_success_skips_backoff() {
        let runner = Arc::new(FlakyRunner::new(0));
        let automation =
            Automation::with_runner(runner.clone(), 3, Duration::from_secs(1));

        assert!(automation.show_typing_indicator("+15551234567").await);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }
}
