//! Model gateway — bounded retry with exponential backoff around a `TextGenerator`.
//!
//! Attempt `i` (0-indexed) that fails transiently waits `base_delay * 2^i`
//! before the next attempt: 1s, 2s, 4s, 8s with the defaults. No jitter.
//! The first success short-circuits; there is no sleep after the final attempt.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use super::{GeneratorError, TextGenerator};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles each time.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Same attempt budget, no waiting.
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.gateway_max_attempts,
            Duration::from_millis(config.gateway_backoff_base_ms),
        )
    }

    /// Wait after the 0-indexed `attempt` fails.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("generation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: GeneratorError,
    },

    #[error("generation rejected on attempt {attempt}: {source}")]
    Rejected {
        attempt: u32,
        #[source]
        source: GeneratorError,
    },
}

/// One pass through the retry loop. Never outlives `ModelGateway::generate`.
struct GatewayAttempt {
    index: u32,
    outcome: AttemptOutcome,
}

enum AttemptOutcome {
    Success(String),
    TransientFailure(GeneratorError),
    HardFailure(GeneratorError),
}

/// The only path from request handling to the generation service.
/// Knows nothing about resumes; it moves a prompt in and raw text out.
#[derive(Clone)]
pub struct ModelGateway {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl ModelGateway {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let max_attempts = self.policy.max_attempts;
        let mut index = 0;

        loop {
            let attempt = self.attempt(index, prompt).await;

            match attempt.outcome {
                AttemptOutcome::Success(text) => {
                    if attempt.index > 0 {
                        info!(
                            "Generation succeeded on attempt {}/{}",
                            attempt.index + 1,
                            max_attempts
                        );
                    }
                    return Ok(text);
                }
                AttemptOutcome::HardFailure(e) => {
                    warn!(
                        "Generation attempt {}/{} failed: {e}",
                        attempt.index + 1,
                        max_attempts
                    );
                    error!(
                        "Generation attempt {}/{} rejected, not retrying",
                        attempt.index + 1,
                        max_attempts
                    );
                    return Err(GatewayError::Rejected {
                        attempt: attempt.index + 1,
                        source: e,
                    });
                }
                AttemptOutcome::TransientFailure(e) => {
                    if attempt.index + 1 >= max_attempts {
                        warn!(
                            "Generation attempt {}/{} failed: {e}",
                            attempt.index + 1,
                            max_attempts
                        );
                        error!("Generation retries exhausted after {max_attempts} attempts");
                        return Err(GatewayError::RetriesExhausted {
                            attempts: max_attempts,
                            last_error: e,
                        });
                    }

                    let delay = self.policy.delay_for(attempt.index);
                    warn!(
                        "Generation attempt {}/{} failed: {e}. Retrying in {}ms",
                        attempt.index + 1,
                        max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            index += 1;
        }
    }

    async fn attempt(&self, index: u32, prompt: &str) -> GatewayAttempt {
        let outcome = match self.generator.generate(prompt).await {
            Ok(text) => AttemptOutcome::Success(text),
            Err(e) if e.is_transient() => AttemptOutcome::TransientFailure(e),
            Err(e) => AttemptOutcome::HardFailure(e),
        };
        GatewayAttempt { index, outcome }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::llm_client::testing::{ScriptedGenerator, Step};

    fn gateway(generator: &Arc<ScriptedGenerator>, policy: RetryPolicy) -> ModelGateway {
        ModelGateway::new(generator.clone(), policy)
    }

    fn failures_then_reply(failures: usize) -> Vec<Step> {
        let mut steps = vec![Step::Transient; failures];
        steps.push(Step::Reply("ok".to_string()));
        steps
    }

    #[test]
    fn test_delay_doubles_from_base() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..5).map(|i| policy.delay_for(i).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_policy_never_allows_zero_attempts() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = Config::for_tests();
        config.gateway_max_attempts = 3;
        config.gateway_backoff_base_ms = 250;
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let generator = Arc::new(ScriptedGenerator::replying("{\"a\":1}"));
        let text = gateway(&generator, RetryPolicy::immediate(5))
            .generate("prompt")
            .await
            .unwrap();
        assert_eq!(text, "{\"a\":1}");
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_attempts_equal_failures_plus_one_capped_at_five() {
        for failures in 0..=6usize {
            let generator = Arc::new(ScriptedGenerator::new(failures_then_reply(failures)));
            let result = gateway(&generator, RetryPolicy::immediate(5))
                .generate("prompt")
                .await;

            let expected = (failures as u32 + 1).min(5);
            assert_eq!(generator.calls(), expected, "failures={failures}");
            assert_eq!(result.is_ok(), failures < 5, "failures={failures}");
        }
    }

    #[tokio::test]
    async fn test_five_failures_exhaust_without_sixth_call() {
        let generator = Arc::new(ScriptedGenerator::new(failures_then_reply(5)));
        let err = gateway(&generator, RetryPolicy::immediate(5))
            .generate("prompt")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::RetriesExhausted { attempts: 5, .. }
        ));
        assert_eq!(generator.calls(), 5);
    }

    #[tokio::test]
    async fn test_hard_failure_is_not_retried() {
        let generator = Arc::new(ScriptedGenerator::new([
            Step::Reject,
            Step::Reply("never reached".to_string()),
        ]));
        let err = gateway(&generator, RetryPolicy::immediate(5))
            .generate("prompt")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Rejected { attempt: 1, .. }));
        assert_eq!(generator.calls(), 1);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    #[tokio::test]
    async fn test_hard_failure_logs_attempt_warning() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let generator = Arc::new(ScriptedGenerator::new([Step::Reject]));
        gateway(&generator, RetryPolicy::immediate(5))
            .generate("prompt")
            .await
            .unwrap_err();

        let lines = logs.lines();
        let warning = lines
            .iter()
            .position(|l| l.contains("WARN") && l.contains("attempt 1/5 failed"))
            .unwrap_or_else(|| panic!("no attempt warning in {lines:?}"));
        let rejection = lines
            .iter()
            .position(|l| l.contains("ERROR") && l.contains("rejected"))
            .unwrap_or_else(|| panic!("no rejection error in {lines:?}"));
        assert!(warning < rejection);
        assert!(lines[warning].contains("400"), "cause missing: {}", lines[warning]);
    }

    #[tokio::test]
    async fn test_same_prompt_sent_on_every_attempt() {
        let generator = Arc::new(ScriptedGenerator::new(failures_then_reply(2)));
        gateway(&generator, RetryPolicy::immediate(5))
            .generate("the prompt")
            .await
            .unwrap();
        assert_eq!(generator.prompts(), vec!["the prompt"; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_on_exhaustion() {
        let generator = Arc::new(ScriptedGenerator::new(failures_then_reply(5)));
        let start = Instant::now();
        let result = gateway(&generator, RetryPolicy::default())
            .generate("prompt")
            .await;

        assert!(result.is_err());
        // 1 + 2 + 4 + 8: no wait after the fifth attempt
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16),
            "elapsed {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_stops_at_success() {
        let generator = Arc::new(ScriptedGenerator::new(failures_then_reply(2)));
        let start = Instant::now();
        gateway(&generator, RetryPolicy::default())
            .generate("prompt")
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4),
            "elapsed {elapsed:?}"
        );
    }
}
