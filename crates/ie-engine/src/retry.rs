use ie_config::RetryConfig;
use ie_core::ImportExportError;

use std::time::Duration;

use tokio::time::sleep;

/// Execute an async operation with retry logic
///
/// `on_retry` sees every failure that is about to be retried, with the
/// 1-based number of the attempt that failed.
pub async fn with_retry<F, Fut, T, E, R>(
    config: &RetryConfig,
    operation_name: &str,
    mut on_retry: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsRetryable,
    R: FnMut(&E, u32),
{
    let mut attempts = 0;
    let mut delay = config.initial_delay();
    let max_delay = config.max_delay();

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    log::info!("{} succeeded after {} attempts", operation_name, attempts);
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() || attempts >= config.max_attempts {
                    log::warn!(
                        "{} failed after {} attempts: {}",
                        operation_name,
                        attempts,
                        e
                    );
                    return Err(e);
                }

                on_retry(&e, attempts);

                let actual_delay = if config.jitter {
                    let jitter_factor = 0.5 + rand::random::<f64>(); // 0.5 to 1.5
                    Duration::from_secs_f64(delay.as_secs_f64() * jitter_factor)
                } else {
                    delay
                };

                log::debug!(
                    "{} attempt {} failed: {}. Retrying in {:?}",
                    operation_name,
                    attempts,
                    e,
                    actual_delay
                );

                sleep(actual_delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(max_delay.as_secs_f64()),
                );
            }
        }
    }
}

/// Trait for errors that can indicate retryability
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for ImportExportError {
    fn is_retryable(&self) -> bool {
        ImportExportError::is_retryable(self)
    }
}
