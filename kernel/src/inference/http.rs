//! Request dispatch with status classification and backoff.

use crate::inference::streaming::RetryConfig;
use agent_sdk::InferenceError;
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

/// Sends the request built by `build`, retrying transient failures.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`.
///
/// # Errors
///
/// Returns the last error once retries are exhausted or a non-retryable
/// status is received.
pub async fn send_with_retry<F>(
    provider: &str,
    retry: &RetryConfig,
    build: F,
) -> Result<Response, InferenceError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = InferenceError::NetworkError("No attempts made".to_string());

    for attempt in 0..=retry.max_retries {
        let outcome = match build().send().await {
            Ok(res) => classify(res).await,
            Err(e) => Err((InferenceError::NetworkError(e.to_string()), true)),
        };

        match outcome {
            Ok(res) => return Ok(res),
            Err((error, should_retry)) => {
                last_error = error;

                if !should_retry || attempt >= retry.max_retries {
                    break;
                }

                let delay = retry.calculate_backoff_delay(attempt);
                let delay_ms: u64 = delay.as_millis().try_into().unwrap_or(u64::MAX);
                warn!(
                    provider,
                    attempt = attempt + 1,
                    max_retries = retry.max_retries,
                    delay_ms,
                    error = %last_error,
                    "Inference request failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    debug!(provider, error = %last_error, "Giving up on inference request");
    Err(last_error)
}

/// Maps a response status to success, or to an error and whether it is worth retrying.
async fn classify(res: Response) -> Result<Response, (InferenceError, bool)> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().await.unwrap_or_default();
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err((InferenceError::RateLimit, true)),
        StatusCode::BAD_REQUEST if text.contains("context_length_exceeded") => {
            Err((InferenceError::ContextLengthExceeded, false))
        }
        StatusCode::BAD_REQUEST => Err((
            InferenceError::ProviderError(format!("Bad Request: {text}")),
            false,
        )),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => Err((
            InferenceError::ProviderError(format!("HTTP {status}: {text}")),
            true,
        )),
        _ => Err((
            InferenceError::ProviderError(format!("HTTP {status}: {text}")),
            false,
        )),
    }
}
