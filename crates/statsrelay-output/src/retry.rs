use crate::error::SendError;
use std::future::Future;

/// Runs `attempt` up to `retry_attempts + 1` times, returning the first
/// success or the last error. Each attempt is expected to open its own
/// connection; no backoff is applied between attempts.
pub(crate) async fn send_with_retry<F, Fut>(
    sink_id: &str,
    retry_attempts: u32,
    mut attempt: F,
) -> Result<(), SendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), SendError>>,
{
    let total_attempts = retry_attempts.saturating_add(1);

    let mut result = attempt().await;
    let mut made = 1;
    while let Err(e) = &result {
        tracing::warn!(
            sink = sink_id,
            attempt = made,
            total_attempts,
            error = %e,
            "Send attempt failed"
        );
        if made >= total_attempts {
            break;
        }
        made += 1;
        result = attempt().await;
    }

    result
}
