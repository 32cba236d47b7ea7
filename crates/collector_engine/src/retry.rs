use std::future::Future;

use collector_core::RetryPolicy;
use collector_logging::collector_warn;

use crate::{FailureKind, FetchError};

/// Runs `op` until it returns something other than a rate-limit error or
/// the policy's attempt budget is spent, sleeping `policy.cooldown` between
/// attempts.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match op().await {
            Err(err) if err.is_rate_limited() => {
                if !policy.allows_retry(attempts) {
                    collector_warn!(
                        "Rate limited on {} after {} attempt(s); giving up",
                        label,
                        attempts
                    );
                    return Err(FetchError::new(
                        FailureKind::RateLimited { attempts },
                        err.message,
                    ));
                }
                collector_warn!(
                    "Rate limited on {} (attempt {}); waiting {:?} before retry",
                    label,
                    attempts,
                    policy.cooldown
                );
                tokio::time::sleep(policy.cooldown).await;
            }
            other => return other,
        }
    }
}
