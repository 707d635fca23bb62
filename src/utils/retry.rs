use tokio::time::sleep;
use tracing::warn;

use crate::Error;
use crate::Result;
use crate::RetryPolicy;

/// Run `task` up to `policy.max_attempts` times with a fixed pause between
/// attempts, propagating the last failure.
///
/// Every failure is retried alike - this layer does not tell transient
/// errors from logic errors. Callers that need fail-fast semantics must not
/// route the operation through here.
pub(crate) async fn with_retry<F, T, P>(
    operation: &str,
    policy: &RetryPolicy,
    task: F,
) -> Result<P>
where
    F: Fn() -> T,
    T: std::future::Future<Output = Result<P>>,
{
    let mut last = Error::Registry(format!("{operation}: no attempts were made"));
    let mut attempt = 0;
    while attempt < policy.max_attempts {
        match task().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    %error,
                    "attempt failed"
                );
                last = error;
            }
        }

        attempt += 1;
        if attempt < policy.max_attempts {
            sleep(policy.delay()).await;
        }
    }
    Err(last)
}
