use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::Instant;

use crate::utils::retry::with_retry;
use crate::Error;
use crate::Result;
use crate::RetryPolicy;

fn policy(max_attempts: usize, delay_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay_ms,
    }
}

async fn failing(counter: &AtomicUsize, succeed_after: usize) -> Result<&'static str> {
    let attempt = counter.fetch_add(1, Ordering::SeqCst);
    if attempt < succeed_after {
        Err(Error::Registry("injected failure".to_string()))
    } else {
        Ok("done")
    }
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_after_two_failures() {
    let counter = AtomicUsize::new(0);
    let started = Instant::now();

    let result = with_retry("read_subtree", &policy(3, 500), || failing(&counter, 2)).await;

    assert_eq!(result.expect("third attempt succeeds"), "done");
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    // Two failures means two full pauses between attempts
    assert!(started.elapsed() >= Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_attempts() {
    let counter = AtomicUsize::new(0);

    let result = with_retry("read_subtree", &policy(3, 500), || failing(&counter, 99)).await;

    assert!(matches!(result, Err(Error::Registry(_))));
    // Never a fourth attempt
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_first_try_success_skips_delay() {
    let counter = AtomicUsize::new(0);
    let started = Instant::now();

    let result = with_retry("connect", &policy(3, 500), || failing(&counter, 0)).await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_last_error_is_propagated() {
    let counter = AtomicUsize::new(0);
    let result: Result<()> = with_retry("read_subtree", &policy(2, 0), || async {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        if attempt == 0 {
            Err(Error::Registry("first".to_string()))
        } else {
            Err(Error::NotFound("second".to_string()))
        }
    })
    .await;

    match result {
        Err(Error::NotFound(key)) => assert_eq!(key, "second"),
        other => panic!("expected the last failure, got {other:?}"),
    }
}
