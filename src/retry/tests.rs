use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(2), Duration::from_millis(10))
}

/// Returns the scripted error for attempts `1..=failures`, then succeeds.
async fn flaky(
    calls: &AtomicU32,
    failures: u32,
    err: RemoteError,
) -> Result<&'static str, RemoteError> {
    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
    if n <= failures { Err(err) } else { Ok("ok") }
}

#[test]
fn test_backoff_doubles_until_cap() {
    let policy = RetryPolicy::new(5, Duration::from_secs(15), Duration::from_secs(180));

    assert_eq!(policy.backoff(0), Duration::from_secs(15));
    assert_eq!(policy.backoff(1), Duration::from_secs(30));
    assert_eq!(policy.backoff(2), Duration::from_secs(60));
    assert_eq!(policy.backoff(3), Duration::from_secs(120));
    assert_eq!(policy.backoff(4), Duration::from_secs(180));
    assert_eq!(policy.backoff(40), Duration::from_secs(180));
}

#[test]
fn test_policy_new_normalizes() {
    let policy = RetryPolicy::new(0, Duration::from_secs(500), Duration::from_secs(180));

    assert_eq!(policy.max_attempts, 1);
    assert_eq!(policy.base_wait, Duration::from_secs(180));
}

#[test]
fn test_error_classification() {
    assert!(RemoteError::network("reset").is_retryable());
    assert!(RemoteError::RateLimited { retry_after: None }.is_retryable());
    assert!(RemoteError::inference("oom").is_retryable());
    assert!(
        !RemoteError::Client {
            status: 404,
            url: "u".into()
        }
        .is_retryable()
    );
    assert!(!RemoteError::validation("no title").is_retryable());
    assert!(
        !RemoteError::ContractViolation {
            expected: 16,
            actual: 15
        }
        .is_retryable()
    );

    let hinted = RemoteError::RateLimited {
        retry_after: Some(Duration::from_secs(7)),
    };
    assert_eq!(hinted.retry_after(), Some(Duration::from_secs(7)));
    assert_eq!(RemoteError::network("x").retry_after(), None);
}

#[tokio::test]
async fn test_success_first_try_does_not_sleep() {
    let executor = RetryableExecutor::new(fast_policy(5));
    let calls = AtomicU32::new(0);

    let exec = executor
        .execute("first", || flaky(&calls, 0, RemoteError::network("x")))
        .await;

    assert_eq!(exec.outcome, Outcome::Success("ok"));
    assert_eq!(exec.attempts, 1);
    assert_eq!(exec.slept, Duration::ZERO);
}

#[tokio::test]
async fn test_rate_limited_three_times_then_success() {
    let policy = fast_policy(5);
    let executor = RetryableExecutor::new(policy);
    let calls = AtomicU32::new(0);

    let exec = executor
        .execute("rate-limited", || {
            flaky(&calls, 3, RemoteError::RateLimited { retry_after: None })
        })
        .await;

    assert!(exec.outcome.is_success());
    assert_eq!(exec.attempts, 4);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(exec.slept, policy.total_backoff(3));
    assert_eq!(
        exec.slept,
        Duration::from_millis(2) + Duration::from_millis(4) + Duration::from_millis(8)
    );
}

#[tokio::test]
async fn test_total_sleep_matches_capped_sum() {
    let policy = RetryPolicy::new(8, Duration::from_millis(1), Duration::from_millis(5));
    let executor = RetryableExecutor::new(policy);
    let calls = AtomicU32::new(0);

    let exec = executor
        .execute("transient", || flaky(&calls, 6, RemoteError::network("timeout")))
        .await;

    assert!(exec.outcome.is_success());
    // 1 + 2 + 4 + 5 + 5 + 5
    assert_eq!(exec.slept, Duration::from_millis(22));
    assert_eq!(exec.slept, policy.total_backoff(6));
}

#[tokio::test]
async fn test_retry_after_hint_is_capped_and_does_not_grow_backoff() {
    let executor = RetryableExecutor::new(fast_policy(5));
    let calls = AtomicU32::new(0);

    let exec = executor
        .execute("hinted", || {
            flaky(
                &calls,
                2,
                RemoteError::RateLimited {
                    retry_after: Some(Duration::from_secs(3600)),
                },
            )
        })
        .await;

    assert!(exec.outcome.is_success());
    // Both waits clamp to the 10ms cap.
    assert_eq!(exec.slept, Duration::from_millis(20));
}

#[tokio::test]
async fn test_hint_then_transient_uses_base_wait() {
    let executor = RetryableExecutor::new(fast_policy(5));
    let calls = AtomicU32::new(0);

    let exec = executor
        .execute("mixed", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                match n {
                    1 => Err(RemoteError::RateLimited {
                        retry_after: Some(Duration::from_millis(3)),
                    }),
                    2 => Err(RemoteError::network("reset")),
                    _ => Ok(n),
                }
            }
        })
        .await;

    assert_eq!(exec.outcome, Outcome::Success(3));
    // 3ms hint, then the untouched 2ms base wait.
    assert_eq!(exec.slept, Duration::from_millis(5));
}

#[tokio::test]
async fn test_terminal_error_stops_immediately() {
    let executor = RetryableExecutor::new(fast_policy(5));
    let calls = AtomicU32::new(0);

    let exec = executor
        .execute("client", || {
            flaky(
                &calls,
                10,
                RemoteError::Client {
                    status: 404,
                    url: "https://example.org".into(),
                },
            )
        })
        .await;

    assert!(matches!(
        exec.outcome,
        Outcome::Terminal(RemoteError::Client { status: 404, .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(exec.slept, Duration::ZERO);
}

#[tokio::test]
async fn test_exhaustion_returns_last_error_without_final_sleep() {
    let policy = fast_policy(3);
    let executor = RetryableExecutor::new(policy);
    let calls = AtomicU32::new(0);

    let exec = executor
        .execute("exhausted", || flaky(&calls, 10, RemoteError::network("down")))
        .await;

    assert!(matches!(exec.outcome, Outcome::Terminal(RemoteError::Network { .. })));
    assert_eq!(exec.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(exec.slept, policy.total_backoff(2));
}
