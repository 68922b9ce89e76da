//! Chunked block-range scanning.
//!
//! Log queries over wide block ranges get rate limited or truncated by RPC
//! providers, so every monitor funnels its range queries through this
//! module: an arbitrary range is split into bounded sub-ranges, each
//! sub-range is fetched through a caller-supplied closure, failed fetches
//! are retried with linearly increasing backoff, and the per-chunk results
//! are flattened back into a single list that preserves block order.
//!
//! This is the single home of retry/backoff behavior; call sites never
//! roll their own.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::services::blockchain::BlockChainError;

/// An inclusive range of block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from_block: u64,
    pub to_block: u64,
}

impl BlockRange {
    /// Creates a new range.
    ///
    /// # Panics
    /// Panics if `from_block > to_block`; ranges are always constructed
    /// from an already-ordered pair.
    pub fn new(from_block: u64, to_block: u64) -> Self {
        assert!(
            from_block <= to_block,
            "invalid block range: {} > {}",
            from_block,
            to_block
        );
        Self {
            from_block,
            to_block,
        }
    }

    /// Number of blocks covered by the range, inclusive of both ends.
    pub fn len(&self) -> u64 {
        self.to_block - self.from_block + 1
    }

    /// Splits the range into consecutive sub-ranges of at most `chunk_size`
    /// blocks, the last truncated to `to_block`.
    ///
    /// A range where `from_block == to_block` yields no chunks at all: the
    /// scan of a single-block range is skipped entirely. (The source this
    /// monitor descends from had both this behavior and a
    /// process-as-single-chunk variant; the skip policy is the one kept.)
    ///
    /// # Panics
    /// Panics if `chunk_size` is zero.
    pub fn chunks(&self, chunk_size: u64) -> Vec<BlockRange> {
        assert!(chunk_size > 0, "chunk_size must be positive");

        if self.from_block == self.to_block {
            return Vec::new();
        }

        let mut ranges = Vec::new();
        let mut current = self.from_block;
        while current <= self.to_block {
            let end = std::cmp::min(current.saturating_add(chunk_size - 1), self.to_block);
            ranges.push(BlockRange {
                from_block: current,
                to_block: end,
            });
            if end == self.to_block {
                break;
            }
            current = end + 1;
        }
        ranges
    }
}

/// Errors the scanner is willing to retry.
///
/// Network hiccups are worth another attempt; decode failures are not,
/// since retrying a parse error cannot change the outcome.
pub trait RetryableError {
    fn is_retryable(&self) -> bool;
}

impl RetryableError for BlockChainError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// Retry policy for failed sub-range fetches: a fixed attempt budget with
/// linearly increasing delay (`attempt * base_delay`).
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts per sub-range, including the first one
    pub max_attempts: u32,

    /// Delay unit; the wait after the n-th failed attempt is `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// 3 attempts with a 1 second delay unit.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

async fn fetch_with_retry<T, E, F, Fut>(
    sub_range: BlockRange,
    policy: &RetryPolicy,
    fetch: &F,
) -> Result<Vec<T>, E>
where
    F: Fn(BlockRange) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match fetch(sub_range).await {
            Ok(items) => return Ok(items),
            Err(e) => {
                attempt += 1;
                if !e.is_retryable() || attempt >= policy.max_attempts {
                    return Err(e);
                }
                warn!(
                    from_block = sub_range.from_block,
                    to_block = sub_range.to_block,
                    attempt,
                    "Sub-range fetch failed ({}), retrying",
                    e
                );
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
        }
    }
}

/// Scans `range` in sub-ranges of at most `chunk_size` blocks, invoking
/// `fetch` once per sub-range, sequentially in block order.
///
/// Failed fetches are retried per `policy`; exhausting the budget (or
/// hitting a non-retryable error) aborts the whole scan and propagates the
/// failure. No partial results are returned for a failed sub-range.
///
/// # Returns
/// A single flat list of all fetched items across all sub-ranges, in block
/// order.
pub async fn scan_range<T, E, F, Fut>(
    range: BlockRange,
    chunk_size: u64,
    policy: &RetryPolicy,
    fetch: F,
) -> Result<Vec<T>, E>
where
    F: Fn(BlockRange) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut results = Vec::new();
    for sub_range in range.chunks(chunk_size) {
        results.extend(fetch_with_retry(sub_range, policy, &fetch).await?);
    }
    Ok(results)
}

/// Like [`scan_range`] but issues up to `max_in_flight` sub-range fetches
/// concurrently, with fetch starts spaced to `requests_per_second`.
///
/// The result order is identical to [`scan_range`]: items are flattened by
/// chunk position, not by arrival order.
pub async fn scan_range_concurrent<T, E, F, Fut>(
    range: BlockRange,
    chunk_size: u64,
    policy: &RetryPolicy,
    max_in_flight: usize,
    requests_per_second: u32,
    fetch: F,
) -> Result<Vec<T>, E>
where
    F: Fn(BlockRange) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
    E: RetryableError + std::fmt::Display,
{
    assert!(max_in_flight > 0, "max_in_flight must be positive");
    assert!(requests_per_second > 0, "requests_per_second must be positive");

    let period =
        Duration::from_millis((1000 / u64::from(requests_per_second)).max(1));
    let limiter = Arc::new(tokio::sync::Mutex::new(tokio::time::interval(period)));
    let fetch = &fetch;
    let policy_ref = &*policy;

    let chunk_results: Vec<Result<Vec<T>, E>> = stream::iter(range.chunks(chunk_size))
        .map(|sub_range| {
            let limiter = limiter.clone();
            async move {
                limiter.lock().await.tick().await;
                fetch_with_retry(sub_range, policy_ref, fetch).await
            }
        })
        .buffered(max_in_flight)
        .collect()
        .await;

    let mut results = Vec::new();
    for chunk in chunk_results {
        results.extend(chunk?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error")
        }
    }

    impl RetryableError for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    ////////////////////////////////////////////////////////////
    // chunking tests
    ////////////////////////////////////////////////////////////

    #[test]
    fn test_chunks_partition_range_exactly() {
        let range = BlockRange::new(100, 1150);
        let chunks = range.chunks(500);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], BlockRange::new(100, 599));
        assert_eq!(chunks[1], BlockRange::new(600, 1099));
        assert_eq!(chunks[2], BlockRange::new(1100, 1150));

        // no gaps, no overlaps
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].to_block + 1, pair[1].from_block);
        }
        assert!(chunks.iter().all(|c| c.len() <= 500));
    }

    #[test]
    fn test_chunks_exact_multiple() {
        let chunks = BlockRange::new(0, 999).chunks(500);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], BlockRange::new(500, 999));
    }

    #[test]
    fn test_single_block_range_is_skipped() {
        assert!(BlockRange::new(42, 42).chunks(100).is_empty());
    }

    #[test]
    fn test_two_block_range_is_one_chunk() {
        let chunks = BlockRange::new(42, 43).chunks(100);
        assert_eq!(chunks, vec![BlockRange::new(42, 43)]);
    }

    #[test]
    #[should_panic(expected = "invalid block range")]
    fn test_inverted_range_panics() {
        BlockRange::new(10, 9);
    }

    ////////////////////////////////////////////////////////////
    // scan_range tests
    ////////////////////////////////////////////////////////////

    #[tokio::test]
    async fn test_scan_flattens_in_block_order() {
        let result: Vec<u64> = scan_range(
            BlockRange::new(0, 99),
            25,
            &fast_policy(),
            |sub: BlockRange| async move { Ok::<_, TestError>(vec![sub.from_block, sub.to_block]) },
        )
        .await
        .unwrap();

        assert_eq!(result, vec![0, 24, 25, 49, 50, 74, 75, 99]);
    }

    #[tokio::test]
    async fn test_scan_empty_single_block_range() {
        let calls = AtomicU32::new(0);
        let result: Vec<u64> = scan_range(BlockRange::new(7, 7), 10, &fast_policy(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TestError>(vec![1]) }
        })
        .await
        .unwrap();

        assert!(result.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retries_are_transparent_below_budget() {
        let attempts = AtomicU32::new(0);
        let result = scan_range(BlockRange::new(0, 9), 100, &fast_policy(), |_| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(TestError { retryable: true })
                } else {
                    Ok(vec![n])
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, vec![2]);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_propagates_failure() {
        let attempts = AtomicU32::new(0);
        let result: Result<Vec<u64>, _> =
            scan_range(BlockRange::new(0, 9), 100, &fast_policy(), |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { retryable: true }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<Vec<u64>, _> =
            scan_range(BlockRange::new(0, 9), 100, &fast_policy(), |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { retryable: false }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_in_later_chunk_aborts_scan() {
        let result: Result<Vec<u64>, _> =
            scan_range(BlockRange::new(0, 99), 25, &fast_policy(), |sub: BlockRange| async move {
                if sub.from_block >= 50 {
                    Err(TestError { retryable: false })
                } else {
                    Ok(vec![sub.from_block])
                }
            })
            .await;

        // fail-fast: no partial results leak out
        assert!(result.is_err());
    }

    ////////////////////////////////////////////////////////////
    // concurrent scan tests
    ////////////////////////////////////////////////////////////

    #[tokio::test]
    async fn test_concurrent_scan_preserves_block_order() {
        // earlier chunks finish last; ordering must still be positional
        let result: Vec<u64> = scan_range_concurrent(
            BlockRange::new(0, 99),
            25,
            &fast_policy(),
            4,
            1000,
            |sub: BlockRange| async move {
                let delay = 40 - sub.from_block / 25 * 10;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, TestError>(vec![sub.from_block])
            },
        )
        .await
        .unwrap();

        assert_eq!(result, vec![0, 25, 50, 75]);
    }

    #[tokio::test]
    async fn test_concurrent_scan_propagates_failure() {
        let result: Result<Vec<u64>, _> = scan_range_concurrent(
            BlockRange::new(0, 99),
            25,
            &fast_policy(),
            4,
            1000,
            |sub: BlockRange| async move {
                if sub.from_block == 50 {
                    Err(TestError { retryable: false })
                } else {
                    Ok(vec![sub.from_block])
                }
            },
        )
        .await;

        assert!(result.is_err());
    }
}
