//! Alerting decisions.
//!
//! Pure functions from raw status data to suppress/warn decisions. Every
//! function takes explicit timestamps instead of reading a clock, so the
//! boundary behavior is directly testable.

use alloy_primitives::U256;

use crate::models::RetryableStatus;

/// Tickets not yet scheduled usually self-resolve within the sequencer's
/// normal processing window; don't report them for the first two hours.
pub const REPORTING_PERIOD_FOR_NOT_SCHEDULED: u64 = 2 * 60 * 60;

/// Tickets that expired more than two days ago are stale: already handled
/// or no longer worth anyone's attention.
pub const REPORTING_PERIOD_FOR_EXPIRED: u64 = 2 * 24 * 60 * 60;

/// Actionable tickets expiring within this window get the dramatic
/// treatment.
pub const CRITICAL_SOON_TO_EXPIRE_PERIOD: u64 = 2 * 24 * 60 * 60;

/// Expected batch-posting cadence when `maxTimeVariation` cannot be read.
pub const BATCH_POSTING_TIMEBOUNDS_FALLBACK: u64 = 4 * 60 * 60;

/// Subtracted from the on-chain time bounds before clamping.
pub const BATCH_POSTING_TIMEBOUNDS_BUFFER: u64 = 9 * 60 * 60;

/// Width of the sequencer-inbox scan window.
pub const MAX_TIMEBOUNDS_SECONDS: u64 = 12 * 60 * 60;

/// The batch poster balance must cover this many days of estimated spend.
pub const DAYS_OF_BALANCE_LEFT: u64 = 3;

/// Only this many most-recent batch postings feed the spend estimate.
pub const RECENT_BATCH_TX_LIMIT: usize = 50;

/// Static minimum balance (0.1 ETH in wei) used when there is no posting
/// history to estimate from.
pub const STATIC_MINIMUM_BALANCE_WEI: u128 = 100_000_000_000_000_000;

/// Child-chain blocks after which a validator is considered AFK.
pub const VALIDATOR_AFK_BLOCKS: u64 = 45818;

/// Assertion search windows never exceed seven days...
pub const ASSERTION_SEARCH_WINDOW_CAP: u64 = 7 * 24 * 60 * 60;

/// ...lose a four-day safety buffer...
pub const ASSERTION_SAFETY_BUFFER: u64 = 4 * 24 * 60 * 60;

/// ...and never shrink below one day.
pub const ASSERTION_MINIMUM_WINDOW: u64 = 24 * 60 * 60;

/// Why a ticket was kept out of the alert stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Created too recently to be meaningful.
    TooRecent,
    /// Expired long enough ago to be stale.
    Stale,
}

/// Outcome of classifying a single ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketDecision {
    Suppress(SuppressReason),
    Warn { escalate: bool },
}

impl TicketDecision {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppress(_))
    }
}

/// Classifies a ticket. Suppression rules apply in order, first match
/// wins:
///
/// 1. `NOT_YET_CREATED` less than two hours old: suppress (strict `<`, so
///    a ticket exactly two hours old is reported)
/// 2. `EXPIRED` more than two days past its timeout: suppress (strict `>`)
/// 3. otherwise warn, escalated when an actionable ticket has under two
///    days left before timeout
pub fn classify_ticket(
    status: RetryableStatus,
    created_at_timestamp: u64,
    timeout_timestamp: u64,
    now: u64,
) -> TicketDecision {
    if status == RetryableStatus::NotYetCreated
        && now.saturating_sub(created_at_timestamp) < REPORTING_PERIOD_FOR_NOT_SCHEDULED
    {
        return TicketDecision::Suppress(SuppressReason::TooRecent);
    }

    if status == RetryableStatus::Expired
        && now.saturating_sub(timeout_timestamp) > REPORTING_PERIOD_FOR_EXPIRED
    {
        return TicketDecision::Suppress(SuppressReason::Stale);
    }

    let escalate = status.is_actionable()
        && timeout_timestamp.saturating_sub(now) < CRITICAL_SOON_TO_EXPIRE_PERIOD;

    TicketDecision::Warn { escalate }
}

/// Derives the expected batch-posting interval from the sequencer inbox's
/// `maxTimeVariation` value: the smaller of delay-blocks converted to
/// seconds and delay-seconds, then clamped by
/// `min(0.5 * x, max(1h, x - buffer))`. The clamp formula directly drives
/// alert sensitivity and is pinned by tests.
pub fn batch_posting_time_bounds(
    max_time_variation: Option<(u64, u64)>,
    parent_block_time: f64,
) -> u64 {
    let bounds = match max_time_variation {
        Some((delay_blocks, delay_seconds)) => {
            std::cmp::min((delay_blocks as f64 * parent_block_time) as u64, delay_seconds)
        }
        None => BATCH_POSTING_TIMEBOUNDS_FALLBACK,
    };

    std::cmp::min(
        bounds / 2,
        std::cmp::max(3600, bounds.saturating_sub(BATCH_POSTING_TIMEBOUNDS_BUFFER)),
    )
}

/// A batch-posting stall is only alertable when there is both a backlog
/// and silence past the expected posting interval.
pub fn should_alert_batch_posting(
    backlog_blocks: u64,
    seconds_since_last_batch: u64,
    time_bounds: u64,
) -> bool {
    backlog_blocks > 0 && seconds_since_last_batch > time_bounds
}

/// Extrapolates the gas spend observed over a scan window to a full day.
pub fn estimated_daily_spend(gas_used: U256, gas_price: U256, window_seconds: u64) -> U256 {
    if window_seconds == 0 {
        return U256::ZERO;
    }
    gas_used * gas_price * U256::from(86400u64) / U256::from(window_seconds)
}

/// Minimum balance the batch poster should hold: [`DAYS_OF_BALANCE_LEFT`]
/// days of estimated spend, or the static floor when there is no history.
pub fn minimum_balance_threshold(daily_spend: U256) -> U256 {
    if daily_spend.is_zero() {
        U256::from(STATIC_MINIMUM_BALANCE_WEI)
    } else {
        U256::from(DAYS_OF_BALANCE_LEFT) * daily_spend
    }
}

/// Seconds of parent-chain history to search for `NodeCreated` events:
/// `min(confirm_period_blocks * validator_afk_blocks * block_time, 7d)`
/// minus a four-day buffer, floored at one day.
pub fn assertion_search_window_seconds(confirm_period_blocks: u64, parent_block_time: f64) -> u64 {
    let raw = confirm_period_blocks as f64 * VALIDATOR_AFK_BLOCKS as f64 * parent_block_time;
    let capped = if raw >= ASSERTION_SEARCH_WINDOW_CAP as f64 {
        ASSERTION_SEARCH_WINDOW_CAP
    } else {
        raw as u64
    };
    std::cmp::max(
        capped.saturating_sub(ASSERTION_SAFETY_BUFFER),
        ASSERTION_MINIMUM_WINDOW,
    )
}
