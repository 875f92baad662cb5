use std::time::Duration;

pub(crate) const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Equal jitter backoff: base/2 + rand(0, base/2).
pub(crate) fn jittered_backoff(attempt: u32) -> Duration {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    Duration::from_millis(half + fastrand::u64(..half.max(1)))
}

/// Whether an HTTP status is worth retrying (rate limiting or a server fault).
pub(crate) fn is_transient_status(code: u16) -> bool {
    code == 429 || (500..=599).contains(&code)
}
