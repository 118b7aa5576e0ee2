pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 8 decimals numbers
pub const COIN_DECIMALS: u8 = 8;
// 100 000 000 to represent 1 PULSE
pub const COIN_VALUE: u64 = 10u64.pow(COIN_DECIMALS as u32);

// ===== WITHDRAWAL LIMITS =====
// Minimum amount accepted for a withdrawal request (1 PULSE)
pub const DEFAULT_MIN_WITHDRAWAL: u64 = COIN_VALUE;
// Maximum amount accepted for a single withdrawal request (10 000 PULSE)
pub const DEFAULT_MAX_WITHDRAWAL: u64 = 10_000 * COIN_VALUE;

// ===== DISTRIBUTION =====
// Maximum number of withdrawals settled in one on-chain batch
pub const MAX_BATCH_SIZE: usize = 50;
// Default interval between two scheduled batch runs (seconds, 0 = disabled)
pub const DEFAULT_DISTRIBUTION_INTERVAL_SECS: u64 = 300;
// Default timeout applied to a single on-chain submission (seconds)
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 60;

// ===== REWARDS =====
// Bonus credited to a fresh account at registration (5 PULSE)
pub const DEFAULT_SIGNUP_BONUS: u64 = 5 * COIN_VALUE;

// Maximum entries returned by a single paginated query
pub const MAX_PAGE_SIZE: usize = 100;
// Default entries per page when the caller does not specify a limit
pub const DEFAULT_PAGE_SIZE: usize = 20;

// Maximum accounts accepted in a single airdrop call
pub const MAX_AIRDROP_RECIPIENTS: usize = 1000;
