//! Central place for all default values.
//! Update these and the whole app picks them up.

use std::time::Duration;

pub struct Defaults;

impl Defaults {

    /* Key generation */
    pub const KEY_LEN: usize = 32; // AES-256
    pub const KEY_COUNT: u32 = 8;

    /* Clipboard */
    pub const CLIPBOARD_DELAY_SECS: u64 = 30;
    pub const DECOY_BYTES: usize = 16;
    pub const DECOY_SETTLE: Duration = Duration::from_millis(50);

    /// Upper bound on how long shutdown waits for one background clearance
    /// before running it on the calling thread instead.
    pub const FORCED_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

    /// Per external emptying tool (xclip, xsel, ...); a hung one is killed.
    pub const CLEAR_TOOL_TIMEOUT: Duration = Duration::from_secs(1);
    pub const CLEAR_TOOL_POLL: Duration = Duration::from_millis(10);

    /* Console */
    pub const MASKED_KEY: &'static str = "••••••••";
    pub const PROGRESS_STEPS: u32 = 100;
    pub const PROGRESS_WIDTH: usize = 50;

    /* Exit codes */
    pub const EXIT_FATAL: i32 = 1;
    pub const SIGNAL_EXIT_BASE: i32 = 128;
}
