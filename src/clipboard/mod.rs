//! Clipboard access and timed clearance.

pub mod memory;
pub mod session;
pub mod system;

pub use memory::MemoryClipboard;
pub use session::{ClearanceHandle, ClearanceOutcome, ClipboardEvent, ClipboardSession, Trigger};
pub use system::SystemClipboard;

use crate::error::ClipboardError;

/// Result of the platform "empty clipboard" call that bypasses history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardClear {
    Done,
    /// No such call on this platform; plain overwrite is all we have.
    Unsupported,
    /// The call exists but did not succeed.
    Failed,
}

/// The OS clipboard as the core sees it.
pub trait ClipboardService: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;

    fn clear(&self) -> Result<(), ClipboardError>;

    /// Empty the clipboard through the platform path that skips history
    /// managers, where there is one.
    fn hard_clear(&self) -> Result<HardClear, ClipboardError>;

    fn get_text(&self) -> Result<String, ClipboardError>;
}
