//! Where keys are shown. The controller only talks to [`KeySurface`].

pub mod common_nav;
pub mod console;
pub mod help;
pub mod scripted;
pub mod style;

use std::io;
use std::time::Duration;

use async_trait::async_trait;

use crate::secret::HexView;
use crate::types::Ack;

pub use console::ConsoleSurface;
pub use scripted::{ScriptedSurface, SurfaceEvent};

/// Status shown next to a masked key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Clipboard copy removed.
    Cleared,
    /// Key material gone without a clipboard copy ever existing.
    Wiped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Copied { delay: Duration },
    /// Single-key mode is about to block for this long.
    Countdown { delay: Duration },
    ClipboardCleared,
    Warning(String),
    Goodbye,
}

/// A single-threaded display. Calls come only from the controller's own
/// flow; background completions are queued and replayed by the controller.
#[async_trait]
pub trait KeySurface: Send {
    fn banner(&mut self, index: usize, total: usize) -> io::Result<()>;

    /// Cosmetic delay before the key appears.
    async fn progress(&mut self) -> io::Result<()>;

    fn show_key(&mut self, index: usize, key: &HexView) -> io::Result<()>;

    fn show_masked(&mut self, index: usize, masked: &str, status: KeyStatus) -> io::Result<()>;

    fn notice(&mut self, notice: Notice) -> io::Result<()>;

    /// Block until the user decides what happens next.
    async fn acknowledge(&mut self) -> io::Result<Ack>;

    /// Clear the screen and anything that scrolled off it.
    fn reset(&mut self) -> io::Result<()>;

    /// Give the terminal back in a usable state.
    fn restore(&mut self) {}
}
