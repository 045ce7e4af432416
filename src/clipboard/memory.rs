use std::sync::{Mutex, MutexGuard};

use zeroize::Zeroizing;

use super::{ClipboardService, HardClear};
use crate::error::ClipboardError;

#[derive(Default)]
struct Slot {
    current: Zeroizing<String>,
    writes: Vec<Zeroizing<String>>,
    hard_clears: usize,
    /// Empty writes and `clear` calls left to fail.
    failing_clears: usize,
}

/// In-process clipboard that remembers every write, so tests can observe
/// what reached the clipboard and in which order.
pub struct MemoryClipboard {
    slot: Mutex<Slot>,
    hard_clear: bool,
    available: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self { slot: Mutex::new(Slot::default()), hard_clear: true, available: true }
    }

    /// A platform without a history-bypassing clear.
    pub fn without_hard_clear() -> Self {
        Self { hard_clear: false, ..Self::new() }
    }

    /// Every operation fails as if no clipboard were reachable.
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    /// Copying works, but the next `times` attempts to empty it (empty
    /// `set_text` or `clear`) fail. No hard clear either.
    pub fn failing_clears(times: usize) -> Self {
        let cb = Self::without_hard_clear();
        cb.lock().failing_clears = times;
        cb
    }

    pub fn contents(&self) -> String {
        self.lock().current.to_string()
    }

    /// All values ever written, oldest first.
    pub fn writes(&self) -> Vec<Zeroizing<String>> {
        self.lock().writes.clone()
    }

    pub fn hard_clears(&self) -> usize {
        self.lock().hard_clears
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panicking test thread must not hide the clipboard state.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<(), ClipboardError> {
        if self.available {
            Ok(())
        } else {
            Err(ClipboardError::Unavailable("no clipboard in this session".into()))
        }
    }

    fn check_clear(slot: &mut Slot) -> Result<(), ClipboardError> {
        if slot.failing_clears > 0 {
            slot.failing_clears -= 1;
            return Err(ClipboardError::Operation("clipboard owner refused to empty".into()));
        }
        Ok(())
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardService for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.check()?;
        let mut slot = self.lock();
        if text.is_empty() {
            Self::check_clear(&mut slot)?;
        }
        slot.current = Zeroizing::new(text.to_owned());
        slot.writes.push(Zeroizing::new(text.to_owned()));
        Ok(())
    }

    fn clear(&self) -> Result<(), ClipboardError> {
        self.check()?;
        let mut slot = self.lock();
        Self::check_clear(&mut slot)?;
        slot.current = Zeroizing::default();
        Ok(())
    }

    fn hard_clear(&self) -> Result<HardClear, ClipboardError> {
        self.check()?;
        if !self.hard_clear {
            return Ok(HardClear::Unsupported);
        }
        let mut slot = self.lock();
        slot.current = Zeroizing::default();
        slot.hard_clears += 1;
        Ok(HardClear::Done)
    }

    fn get_text(&self) -> Result<String, ClipboardError> {
        self.check()?;
        Ok(self.contents())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_writes_in_order() {
        let cb = MemoryClipboard::new();
        cb.set_text("a").unwrap();
        cb.set_text("b").unwrap();
        let writes = cb.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].as_str(), "a");
        assert_eq!(writes[1].as_str(), "b");
        assert_eq!(cb.get_text().unwrap(), "b");
    }

    #[test]
    fn hard_clear_support_is_configurable() {
        let cb = MemoryClipboard::without_hard_clear();
        cb.set_text("x").unwrap();
        assert_eq!(cb.hard_clear().unwrap(), HardClear::Unsupported);
        assert_eq!(cb.contents(), "x");

        let cb = MemoryClipboard::new();
        cb.set_text("x").unwrap();
        assert_eq!(cb.hard_clear().unwrap(), HardClear::Done);
        assert_eq!(cb.contents(), "");
        assert_eq!(cb.hard_clears(), 1);
    }

    #[test]
    fn failing_clears_only_refuse_emptying() {
        let cb = MemoryClipboard::failing_clears(2);
        cb.set_text("k").unwrap();
        assert!(cb.set_text("").is_err());
        assert!(cb.clear().is_err());
        assert_eq!(cb.contents(), "k");
        assert_eq!(cb.hard_clear().unwrap(), HardClear::Unsupported);

        cb.set_text("").unwrap();
        assert_eq!(cb.contents(), "");
    }

    #[test]
    fn unavailable_fails_every_call() {
        let cb = MemoryClipboard::unavailable();
        assert!(matches!(cb.set_text("x"), Err(ClipboardError::Unavailable(_))));
        assert!(cb.clear().is_err());
        assert!(cb.hard_clear().is_err());
        assert!(cb.get_text().is_err());
    }
}
