use crate::error::LifecycleError;

/// Where a single key is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Generated,
    Displayed,
    ClipboardArmed,
    Erased,
}

impl LifecycleState {
    /// Move to `next`. Forward steps must be taken one at a time; `Erased`
    /// is reachable from anywhere and is terminal.
    pub fn advance(self, key: usize, next: LifecycleState) -> Result<LifecycleState, LifecycleError> {
        use LifecycleState::*;
        let ok = matches!(
            (self, next),
            (Generated, Displayed)
                | (Displayed, ClipboardArmed)
                | (Generated | Displayed | ClipboardArmed, Erased)
                | (Erased, Erased)
        );
        if ok {
            Ok(next)
        } else {
            Err(LifecycleError::InvalidTransition { key, from: self, to: next })
        }
    }

    pub fn is_erased(self) -> bool {
        self == LifecycleState::Erased
    }
}

/// What the user answered at the batch-mode prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Move on to the next key.
    Next,
    /// Clear the clipboard right away, then move on.
    ClearNow,
    /// Stop generating; cleanup runs as on a normal exit.
    Quit,
    /// Ctrl+C seen by the surface itself (raw mode swallows SIGINT).
    Interrupt,
}

/// How a controller run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { generated: usize },
    Quit { generated: usize },
    Interrupted { signal: i32 },
}
