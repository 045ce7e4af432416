use std::sync::Mutex;

use tracing::debug;

use super::{ClipboardService, HardClear};
use crate::error::ClipboardError;

/// The desktop clipboard through `arboard`, plus the platform's own
/// emptying tools for the hard clear.
pub struct SystemClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn open() -> Result<Self, ClipboardError> {
        let inner = arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        Ok(Self { inner: Mutex::new(inner) })
    }

    fn with<T>(&self, f: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>) -> Result<T, ClipboardError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ClipboardError::Operation("clipboard lock poisoned".into()))?;
        f(&mut *guard).map_err(|e| ClipboardError::Operation(e.to_string()))
    }
}

impl ClipboardService for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.with(|cb| cb.set_text(text))
    }

    fn clear(&self) -> Result<(), ClipboardError> {
        self.with(|cb| cb.clear())
    }

    fn hard_clear(&self) -> Result<HardClear, ClipboardError> {
        #[cfg(windows)]
        {
            // arboard's clear is OpenClipboard + EmptyClipboard.
            self.clear()?;
            Ok(HardClear::Done)
        }

        #[cfg(not(windows))]
        {
            Ok(external::empty_selections())
        }
    }

    fn get_text(&self) -> Result<String, ClipboardError> {
        self.with(|cb| cb.get_text())
    }
}

#[cfg(not(windows))]
mod external {
    use std::io::{self, Write};
    use std::process::{Command, Stdio};
    use std::thread;
    use std::time::{Duration, Instant};

    use super::{debug, HardClear};
    use crate::defaults::Defaults;

    #[cfg(target_os = "macos")]
    const TOOLS: &[(&str, &[&str])] = &[("pbcopy", &[])];

    #[cfg(not(target_os = "macos"))]
    const TOOLS: &[(&str, &[&str])] = &[
        ("wl-copy", &["--clear"]),
        ("wl-copy", &["--primary", "--clear"]),
        ("xclip", &["-selection", "clipboard"]),
        ("xclip", &["-selection", "primary"]),
        ("xsel", &["--clipboard", "--input"]),
        ("xsel", &["--primary", "--input"]),
    ];

    /// Feed empty input to every emptying tool that is installed. Done if at
    /// least one ran cleanly.
    pub(super) fn empty_selections() -> HardClear {
        let mut ran = false;
        let mut failed = false;
        for (program, args) in TOOLS {
            match run_empty(program, args) {
                Ok(true) => ran = true,
                Ok(false) => failed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    debug!(program, error = %e, "hard clear tool failed to start");
                    failed = true;
                }
            }
        }
        match (ran, failed) {
            (true, _) => HardClear::Done,
            (false, true) => HardClear::Failed,
            (false, false) => HardClear::Unsupported,
        }
    }

    fn run_empty(program: &str, args: &[&str]) -> io::Result<bool> {
        run_with_deadline(Command::new(program).args(args), Defaults::CLEAR_TOOL_TIMEOUT)
    }

    /// Spawn with empty stdin and wait at most `timeout`. A child still
    /// running at the deadline is killed and counts as a failure.
    fn run_with_deadline(command: &mut Command, timeout: Duration) -> io::Result<bool> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(b"")?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status.success());
            }
            if Instant::now() >= deadline {
                debug!(pid = child.id(), "clipboard tool timed out, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return Ok(false);
            }
            thread::sleep(Defaults::CLEAR_TOOL_POLL);
        }
    }

    #[cfg(all(test, unix))]
    mod tests {
        use super::*;

        #[test]
        fn hung_tool_is_killed_at_the_deadline() {
            let started = Instant::now();
            let mut sleeper = Command::new("sleep");
            sleeper.arg("5");
            let ok = run_with_deadline(&mut sleeper, Duration::from_millis(200)).unwrap();
            assert!(!ok);
            assert!(started.elapsed() < Duration::from_secs(3));
        }

        #[test]
        fn quick_tool_reports_its_status() {
            assert!(run_with_deadline(&mut Command::new("true"), Duration::from_secs(5)).unwrap());
            assert!(!run_with_deadline(&mut Command::new("false"), Duration::from_secs(5)).unwrap());
        }

        #[test]
        fn missing_tool_is_not_found() {
            let err = run_with_deadline(&mut Command::new("no-such-clipboard-tool"), Duration::from_secs(1))
                .unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::NotFound);
        }
    }
}
