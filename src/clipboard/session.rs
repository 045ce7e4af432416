//! One armed copy of a key on the clipboard and its guaranteed removal.
//!
//! [`ClipboardSession::arm`] puts the text on the clipboard right away and
//! spawns a task that sleeps for the delay, then runs the clearance
//! sequence: random decoy, short settle, empty text, platform hard clear.
//! The sleep races a cancel signal, so shutdown can turn any pending
//! clearance into an immediate one. Completion is reported as a
//! [`ClipboardEvent`] on a queue; the task never calls into the display.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand_core::{OsRng, RngCore};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use super::{ClipboardService, HardClear};
use crate::defaults::Defaults;
use crate::error::ClipboardError;
use crate::secret::HexView;

/// What started a clearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Elapsed,
    /// Explicit cancel, or the handle was dropped.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearanceOutcome {
    Cleared { hard: HardClear, trigger: Trigger },
    /// Someone else already ran this session's clearance.
    AlreadyCleared,
    Failed(String),
}

/// Sent once per armed session when its clearance has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEvent {
    pub key: usize,
    pub outcome: ClearanceOutcome,
}

/// Overwrite with a decoy, wait, empty, then hard clear. Every step runs even
/// if an earlier one failed. The slot may already hold newer text; clearing
/// it anyway is harmless.
pub fn clearance_sequence(service: &dyn ClipboardService, settle: Duration) -> Result<HardClear, ClipboardError> {
    let decoy = decoy(&mut OsRng);

    if let Err(e) = service.set_text(&decoy) {
        debug!(error = %e, "decoy overwrite failed");
    }
    if !settle.is_zero() {
        thread::sleep(settle);
    }
    let emptied = service.set_text("").or_else(|_| service.clear());

    match service.hard_clear() {
        Ok(HardClear::Done) => Ok(HardClear::Done),
        Ok(other) => {
            debug!(hard_clear = ?other, "no history-bypassing clear, relying on overwrite");
            emptied.map(|()| other)
        }
        Err(e) => {
            debug!(error = %e, "hard clear failed, relying on overwrite");
            emptied.map(|()| HardClear::Failed)
        }
    }
}

/// Random hex of the decoy length. Cleanup must not panic, so a failing RNG
/// yields a fixed pattern; any non-key text still displaces the key.
fn decoy<R: RngCore>(rng: &mut R) -> Zeroizing<String> {
    let mut noise = [0u8; Defaults::DECOY_BYTES];
    if let Err(e) = rng.try_fill_bytes(&mut noise) {
        debug!(error = %e, "rng unavailable, using fixed decoy");
        noise.fill(0x5A);
    }
    let decoy = Zeroizing::new(hex::encode(noise));
    noise.zeroize();
    decoy
}

struct Clearance {
    service: Arc<dyn ClipboardService>,
    settle: Duration,
    fired: AtomicBool,
}

impl Clearance {
    /// `None` if this session was already cleared.
    fn run_once(&self) -> Option<Result<HardClear, ClipboardError>> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(clearance_sequence(self.service.as_ref(), self.settle))
    }

    /// Ignores the once-flag; used when the background run cannot be trusted
    /// to finish.
    fn run_forced(&self) -> Result<HardClear, ClipboardError> {
        self.fired.store(true, Ordering::SeqCst);
        clearance_sequence(self.service.as_ref(), self.settle)
    }
}

/// A pending clearance. Dropping it clears immediately.
pub struct ClearanceHandle {
    key: usize,
    cancel: Option<oneshot::Sender<()>>,
    done: watch::Receiver<bool>,
    clearance: Arc<Clearance>,
}

impl ClearanceHandle {
    pub fn key(&self) -> usize {
        self.key
    }

    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Wake the background task so it clears now instead of after the delay.
    pub fn trigger(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the clearance, however it gets started.
    pub async fn wait(&self) {
        let mut done = self.done.clone();
        let _ = done.wait_for(|cleared| *cleared).await;
    }

    /// Clear now and wait at most `timeout` for the background task; past
    /// that, run the sequence on this thread.
    pub async fn cancel(&mut self, timeout: Duration) {
        self.trigger();
        if tokio::time::timeout(timeout, self.wait()).await.is_err() || !self.is_done() {
            warn!(key = self.key, "background clearance did not finish, clearing synchronously");
            if let Err(e) = self.clearance.run_forced() {
                warn!(key = self.key, error = %e, "forced clipboard clearance failed");
            }
        }
    }

    /// For contexts that cannot await, such as `Drop`.
    pub fn cancel_blocking(&mut self) {
        self.trigger();
        if !self.is_done() {
            if let Err(e) = self.clearance.run_forced() {
                warn!(key = self.key, error = %e, "forced clipboard clearance failed");
            }
        }
    }
}

pub struct ClipboardSession {
    service: Arc<dyn ClipboardService>,
    events: mpsc::UnboundedSender<ClipboardEvent>,
    settle: Duration,
    flush_timeout: Duration,
}

impl ClipboardSession {
    pub fn new(service: Arc<dyn ClipboardService>, events: mpsc::UnboundedSender<ClipboardEvent>) -> Self {
        Self {
            service,
            events,
            settle: Defaults::DECOY_SETTLE,
            flush_timeout: Defaults::FORCED_FLUSH_TIMEOUT,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }

    /// Copy `text` now, erase it, and schedule the clearance after `delay`.
    /// Must be called from within a Tokio runtime.
    pub fn arm(&self, key: usize, mut text: HexView, delay: Duration) -> Result<ClearanceHandle, ClipboardError> {
        let copied = self.service.set_text(text.as_str());
        text.erase();
        drop(text);
        copied?;

        let clearance = Arc::new(Clearance {
            service: Arc::clone(&self.service),
            settle: self.settle,
            fired: AtomicBool::new(false),
        });
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (done_tx, done_rx) = watch::channel(false);

        tokio::spawn(run_clearance(
            key,
            delay,
            cancel_rx,
            Arc::clone(&clearance),
            done_tx,
            self.events.clone(),
        ));
        debug!(key, delay_secs = delay.as_secs_f64(), "clipboard armed");

        Ok(ClearanceHandle { key, cancel: Some(cancel_tx), done: done_rx, clearance })
    }

    /// Clear `handle`'s session immediately and wait for it.
    pub async fn cancel(&self, handle: &mut ClearanceHandle) {
        handle.cancel(self.flush_timeout).await;
    }

    /// Run one clearance on this thread, independent of any session.
    pub fn flush_now(&self) -> Result<HardClear, ClipboardError> {
        clearance_sequence(self.service.as_ref(), self.settle)
    }

    /// [`flush_now`](Self::flush_now) on the blocking pool.
    pub async fn flush(&self) -> Result<HardClear, ClipboardError> {
        let service = Arc::clone(&self.service);
        let settle = self.settle;
        tokio::task::spawn_blocking(move || clearance_sequence(service.as_ref(), settle))
            .await
            .map_err(|e| ClipboardError::Operation(e.to_string()))?
    }
}

async fn run_clearance(
    key: usize,
    delay: Duration,
    cancel: oneshot::Receiver<()>,
    clearance: Arc<Clearance>,
    done: watch::Sender<bool>,
    events: mpsc::UnboundedSender<ClipboardEvent>,
) {
    let trigger = tokio::select! {
        _ = tokio::time::sleep(delay) => Trigger::Elapsed,
        // Resolves on send and on a dropped handle alike.
        _ = cancel => Trigger::Cancelled,
    };

    let outcome = match tokio::task::spawn_blocking(move || clearance.run_once()).await {
        Ok(Some(Ok(hard))) => ClearanceOutcome::Cleared { hard, trigger },
        Ok(Some(Err(e))) => {
            warn!(key, error = %e, "clipboard clearance failed");
            ClearanceOutcome::Failed(e.to_string())
        }
        Ok(None) => ClearanceOutcome::AlreadyCleared,
        Err(e) => {
            warn!(key, error = %e, "clipboard clearance task aborted");
            ClearanceOutcome::Failed(e.to_string())
        }
    };
    debug!(key, ?outcome, "clipboard clearance finished");

    let _ = done.send(true);
    let _ = events.send(ClipboardEvent { key, outcome });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::secret::SecretBuffer;
    use std::time::Instant;

    fn session(cb: &Arc<MemoryClipboard>) -> (ClipboardSession, mpsc::UnboundedReceiver<ClipboardEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service: Arc<dyn ClipboardService> = cb.clone();
        (ClipboardSession::new(service, tx).with_settle(Duration::ZERO), rx)
    }

    fn key_text() -> (HexView, String) {
        let secret = SecretBuffer::allocate(32).unwrap();
        let view = HexView::encode(&secret).unwrap();
        let copy = view.as_str().to_owned();
        (view, copy)
    }

    fn assert_no_trace(contents: &str, text: &str) {
        assert!(!contents.contains(text));
        for cut in 8..text.len() {
            assert!(!contents.contains(&text[..cut]), "prefix of key left on clipboard");
            assert!(!contents.contains(&text[cut..]), "suffix of key left on clipboard");
        }
    }

    /// Stalls the `stall_on`-th `set_text` call (0-based) for `stall`.
    struct StallingClipboard {
        inner: MemoryClipboard,
        stall_on: usize,
        stall: Duration,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl ClipboardService for StallingClipboard {
        fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == self.stall_on {
                thread::sleep(self.stall);
            }
            self.inner.set_text(text)
        }
        fn clear(&self) -> Result<(), ClipboardError> {
            self.inner.clear()
        }
        fn hard_clear(&self) -> Result<HardClear, ClipboardError> {
            self.inner.hard_clear()
        }
        fn get_text(&self) -> Result<String, ClipboardError> {
            self.inner.get_text()
        }
    }

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("fill_bytes must not be used for the decoy");
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
            let code = std::num::NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap();
            Err(rand_core::Error::from(code))
        }
    }

    #[test]
    fn decoy_survives_a_failing_rng() {
        let text = decoy(&mut BrokenRng);
        assert_eq!(text.len(), Defaults::DECOY_BYTES * 2);
        assert!(text.chars().all(|c| c == '5' || c == 'a'));
    }

    #[test]
    fn decoys_differ() {
        assert_ne!(decoy(&mut OsRng), decoy(&mut OsRng));
    }

    #[tokio::test]
    async fn stuck_background_clearance_is_forced_after_timeout() {
        // Call 0 is the copy, call 1 the background decoy write.
        let cb = Arc::new(StallingClipboard {
            inner: MemoryClipboard::new(),
            stall_on: 1,
            stall: Duration::from_secs(1),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let (tx, _events) = mpsc::unbounded_channel();
        let service: Arc<dyn ClipboardService> = cb.clone();
        let session = ClipboardSession::new(service, tx)
            .with_settle(Duration::ZERO)
            .with_flush_timeout(Duration::from_millis(100));
        let (view, text) = key_text();

        let mut handle = session.arm(0, view, Duration::from_secs(60)).unwrap();
        assert_eq!(cb.inner.contents(), text);

        let started = Instant::now();
        session.cancel(&mut handle).await;
        let took = started.elapsed();

        assert!(took >= Duration::from_millis(100));
        assert!(took < Duration::from_millis(900), "waited for the stalled task: {took:?}");
        assert_eq!(cb.inner.contents(), "");
        assert_no_trace(&cb.inner.contents(), &text);
    }

    #[test]
    fn sequence_writes_decoy_then_empties() {
        let cb = MemoryClipboard::new();
        cb.set_text("secret").unwrap();
        let hard = clearance_sequence(&cb, Duration::ZERO).unwrap();
        assert_eq!(hard, HardClear::Done);
        let writes = cb.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[1].len(), Defaults::DECOY_BYTES * 2);
        assert_ne!(writes[1].as_str(), "secret");
        assert_eq!(writes[2].as_str(), "");
        assert_eq!(cb.contents(), "");
    }

    #[test]
    fn sequence_degrades_without_hard_clear() {
        let cb = MemoryClipboard::without_hard_clear();
        cb.set_text("secret").unwrap();
        assert_eq!(clearance_sequence(&cb, Duration::ZERO).unwrap(), HardClear::Unsupported);
        assert_eq!(cb.contents(), "");
    }

    #[test]
    fn sequence_clears_even_after_newer_content() {
        let cb = MemoryClipboard::new();
        cb.set_text("old key").unwrap();
        cb.set_text("new key").unwrap();
        clearance_sequence(&cb, Duration::ZERO).unwrap();
        assert_eq!(cb.contents(), "");
    }

    #[tokio::test]
    async fn arm_copies_immediately_and_clears_after_delay() {
        let cb = Arc::new(MemoryClipboard::new());
        let (session, mut events) = session(&cb);
        let (view, text) = key_text();

        let handle = session.arm(0, view, Duration::from_millis(50)).unwrap();
        assert_eq!(cb.contents(), text);
        assert!(!handle.is_done());

        handle.wait().await;
        assert_no_trace(&cb.contents(), &text);
        let event = events.recv().await.unwrap();
        assert_eq!(event.key, 0);
        assert_eq!(
            event.outcome,
            ClearanceOutcome::Cleared { hard: HardClear::Done, trigger: Trigger::Elapsed }
        );
    }

    #[tokio::test]
    async fn cancel_clears_without_waiting_for_delay() {
        let cb = Arc::new(MemoryClipboard::new());
        let (session, mut events) = session(&cb);
        let (view, text) = key_text();

        let started = Instant::now();
        let mut handle = session.arm(4, view, Duration::from_secs(60)).unwrap();
        session.cancel(&mut handle).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(handle.is_done());
        assert_no_trace(&cb.contents(), &text);

        let event = events.recv().await.unwrap();
        assert_eq!(
            event.outcome,
            ClearanceOutcome::Cleared { hard: HardClear::Done, trigger: Trigger::Cancelled }
        );
    }

    #[tokio::test]
    async fn cancel_twice_is_harmless() {
        let cb = Arc::new(MemoryClipboard::new());
        let (session, _events) = session(&cb);
        let (view, _) = key_text();
        let mut handle = session.arm(0, view, Duration::from_secs(60)).unwrap();
        session.cancel(&mut handle).await;
        let writes = cb.writes().len();
        session.cancel(&mut handle).await;
        assert_eq!(cb.writes().len(), writes);
    }

    #[tokio::test]
    async fn dropping_the_handle_clears() {
        let cb = Arc::new(MemoryClipboard::new());
        let (session, mut events) = session(&cb);
        let (view, text) = key_text();
        let handle = session.arm(1, view, Duration::from_secs(60)).unwrap();
        drop(handle);
        let event = events.recv().await.unwrap();
        assert_eq!(event.key, 1);
        assert_no_trace(&cb.contents(), &text);
    }

    #[tokio::test]
    async fn arm_reports_unavailable_clipboard() {
        let cb = Arc::new(MemoryClipboard::unavailable());
        let (session, _events) = session(&cb);
        let (view, _) = key_text();
        let err = session.arm(0, view, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, ClipboardError::Unavailable(_)));
    }
}
