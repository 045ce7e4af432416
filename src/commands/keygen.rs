//! Key lifecycle: generate → display → clipboard → erased.
//!
//! The controller owns every live secret and every pending clipboard
//! clearance for the whole run. Whatever ends the run (completion, quit,
//! error, a signal that drops the [`run`](KeyLifecycleController::run)
//! future, or a panic that drops the controller), cleanup goes through the
//! same idempotent steps: erase held buffers, force pending clearances,
//! sweep the clipboard once more if any clearance is unconfirmed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clipboard::{ClearanceHandle, ClearanceOutcome, ClipboardEvent, ClipboardService, ClipboardSession};
use crate::defaults::Defaults;
use crate::error::{KeygenError, SecretError};
use crate::secret::{HexView, SecretBuffer};
use crate::signals::SIGINT;
use crate::types::{Ack, LifecycleState, RunOutcome};
use crate::ui::{KeyStatus, KeySurface, Notice};

#[derive(Debug, Clone)]
pub struct KeygenConfig {
    pub count: u32,
    pub clipboard_delay: Duration,
    pub key_len: usize,
    pub show_progress: bool,
    /// Pause between the decoy write and the final empty write.
    pub decoy_settle: Duration,
    pub flush_timeout: Duration,
}

impl Default for KeygenConfig {
    fn default() -> Self {
        Self {
            count: Defaults::KEY_COUNT,
            clipboard_delay: Duration::from_secs(Defaults::CLIPBOARD_DELAY_SECS),
            key_len: Defaults::KEY_LEN,
            show_progress: true,
            decoy_settle: Defaults::DECOY_SETTLE,
            flush_timeout: Defaults::FORCED_FLUSH_TIMEOUT,
        }
    }
}

struct KeySlot {
    state: LifecycleState,
    secret: Option<SecretBuffer>,
    clearance: Option<ClearanceHandle>,
    copied: bool,
}

impl KeySlot {
    fn erase_secret(&mut self) {
        if let Some(mut secret) = self.secret.take() {
            secret.erase();
        }
    }
}

pub struct KeyLifecycleController {
    config: KeygenConfig,
    clipboard: Option<ClipboardSession>,
    events: mpsc::UnboundedReceiver<ClipboardEvent>,
    slots: Vec<KeySlot>,
    /// Some clearance was cut short or failed; the final sweep must run.
    sweep_needed: bool,
    shut_down: bool,
}

impl KeyLifecycleController {
    /// `clipboard: None` means keys are only displayed.
    pub fn new(config: KeygenConfig, clipboard: Option<Arc<dyn ClipboardService>>) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let clipboard = clipboard.map(|service| {
            ClipboardSession::new(service, tx)
                .with_settle(config.decoy_settle)
                .with_flush_timeout(config.flush_timeout)
        });
        Self {
            config,
            clipboard,
            events,
            slots: Vec::new(),
            sweep_needed: false,
            shut_down: false,
        }
    }

    pub fn config(&self) -> &KeygenConfig {
        &self.config
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    pub fn states(&self) -> Vec<LifecycleState> {
        self.slots.iter().map(|s| s.state).collect()
    }

    /// Secrets still owned by the controller and not yet erased.
    pub fn secrets_held(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.secret.as_ref().is_some_and(|b| !b.is_erased()))
            .count()
    }

    pub fn pending_clearances(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.clearance.as_ref().is_some_and(|h| !h.is_done()))
            .count()
    }

    /// Generate `count` keys. Batch mode waits for an acknowledgment after
    /// each key; single-key mode waits for the clipboard clearance instead.
    /// Returns once every key is erased, or early on quit/interrupt.
    pub async fn run<S>(&mut self, surface: &mut S) -> Result<RunOutcome, KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        let total = self.config.count as usize;
        let batch = total > 1;
        info!(count = total, delay_secs = self.config.clipboard_delay.as_secs(), "starting");

        for index in 0..total {
            self.dispatch_events(surface)?;
            self.generate_one(index, total, surface).await?;

            if !batch {
                self.await_clearance(index, surface).await?;
                continue;
            }

            let ack = surface.acknowledge().await?;
            match ack {
                Ack::Next => {}
                Ack::ClearNow => self.clear_now(index, surface).await?,
                Ack::Quit => {
                    self.finish(surface).await?;
                    return Ok(RunOutcome::Quit { generated: index + 1 });
                }
                Ack::Interrupt => return Ok(RunOutcome::Interrupted { signal: SIGINT }),
            }
            self.confirm_wiped(index, surface)?;
            self.dispatch_events(surface)?;
            if index + 1 < total {
                surface.reset()?;
            }
        }

        self.finish(surface).await?;
        Ok(RunOutcome::Completed { generated: total })
    }

    async fn generate_one<S>(&mut self, index: usize, total: usize, surface: &mut S) -> Result<(), KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        let secret = SecretBuffer::allocate_pinned(self.config.key_len)?;
        self.slots.push(KeySlot {
            state: LifecycleState::Generated,
            secret: Some(secret),
            clearance: None,
            copied: false,
        });
        debug_assert_eq!(self.slots.len(), index + 1);
        debug!(key = index, "generated");

        surface.banner(index, total)?;
        if self.config.show_progress {
            surface.progress().await?;
        }

        let view = match self.slots[index].secret.as_ref() {
            Some(secret) => HexView::encode(secret)?,
            None => return Err(SecretError::UseAfterErase.into()),
        };
        surface.show_key(index, &view)?;
        self.advance(index, LifecycleState::Displayed)?;

        let armed = match self.clipboard.as_ref() {
            Some(session) => Some(session.arm(index, view, self.config.clipboard_delay)),
            None => {
                drop(view);
                None
            }
        };

        // Encoded and handed off; the raw bytes are not needed any more.
        self.slots[index].erase_secret();

        match armed {
            Some(Ok(handle)) => {
                self.slots[index].clearance = Some(handle);
                self.slots[index].copied = true;
                self.advance(index, LifecycleState::ClipboardArmed)?;
                surface.notice(Notice::Copied { delay: self.config.clipboard_delay })?;
            }
            Some(Err(e)) => {
                warn!(key = index, error = %e, "clipboard copy skipped");
                surface.notice(Notice::Warning(format!("clipboard unavailable, key not copied: {e}")))?;
                self.advance(index, LifecycleState::Erased)?;
            }
            None => self.advance(index, LifecycleState::Erased)?,
        }
        Ok(())
    }

    fn advance(&mut self, index: usize, next: LifecycleState) -> Result<(), KeygenError> {
        let slot = &mut self.slots[index];
        slot.state = slot.state.advance(index, next)?;
        debug!(key = index, state = ?slot.state, "transition");
        Ok(())
    }

    async fn await_clearance<S>(&mut self, index: usize, surface: &mut S) -> Result<(), KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        if let Some(handle) = self.slots[index].clearance.as_ref() {
            surface.notice(Notice::Countdown { delay: self.config.clipboard_delay })?;
            handle.wait().await;
        }
        self.drain_events(surface, true).await?;
        self.confirm_wiped(index, surface)
    }

    /// Keys that never reached the clipboard get no clearance event, so
    /// their masked line is written here.
    fn confirm_wiped<S>(&mut self, index: usize, surface: &mut S) -> Result<(), KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        if !self.slots[index].copied {
            surface.show_masked(index, Defaults::MASKED_KEY, KeyStatus::Wiped)?;
        }
        Ok(())
    }

    /// Explicit wipe of one key's clipboard copy.
    async fn clear_now<S>(&mut self, index: usize, surface: &mut S) -> Result<(), KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        if let (Some(session), Some(handle)) = (self.clipboard.as_ref(), self.slots[index].clearance.as_mut()) {
            session.cancel(handle).await;
        }
        self.drain_events(surface, true).await
    }

    /// Force every pending clearance and leave all keys erased. Used on the
    /// normal exit paths, where the surface is still there to report to.
    async fn finish<S>(&mut self, surface: &mut S) -> Result<(), KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        let pending = self.pending_clearances();
        if pending > 0 {
            debug!(pending, "flushing clipboard before exit");
        }
        self.force_clearances().await;
        self.drain_events(surface, false).await?;
        self.shutdown().await;
        Ok(())
    }

    /// Replay queued clearance completions onto the surface.
    fn dispatch_events<S>(&mut self, surface: &mut S) -> Result<(), KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        while let Ok(event) = self.events.try_recv() {
            self.on_clipboard_event(event, surface)?;
        }
        Ok(())
    }

    /// Like [`dispatch_events`](Self::dispatch_events), but first waits for
    /// the events of clearances that have already signalled completion.
    async fn drain_events<S>(&mut self, surface: &mut S, announce: bool) -> Result<(), KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        loop {
            let outstanding = self
                .slots
                .iter()
                .filter(|s| s.state == LifecycleState::ClipboardArmed && s.clearance.as_ref().is_some_and(|h| h.is_done()))
                .count();
            if outstanding == 0 {
                break;
            }
            match self.events.recv().await {
                Some(event) => {
                    let cleared = matches!(event.outcome, ClearanceOutcome::Cleared { .. });
                    self.on_clipboard_event(event, &mut *surface)?;
                    if announce && cleared {
                        surface.notice(Notice::ClipboardCleared)?;
                    }
                }
                None => break,
            }
        }
        self.dispatch_events(surface)
    }

    fn on_clipboard_event<S>(&mut self, event: ClipboardEvent, surface: &mut S) -> Result<(), KeygenError>
    where
        S: KeySurface + ?Sized,
    {
        let index = event.key;
        let Some(slot) = self.slots.get_mut(index) else {
            return Ok(());
        };
        slot.clearance = None;
        let state = slot.state;

        match event.outcome {
            ClearanceOutcome::Cleared { .. } | ClearanceOutcome::AlreadyCleared => {
                if !state.is_erased() {
                    self.advance(index, LifecycleState::Erased)?;
                }
                surface.show_masked(index, Defaults::MASKED_KEY, KeyStatus::Cleared)?;
            }
            ClearanceOutcome::Failed(reason) => {
                self.sweep_needed = true;
                surface.notice(Notice::Warning(format!(
                    "clipboard clearance for key {} failed: {reason}",
                    index + 1
                )))?;
            }
        }
        Ok(())
    }

    async fn force_clearances(&mut self) {
        let Some(session) = self.clipboard.as_ref() else {
            return;
        };
        // Wake every task first so they all clear in parallel.
        let mut forced = 0usize;
        for handle in self.slots.iter_mut().filter_map(|s| s.clearance.as_mut()) {
            if !handle.is_done() {
                handle.trigger();
                forced += 1;
            }
        }
        for handle in self.slots.iter_mut().filter_map(|s| s.clearance.as_mut()) {
            session.cancel(handle).await;
        }
        if forced > 0 {
            self.sweep_needed = true;
        }
    }

    /// Erase everything still held and force every pending clearance.
    /// Safe to call any number of times and from any state.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        for slot in &mut self.slots {
            slot.erase_secret();
        }
        self.force_clearances().await;

        if self.sweep_needed {
            if let Some(session) = self.clipboard.as_ref() {
                match session.flush().await {
                    Ok(hard) => debug!(?hard, "final clipboard sweep"),
                    Err(e) => warn!(error = %e, "final clipboard sweep failed"),
                }
            }
            self.sweep_needed = false;
        }

        while let Ok(event) = self.events.try_recv() {
            debug!(key = event.key, outcome = ?event.outcome, "late clearance event");
        }
        for slot in &mut self.slots {
            slot.clearance = None;
            slot.state = LifecycleState::Erased;
        }
        self.shut_down = true;
        info!(keys = self.slots.len(), "all keys erased");
    }

    /// Blocking variant of [`shutdown`](Self::shutdown) for `Drop`.
    fn shutdown_blocking(&mut self) {
        for slot in &mut self.slots {
            slot.erase_secret();
        }
        let mut forced = false;
        for handle in self.slots.iter_mut().filter_map(|s| s.clearance.as_mut()) {
            if !handle.is_done() {
                handle.cancel_blocking();
                forced = true;
            }
        }
        if forced || self.sweep_needed {
            if let Some(session) = self.clipboard.as_ref() {
                if let Err(e) = session.flush_now() {
                    warn!(error = %e, "final clipboard sweep failed");
                }
            }
        }
        for slot in &mut self.slots {
            slot.clearance = None;
            slot.state = LifecycleState::Erased;
        }
        self.shut_down = true;
    }
}

impl Drop for KeyLifecycleController {
    fn drop(&mut self) {
        if !self.shut_down {
            warn!("controller dropped without shutdown, purging");
            self.shutdown_blocking();
        }
    }
}
