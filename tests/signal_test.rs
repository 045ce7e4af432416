#![cfg(unix)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ephemeral_keygen::clipboard::{ClipboardService, MemoryClipboard};
use ephemeral_keygen::commands::keygen::{KeyLifecycleController, KeygenConfig};
use ephemeral_keygen::signals::{self, ShutdownSignals, SIGTERM};
use ephemeral_keygen::types::{Ack, LifecycleState, RunOutcome};
use ephemeral_keygen::ui::ScriptedSurface;

fn raise_later(signal: libc::c_int, after: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(after);
        // SAFETY: raising a signal this process has a listener for.
        unsafe { libc::raise(signal) };
    })
}

#[tokio::test]
async fn sigterm_during_clipboard_delay_clears_before_exit() {
    let cb = Arc::new(MemoryClipboard::new());
    let config = KeygenConfig {
        count: 3,
        clipboard_delay: Duration::from_secs(30),
        show_progress: false,
        decoy_settle: Duration::ZERO,
        ..KeygenConfig::default()
    };
    let service: Arc<dyn ClipboardService> = cb.clone();
    let mut ctl = KeyLifecycleController::new(config, Some(service));
    let mut surface = ScriptedSurface::new([Ack::Next]);

    let mut shutdown = ShutdownSignals::install();
    let raiser = raise_later(libc::SIGTERM, Duration::from_millis(200));

    let outcome = tokio::select! {
        res = ctl.run(&mut surface) => res.unwrap(),
        signal = shutdown.recv() => RunOutcome::Interrupted { signal },
    };
    raiser.join().unwrap();

    assert_eq!(outcome, RunOutcome::Interrupted { signal: SIGTERM });
    let key = surface.shown_keys()[1].to_owned();
    assert_eq!(cb.contents(), key, "second key still on the clipboard when the signal lands");
    assert_eq!(ctl.pending_clearances(), 2);

    ctl.shutdown().await;

    assert_eq!(cb.contents(), "");
    assert_eq!(ctl.states(), vec![LifecycleState::Erased; 2]);
    assert_eq!(ctl.pending_clearances(), 0);
    assert_eq!(signals::exit_code(SIGTERM), 143);
}
