use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, warn};

use ephemeral_keygen::cli::Cli;
use ephemeral_keygen::clipboard::{ClipboardService, SystemClipboard};
use ephemeral_keygen::commands::keygen::KeyLifecycleController;
use ephemeral_keygen::defaults::Defaults;
use ephemeral_keygen::types::RunOutcome;
use ephemeral_keygen::ui::{ConsoleSurface, KeySurface, Notice};
use ephemeral_keygen::signals::{self, ShutdownSignals};
use ephemeral_keygen::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("Error: {e:#}");
            Defaults::EXIT_FATAL
        }
    };
    // Returning would make the runtime wait on a stdin read that may never end.
    std::process::exit(code)
}

async fn run(cli: &Cli) -> Result<i32> {
    let config = cli.config();
    let clipboard: Option<Arc<dyn ClipboardService>> = match SystemClipboard::open() {
        Ok(cb) => Some(Arc::new(cb)),
        Err(e) => {
            warn!(error = %e, "no clipboard, keys will only be displayed");
            None
        }
    };

    let mut surface = ConsoleSurface::new(config.show_progress);
    surface.reset().context("clearing terminal")?;
    if clipboard.is_none() {
        surface.notice(Notice::Warning("clipboard unavailable, keys will not be copied".into()))?;
    }

    // Handlers go in before the first key can reach the clipboard.
    let mut shutdown = ShutdownSignals::install();
    let mut controller = KeyLifecycleController::new(config, clipboard);
    let outcome = tokio::select! {
        res = controller.run(&mut surface) => res,
        signal = shutdown.recv() => Ok(RunOutcome::Interrupted { signal }),
    };

    // Every exit path, fatal errors included, erases and clears first.
    controller.shutdown().await;

    let code = match &outcome {
        Ok(RunOutcome::Completed { .. }) => 0,
        Ok(RunOutcome::Quit { .. }) => {
            surface.notice(Notice::Goodbye)?;
            0
        }
        Ok(RunOutcome::Interrupted { signal }) => {
            surface.notice(Notice::Goodbye)?;
            signals::exit_code(*signal)
        }
        Err(_) => Defaults::EXIT_FATAL,
    };
    surface.restore();
    outcome.context("key generation failed")?;
    Ok(code)
}
