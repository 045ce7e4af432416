use std::io::{self, BufRead, Stdout, Write};
use std::time::Duration;

use async_trait::async_trait;
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::{Print, PrintStyledContent},
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType},
    tty::IsTty,
};
use rand::Rng;
use tracing::debug;

use super::common_nav::{ack_from_key, ack_from_line};
use super::help::{help_ack, help_ack_line};
use super::style::{banner_edge, banner_title, key_text, progress_fill, status, warning};
use super::{KeyStatus, KeySurface, Notice};
use crate::defaults::Defaults;
use crate::secret::HexView;
use crate::types::Ack;

/// Plain terminal output with crossterm colors. Single key presses in raw
/// mode when stdin is a terminal, whole lines otherwise.
pub struct ConsoleSurface {
    out: Stdout,
    interactive: bool,
    animate: bool,
}

impl ConsoleSurface {
    pub fn new(animate: bool) -> Self {
        Self {
            out: io::stdout(),
            interactive: io::stdin().is_tty(),
            animate,
        }
    }

    fn status_label(status: KeyStatus) -> &'static str {
        match status {
            KeyStatus::Cleared => "[cleared]",
            KeyStatus::Wiped => "[wiped]",
        }
    }
}

fn read_key_raw() -> io::Result<Ack> {
    enable_raw_mode()?;
    let ack = loop {
        match event::read() {
            Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => break Ok(ack_from_key(k)),
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    disable_raw_mode()?;
    ack
}

fn read_line() -> io::Result<Ack> {
    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line)?;
    Ok(ack_from_line((n > 0).then_some(line.as_str())))
}

#[async_trait]
impl KeySurface for ConsoleSurface {
    fn banner(&mut self, index: usize, total: usize) -> io::Result<()> {
        queue!(
            self.out,
            PrintStyledContent(banner_edge("♦───────⟨ ")),
            PrintStyledContent(banner_title("AES 256-bit Hex Generator ")),
            PrintStyledContent(banner_edge("⟩───────♦")),
        )?;
        if total > 1 {
            queue!(self.out, Print(format!("  {}/{}", index + 1, total)))?;
        }
        queue!(self.out, Print("\n"))?;
        self.out.flush()
    }

    async fn progress(&mut self) -> io::Result<()> {
        if !self.animate {
            return Ok(());
        }
        let width = Defaults::PROGRESS_WIDTH;
        for step in 0..=Defaults::PROGRESS_STEPS {
            let filled = (step as usize * width) / Defaults::PROGRESS_STEPS as usize;
            let bar = format!("{}{}", "█".repeat(filled), "-".repeat(width - filled));
            queue!(
                self.out,
                Print("\r|"),
                PrintStyledContent(progress_fill(&bar)),
                Print(format!("| {step}%")),
            )?;
            self.out.flush()?;
            let micros = rand::thread_rng().gen_range(2_500..10_000);
            tokio::time::sleep(Duration::from_micros(micros)).await;
        }
        queue!(self.out, Print("\n"))?;
        self.out.flush()
    }

    fn show_key(&mut self, _index: usize, key: &HexView) -> io::Result<()> {
        queue!(
            self.out,
            Print("[ "),
            PrintStyledContent(key_text(key.as_str())),
            Print(" ]\n"),
        )?;
        self.out.flush()
    }

    fn show_masked(&mut self, index: usize, masked: &str, key_status: KeyStatus) -> io::Result<()> {
        queue!(
            self.out,
            Print(format!("Key {}: {masked} ", index + 1)),
            PrintStyledContent(status(Self::status_label(key_status))),
            Print("\n"),
        )?;
        self.out.flush()
    }

    fn notice(&mut self, notice: Notice) -> io::Result<()> {
        match notice {
            Notice::Copied { delay } => queue!(
                self.out,
                Print(format!("The key has been copied to your clipboard (clears in {}s).\n", delay.as_secs()))
            )?,
            Notice::Countdown { delay } => queue!(
                self.out,
                Print(format!("Clipboard will self-destruct in {} seconds...\n", delay.as_secs()))
            )?,
            Notice::ClipboardCleared => queue!(self.out, Print("Clipboard cleared.\n"))?,
            Notice::Warning(msg) => queue!(
                self.out,
                PrintStyledContent(warning("warning: ")),
                Print(msg),
                Print("\n"),
            )?,
            Notice::Goodbye => queue!(self.out, Print("\nGoodbye!\n"))?,
        }
        self.out.flush()
    }

    async fn acknowledge(&mut self) -> io::Result<Ack> {
        let prompt = if self.interactive { help_ack() } else { help_ack_line() };
        for part in prompt {
            queue!(self.out, PrintStyledContent(part))?;
        }
        queue!(self.out, Print("\n"))?;
        self.out.flush()?;

        let interactive = self.interactive;
        let ack = tokio::task::spawn_blocking(move || if interactive { read_key_raw() } else { read_line() })
            .await
            .map_err(io::Error::other)??;
        debug!(?ack, "acknowledged");
        queue!(self.out, Print("\n"))?;
        self.out.flush()?;
        Ok(ack)
    }

    fn reset(&mut self) -> io::Result<()> {
        execute!(self.out, Clear(ClearType::Purge), Clear(ClearType::All), MoveTo(0, 0))
    }

    fn restore(&mut self) {
        if terminal::is_raw_mode_enabled().unwrap_or(false) {
            let _ = disable_raw_mode();
        }
        let _ = self.out.flush();
    }
}

impl Drop for ConsoleSurface {
    fn drop(&mut self) {
        self.restore();
    }
}
