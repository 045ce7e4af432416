use clap::Parser;
use std::time::Duration;

use crate::commands::keygen::KeygenConfig;
use crate::defaults::Defaults;

/// Ephemeral AES-256 key generator: shows each key once, copies it to the
/// clipboard and wipes both memory and clipboard afterwards
#[derive(Parser, Debug)]
#[command(version, about = "Ephemeral AES-256 hex key generator")]
pub struct Cli {
    /// Number of keys to generate
    #[arg(long, default_value_t = Defaults::KEY_COUNT, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// Seconds before the clipboard is cleared
    #[arg(long, default_value_t = Defaults::CLIPBOARD_DELAY_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub clipboard_delay: u64,

    /// Skip the progress animation before each key
    #[arg(long)]
    pub no_progress: bool,

    /// Enable debug logging on stderr
    #[arg(long, hide = true)]
    pub debug: bool,
}

impl Cli {
    pub fn config(&self) -> KeygenConfig {
        KeygenConfig {
            count: self.count,
            clipboard_delay: Duration::from_secs(self.clipboard_delay),
            show_progress: !self.no_progress,
            ..KeygenConfig::default()
        }
    }
}
