//! Ephemeral AES-256 key generator.
//!
//! Keys are generated into locked, zero-on-drop buffers, shown once as hex,
//! copied to the clipboard and removed from both memory and clipboard after
//! a delay or on any kind of exit.

pub mod cli;
pub mod clipboard;
pub mod commands;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod secret;
pub mod signals;
pub mod types;
pub mod ui;
