// style.rs
use crossterm::style::{StyledContent, Stylize};

pub fn span_key(s: &'static str) -> StyledContent<&'static str> {
    s.cyan().bold()
}
pub fn span_sep() -> StyledContent<&'static str> {
    "  |  ".dark_grey()
}
pub fn span_text(s: &'static str) -> StyledContent<&'static str> {
    s.stylize()
}

/* ---------- Key rendering (bright green on the default background) ---------- */

pub fn banner_edge(s: &'static str) -> StyledContent<&'static str> {
    s.green()
}
pub fn banner_title(s: &'static str) -> StyledContent<&'static str> {
    s.green().bold()
}

/// The hex key itself.
pub fn key_text(s: &str) -> StyledContent<&str> {
    s.green().bold()
}

pub fn progress_fill(s: &str) -> StyledContent<&str> {
    s.magenta().bold()
}

pub fn warning(s: &str) -> StyledContent<&str> {
    s.yellow().bold()
}

pub fn status(s: &'static str) -> StyledContent<&'static str> {
    s.red()
}
