use crossterm::style::StyledContent;

use super::style::{span_key, span_sep, span_text};

/// Prompt shown between keys in batch mode.
pub fn help_ack() -> Vec<StyledContent<&'static str>> {
    vec![
        span_key("Any key"), span_text(" Next"), span_sep(),
        span_key("C"), span_text(" Clear clipboard now"), span_sep(),
        span_key("Q/Esc"), span_text(" Quit"), span_sep(),
        span_key("Ctrl+C"), span_text(" Abort"),
    ]
}

/// Same choices when stdin is not a terminal and input is line based.
pub fn help_ack_line() -> Vec<StyledContent<&'static str>> {
    vec![
        span_key("Enter"), span_text(" Next"), span_sep(),
        span_key("c+Enter"), span_text(" Clear clipboard now"), span_sep(),
        span_key("q+Enter"), span_text(" Quit"),
    ]
}
