pub mod buffer;
pub mod eraser;
pub mod hex_view;
pub mod pin;

pub use buffer::SecretBuffer;
pub use eraser::{SecureEraser, WipeStrategy};
pub use hex_view::HexView;
