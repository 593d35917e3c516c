//! Terminal surface: key bindings in, rendered session text out

mod keyboard;
mod render;

pub use keyboard::{action_for_key, KeyboardInput};
pub use render::{render_lines, SessionView};
