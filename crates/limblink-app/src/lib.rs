//! LimbLink Application
//!
//! The main application shell providing windowing, input handling,
//! and integration of all components.

mod app;
mod shortcuts;
mod ui;

pub use app::{App, AppConfig};
pub use shortcuts::{Shortcut, ShortcutAction, SHORTCUTS};
pub use ui::{render_ui, Notice, UiAction, UiState};
