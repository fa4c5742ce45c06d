//! Reusable egui widget components with Tailwind-inspired styling.
//!
//! This crate provides the styled UI components used by the controller
//! console:
//!
//! - **Buttons**: Action buttons in neutral, primary and danger tones
//! - **Sliders**: Labeled angle sliders with degree readouts
//! - **Status**: Connection status dots
//! - **Layout**: Section labels, separators, panel frames

pub mod buttons;
pub mod layout;
pub mod sliders;
pub mod status;

pub use buttons::{ActionButton, ButtonTone};
pub use layout::{panel_frame, section_label, separator, toolbar_frame, vertical_separator};
pub use sliders::AngleSlider;
pub use status::StatusDot;

/// Standard sizing constants used across widgets.
pub mod sizing {
    /// Small button size
    pub const SMALL: f32 = 20.0;
    /// Medium button size (toolbar buttons)
    pub const MEDIUM: f32 = 28.0;
    /// Large button size
    pub const LARGE: f32 = 36.0;
    /// Standard corner radius
    pub const CORNER_RADIUS: u8 = 4;
    /// Panel corner radius
    pub const PANEL_RADIUS: u8 = 8;
}

/// Standard colors used across widgets.
pub mod theme {
    use egui::Color32;

    /// Text color (dark gray)
    pub const TEXT: Color32 = Color32::from_rgb(60, 60, 60);
    /// Muted text color
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(120, 120, 120);
    /// Border color
    pub const BORDER: Color32 = Color32::from_rgb(220, 220, 220);
    /// Selection/active color (blue)
    pub const ACCENT: Color32 = Color32::from_rgb(59, 130, 246);
    /// Danger color (red)
    pub const DANGER: Color32 = Color32::from_rgb(220, 38, 38);
    /// Healthy/connected color (green)
    pub const OK: Color32 = Color32::from_rgb(22, 163, 74);
    /// In-progress color (amber)
    pub const WARN: Color32 = Color32::from_rgb(217, 119, 6);
    /// Hover background
    pub const HOVER_BG: Color32 = Color32::from_rgb(245, 245, 245);
    /// Selected background
    pub const SELECTED_BG: Color32 = Color32::from_rgb(235, 245, 255);
    /// Panel background
    pub const PANEL_BG: Color32 = Color32::from_rgba_premultiplied(250, 250, 252, 250);
}
