//! Button components for the control panels.

use egui::{vec2, Align2, Color32, CornerRadius, CursorIcon, Sense, Ui};

use crate::{sizing, theme};

/// Visual tone of an [`ActionButton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTone {
    /// Gray background, dark text. The default.
    Neutral,
    /// Solid accent background, white text. One per panel at most.
    Primary,
    /// Solid red background, white text. Disconnect and friends.
    Danger,
}

/// A rectangular text button used across the control panels.
pub struct ActionButton<'a> {
    label: &'a str,
    tone: ButtonTone,
    enabled: bool,
    min_width: Option<f32>,
    height: f32,
    font_size: f32,
}

impl<'a> ActionButton<'a> {
    /// Create a new neutral action button.
    pub fn new(label: &'a str) -> Self {
        Self {
            label,
            tone: ButtonTone::Neutral,
            enabled: true,
            min_width: None,
            height: 24.0,
            font_size: 11.0,
        }
    }

    /// Set the button tone.
    pub fn tone(mut self, tone: ButtonTone) -> Self {
        self.tone = tone;
        self
    }

    /// Enable or disable the button. Disabled buttons never report clicks.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set minimum width.
    pub fn min_width(mut self, width: f32) -> Self {
        self.min_width = Some(width);
        self
    }

    /// Set the button height.
    pub fn height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    /// Show the button and return true if clicked.
    pub fn show(self, ui: &mut Ui) -> bool {
        // Size the button to its text so labels of any length fit
        let font_id = egui::FontId::proportional(self.font_size);
        let galley = ui.painter().layout_no_wrap(
            self.label.to_string(),
            font_id.clone(),
            Color32::PLACEHOLDER,
        );
        let text_width = galley.size().x;
        let width = self
            .min_width
            .unwrap_or(text_width + 16.0)
            .max(text_width + 16.0);
        let size = vec2(width, self.height);

        let sense = if self.enabled {
            Sense::click()
        } else {
            Sense::hover()
        };
        let (rect, response) = ui.allocate_exact_size(size, sense);

        if ui.is_rect_visible(rect) {
            let (bg_color, text_color) = match (self.tone, self.enabled) {
                (_, false) => (Color32::from_gray(245), Color32::from_gray(180)),
                (ButtonTone::Primary, true) => {
                    let bg = if response.hovered() {
                        Color32::from_rgb(37, 99, 235)
                    } else {
                        theme::ACCENT
                    };
                    (bg, Color32::WHITE)
                }
                (ButtonTone::Danger, true) => {
                    let bg = if response.hovered() {
                        Color32::from_rgb(185, 28, 28)
                    } else {
                        theme::DANGER
                    };
                    (bg, Color32::WHITE)
                }
                (ButtonTone::Neutral, true) => {
                    let bg = if response.hovered() {
                        Color32::from_gray(235)
                    } else {
                        Color32::from_gray(245)
                    };
                    (bg, Color32::from_gray(80))
                }
            };

            ui.painter()
                .rect_filled(rect, CornerRadius::same(sizing::CORNER_RADIUS), bg_color);

            ui.painter().text(
                rect.center(),
                Align2::CENTER_CENTER,
                self.label,
                font_id,
                text_color,
            );
        }

        let clicked = self.enabled && response.clicked();
        if self.enabled {
            response.on_hover_cursor(CursorIcon::PointingHand);
        }
        clicked
    }
}
