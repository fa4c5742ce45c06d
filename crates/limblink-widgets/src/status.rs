//! Connection status indicator.

use egui::{vec2, Color32, Sense, Ui};

use crate::theme;

/// A small colored dot with a label, used for the connection readout.
pub struct StatusDot<'a> {
    color: Color32,
    label: &'a str,
    detail: Option<String>,
}

impl<'a> StatusDot<'a> {
    /// Create a new status dot.
    pub fn new(color: Color32, label: &'a str) -> Self {
        Self {
            color,
            label,
            detail: None,
        }
    }

    /// Add muted text after the label (attempt counters and such).
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Show the indicator.
    pub fn show(self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            let (rect, _response) = ui.allocate_exact_size(vec2(10.0, 16.0), Sense::hover());
            if ui.is_rect_visible(rect) {
                ui.painter().circle_filled(
                    egui::Pos2::new(rect.left() + 4.0, rect.center().y),
                    4.0,
                    self.color,
                );
            }
            ui.label(
                egui::RichText::new(self.label)
                    .size(11.0)
                    .color(theme::TEXT),
            );
            if let Some(detail) = self.detail {
                ui.label(
                    egui::RichText::new(detail)
                        .size(10.0)
                        .color(theme::TEXT_MUTED),
                );
            }
        });
    }
}
