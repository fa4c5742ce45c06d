//! Angle slider rows for the joint control panel.

use std::ops::RangeInclusive;

use egui::{vec2, Align2, CursorIcon, Sense, Ui};

use crate::theme;

/// A labeled slider with a one-decimal degree readout.
///
/// The caller passes the current angle and gets the new one back when
/// the user moves the slider. Clamping stays with the caller.
pub struct AngleSlider<'a> {
    label: &'a str,
    value: f64,
    range: RangeInclusive<f64>,
    label_width: f32,
    slider_width: f32,
}

impl<'a> AngleSlider<'a> {
    /// Create a new slider row.
    pub fn new(label: &'a str, value: f64, range: RangeInclusive<f64>) -> Self {
        Self {
            label,
            value,
            range,
            label_width: 72.0,
            slider_width: 140.0,
        }
    }

    /// Set the width reserved for the label column.
    pub fn label_width(mut self, width: f32) -> Self {
        self.label_width = width;
        self
    }

    /// Set the slider track width.
    pub fn slider_width(mut self, width: f32) -> Self {
        self.slider_width = width;
        self
    }

    /// Show the row and return the new angle if the user changed it.
    pub fn show(self, ui: &mut Ui) -> Option<f64> {
        let mut value = self.value;
        let mut changed = false;

        ui.horizontal(|ui| {
            // Fixed-width label column so the sliders line up
            let (rect, response) =
                ui.allocate_exact_size(vec2(self.label_width, 18.0), Sense::hover());
            if ui.is_rect_visible(rect) {
                ui.painter().text(
                    egui::Pos2::new(rect.left(), rect.center().y),
                    Align2::LEFT_CENTER,
                    self.label,
                    egui::FontId::proportional(11.0),
                    theme::TEXT,
                );
            }
            response.on_hover_cursor(CursorIcon::Default);

            ui.spacing_mut().slider_width = self.slider_width;
            let slider = egui::Slider::new(&mut value, self.range)
                .fixed_decimals(1)
                .suffix("\u{00b0}");
            if ui.add(slider).changed() {
                changed = true;
            }
        });

        changed.then_some(value)
    }
}
