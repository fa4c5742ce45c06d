//! UI components using egui.

use egui::{Align2, Color32, Context, CornerRadius, Margin, Pos2, Vec2};
use limblink_core::camera::BASE_ZOOM;
use limblink_core::sync::ConnectionState;
use limblink_core::{ConnectionStatus, Part, RobotState, Side};
use limblink_render::GridStyle;

// Styled controls from the widgets crate
use limblink_widgets::{
    panel_frame as widgets_panel_frame, section_label as widgets_section_label, theme,
    ActionButton, AngleSlider, ButtonTone, StatusDot,
};

/// Frames a transient notice stays on screen (~4s at 60 fps).
const NOTICE_FRAMES: u32 = 240;

/// A transient on-screen message, aged out per frame.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub frames_left: u32,
}

/// UI state shared between the app shell and the egui panels.
pub struct UiState {
    /// Current grid style
    pub grid_style: GridStyle,
    /// Current camera zoom, mirrored from the app each frame
    pub zoom_level: f64,
    /// Link status, mirrored from the engine each frame
    pub connection: ConnectionStatus,
    /// Controller server URL input
    pub server_url: String,
    /// Transient toasts (server errors, link notices)
    pub notices: Vec<Notice>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            grid_style: GridStyle::Lines,
            zoom_level: BASE_ZOOM,
            connection: ConnectionStatus::default(),
            server_url: "ws://127.0.0.1:5000/ws".to_string(),
            notices: Vec::new(),
        }
    }
}

impl UiState {
    /// Queue a transient notice toast.
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.notices.push(Notice {
            text: text.into(),
            frames_left: NOTICE_FRAMES,
        });
    }

    fn tick_notices(&mut self) {
        for notice in &mut self.notices {
            notice.frames_left = notice.frames_left.saturating_sub(1);
        }
        self.notices.retain(|n| n.frames_left > 0);
    }
}

/// Actions the panels can request from the app shell.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// A slider committed an angle for one degree of freedom
    SetAngle { side: Side, part: Part, angle: f64 },
    /// Flush the current pose to the actuators immediately
    SendNow,
    /// Open the link to the given controller URL
    Connect(String),
    /// Drop the link and stop reconnecting
    Disconnect,
    /// Cycle the grid style
    ToggleGrid,
    ZoomIn,
    ZoomOut,
    /// Reset zoom to 100%
    ZoomReset,
    /// Zoom to fit the whole rig
    ZoomToFit,
}

pub fn render_ui(ctx: &Context, ui_state: &mut UiState, robot: &RobotState) -> Option<UiAction> {
    ui_state.tick_notices();

    let link_action = render_link_panel(ctx, ui_state);
    let pose_action = render_pose_panel(ctx, robot);
    let bottom_action = render_bottom_toolbar(ctx, ui_state);

    render_notices(ctx, ui_state);

    // Return the first action (link panel takes precedence)
    link_action.or(pose_action).or(bottom_action)
}

/// Render the link panel: status dot, server URL and connect controls.
fn render_link_panel(ctx: &Context, ui_state: &mut UiState) -> Option<UiAction> {
    let mut action = None;

    egui::Area::new(egui::Id::new("link_panel"))
        .anchor(Align2::LEFT_TOP, Vec2::new(12.0, 12.0))
        .interactable(true)
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            widgets_panel_frame().show(ui, |ui| {
                ui.set_width(210.0);
                ui.vertical(|ui| {
                    ui.spacing_mut().item_spacing = Vec2::new(0.0, 6.0);

                    widgets_section_label(ui, "CONTROLLER LINK");

                    let (status_color, status_text) = match ui_state.connection.state {
                        ConnectionState::Connected => (theme::OK, "Connected"),
                        ConnectionState::Connecting => (theme::WARN, "Connecting"),
                        ConnectionState::Disconnected => {
                            (Color32::from_gray(148), "Not connected")
                        }
                    };
                    let dot = StatusDot::new(status_color, status_text);
                    let dot = if ui_state.connection.attempts > 0 {
                        dot.detail(format!("attempt {}", ui_state.connection.attempts))
                    } else {
                        dot
                    };
                    dot.show(ui);

                    ui.label(
                        egui::RichText::new("Server URL")
                            .size(11.0)
                            .color(theme::TEXT_MUTED),
                    );
                    let linked = ui_state.connection.state != ConnectionState::Disconnected;
                    ui.visuals_mut().extreme_bg_color = Color32::WHITE;
                    ui.visuals_mut().override_text_color = Some(Color32::from_gray(30));
                    ui.add_enabled(
                        !linked,
                        egui::TextEdit::singleline(&mut ui_state.server_url)
                            .hint_text("ws://127.0.0.1:5000/ws")
                            .desired_width(f32::INFINITY),
                    );
                    ui.visuals_mut().override_text_color = None;

                    ui.horizontal(|ui| {
                        ui.spacing_mut().item_spacing = Vec2::new(6.0, 0.0);

                        if linked {
                            if ActionButton::new("Disconnect")
                                .tone(ButtonTone::Danger)
                                .min_width(92.0)
                                .show(ui)
                            {
                                action = Some(UiAction::Disconnect);
                            }
                        } else if ActionButton::new("Connect")
                            .tone(ButtonTone::Primary)
                            .min_width(92.0)
                            .show(ui)
                        {
                            action = Some(UiAction::Connect(ui_state.server_url.clone()));
                        }

                        let can_send = ui_state.connection.state == ConnectionState::Connected;
                        if ActionButton::new("Send Now").enabled(can_send).show(ui) {
                            action = Some(UiAction::SendNow);
                        }
                    });
                });
            });
        });

    action
}

/// Render the pose panel: one slider per degree of freedom.
///
/// Slider values come straight from the live pose, so remote overwrites
/// and drags show up here without any extra plumbing.
fn render_pose_panel(ctx: &Context, robot: &RobotState) -> Option<UiAction> {
    let mut action = None;

    egui::Area::new(egui::Id::new("pose_panel"))
        .anchor(Align2::RIGHT_TOP, Vec2::new(-12.0, 12.0))
        .interactable(true)
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            widgets_panel_frame().show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.spacing_mut().item_spacing = Vec2::new(0.0, 4.0);

                    widgets_section_label(ui, "POSE");

                    let rows = [
                        ("Left leg", Side::Left, Part::Leg, robot.left_leg),
                        ("Left joint", Side::Left, Part::Joint, robot.left_joint),
                        ("Right leg", Side::Right, Part::Leg, robot.right_leg),
                        ("Right joint", Side::Right, Part::Joint, robot.right_joint),
                    ];

                    for (label, side, part, value) in rows {
                        let (lo, hi) = part.range();
                        if let Some(angle) = AngleSlider::new(label, value, lo..=hi).show(ui) {
                            action = Some(UiAction::SetAngle { side, part, angle });
                        }
                    }
                });
            });
        });

    action
}

/// Render the bottom toolbar with grid toggle and zoom controls.
fn render_bottom_toolbar(ctx: &Context, ui_state: &mut UiState) -> Option<UiAction> {
    let mut action = None;

    // Get screen rect to position at bottom
    #[allow(deprecated)]
    let screen_rect = ctx.input(|i| i.content_rect());
    let toolbar_height = 36.0;
    let margin = 12.0;
    let bottom_y = screen_rect.max.y - margin - toolbar_height;

    egui::Area::new(egui::Id::new("bottom_toolbar"))
        .fixed_pos(Pos2::new(margin, bottom_y.max(margin)))
        .interactable(true)
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            limblink_widgets::toolbar_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.spacing_mut().item_spacing = Vec2::new(2.0, 0.0);

                    let text_color = Color32::from_gray(80);

                    // Grid style button - cycles None -> Lines -> Dots
                    let grid_tooltip = match ui_state.grid_style {
                        GridStyle::None => "No grid (click for lines)",
                        GridStyle::Lines => "Line grid (click for dots)",
                        GridStyle::Dots => "Dot grid (click to hide)",
                    };
                    let grid_response = ui.add(
                        egui::Label::new(
                            egui::RichText::new(format!("Grid: {}", ui_state.grid_style.name()))
                                .size(13.0)
                                .color(text_color),
                        )
                        .sense(egui::Sense::click()),
                    );
                    if grid_response.clicked() {
                        action = Some(UiAction::ToggleGrid);
                    }
                    grid_response.clone().on_hover_text(grid_tooltip);
                    grid_response.on_hover_cursor(egui::CursorIcon::PointingHand);

                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new("|")
                            .size(14.0)
                            .color(Color32::from_gray(200)),
                    );
                    ui.add_space(8.0);

                    // Zoom out button
                    let minus_response = ui.add(
                        egui::Label::new(
                            egui::RichText::new("\u{2212}") // − minus sign
                                .size(16.0)
                                .color(text_color),
                        )
                        .sense(egui::Sense::click()),
                    );
                    if minus_response.clicked() {
                        action = Some(UiAction::ZoomOut);
                    }
                    minus_response.clone().on_hover_text("Zoom out");
                    minus_response.on_hover_cursor(egui::CursorIcon::PointingHand);

                    ui.add_space(12.0);

                    // Current zoom level (clickable to reset)
                    // Display zoom relative to BASE_ZOOM (so BASE_ZOOM = 100%)
                    let zoom_pct = (ui_state.zoom_level / BASE_ZOOM * 100.0).round() as i32;
                    let zoom_response = ui.add(
                        egui::Label::new(
                            egui::RichText::new(format!("{}%", zoom_pct))
                                .size(13.0)
                                .color(text_color),
                        )
                        .sense(egui::Sense::click()),
                    );
                    if zoom_response.clicked() {
                        action = Some(UiAction::ZoomReset);
                    }
                    zoom_response.clone().on_hover_text("Reset to 100%");
                    zoom_response.on_hover_cursor(egui::CursorIcon::PointingHand);

                    ui.add_space(12.0);

                    // Zoom in button
                    let plus_response = ui.add(
                        egui::Label::new(egui::RichText::new("+").size(16.0).color(text_color))
                            .sense(egui::Sense::click()),
                    );
                    if plus_response.clicked() {
                        action = Some(UiAction::ZoomIn);
                    }
                    plus_response.clone().on_hover_text("Zoom in");
                    plus_response.on_hover_cursor(egui::CursorIcon::PointingHand);

                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new("|")
                            .size(14.0)
                            .color(Color32::from_gray(200)),
                    );
                    ui.add_space(8.0);

                    // Zoom to fit button
                    let fit_response = ui.add(
                        egui::Label::new(egui::RichText::new("Fit").size(13.0).color(text_color))
                            .sense(egui::Sense::click()),
                    );
                    if fit_response.clicked() {
                        action = Some(UiAction::ZoomToFit);
                    }
                    fit_response.clone().on_hover_text("Zoom to fit the rig (F)");
                    fit_response.on_hover_cursor(egui::CursorIcon::PointingHand);
                });
            });
        });

    action
}

/// Render transient notice toasts above the bottom toolbar.
fn render_notices(ctx: &Context, ui_state: &UiState) {
    if ui_state.notices.is_empty() {
        return;
    }

    egui::Area::new(egui::Id::new("notices"))
        .anchor(Align2::CENTER_BOTTOM, Vec2::new(0.0, -60.0))
        .interactable(false)
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.spacing_mut().item_spacing = Vec2::new(0.0, 4.0);
                for notice in &ui_state.notices {
                    egui::Frame::new()
                        .fill(Color32::from_rgba_unmultiplied(40, 40, 46, 235))
                        .corner_radius(CornerRadius::same(6))
                        .inner_margin(Margin::symmetric(10, 6))
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(&notice.text)
                                    .size(12.0)
                                    .color(Color32::from_gray(235)),
                            );
                        });
                }
            });
        });
}
