//! Renderer trait abstraction.

use kurbo::{Affine, Size};
use limblink_core::model::{RigConfig, RobotState};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Grid display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// No grid (plain background).
    None,
    /// Full grid lines.
    #[default]
    Lines,
    /// Only intersection dots.
    Dots,
}

impl GridStyle {
    /// Cycle to the next grid style.
    pub fn next(self) -> Self {
        match self {
            GridStyle::None => GridStyle::Lines,
            GridStyle::Lines => GridStyle::Dots,
            GridStyle::Dots => GridStyle::None,
        }
    }

    /// Get display name for this grid style.
    pub fn name(self) -> &'static str {
        match self {
            GridStyle::None => "None",
            GridStyle::Lines => "Lines",
            GridStyle::Dots => "Dots",
        }
    }
}

/// Context for a single render frame.
///
/// The frame is always rebuilt from scratch out of the pose it carries;
/// nothing about a previous frame survives.
pub struct RenderContext<'a> {
    /// The pose to render.
    pub state: &'a RobotState,
    /// Mounting geometry of the rig.
    pub rig: &'a RigConfig,
    /// World-to-screen transform from the camera.
    pub transform: Affine,
    /// Camera zoom, for elements sized in screen pixels.
    pub zoom: f64,
    /// Viewport size in physical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Background color.
    pub background_color: Color,
    /// Grid display style.
    pub grid_style: GridStyle,
    /// Whether a drag is active (hides the grab affordance rings).
    pub dragging: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(state: &'a RobotState, rig: &'a RigConfig, viewport_size: Size) -> Self {
        Self {
            state,
            rig,
            transform: Affine::IDENTITY,
            zoom: 1.0,
            viewport_size,
            scale_factor: 1.0,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            grid_style: GridStyle::Lines,
            dragging: false,
        }
    }

    /// Set the camera transform and zoom.
    pub fn with_camera(mut self, transform: Affine, zoom: f64) -> Self {
        self.transform = transform;
        self.zoom = zoom;
        self
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the grid style.
    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    /// Set whether a drag is active.
    pub fn with_dragging(mut self, dragging: bool) -> Self {
        self.dragging = dragging;
        self
    }
}

/// Trait for rendering backends.
///
/// Implementations can use Vello, wgpu directly, or other rendering engines.
pub trait Renderer: Send + Sync {
    /// Build the scene/command buffer for a frame.
    ///
    /// This method is called once per frame and should prepare all drawing commands.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
