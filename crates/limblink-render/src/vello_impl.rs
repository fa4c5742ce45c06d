//! Vello-based renderer implementation.
//!
//! Builds the whole frame from scratch every time: grid, title, limb
//! strokes, marker dots, angle labels, then the grab rings. Nothing is
//! retained between frames except the font and layout contexts.

use crate::renderer::{GridStyle, RenderContext, Renderer};
use kurbo::{Affine, BezPath, Circle, Line, Point, Rect, Stroke};
use limblink_core::hit::HANDLE_HIT_RADIUS;
use limblink_core::model::{limb_geometry, LimbGeometry, Side};
use parley::layout::PositionedLayoutItem;
use parley::{FontContext, LayoutContext, StyleProperty};
use peniko::{Brush, Color, Fill};
use vello::Scene;

/// Title drawn in the top-left corner of the viewport.
const TITLE: &str = "Robot Dog Controller";

/// Grid pitch in world units.
const GRID_SIZE: f64 = 20.0;

/// Vello-based renderer for GPU-accelerated 2D graphics.
pub struct VelloRenderer {
    /// The Vello scene being built.
    scene: Scene,
    /// Font context for text rendering (cached across frames).
    font_cx: FontContext,
    /// Layout context for text rendering.
    layout_cx: LayoutContext<Brush>,
    /// Current zoom level (for zoom-independent UI elements).
    zoom: f64,
}

impl Default for VelloRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloRenderer {
    /// Create a new Vello renderer.
    ///
    /// Text uses the platform's sans-serif family; nothing is embedded.
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            zoom: 1.0,
        }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Render the two limb segments as thick strokes, leg then joint.
    fn render_limb(&mut self, geo: &LimbGeometry, transform: Affine) {
        let leg_color = Color::from_rgba8(51, 65, 85, 255);
        let joint_color = Color::from_rgba8(100, 116, 139, 255);

        self.scene.stroke(
            &Stroke::new(6.0),
            transform,
            leg_color,
            None,
            &Line::new(geo.pivot, geo.knee),
        );
        self.scene.stroke(
            &Stroke::new(5.0),
            transform,
            joint_color,
            None,
            &Line::new(geo.knee, geo.foot),
        );
    }

    /// Render the pivot, knee and foot marker dots.
    fn render_markers(&mut self, geo: &LimbGeometry, transform: Affine) {
        let pivot_color = Color::from_rgba8(30, 41, 59, 255);
        let knee_color = Color::from_rgba8(59, 130, 246, 255);
        let foot_color = Color::from_rgba8(16, 185, 129, 255);

        self.scene.fill(
            Fill::NonZero,
            transform,
            pivot_color,
            None,
            &Circle::new(geo.pivot, 7.0),
        );
        self.scene.fill(
            Fill::NonZero,
            transform,
            knee_color,
            None,
            &Circle::new(geo.knee, 6.0),
        );
        self.scene.fill(
            Fill::NonZero,
            transform,
            foot_color,
            None,
            &Circle::new(geo.foot, 5.0),
        );
    }

    /// Render the grab affordance rings around the pivot and knee.
    ///
    /// Ring radius matches the hit tolerance and stays constant in
    /// screen pixels, so the ring always shows exactly where a grab
    /// will land.
    fn render_grab_rings(&mut self, geo: &LimbGeometry, transform: Affine) {
        let ring_fill = Color::from_rgba8(59, 130, 246, 24);
        let ring_stroke = Color::from_rgba8(59, 130, 246, 120);
        let radius = HANDLE_HIT_RADIUS / self.zoom;
        let stroke = Stroke::new(1.5 / self.zoom);

        for center in [geo.pivot, geo.knee] {
            let ring = Circle::new(center, radius);
            self.scene.fill(Fill::NonZero, transform, ring_fill, None, &ring);
            self.scene.stroke(&stroke, transform, ring_stroke, None, &ring);
        }
    }

    /// Render the two angle labels for one limb, leg then joint.
    fn render_angle_labels(&mut self, ctx: &RenderContext, geo: &LimbGeometry, side: Side, transform: Affine) {
        let label_color = Color::from_rgba8(71, 85, 105, 255);

        let leg_text = format!("{:.1}\u{00b0}", ctx.state.leg(side));
        let leg_mid = Point::new(
            (geo.pivot.x + geo.knee.x) / 2.0,
            (geo.pivot.y + geo.knee.y) / 2.0,
        );
        self.render_label(
            &leg_text,
            Point::new(leg_mid.x + 14.0, leg_mid.y - 8.0),
            14.0,
            label_color,
            transform,
        );

        let joint_text = format!("{:.1}\u{00b0}", ctx.state.joint(side));
        let joint_mid = Point::new(
            (geo.knee.x + geo.foot.x) / 2.0,
            (geo.knee.y + geo.foot.y) / 2.0,
        );
        self.render_label(
            &joint_text,
            Point::new(joint_mid.x + 14.0, joint_mid.y - 8.0),
            14.0,
            label_color,
            transform,
        );
    }

    /// Render a single line of text using Parley for layout.
    ///
    /// `position` is the top-left of the text box in the coordinate
    /// space of `transform`.
    fn render_label(
        &mut self,
        text: &str,
        position: Point,
        font_size: f32,
        color: Color,
        transform: Affine,
    ) {
        if text.is_empty() {
            return;
        }

        let brush = Brush::Solid(color);

        // Build the layout using the cached font context
        let mut builder = self
            .layout_cx
            .ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(font_size));
        builder.push_default(StyleProperty::Brush(brush.clone()));
        builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
            parley::FontFamily::Generic(parley::GenericFamily::SansSerif),
        )));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout.align(
            None,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );

        let text_transform = transform * Affine::translate((position.x, position.y));
        let mut glyph_count = 0;

        // Render each line (adapted from Parley's vello example)
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let run = glyph_run.run();
                let font = run.font();
                let run_font_size = run.font_size();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));

                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        glyph_count += 1;
                        vello::Glyph {
                            id: glyph.id,
                            x: gx,
                            y: gy,
                        }
                    })
                    .collect();

                if !glyphs.is_empty() {
                    self.scene
                        .draw_glyphs(font)
                        .brush(&brush)
                        .hint(true)
                        .transform(text_transform)
                        .glyph_transform(glyph_xform)
                        .font_size(run_font_size)
                        .normalized_coords(run.normalized_coords())
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
            }
        }

        // If no glyphs were rendered (no usable font), mark the spot
        if glyph_count == 0 {
            let width = (text.len() as f64 * font_size as f64 * 0.6).max(20.0);
            let height = font_size as f64 * 1.2;
            let rect = Rect::new(position.x, position.y, position.x + width, position.y + height);
            self.scene.fill(
                Fill::NonZero,
                transform,
                Color::from_rgba8(255, 100, 100, 100),
                None,
                &rect,
            );
        }
    }

    /// Render the background grid in the requested style.
    ///
    /// Lines and dots are batched into as few draw calls as possible.
    fn render_grid(&mut self, style: GridStyle, viewport: Rect, transform: Affine) {
        if style == GridStyle::None {
            return;
        }

        // Visible world bounds, snapped outward to the grid pitch
        let inv = transform.inverse();
        let world_tl = inv * Point::new(viewport.x0, viewport.y0);
        let world_br = inv * Point::new(viewport.x1, viewport.y1);
        let start_x = (world_tl.x / GRID_SIZE).floor() * GRID_SIZE;
        let start_y = (world_tl.y / GRID_SIZE).floor() * GRID_SIZE;
        let end_x = (world_br.x / GRID_SIZE).ceil() * GRID_SIZE;
        let end_y = (world_br.y / GRID_SIZE).ceil() * GRID_SIZE;

        match style {
            GridStyle::None => {}
            GridStyle::Lines => {
                let grid_color = Color::from_rgba8(200, 200, 200, 100);
                let stroke = Stroke::new(0.5);
                let mut path = BezPath::new();

                let mut x = start_x;
                while x <= end_x {
                    path.move_to(Point::new(x, start_y));
                    path.line_to(Point::new(x, end_y));
                    x += GRID_SIZE;
                }
                let mut y = start_y;
                while y <= end_y {
                    path.move_to(Point::new(start_x, y));
                    path.line_to(Point::new(end_x, y));
                    y += GRID_SIZE;
                }

                self.scene.stroke(&stroke, transform, grid_color, None, &path);
            }
            GridStyle::Dots => {
                let grid_color = Color::from_rgba8(160, 160, 160, 70);
                let dot_size = 1.5;
                let mut path = BezPath::new();

                let mut x = start_x;
                while x <= end_x {
                    let mut y = start_y;
                    while y <= end_y {
                        // Small squares are cheaper than ellipses
                        path.move_to(Point::new(x - dot_size, y - dot_size));
                        path.line_to(Point::new(x + dot_size, y - dot_size));
                        path.line_to(Point::new(x + dot_size, y + dot_size));
                        path.line_to(Point::new(x - dot_size, y + dot_size));
                        path.close_path();
                        y += GRID_SIZE;
                    }
                    x += GRID_SIZE;
                }

                self.scene.fill(Fill::NonZero, transform, grid_color, None, &path);
            }
        }
    }
}

impl Renderer for VelloRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        // Clear the scene
        self.scene.reset();
        self.zoom = ctx.zoom;

        let camera = ctx.transform;
        let viewport = Rect::new(0.0, 0.0, ctx.viewport_size.width, ctx.viewport_size.height);

        self.render_grid(ctx.grid_style, viewport, camera);

        // Title is screen-fixed, not part of the world
        self.render_label(
            TITLE,
            Point::new(20.0, 16.0),
            22.0,
            Color::from_rgba8(15, 23, 42, 255),
            Affine::IDENTITY,
        );

        // Geometry is derived from the pose fresh for every pass
        for side in Side::ALL {
            let geo = limb_geometry(ctx.state, side, ctx.rig);
            self.render_limb(&geo, camera);
        }
        for side in Side::ALL {
            let geo = limb_geometry(ctx.state, side, ctx.rig);
            self.render_markers(&geo, camera);
        }
        for side in Side::ALL {
            let geo = limb_geometry(ctx.state, side, ctx.rig);
            self.render_angle_labels(ctx, &geo, side, camera);
        }

        // Grab rings disappear while a drag is active
        if !ctx.dragging {
            for side in Side::ALL {
                let geo = limb_geometry(ctx.state, side, ctx.rig);
                self.render_grab_rings(&geo, camera);
            }
        }
    }
}
