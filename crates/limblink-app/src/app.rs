//! Core application state and lifecycle.

use kurbo::{Point, Size, Vec2};
use limblink_core::camera::{Camera, BASE_ZOOM};
use limblink_core::input::{InputState, Modifiers, MouseButton as PointerButton, PointerEvent};
use limblink_core::sync::NativeWebSocket;
use limblink_core::{Engine, EngineEvent, HANDLE_HIT_RADIUS};
use limblink_render::{GridStyle, RenderContext, Renderer, VelloRenderer};
use peniko::Color;
use std::sync::Arc;
use vello::util::RenderSurface;
use vello::wgpu::PresentMode;
use vello::{AaConfig, RenderParams, RendererOptions};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::shortcuts::{self, ShortcutAction};
use crate::ui::{render_ui, UiAction, UiState};

/// Padding around the rig when fitting the view.
const FIT_PADDING: f64 = 60.0;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub grid_style: GridStyle,
    pub background_color: Color,
    /// Controller endpoint offered in the link panel
    pub server_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "LimbLink".to_string(),
            width: 1280,
            height: 800,
            grid_style: GridStyle::Lines,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            server_url: "ws://127.0.0.1:5000/ws".to_string(),
        }
    }
}

/// Runtime state for the application.
struct AppState {
    // Windowing
    window: Arc<Window>,
    surface: RenderSurface<'static>,

    // Rendering
    vello_renderer: vello::Renderer,
    rig_renderer: VelloRenderer,
    /// Texture blitter for RGBA->surface format conversion
    texture_blitter: vello::wgpu::util::TextureBlitter,

    // egui
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    ui_state: UiState,

    // State
    engine: Engine,
    camera: Camera,
    input: InputState,
    viewport_size: Size,
    config: AppConfig,

    // Control channel
    websocket: Option<NativeWebSocket>,
}

/// Main application struct.
pub struct App {
    config: AppConfig,
    state: Option<AppState>,
    render_cx: Option<vello::util::RenderContext>,
}

impl App {
    /// Create a new application with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a new application with custom configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            state: None,
            render_cx: None,
        }
    }

    /// Run the application.
    pub fn run() {
        let event_loop = EventLoop::new().expect("Failed to create event loop");
        let mut app = App::new();
        event_loop.run_app(&mut app).expect("Event loop error");
    }

    /// Finish initialization after surface is created.
    fn finish_init(&mut self, window: Arc<Window>, surface: RenderSurface<'static>) {
        let render_cx = self
            .render_cx
            .as_ref()
            .expect("RenderContext not initialized");
        let device = &render_cx.devices[surface.dev_id].device;

        let vello_renderer = vello::Renderer::new(device, RendererOptions::default())
            .expect("Failed to create Vello renderer");

        // Create texture blitter for RGBA->surface format conversion
        // This is needed because Vello renders to Rgba8Unorm (for compute shader
        // compatibility) but the surface format is typically Bgra8Unorm
        let texture_blitter =
            vello::wgpu::util::TextureBlitter::new(device, surface.config.format);

        // Initialize egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface.config.format,
            egui_wgpu::RendererOptions::default(),
        );

        let viewport_size = Size::new(surface.config.width as f64, surface.config.height as f64);

        // The rig is modeled around the origin; start with it centered at 100%
        let mut camera = Camera::new();
        camera.offset = Vec2::new(viewport_size.width / 2.0, viewport_size.height / 2.0);

        let mut ui_state = UiState::default();
        ui_state.server_url = self.config.server_url.clone();
        ui_state.grid_style = self.config.grid_style;

        log::info!(
            "LimbLink initialized - {}x{}",
            surface.config.width,
            surface.config.height
        );
        for shortcut in shortcuts::SHORTCUTS {
            log::info!("  {:10} {}", shortcut.key, shortcut.description);
        }

        self.state = Some(AppState {
            window: window.clone(),
            surface,
            vello_renderer,
            rig_renderer: VelloRenderer::new(),
            texture_blitter,
            egui_ctx,
            egui_state,
            egui_renderer,
            ui_state,
            engine: Engine::new(),
            camera,
            input: InputState::new(),
            viewport_size,
            config: self.config.clone(),
            websocket: None,
        });

        // Request initial redraw
        window.request_redraw();
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        log::info!("Creating window...");

        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        log::info!("Window created, initializing renderer...");

        let size = window.inner_size();
        let (width, height) = if size.width == 0 || size.height == 0 {
            (self.config.width, self.config.height)
        } else {
            (size.width, size.height)
        };

        log::info!("Surface size: {}x{}", width, height);

        let render_cx = self
            .render_cx
            .get_or_insert_with(|| vello::util::RenderContext::new());

        let surface = pollster::block_on(render_cx.create_surface(
            window.clone(),
            width,
            height,
            PresentMode::AutoVsync,
        ))
        .expect("Failed to create surface");

        // Transmute lifetime to 'static - safe because App owns everything
        let surface: RenderSurface<'static> = unsafe { std::mem::transmute(surface) };
        self.finish_init(window, surface);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        // Let egui process the event first
        let egui_response = state.egui_state.on_window_event(&state.window, &event);

        // If egui wants this event exclusively, don't process it for the rig
        // Check both: if egui consumed the event OR if the pointer is over an egui area
        let egui_wants_input = egui_response.consumed
            || state.egui_ctx.is_pointer_over_area()
            || state.egui_ctx.wants_pointer_input()
            || state.egui_ctx.wants_keyboard_input();

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return;
                }

                state.viewport_size = Size::new(size.width as f64, size.height as f64);

                if let Some(render_cx) = self.render_cx.as_mut() {
                    render_cx.resize_surface(&mut state.surface, size.width, size.height);
                }

                state.window.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                // Feed transport events into the engine queue
                if let Some(ref mut ws) = state.websocket {
                    for channel_event in ws.poll_events() {
                        state.engine.push(EngineEvent::Channel(channel_event));
                    }
                }

                // The grab radius is constant on screen, so scale it to world units
                state
                    .engine
                    .set_hit_tolerance(HANDLE_HIT_RADIUS / state.camera.zoom);
                state.engine.pump();

                // Mirror engine state into the UI
                state.ui_state.connection = state.engine.connection();
                state.ui_state.zoom_level = state.camera.zoom;
                state.ui_state.grid_style = state.config.grid_style;
                for text in state.engine.take_notices() {
                    state.ui_state.push_notice(text);
                }

                // Run egui and get any actions
                let egui_input = state.egui_state.take_egui_input(&state.window);
                let egui_output = state.egui_ctx.run(egui_input, |ctx| {
                    if let Some(action) = render_ui(ctx, &mut state.ui_state, state.engine.state())
                    {
                        match action {
                            UiAction::SetAngle { side, part, angle } => {
                                state
                                    .engine
                                    .push(EngineEvent::SliderInput { side, part, angle });
                            }
                            UiAction::SendNow => {
                                state.engine.push(EngineEvent::SendNow);
                            }
                            UiAction::Connect(url) => {
                                let mut ws = NativeWebSocket::new();
                                match ws.connect(&url) {
                                    Ok(()) => {
                                        log::info!("Control channel dialing {}", url);
                                        state.websocket = Some(ws);
                                        state.engine.bridge_mut().on_connecting();
                                    }
                                    Err(e) => {
                                        log::error!("Connect failed: {}", e);
                                        state.ui_state.push_notice(format!("Connect failed: {}", e));
                                    }
                                }
                            }
                            UiAction::Disconnect => {
                                if let Some(mut ws) = state.websocket.take() {
                                    ws.disconnect();
                                }
                                state.engine.bridge_mut().on_manual_disconnect();
                                log::info!("Control channel closed");
                            }
                            UiAction::ToggleGrid => {
                                state.config.grid_style = state.config.grid_style.next();
                                state.ui_state.grid_style = state.config.grid_style;
                            }
                            UiAction::ZoomIn => {
                                let center = Point::new(
                                    state.viewport_size.width / 2.0,
                                    state.viewport_size.height / 2.0,
                                );
                                state.camera.zoom_at(center, 1.25);
                                state.ui_state.zoom_level = state.camera.zoom;
                            }
                            UiAction::ZoomOut => {
                                let center = Point::new(
                                    state.viewport_size.width / 2.0,
                                    state.viewport_size.height / 2.0,
                                );
                                state.camera.zoom_at(center, 0.8);
                                state.ui_state.zoom_level = state.camera.zoom;
                            }
                            UiAction::ZoomReset => {
                                state.camera.zoom = BASE_ZOOM;
                                state.ui_state.zoom_level = BASE_ZOOM;
                            }
                            UiAction::ZoomToFit => {
                                state.camera.fit_to_bounds(
                                    state.engine.rig().reach_bounds(),
                                    state.viewport_size,
                                    FIT_PADDING,
                                );
                                state.ui_state.zoom_level = state.camera.zoom;
                            }
                        }
                    }
                });

                state
                    .egui_state
                    .handle_platform_output(&state.window, egui_output.platform_output);
                let egui_primitives = state
                    .egui_ctx
                    .tessellate(egui_output.shapes, egui_output.pixels_per_point);

                // Apply slider edits in the same frame they were made
                state.engine.pump();

                // Flush queued controller frames
                if let Some(ref ws) = state.websocket {
                    if state.engine.bridge().has_outgoing() {
                        for msg in state.engine.bridge_mut().take_outgoing() {
                            let _ = ws.send(&msg);
                        }
                    }
                } else if state.engine.bridge().has_outgoing() {
                    // No link: edits stay local
                    state.engine.bridge_mut().take_outgoing();
                }

                // Build the rig scene
                let render_ctx = RenderContext::new(
                    state.engine.state(),
                    state.engine.rig(),
                    state.viewport_size,
                )
                .with_camera(state.camera.transform(), state.camera.zoom)
                .with_scale_factor(state.window.scale_factor())
                .with_background(state.config.background_color)
                .with_grid(state.config.grid_style)
                .with_dragging(state.engine.is_dragging());

                state.rig_renderer.build_scene(&render_ctx);
                let scene = state.rig_renderer.take_scene();

                // Render
                let Some(render_cx) = self.render_cx.as_ref() else {
                    return;
                };

                let device_handle = &render_cx.devices[state.surface.dev_id];
                let device = &device_handle.device;
                let queue = &device_handle.queue;

                let surface_texture = match state.surface.surface.get_current_texture() {
                    Ok(t) => t,
                    Err(e) => {
                        log::warn!("Failed to get surface texture: {:?}", e);
                        return;
                    }
                };

                let width = state.surface.config.width;
                let height = state.surface.config.height;

                let params = RenderParams {
                    base_color: state.config.background_color,
                    width,
                    height,
                    antialiasing_method: AaConfig::Area,
                };

                // Create an intermediate texture with StorageBinding usage for Vello.
                // IMPORTANT: Must use Rgba8Unorm format because:
                // 1. Vello's compute shaders require StorageBinding usage
                // 2. WebGPU only supports StorageBinding for Rgba8Unorm (not Bgra8Unorm)
                // 3. We copy to the surface texture afterward (which may be Bgra8Unorm)
                let render_texture = device.create_texture(&vello::wgpu::TextureDescriptor {
                    label: Some("vello render texture"),
                    size: vello::wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: vello::wgpu::TextureDimension::D2,
                    format: vello::wgpu::TextureFormat::Rgba8Unorm,
                    usage: vello::wgpu::TextureUsages::STORAGE_BINDING
                        | vello::wgpu::TextureUsages::COPY_SRC
                        | vello::wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                });

                let render_texture_view =
                    render_texture.create_view(&vello::wgpu::TextureViewDescriptor::default());

                // Render Vello to the intermediate texture
                if let Err(e) = state.vello_renderer.render_to_texture(
                    device,
                    queue,
                    &scene,
                    &render_texture_view,
                    &params,
                ) {
                    log::error!("Failed to render: {:?}", e);
                    return;
                }

                let surface_view = surface_texture
                    .texture
                    .create_view(&vello::wgpu::TextureViewDescriptor::default());

                // Blit the RGBA intermediate texture to the surface texture (which may be BGRA)
                {
                    let mut blit_encoder =
                        device.create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                            label: Some("blit encoder"),
                        });

                    state.texture_blitter.copy(
                        device,
                        &mut blit_encoder,
                        &render_texture_view,
                        &surface_view,
                    );

                    queue.submit(std::iter::once(blit_encoder.finish()));
                }

                // Update egui textures
                for (id, image_delta) in &egui_output.textures_delta.set {
                    state
                        .egui_renderer
                        .update_texture(device, queue, *id, image_delta);
                }

                // Render egui on top
                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [width, height],
                    pixels_per_point: egui_output.pixels_per_point,
                };

                {
                    let mut egui_encoder =
                        device.create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                            label: Some("egui encoder"),
                        });

                    state.egui_renderer.update_buffers(
                        device,
                        queue,
                        &mut egui_encoder,
                        &egui_primitives,
                        &screen_descriptor,
                    );

                    let render_pass =
                        egui_encoder.begin_render_pass(&vello::wgpu::RenderPassDescriptor {
                            label: Some("egui render pass"),
                            color_attachments: &[Some(vello::wgpu::RenderPassColorAttachment {
                                view: &surface_view,
                                resolve_target: None,
                                ops: vello::wgpu::Operations {
                                    load: vello::wgpu::LoadOp::Load, // Keep Vello content
                                    store: vello::wgpu::StoreOp::Store,
                                },
                                depth_slice: None,
                            })],
                            depth_stencil_attachment: None,
                            timestamp_writes: None,
                            occlusion_query_set: None,
                        });

                    // Use forget_lifetime to satisfy egui-wgpu's 'static requirement
                    let mut render_pass = render_pass.forget_lifetime();
                    state
                        .egui_renderer
                        .render(&mut render_pass, &egui_primitives, &screen_descriptor);
                    drop(render_pass);

                    queue.submit(std::iter::once(egui_encoder.finish()));
                }

                // Free egui textures
                for id in &egui_output.textures_delta.free {
                    state.egui_renderer.free_texture(id);
                }
                surface_texture.present();
                state.window.request_redraw();
            }

            WindowEvent::CursorMoved { position, .. } => {
                let point = Point::new(position.x, position.y);
                let previous = state.input.pointer_position;
                state
                    .input
                    .handle_pointer_event(PointerEvent::Move { position: point });

                // Skip rig processing if egui wants the pointer
                if egui_wants_input {
                    return;
                }

                let world_point = state.camera.screen_to_world(point);
                state.engine.push(EngineEvent::PointerMove(world_point));

                // Middle mouse button always pans
                if state.input.is_button_pressed(PointerButton::Middle) {
                    state.camera.pan(point - previous);
                }
            }

            WindowEvent::MouseInput {
                state: btn_state,
                button,
                ..
            } => {
                let pointer_btn = match button {
                    MouseButton::Left => PointerButton::Left,
                    MouseButton::Right => PointerButton::Right,
                    MouseButton::Middle => PointerButton::Middle,
                    _ => return,
                };

                let position = state.input.pointer_position;

                match btn_state {
                    ElementState::Pressed => {
                        state.input.handle_pointer_event(PointerEvent::Down {
                            position,
                            button: pointer_btn,
                        });

                        // Skip rig processing if egui wants the pointer
                        if egui_wants_input {
                            return;
                        }

                        if pointer_btn == PointerButton::Left {
                            let world_point = state.camera.screen_to_world(position);
                            state.engine.push(EngineEvent::PointerDown(world_point));
                        }
                    }
                    ElementState::Released => {
                        state.input.handle_pointer_event(PointerEvent::Up {
                            position,
                            button: pointer_btn,
                        });

                        // Release always reaches the engine, whatever egui says,
                        // so a drag cannot outlive its button
                        if pointer_btn == PointerButton::Left {
                            state.engine.push(EngineEvent::PointerUp);
                        }
                    }
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                // Skip rig processing if egui wants the pointer
                if egui_wants_input {
                    return;
                }

                let scroll = match delta {
                    MouseScrollDelta::LineDelta(x, y) => {
                        Vec2::new(x as f64 * 20.0, y as f64 * 20.0)
                    }
                    MouseScrollDelta::PixelDelta(pos) => Vec2::new(pos.x, pos.y),
                };

                let position = state.input.pointer_position;
                state.input.handle_pointer_event(PointerEvent::Scroll {
                    position,
                    delta: scroll,
                });

                if state.input.modifiers.ctrl {
                    // Ctrl/Cmd + scroll = zoom
                    let zoom_factor = if scroll.y > 0.0 { 1.1 } else { 0.9 };
                    state.camera.zoom_at(position, zoom_factor);
                } else {
                    // Normal scroll/trackpad = pan
                    state.camera.pan(scroll);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                // Skip rig processing if egui wants keyboard
                if egui_wants_input {
                    return;
                }

                let key_str = match &event.logical_key {
                    Key::Named(named) => match named {
                        NamedKey::Escape => "Escape",
                        _ => return,
                    },
                    Key::Character(c) => c.as_str(),
                    _ => return,
                };

                if event.state == ElementState::Pressed {
                    match shortcuts::resolve(key_str) {
                        Some(ShortcutAction::CycleGrid) => {
                            state.config.grid_style = state.config.grid_style.next();
                            log::info!("Grid: {}", state.config.grid_style.name());
                        }
                        Some(ShortcutAction::FitView) => {
                            state.camera.fit_to_bounds(
                                state.engine.rig().reach_bounds(),
                                state.viewport_size,
                                FIT_PADDING,
                            );
                        }
                        // Home view: rig centered at 100%
                        Some(ShortcutAction::HomeView) => {
                            state.camera.reset();
                            state.camera.pan(Vec2::new(
                                state.viewport_size.width / 2.0,
                                state.viewport_size.height / 2.0,
                            ));
                        }
                        // Release keeps the current angle
                        Some(ShortcutAction::CancelDrag) => {
                            state.engine.push(EngineEvent::PointerUp);
                        }
                        None => {}
                    }
                }
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                let mods = modifiers.state();
                state.input.set_modifiers(Modifiers {
                    shift: mods.shift_key(),
                    ctrl: mods.control_key(),
                    alt: mods.alt_key(),
                    meta: mods.super_key(),
                });
            }

            _ => {}
        }
    }

    fn new_events(&mut self, _event_loop: &ActiveEventLoop, _cause: winit::event::StartCause) {
        if let Some(state) = &mut self.state {
            state.input.begin_frame();
        }
    }
}
