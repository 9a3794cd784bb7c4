//! Application shell: event loop, frame driver, and the [`Experience`] trait.
//!
//! An experience is one self-contained interactive scene. The shell owns the
//! window and GPU context, feeds input events to the camera controller and the
//! experience, and drives an explicit tick per host redraw:
//!
//! 1. read the elapsed time from the clock
//! 2. let the experience mutate its scene (animation, uniform refresh)
//! 3. advance the damped orbit camera and upload the camera uniform
//! 4. issue exactly one render
//!
//! Rendering is gated only on the surface being configured. Asynchronous
//! asset decodes run on their own lifecycle: they are spawned through an
//! [`AssetDispatcher`] and complete by posting an [`AppEvent`] back through
//! the event-loop proxy, so a slow or failed decode never stalls the loop.

use std::{iter, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    camera::CameraConfig,
    context::{Context, MouseButtonState, clamped_surface_size, pointer_to_ndc},
    data_structures::scene_graph::SceneNode,
    lights::LightRig,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Immutable application parameters, fixed at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub clear_colour: wgpu::Color,
    pub camera: CameraConfig,
    pub light_rig: LightRig,
    /// Upper bound on the device pixel ratio used for rendering.
    pub max_pixel_ratio: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "vitrine".to_string(),
            // #E8EDFF
            clear_colour: wgpu::Color {
                r: 232.0 / 255.0,
                g: 237.0 / 255.0,
                b: 1.0,
                a: 1.0,
            },
            camera: CameraConfig::default(),
            light_rig: LightRig::default(),
            max_pixel_ratio: 2.0,
        }
    }
}

/// Monotonic elapsed-time source, read once per frame.
#[derive(Debug)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

pub enum AppEvent {
    /// GPU context finished initializing (sent from the async init on wasm).
    Initialized(AppState),
    /// A model decode completed, successfully or not.
    AssetReady(anyhow::Result<SceneNode>),
}

/// Launches asynchronous asset decodes.
///
/// Decodes run detached from the frame loop; completion (or failure) arrives
/// later as [`AppEvent::AssetReady`]. There is no cancellation or retry; a
/// stalled fetch only ever stalls the asset-dependent visuals.
pub struct AssetDispatcher {
    proxy: EventLoopProxy<AppEvent>,
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
}

impl AssetDispatcher {
    pub fn load_model(&self, path: &str, device: wgpu::Device, queue: wgpu::Queue) {
        let path = path.to_string();
        let proxy = self.proxy.clone();

        #[cfg(not(target_arch = "wasm32"))]
        self.runtime.spawn(async move {
            let result = crate::resources::load_gltf_scene(&path, &device, &queue).await;
            if proxy.send_event(AppEvent::AssetReady(result)).is_err() {
                log::error!("event loop closed before the model decode finished");
            }
        });

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move {
            let result = crate::resources::load_gltf_scene(&path, &device, &queue).await;
            if proxy.send_event(AppEvent::AssetReady(result)).is_err() {
                log::error!("event loop closed before the model decode finished");
            }
        });
    }
}

/// One interactive scene: input handling, per-tick scene mutation, rendering.
pub trait Experience {
    /// Called once when the GPU context is ready. Build scene content here
    /// and kick off asset decodes through the dispatcher.
    fn on_ready(&mut self, ctx: &mut Context, assets: &AssetDispatcher) -> anyhow::Result<()>;

    /// A previously dispatched model decode completed.
    fn on_asset(&mut self, ctx: &Context, result: anyhow::Result<SceneNode>) {
        let _ = (ctx, result);
    }

    /// Raw window events, after the shell's own handling.
    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent) {
        let _ = (ctx, event);
    }

    /// Per-frame scene update: `elapsed` is total seconds since launch,
    /// `dt` the time since the previous tick.
    fn tick(&mut self, ctx: &Context, elapsed: f32, dt: Duration);

    /// Record this experience's draws into the frame's render pass.
    fn render<'a, 'pass>(&'a self, ctx: &'a Context, render_pass: &'pass mut wgpu::RenderPass<'a>)
    where
        'a: 'pass;
}

/// GPU context plus surface status and the frame clock.
pub struct AppState {
    pub ctx: Context,
    is_surface_configured: bool,
    clock: Clock,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &AppConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        Ok(Self {
            ctx,
            is_surface_configured: false,
            clock: Clock::new(),
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (width, height) =
            clamped_surface_size(size, self.ctx.window.scale_factor(), self.ctx.max_pixel_ratio);
        if width > 0 && height > 0 {
            self.is_surface_configured = true;
            self.ctx.resize(width, height);
        }
    }

    fn render<E: Experience>(&mut self, experience: &E) -> Result<(), wgpu::SurfaceError> {
        // keep the redraw loop going
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

            experience.render(&self.ctx, &mut render_pass);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App<E: Experience + 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<AppEvent>,
    state: Option<AppState>,
    experience: E,
    config: AppConfig,
    last_time: Instant,
}

impl<E: Experience + 'static> App<E> {
    fn new(event_loop: &EventLoop<AppEvent>, config: AppConfig, experience: E) -> Self {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new().expect("failed to start async runtime");
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            experience,
            config,
            last_time: Instant::now(),
        }
    }

    fn asset_dispatcher(&self) -> AssetDispatcher {
        AssetDispatcher {
            proxy: self.proxy.clone(),
            #[cfg(not(target_arch = "wasm32"))]
            runtime: self.async_runtime.handle().clone(),
        }
    }
}

impl<E: Experience + 'static> ApplicationHandler<AppEvent> for App<E> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("failed to create window"),
        );

        #[cfg(not(target_arch = "wasm32"))]
        {
            let app_state = self
                .async_runtime
                .block_on(AppState::new(window, &self.config));
            let mut app_state = match app_state {
                Ok(app_state) => app_state,
                Err(e) => {
                    log::error!("app initialization failed: {:?}", e);
                    event_loop.exit();
                    return;
                }
            };
            let dispatcher = self.asset_dispatcher();
            if let Err(e) = self.experience.on_ready(&mut app_state.ctx, &dispatcher) {
                log::error!("experience initialization failed: {:?}", e);
                event_loop.exit();
                return;
            }
            self.state = Some(app_state);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match AppState::new(window, &config).await {
                    Ok(app_state) => {
                        assert!(proxy.send_event(AppEvent::Initialized(app_state)).is_ok());
                    }
                    Err(e) => log::error!("app initialization failed: {:?}", e),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Initialized(mut app_state) => {
                // This is the message from our wasm async init. Trigger a
                // resize and redraw now that we are initialized.
                let size = app_state.ctx.window.inner_size();
                app_state.resize(size);
                let dispatcher = self.asset_dispatcher();
                if let Err(e) = self.experience.on_ready(&mut app_state.ctx, &dispatcher) {
                    log::error!("experience initialization failed: {:?}", e);
                    event_loop.exit();
                    return;
                }
                app_state.ctx.window.request_redraw();
                self.state = Some(app_state);
            }
            AppEvent::AssetReady(result) => {
                if let Some(state) = &self.state {
                    self.experience.on_asset(&state.ctx, result);
                }
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            state.ctx.camera.controller.handle_mouse(dx, dy);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.ctx.camera.controller.handle_window_events(&event);

        match &event {
            WindowEvent::CursorMoved { position, .. } => {
                let size = state.ctx.window.inner_size();
                state.ctx.pointer.ndc =
                    pointer_to_ndc(position.x, position.y, size.width, size.height);
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                state.ctx.pointer.pressed = match (button, button_state.is_pressed()) {
                    (MouseButton::Left, true) => MouseButtonState::Left,
                    (MouseButton::Right, true) => MouseButtonState::Right,
                    _ => MouseButtonState::None,
                };
            }
            _ => {}
        }

        self.experience.on_window_events(&state.ctx, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                let elapsed = state.clock.elapsed_secs();

                // Scene updates first, then the camera, then one render.
                self.experience.tick(&state.ctx, elapsed, dt);

                let projection = state.ctx.projection;
                state
                    .ctx
                    .camera
                    .controller
                    .update(&mut state.ctx.camera.camera, dt);
                state
                    .ctx
                    .camera
                    .uniform
                    .update_view_proj(&state.ctx.camera.camera, &projection);
                state.ctx.queue.write_buffer(
                    &state.ctx.camera.buffer,
                    0,
                    bytemuck::cast_slice(&[state.ctx.camera.uniform]),
                );

                match state.render(&self.experience) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size);
                    }
                    Err(e) => {
                        log::error!("unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn run<E: Experience + 'static>(config: AppConfig, experience: E) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;

    let mut app: App<E> = App::new(&event_loop, config, experience);

    event_loop.run_app(&mut app)?;

    Ok(())
}
