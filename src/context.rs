use std::sync::Arc;

use anyhow::{Context as _, Result, ensure};
use cgmath::Vector2;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    app::AppConfig,
    camera::{self, CameraResources, CameraUniform},
    data_structures::texture,
    lights::LightResources,
    pipelines::{basic::mk_basic_pipeline, transparent::mk_transparent_pipeline},
};

use wgpu::util::DeviceExt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MouseButtonState {
    Left,
    Right,
    None,
}

/// Raw pointer state: the last cursor position in normalized device
/// coordinates plus the currently pressed button.
#[derive(Clone, Copy, Debug)]
pub struct PointerState {
    pub ndc: Vector2<f32>,
    pub pressed: MouseButtonState,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            ndc: Vector2::new(0.0, 0.0),
            pressed: MouseButtonState::None,
        }
    }
}

/// Map a cursor position to normalized device coordinates.
///
/// x maps [0, width] to [-1, 1]; y maps [0, height] to [1, -1] (flipped).
/// Positions outside the viewport map outside [-1, 1]; no clamping.
pub fn pointer_to_ndc(x: f64, y: f64, width: u32, height: u32) -> Vector2<f32> {
    Vector2::new(
        (x / width as f64 * 2.0 - 1.0) as f32,
        (-(y / height as f64) * 2.0 + 1.0) as f32,
    )
}

/// The device pixel ratio actually used for rendering, bounding the cost of
/// very dense displays.
pub fn effective_pixel_ratio(host_ratio: f64, max_ratio: f64) -> f64 {
    host_ratio.min(max_ratio)
}

/// Scale a physical size down so the backing store never exceeds
/// `max_ratio` physical pixels per logical pixel.
pub fn clamped_surface_size(
    size: PhysicalSize<u32>,
    scale_factor: f64,
    max_ratio: f64,
) -> (u32, u32) {
    if scale_factor <= max_ratio || scale_factor <= 0.0 {
        return (size.width, size.height);
    }
    let scale = effective_pixel_ratio(scale_factor, max_ratio) / scale_factor;
    (
        (size.width as f64 * scale).round() as u32,
        (size.height as f64 * scale).round() as u32,
    )
}

#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub transparent: wgpu::RenderPipeline,
}

#[derive(Debug)]
pub struct Context {
    pub window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: camera::Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub pointer: PointerState,
    pub clear_colour: wgpu::Color,
    pub max_pixel_ratio: f64,
}

impl Context {
    pub async fn new(window: Arc<Window>, app_config: &AppConfig) -> Result<Self> {
        let size = window.inner_size();
        ensure!(
            size.width > 0 && size.height > 0,
            "cannot build a scene for a {}x{} window: both dimensions must be positive",
            size.width,
            size.height
        );
        let (width, height) =
            clamped_surface_size(size, window.scale_factor(), app_config.max_pixel_ratio);

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to acquire GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders assume an Srgb surface texture; a non-Srgb format would
        // come out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera_config = app_config.camera;
        let camera = camera::Camera::new(camera_config.position, camera_config.target);
        let projection = camera::Projection::new(
            config.width,
            config.height,
            camera_config.fovy,
            camera_config.znear,
            camera_config.zfar,
        );
        let camera_controller = camera::OrbitController::from_camera(&camera, &camera_config);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let bind_group_layout = camera_bind_group_layout.clone();

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            controller: camera_controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout,
        };

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let light = LightResources::new(&app_config.light_rig, &device);

        let pipelines = Pipelines {
            basic: mk_basic_pipeline(
                &device,
                &config,
                &light.bind_group_layout,
                &camera.bind_group_layout,
            ),
            transparent: mk_transparent_pipeline(
                &device,
                &config,
                &light.bind_group_layout,
                &camera.bind_group_layout,
            ),
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            pointer: PointerState::default(),
            clear_colour: app_config.clear_colour,
            max_pixel_ratio: app_config.max_pixel_ratio,
            window,
            depth_texture,
        })
    }

    /// Reconfigure the surface and projection for new dimensions.
    ///
    /// Safe to call redundantly; zero-sized updates are ignored so a
    /// minimized window keeps the last valid configuration.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.projection.resize(width, height);
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = texture::Texture::create_depth_texture(
                &self.device,
                [self.config.width, self.config.height],
                "depth_texture",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_maps_viewport_corners_to_ndc() {
        let (width, height) = (800, 600);
        assert_eq!(
            pointer_to_ndc(0.0, 0.0, width, height),
            Vector2::new(-1.0, 1.0)
        );
        assert_eq!(
            pointer_to_ndc(800.0, 600.0, width, height),
            Vector2::new(1.0, -1.0)
        );
        assert_eq!(
            pointer_to_ndc(400.0, 300.0, width, height),
            Vector2::new(0.0, 0.0)
        );
    }

    #[test]
    fn pointer_outside_the_viewport_is_not_clamped() {
        let ndc = pointer_to_ndc(1000.0, -150.0, 800, 600);
        assert!(ndc.x > 1.0);
        assert!(ndc.y > 1.0);
    }

    #[test]
    fn pixel_ratio_never_exceeds_the_cap() {
        assert_eq!(effective_pixel_ratio(3.0, 2.0), 2.0);
        assert_eq!(effective_pixel_ratio(2.0, 2.0), 2.0);
        assert_eq!(effective_pixel_ratio(1.0, 2.0), 1.0);
        assert_eq!(effective_pixel_ratio(1.5, 2.0), 1.5);
    }

    #[test]
    fn surface_size_scales_down_for_dense_displays() {
        let size = PhysicalSize::new(300, 300);
        // Host ratio 3 with a cap of 2: backing store shrinks to 2/3.
        assert_eq!(clamped_surface_size(size, 3.0, 2.0), (200, 200));
        // At or below the cap the physical size passes through untouched.
        assert_eq!(clamped_surface_size(size, 2.0, 2.0), (300, 300));
        assert_eq!(clamped_surface_size(size, 1.0, 2.0), (300, 300));
    }
}
