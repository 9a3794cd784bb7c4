//! The light rig: a fixed directional/ambient/spot configuration and its GPU uniform.
//!
//! The rig is a plain value struct. It is immutable after setup except through
//! parameter-panel bindings; whatever its current values are gets folded into
//! one [`LightsUniform`] and uploaded every tick. Shadow parameters are carried
//! as configuration state for the GPU layer; no shadow-map pass lives here.

use cgmath::Vector3;
use wgpu::util::DeviceExt;

#[derive(Clone, Copy, Debug)]
pub struct DirectionalLight {
    pub position: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow_near: f32,
    pub shadow_far: f32,
    pub shadow_map_size: [u32; 2],
    pub shadow_normal_bias: f32,
    pub shadow_intensity: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct AmbientLight {
    pub position: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct SpotLight {
    pub position: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow_near: f32,
    pub shadow_far: f32,
    pub shadow_fov_deg: f32,
    pub shadow_map_size: [u32; 2],
}

/// The full light configuration of a scene.
#[derive(Clone, Copy, Debug)]
pub struct LightRig {
    pub directional: DirectionalLight,
    pub ambient: AmbientLight,
    pub spot: SpotLight,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            directional: DirectionalLight {
                position: Vector3::new(0.99, 7.05, 10.0),
                color: [1.0, 1.0, 1.0],
                intensity: 4.0,
                cast_shadow: true,
                shadow_near: 1.0,
                shadow_far: 25.0,
                shadow_map_size: [1024, 1024],
                shadow_normal_bias: 0.05,
                shadow_intensity: 0.3,
            },
            ambient: AmbientLight {
                position: Vector3::new(-1.0, 1.0, 1.0),
                color: [1.0, 1.0, 1.0],
                intensity: 0.84,
            },
            spot: SpotLight {
                position: Vector3::new(1.0, 0.2, 2.0),
                color: [1.0, 1.0, 1.0],
                intensity: 1.0,
                cast_shadow: true,
                shadow_near: 500.0,
                shadow_far: 4000.0,
                shadow_fov_deg: 30.0,
                shadow_map_size: [1024, 1024],
            },
        }
    }
}

impl LightRig {
    pub fn to_uniform(&self) -> LightsUniform {
        LightsUniform {
            directional_position: self.directional.position.into(),
            directional_intensity: self.directional.intensity,
            directional_color: self.directional.color,
            ambient_intensity: self.ambient.intensity,
            ambient_color: self.ambient.color,
            spot_intensity: self.spot.intensity,
            spot_position: self.spot.position.into(),
            _padding: 0.0,
            spot_color: self.spot.color,
            _padding2: 0.0,
        }
    }
}

// Uniforms require 16 byte (4 float) row spacing, so each vec3 shares its
// fourth slot with a scalar or padding.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    directional_position: [f32; 3],
    directional_intensity: f32,
    directional_color: [f32; 3],
    ambient_intensity: f32,
    ambient_color: [f32; 3],
    spot_intensity: f32,
    spot_position: [f32; 3],
    _padding: f32,
    spot_color: [f32; 3],
    _padding2: f32,
}

/// GPU resources backing the light uniform.
#[derive(Debug)]
pub struct LightResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(rig: &LightRig, device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[rig.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Upload the rig's current values.
    pub fn write(&self, queue: &wgpu::Queue, rig: &LightRig) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[rig.to_uniform()]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
        label: Some("light_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rig_carries_the_fixed_configuration() {
        let rig = LightRig::default();
        assert_eq!(rig.directional.intensity, 4.0);
        assert_eq!(rig.directional.position, Vector3::new(0.99, 7.05, 10.0));
        assert_eq!(rig.ambient.intensity, 0.84);
        assert_eq!(rig.spot.position, Vector3::new(1.0, 0.2, 2.0));
        assert!(rig.directional.cast_shadow);
        assert!(rig.spot.cast_shadow);
    }

    #[test]
    fn uniform_packs_positions_and_intensities() {
        let rig = LightRig::default();
        let uniform = rig.to_uniform();
        assert_eq!(uniform.directional_position, [0.99, 7.05, 10.0]);
        assert_eq!(uniform.directional_intensity, 4.0);
        assert_eq!(uniform.ambient_intensity, 0.84);
        assert_eq!(uniform.spot_position, [1.0, 0.2, 2.0]);
    }
}
