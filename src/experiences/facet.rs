//! The facet cube: a procedurally shaded cube under the custom shader pair.
//!
//! The camera orbit and resize handling come from the application shell; the
//! scene itself is a single static cube. The shader's `time` uniform is
//! uploaded once at initialization and deliberately left alone afterwards.

use anyhow::Result;
use cgmath::Vector3;
use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    app::{AssetDispatcher, Experience},
    context::Context,
    pipelines::facet::{FacetParams, FacetResources, FacetVertex},
};

struct CubeMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

pub struct Facet {
    resources: Option<FacetResources>,
    cube: Option<CubeMesh>,
}

impl Facet {
    pub fn new() -> Self {
        Self {
            resources: None,
            cube: None,
        }
    }
}

impl Default for Facet {
    fn default() -> Self {
        Self::new()
    }
}

impl Experience for Facet {
    fn on_ready(&mut self, ctx: &mut Context, _assets: &AssetDispatcher) -> Result<()> {
        self.resources = Some(FacetResources::new(
            &ctx.device,
            &ctx.config,
            &ctx.camera.bind_group_layout,
            FacetParams {
                time: 0.0,
                _padding: [0.0; 3],
            },
        ));

        let (vertices, indices) = cube_geometry();
        let vertex_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Facet Cube Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Facet Cube Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.cube = Some(CubeMesh {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
        });
        Ok(())
    }

    fn tick(&mut self, _ctx: &Context, _elapsed: f32, _dt: Duration) {
        // The time uniform is written once at init and never advanced here.
    }

    fn render<'a, 'pass>(&'a self, ctx: &'a Context, render_pass: &'pass mut wgpu::RenderPass<'a>)
    where
        'a: 'pass,
    {
        let (Some(resources), Some(cube)) = (&self.resources, &self.cube) else {
            return;
        };
        render_pass.set_pipeline(&resources.pipeline);
        render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        render_pass.set_bind_group(1, &resources.params_bind_group, &[]);
        render_pass.set_vertex_buffer(0, cube.vertex_buffer.slice(..));
        render_pass.set_index_buffer(cube.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..cube.num_elements, 0, 0..1);
    }
}

/// A unit cube centered on the origin: 4 vertices per face so every face
/// keeps its own flat normal.
pub fn cube_geometry() -> (Vec<FacetVertex>, Vec<u32>) {
    // (normal, right, up) per face, with right x up = normal so the
    // triangles wind counter-clockwise seen from outside.
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, right, up) in FACES {
        let normal_v = Vector3::from(normal);
        let right_v = Vector3::from(right) * 0.5;
        let up_v = Vector3::from(up) * 0.5;
        let center = normal_v * 0.5;

        let base = vertices.len() as u32;
        for corner in [
            center - right_v - up_v,
            center + right_v - up_v,
            center + right_v + up_v,
            center - right_v + up_v,
        ] {
            vertices.push(FacetVertex {
                position: corner.into(),
                normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn cube_has_four_vertices_per_face() {
        let (vertices, indices) = cube_geometry();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
    }

    #[test]
    fn cube_vertices_sit_on_the_unit_cube() {
        let (vertices, _) = cube_geometry();
        for vertex in &vertices {
            for coordinate in vertex.position {
                assert!((coordinate.abs() - 0.5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn cube_normals_are_unit_and_axis_aligned() {
        let (vertices, _) = cube_geometry();
        for vertex in &vertices {
            let normal = Vector3::from(vertex.normal);
            assert!((normal.magnitude() - 1.0).abs() < 1e-6);
            let nonzero = vertex.normal.iter().filter(|c| **c != 0.0).count();
            assert_eq!(nonzero, 1);
        }
    }

    #[test]
    fn cube_indices_stay_in_range() {
        let (vertices, indices) = cube_geometry();
        assert!(indices.iter().all(|i| (*i as usize) < vertices.len()));
    }
}
