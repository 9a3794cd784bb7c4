use std::io::{BufReader, Cursor};

use anyhow::Context as _;
use cgmath::{Euler, Quaternion};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::{self, MaterialFactors},
        scene_graph::{NodeTransform, SceneNode},
        texture::Texture,
    },
    resources::texture::{load_binary, load_texture, material_layout},
};

/**
 * This module contains all logic for loading models/textures from external files.
 */
pub mod texture;

/// Decoded per-material data, before it is materialized for a node.
///
/// Textures are shared across nodes (cheap reference clones); the factor
/// uniform is allocated fresh per node so live edits stay node-local.
struct MaterialTemplate {
    name: String,
    diffuse: Texture,
    normal: Texture,
    factors: MaterialFactors,
}

/// Decode a glTF file into a named scene-node tree.
///
/// External buffer and image URIs are resolved against the assets directory.
/// Node names come from the authored asset; unnamed nodes fall back to their
/// index so lookups stay stable within one export.
pub async fn load_gltf_scene(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<SceneNode> {
    let gltf_bytes = load_binary(file_name)
        .await
        .with_context(|| format!("failed to fetch model {}", file_name))?;
    let gltf_cursor = Cursor::new(gltf_bytes);
    let gltf_reader = BufReader::new(gltf_cursor);
    let gltf = gltf::Gltf::from_reader(gltf_reader)
        .with_context(|| format!("failed to decode model {}", file_name))?;

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.push(blob.into());
                };
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(uri)
                    .await
                    .with_context(|| format!("failed to fetch model buffer {}", uri))?;
                buffer_data.push(bin);
            }
        }
    }

    // Load materials
    let mut templates = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let emissive = material.emissive_factor();
        let factors = MaterialFactors {
            base_color: pbr.base_color_factor(),
            emissive: [emissive[0], emissive[1], emissive[2], 1.0],
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
        };

        let diffuse = match pbr.base_color_texture() {
            Some(info) => match info.texture().source().source() {
                gltf::image::Source::View { view, mime_type } => Texture::from_bytes(
                    device,
                    queue,
                    &buffer_data[view.buffer().index()],
                    file_name,
                    mime_type.split('/').next_back(),
                    false,
                )?,
                gltf::image::Source::Uri { uri, mime_type } => {
                    load_texture(
                        uri,
                        false,
                        device,
                        queue,
                        mime_type.and_then(|mt| mt.split('/').next_back()),
                    )
                    .await?
                }
            },
            // Solid base-color materials still get a (white) diffuse map so
            // every material binds the same way.
            None => Texture::create_solid_color([255, 255, 255, 255], device, queue),
        };

        let normal = if let Some(texture) = material.normal_texture() {
            match &texture.texture().source().source() {
                gltf::image::Source::View { view, mime_type: _ } => Texture::from_bytes(
                    device,
                    queue,
                    &buffer_data[view.buffer().index()],
                    file_name,
                    None,
                    true,
                )?,
                gltf::image::Source::Uri { uri, mime_type: _ } => {
                    load_texture(uri, true, device, queue, None).await?
                }
            }
        } else {
            Texture::create_default_normal_map(2, 2, device, queue)
        };

        templates.push(MaterialTemplate {
            name: material.name().unwrap_or("material").to_string(),
            diffuse,
            normal,
            factors,
        });
    }
    if templates.is_empty() {
        templates.push(MaterialTemplate {
            name: "default material".to_string(),
            diffuse: Texture::create_solid_color([255, 255, 255, 255], device, queue),
            normal: Texture::create_default_normal_map(2, 2, device, queue),
            factors: MaterialFactors::default(),
        });
    }

    let layout = material_layout(device);

    let mut roots = Vec::new();
    for scene in gltf.scenes() {
        for node in scene.nodes() {
            roots.push(to_scene_node(node, &buffer_data, device, &templates, &layout));
        }
    }

    let root = if roots.len() == 1 {
        roots.into_iter().next().unwrap()
    } else {
        let mut root = SceneNode::container(file_name);
        root.children = roots;
        root
    };

    Ok(root)
}

fn to_scene_node(
    node: gltf::scene::Node,
    buf: &Vec<Vec<u8>>,
    device: &wgpu::Device,
    templates: &Vec<MaterialTemplate>,
    layout: &wgpu::BindGroupLayout,
) -> SceneNode {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let mut scene_node = match node.mesh() {
        Some(mesh) => {
            let mut meshes = Vec::new();
            let primitives = mesh.primitives();

            primitives.for_each(|primitive| {
                let reader = primitive.reader(|buffer| Some(&buf[buffer.index()]));

                let mut vertices = Vec::new();
                if let Some(vertex_attribute) = reader.read_positions() {
                    vertex_attribute.for_each(|vertex| {
                        vertices.push(model::ModelVertex {
                            position: vertex,
                            tex_coords: Default::default(),
                            normal: Default::default(),
                            bitangent: Default::default(),
                            tangent: Default::default(),
                        })
                    });
                }
                if let Some(normal_attribute) = reader.read_normals() {
                    let mut normal_index = 0;
                    normal_attribute.for_each(|normal| {
                        vertices[normal_index].normal = normal;

                        normal_index += 1;
                    });
                }
                if let Some(tex_coord_attribute) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                    let mut tex_coord_index = 0;
                    tex_coord_attribute.for_each(|tex_coord| {
                        vertices[tex_coord_index].tex_coords = tex_coord;

                        tex_coord_index += 1;
                    });
                }
                if let Some(tangent_attribute) = reader.read_tangents() {
                    let mut tangent_index = 0;
                    tangent_attribute.for_each(|tangent| {
                        // GLTF represents tangents as vec4 where the 4th elem can be used to calculate the bitangent
                        let tangent: cgmath::Vector4<f32> = tangent.into();
                        vertices[tangent_index].tangent = tangent.truncate().into();
                        let normal: cgmath::Vector3<f32> = vertices[tangent_index].normal.into();
                        let bitangent = normal.cross(tangent.truncate()) * tangent[3];
                        vertices[tangent_index].bitangent = bitangent.into();

                        tangent_index += 1;
                    });
                };

                let mut indices = Vec::new();
                if let Some(indices_raw) = reader.read_indices() {
                    indices.append(&mut indices_raw.into_u32().collect::<Vec<u32>>());
                }
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Vertex Buffer", mesh.name())),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });

                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Index Buffer", mesh.name())),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                let mat_idx = primitive.material().index().unwrap_or(0);

                meshes.push(model::Mesh {
                    name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                    vertex_buffer,
                    index_buffer,
                    num_elements: indices.len() as u32,
                    material: mat_idx,
                });
            });

            let materials = templates
                .iter()
                .map(|template| {
                    model::Material::new(
                        device,
                        &template.name,
                        template.diffuse.clone(),
                        template.normal.clone(),
                        template.factors,
                        layout,
                    )
                })
                .collect();

            let model = model::Model { meshes, materials };
            SceneNode::with_model(&name, model, device)
        }
        None => SceneNode::container(&name),
    };

    let (translation, rotation, scale) = node.transform().decomposed();
    scene_node.transform = NodeTransform {
        position: translation.into(),
        rotation: Euler::from(Quaternion::from(rotation)),
        scale: scale.into(),
    };

    for child in node.children() {
        let child_node = to_scene_node(child, buf, device, templates, layout);
        scene_node.children.push(child_node);
    }

    scene_node
}
