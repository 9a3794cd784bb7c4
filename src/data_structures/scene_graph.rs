//! Named scene graph: the hierarchical scene container.
//!
//! Scene content is a tree of [`SceneNode`]s addressed by their authored
//! names, never by child position. Anything that edits or animates a loaded
//! model resolves nodes through [`Stage::find_mut`] and validates the names it
//! relies on up front via [`Stage::ensure_named`], so a re-exported asset with
//! reordered children either still works or fails loudly at load time.

use std::collections::HashSet;

use anyhow::{Result, bail};
use cgmath::{Euler, Quaternion, Rad, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::Instance,
    model::{DrawModel, MaterialFactors, Model},
};

/// A node's local transform with the rotation kept as Euler angles.
///
/// Euler form is what the parameter panel binds to (one slider per axis) and
/// what the rotor animation writes; it collapses to a quaternion-based
/// [`Instance`] when world transforms are resolved.
#[derive(Clone, Copy, Debug)]
pub struct NodeTransform {
    pub position: Vector3<f32>,
    pub rotation: Euler<Rad<f32>>,
    pub scale: Vector3<f32>,
}

impl NodeTransform {
    pub fn to_instance(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: Quaternion::from(self.rotation),
            scale: self.scale,
        }
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Euler::new(Rad(0.0), Rad(0.0), Rad(0.0)),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// One named node: an optional renderable model plus child nodes.
#[derive(Debug)]
pub struct SceneNode {
    pub name: String,
    pub transform: NodeTransform,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub children: Vec<SceneNode>,
    pub model: Option<Model>,
    instance_buffer: Option<wgpu::Buffer>,
    world: Instance,
}

impl SceneNode {
    /// A node without renderable content, used for grouping.
    pub fn container(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transform: NodeTransform::default(),
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
            model: None,
            instance_buffer: None,
            world: Instance::default(),
        }
    }

    /// A renderable node. Allocates the single-entry instance buffer that
    /// carries the node's world transform to the vertex stage.
    pub fn with_model(name: &str, model: Model, device: &wgpu::Device) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Instance Buffer", name)),
            contents: bytemuck::cast_slice(&[Instance::default().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            name: name.to_string(),
            transform: NodeTransform::default(),
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
            model: Some(model),
            instance_buffer: Some(instance_buffer),
            world: Instance::default(),
        }
    }

    /// Find a node by name in this subtree, including `self`.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(name))
    }

    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut SceneNode)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    fn collect_names(&self, out: &mut HashSet<String>) {
        out.insert(self.name.clone());
        for child in &self.children {
            child.collect_names(out);
        }
    }

    /// Verify that every required node name appears in this subtree, failing
    /// with a descriptive error naming what is missing. Run against a decoded
    /// model before any name-keyed edit or animation touches it.
    pub fn ensure_named(&self, required: &[&str]) -> Result<()> {
        let mut names = HashSet::new();
        self.collect_names(&mut names);
        check_required(&names, required)
    }

    /// Resolve world transforms for this subtree: `world = parent * local`.
    pub fn update_world_transforms(&mut self, parent: &Instance) {
        self.world = parent * &self.transform.to_instance();
        for child in &mut self.children {
            child.update_world_transforms(&self.world);
        }
    }

    pub fn world_transform(&self) -> &Instance {
        &self.world
    }

    /// Upload the resolved world transform and the current material factors.
    pub fn write_to_buffers(&self, queue: &wgpu::Queue) {
        if let Some(buffer) = &self.instance_buffer {
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[self.world.to_raw()]));
        }
        if let Some(model) = &self.model {
            for material in &model.materials {
                material.write_factors(queue);
            }
        }
        for child in &self.children {
            child.write_to_buffers(queue);
        }
    }

    pub fn draw<'a, 'pass>(
        &'a self,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'pass mut wgpu::RenderPass<'a>,
    ) where
        'a: 'pass,
    {
        if let (Some(model), Some(buffer)) = (&self.model, &self.instance_buffer) {
            render_pass.set_vertex_buffer(1, buffer.slice(..));
            render_pass.draw_model_instanced(model, 0..1, camera_bind_group, light_bind_group);
        }
        for child in &self.children {
            child.draw(camera_bind_group, light_bind_group, render_pass);
        }
    }

    /// Set shadow flags on every mesh-bearing node in this subtree.
    pub fn set_shadow_flags(&mut self, cast: bool, receive: bool) {
        self.visit_mut(&mut |node| {
            if node.model.is_some() {
                node.cast_shadow = cast;
                node.receive_shadow = receive;
            }
        });
    }

    pub fn metallic(&self) -> Option<f32> {
        self.model
            .as_ref()
            .and_then(|model| model.materials.first())
            .map(|material| material.factors.metallic)
    }

    pub fn set_metallic(&mut self, value: f32) {
        self.for_each_material(|factors| factors.metallic = value);
    }

    pub fn roughness(&self) -> Option<f32> {
        self.model
            .as_ref()
            .and_then(|model| model.materials.first())
            .map(|material| material.factors.roughness)
    }

    pub fn set_roughness(&mut self, value: f32) {
        self.for_each_material(|factors| factors.roughness = value);
    }

    pub fn base_color(&self) -> Option<[f32; 3]> {
        self.model
            .as_ref()
            .and_then(|model| model.materials.first())
            .map(|material| {
                let [r, g, b, _] = material.factors.base_color;
                [r, g, b]
            })
    }

    /// Override the base color, keeping the authored alpha.
    pub fn set_base_color(&mut self, rgb: [f32; 3]) {
        self.for_each_material(|factors| {
            factors.base_color[0] = rgb[0];
            factors.base_color[1] = rgb[1];
            factors.base_color[2] = rgb[2];
        });
    }

    pub fn emissive(&self) -> Option<[f32; 3]> {
        self.model
            .as_ref()
            .and_then(|model| model.materials.first())
            .map(|material| {
                let [r, g, b, _] = material.factors.emissive;
                [r, g, b]
            })
    }

    pub fn set_emissive(&mut self, rgb: [f32; 3]) {
        self.for_each_material(|factors| {
            factors.emissive[0] = rgb[0];
            factors.emissive[1] = rgb[1];
            factors.emissive[2] = rgb[2];
        });
    }

    fn for_each_material(&mut self, mut edit: impl FnMut(&mut MaterialFactors)) {
        if let Some(model) = &mut self.model {
            for material in &mut model.materials {
                edit(&mut material.factors);
            }
        }
    }
}

/// The scene container: owns all renderable content for one experience.
#[derive(Debug, Default)]
pub struct Stage {
    roots: Vec<SceneNode>,
}

impl Stage {
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    pub fn add_root(&mut self, node: SceneNode) {
        self.roots.push(node);
    }

    pub fn roots(&self) -> &[SceneNode] {
        &self.roots
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.roots.iter().find_map(|root| root.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.roots.iter_mut().find_map(|root| root.find_mut(name))
    }

    pub fn update_world_transforms(&mut self) {
        let identity = Instance::default();
        for root in &mut self.roots {
            root.update_world_transforms(&identity);
        }
    }

    pub fn write_to_buffers(&self, queue: &wgpu::Queue) {
        for root in &self.roots {
            root.write_to_buffers(queue);
        }
    }

    /// Verify that every required node name is present somewhere on the
    /// stage, failing with a descriptive error naming what is missing.
    pub fn ensure_named(&self, required: &[&str]) -> Result<()> {
        let mut names = HashSet::new();
        for root in &self.roots {
            root.collect_names(&mut names);
        }
        check_required(&names, required)
    }

    /// Turn on shadow casting and receiving for every mesh in the scene.
    pub fn enable_shadows(&mut self) {
        for root in &mut self.roots {
            root.set_shadow_flags(true, true);
        }
    }
}

fn check_required(names: &HashSet<String>, required: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !names.contains(*name))
        .collect();
    if !missing.is_empty() {
        bail!(
            "scene is missing required nodes: {} (was the asset re-exported with different names?)",
            missing.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SceneNode {
        let mut root = SceneNode::container("Root");
        let mut arm = SceneNode::container("Arm");
        arm.children.push(SceneNode::container("Hand"));
        root.children.push(arm);
        root.children.push(SceneNode::container("Leg"));
        root
    }

    #[test]
    fn finds_nested_nodes_by_name() {
        let root = tree();
        assert!(root.find("Hand").is_some());
        assert!(root.find("Leg").is_some());
        assert!(root.find("Foot").is_none());
    }

    #[test]
    fn ensure_named_reports_missing_nodes() {
        let mut stage = Stage::new();
        stage.add_root(tree());
        assert!(stage.ensure_named(&["Root", "Hand"]).is_ok());

        let err = stage
            .ensure_named(&["Hand", "Foot", "Tail"])
            .expect_err("missing nodes should fail");
        let message = err.to_string();
        assert!(message.contains("Foot"));
        assert!(message.contains("Tail"));
        assert!(!message.contains("Hand,"));
    }

    #[test]
    fn world_transforms_compose_down_the_tree() {
        let mut root = SceneNode::container("Root");
        root.transform.position = Vector3::new(1.0, 0.0, 0.0);
        root.transform.scale = Vector3::new(2.0, 2.0, 2.0);
        let mut child = SceneNode::container("Child");
        child.transform.position = Vector3::new(0.0, 1.0, 0.0);
        root.children.push(child);

        root.update_world_transforms(&Instance::default());
        let child_world = root.find("Child").unwrap().world_transform().clone();
        assert_eq!(child_world.position, Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(child_world.scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn euler_rotation_round_trips_through_instance() {
        let mut transform = NodeTransform::default();
        transform.rotation.z = Rad(0.75);
        let instance = transform.to_instance();
        let back = Euler::from(instance.rotation);
        assert!((back.z.0 - 0.75).abs() < 1e-5);
    }
}
