//! The showroom: a lit, orbitable glTF model over a soft backdrop plane.
//!
//! Scene composition, the post-load edit tables, the per-frame rotor spin and
//! the parameter-panel bindings all live here. Everything that touches the
//! loaded model is keyed by authored node names; the required names are
//! validated once when the decode completes, before any edit is applied.

use std::f32::consts::PI;

use anyhow::Result;
use cgmath::{Euler, Rad, Vector3};
use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    app::{AssetDispatcher, Experience},
    context::Context,
    data_structures::{
        model::{Material, MaterialFactors, Mesh, Model, ModelVertex},
        scene_graph::{SceneNode, Stage},
        texture::Texture,
    },
    lights::LightRig,
    panel::Panel,
    resources::texture::material_layout,
};

pub const MODEL_PATH: &str = "models/showroom.glb";

/// Name given to the decoded model's root once it joins the stage.
pub const MODEL_ROOT: &str = "ModelRoot";
/// Name of the procedural backdrop plane.
pub const BACKDROP: &str = "Backdrop";

/// Radians of rotor rotation per elapsed second.
const SPIN_RATE: f32 = 0.5;

/// Rotor nodes spun about z every frame; the sign picks the direction.
const SPIN_TRACKS: [(&str, f32); 3] = [
    ("RotorHub", 1.0),
    ("RotorLeft", -1.0),
    ("RotorRight", -1.0),
];

/// Nodes whose metallic factor is overridden after load.
const METALLIC_OVERRIDES: [&str; 7] = [
    "Hull", "Chassis", "Canopy", "Dish", "Mast", "FinLeft", "FinRight",
];
const METALLIC_OVERRIDE: f32 = 0.2;

/// Nodes tinted after load. Overlaps with the metallic table on the fins;
/// the tables apply in order and the last write wins.
const TINT_OVERRIDES: [&str; 8] = [
    "Strut",
    "RotorHub",
    "PanelLeft",
    "PanelRight",
    "SkidLeft",
    "SkidRight",
    "FinLeft",
    "FinRight",
];
const TINT_COLOR: [f32; 3] = [0.2, 0.3, 1.0];

/// Every authored node the edit tables and the rotor animation rely on.
pub const REQUIRED_NODES: [&str; 15] = [
    "Hull",
    "Chassis",
    "Canopy",
    "Dish",
    "Mast",
    "FinLeft",
    "FinRight",
    "Strut",
    "RotorHub",
    "RotorLeft",
    "RotorRight",
    "PanelLeft",
    "PanelRight",
    "SkidLeft",
    "SkidRight",
];

/// Rotor angle for a given elapsed time.
pub fn spin_angle(elapsed: f32) -> f32 {
    SPIN_RATE * elapsed
}

/// The model decode lifecycle, checked every tick. Rendering never waits on
/// it; only the asset-dependent per-frame behavior does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AssetPhase {
    Loading,
    Ready,
    Failed,
}

/// The mutable scene world the panel bindings close over.
pub struct World {
    pub stage: Stage,
    pub lights: LightRig,
}

pub struct Showroom {
    world: World,
    panel: Panel<World>,
    phase: AssetPhase,
}

impl Showroom {
    pub fn new() -> Self {
        let mut panel = initial_panel();
        // Hidden by default; a widget layer can flip this.
        panel.hide();
        Self {
            world: World {
                stage: Stage::new(),
                lights: LightRig::default(),
            },
            panel,
            phase: AssetPhase::Loading,
        }
    }

    pub fn phase(&self) -> AssetPhase {
        self.phase
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn panel(&self) -> &Panel<World> {
        &self.panel
    }

    /// Route a control edit from the widget layer to its bound property.
    pub fn apply_control(
        &mut self,
        name: &str,
        value: crate::panel::ControlValue,
    ) -> Result<()> {
        self.panel.set(&mut self.world, name, value)
    }

    /// Fold the decoded model into the stage: fixed root transform, the
    /// name-keyed edit tables, shadow flags, and the post-load panel
    /// bindings. Fails without touching the stage when a required node is
    /// missing.
    fn adopt_model(&mut self, mut root: SceneNode) -> Result<()> {
        root.ensure_named(&REQUIRED_NODES)?;

        root.name = MODEL_ROOT.to_string();
        root.transform.scale = Vector3::new(0.125, 0.125, 0.125);
        root.transform.position = Vector3::new(0.438, -0.225, 0.0);
        root.transform.rotation = Euler::new(Rad(-0.334), Rad(0.207), Rad(0.207));
        root.set_shadow_flags(true, true);

        for name in METALLIC_OVERRIDES {
            if let Some(node) = root.find_mut(name) {
                node.set_metallic(METALLIC_OVERRIDE);
            }
        }
        for name in TINT_OVERRIDES {
            if let Some(node) = root.find_mut(name) {
                node.set_base_color(TINT_COLOR);
            }
        }
        if let Some(dish) = root.find_mut("Dish") {
            dish.transform.position.z = 3.69;
        }

        self.world.stage.add_root(root);
        self.world.stage.enable_shadows();
        register_model_bindings(&mut self.panel);
        self.phase = AssetPhase::Ready;
        Ok(())
    }

    fn note_asset_failure(&mut self, error: anyhow::Error) {
        log::error!(
            "model decode failed: {:?}; continuing with the bare stage",
            error
        );
        self.phase = AssetPhase::Failed;
    }

    /// Per-frame scene mutation. A no-op until the model is ready.
    fn animate(&mut self, elapsed: f32) {
        if self.phase != AssetPhase::Ready {
            return;
        }
        let Some(root) = self.world.stage.find_mut(MODEL_ROOT) else {
            return;
        };
        for (name, direction) in SPIN_TRACKS {
            if let Some(node) = root.find_mut(name) {
                node.transform.rotation.z = Rad(direction * spin_angle(elapsed));
            }
        }
    }

    #[cfg(test)]
    fn force_phase(&mut self, phase: AssetPhase) {
        self.phase = phase;
    }
}

impl Default for Showroom {
    fn default() -> Self {
        Self::new()
    }
}

impl Experience for Showroom {
    fn on_ready(&mut self, ctx: &mut Context, assets: &AssetDispatcher) -> Result<()> {
        let backdrop = build_backdrop(ctx);
        self.world.stage.add_root(backdrop);

        // The decode runs on its own lifecycle; rendering starts regardless.
        assets.load_model(MODEL_PATH, ctx.device.clone(), ctx.queue.clone());
        Ok(())
    }

    fn on_asset(&mut self, _ctx: &Context, result: Result<SceneNode>) {
        match result {
            Ok(root) => {
                if let Err(e) = self.adopt_model(root) {
                    self.note_asset_failure(e);
                } else {
                    log::info!("showroom model ready");
                }
            }
            Err(e) => self.note_asset_failure(e),
        }
    }

    fn tick(&mut self, ctx: &Context, elapsed: f32, _dt: Duration) {
        self.animate(elapsed);
        self.world.stage.update_world_transforms();
        self.world.stage.write_to_buffers(&ctx.queue);
        ctx.light.write(&ctx.queue, &self.world.lights);
    }

    fn render<'a, 'pass>(&'a self, ctx: &'a Context, render_pass: &'pass mut wgpu::RenderPass<'a>)
    where
        'a: 'pass,
    {
        render_pass.set_pipeline(&ctx.pipelines.basic);
        if let Some(root) = self.world.stage.find(MODEL_ROOT) {
            root.draw(&ctx.camera.bind_group, &ctx.light.bind_group, render_pass);
        }

        // Blended content renders after the opaque model.
        render_pass.set_pipeline(&ctx.pipelines.transparent);
        if let Some(backdrop) = self.world.stage.find(BACKDROP) {
            backdrop.draw(&ctx.camera.bind_group, &ctx.light.bind_group, render_pass);
        }
    }
}

/// The initial control set, bound before any model is loaded.
fn initial_panel() -> Panel<World> {
    let mut panel = Panel::new();

    panel.slider(
        "positionY",
        -15.0,
        15.0,
        0.01,
        |world: &World| {
            world
                .stage
                .find(BACKDROP)
                .map(|node| node.transform.position.y)
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut(BACKDROP) {
                node.transform.position.y = value;
            }
        },
    );
    panel.slider(
        "positionZ",
        -15.0,
        15.0,
        0.01,
        |world: &World| {
            world
                .stage
                .find(BACKDROP)
                .map(|node| node.transform.position.z)
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut(BACKDROP) {
                node.transform.position.z = value;
            }
        },
    );
    panel.slider(
        "rotationPlaneX",
        -PI,
        PI,
        0.01,
        |world: &World| {
            world
                .stage
                .find(BACKDROP)
                .map(|node| node.transform.rotation.x.0)
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut(BACKDROP) {
                node.transform.rotation.x = Rad(value);
            }
        },
    );
    panel.slider(
        "rotationPlaneY",
        -PI,
        PI,
        0.01,
        |world: &World| {
            world
                .stage
                .find(BACKDROP)
                .map(|node| node.transform.rotation.y.0)
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut(BACKDROP) {
                node.transform.rotation.y = Rad(value);
            }
        },
    );
    panel.slider(
        "lightX",
        -45.0,
        45.0,
        0.01,
        |world: &World| world.lights.directional.position.x,
        |world, value| world.lights.directional.position.x = value,
    );
    panel.slider(
        "lightY",
        -40.0,
        40.0,
        0.01,
        |world: &World| world.lights.directional.position.y,
        |world, value| world.lights.directional.position.y = value,
    );
    panel.slider(
        "lightZ",
        -40.0,
        40.0,
        0.01,
        |world: &World| world.lights.directional.position.z,
        |world, value| world.lights.directional.position.z = value,
    );
    panel.color(
        "color",
        |world: &World| {
            world
                .stage
                .find(BACKDROP)
                .and_then(|node| node.base_color())
                .unwrap_or([1.0; 3])
        },
        |world, rgb| {
            if let Some(node) = world.stage.find_mut(BACKDROP) {
                node.set_base_color(rgb);
            }
        },
    );
    panel.color(
        "colorEm",
        |world: &World| {
            world
                .stage
                .find(BACKDROP)
                .and_then(|node| node.emissive())
                .unwrap_or([0.0; 3])
        },
        |world, rgb| {
            if let Some(node) = world.stage.find_mut(BACKDROP) {
                node.set_emissive(rgb);
            }
        },
    );

    panel
}

/// Controls bound to decoded-node properties, registered once the model is in.
fn register_model_bindings(panel: &mut Panel<World>) {
    panel.slider(
        "metalness",
        0.0,
        1.0,
        0.001,
        |world: &World| {
            world
                .stage
                .find("Dish")
                .and_then(|node| node.metallic())
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut("Dish") {
                node.set_metallic(value);
            }
        },
    );
    panel.slider(
        "roughness",
        0.0,
        1.0,
        0.001,
        |world: &World| {
            world
                .stage
                .find("Dish")
                .and_then(|node| node.roughness())
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut("Dish") {
                node.set_roughness(value);
            }
        },
    );
    panel.slider(
        "rotationX",
        -PI,
        PI,
        0.001,
        |world: &World| {
            world
                .stage
                .find(MODEL_ROOT)
                .map(|node| node.transform.rotation.x.0)
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut(MODEL_ROOT) {
                node.transform.rotation.x = Rad(value);
            }
        },
    );
    panel.slider(
        "rotationY",
        -PI,
        PI,
        0.001,
        |world: &World| {
            world
                .stage
                .find(MODEL_ROOT)
                .map(|node| node.transform.rotation.y.0)
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut(MODEL_ROOT) {
                node.transform.rotation.y = Rad(value);
            }
        },
    );
    panel.slider(
        "rotationZ",
        -PI,
        PI,
        0.001,
        |world: &World| {
            world
                .stage
                .find(MODEL_ROOT)
                .map(|node| node.transform.rotation.z.0)
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut(MODEL_ROOT) {
                node.transform.rotation.z = Rad(value);
            }
        },
    );
    panel.slider(
        "meshPositionY",
        -5.0,
        5.0,
        0.001,
        |world: &World| {
            world
                .stage
                .find(MODEL_ROOT)
                .map(|node| node.transform.position.y)
                .unwrap_or(0.0)
        },
        |world, value| {
            if let Some(node) = world.stage.find_mut(MODEL_ROOT) {
                node.transform.position.y = value;
            }
        },
    );
}

/// The backdrop: a segmented plane sized to the viewport, tipped toward the
/// camera, with a soft transparent material.
fn build_backdrop(ctx: &Context) -> SceneNode {
    let factors = MaterialFactors {
        // #E8EDFF
        base_color: [232.0 / 255.0, 237.0 / 255.0, 1.0, 1.0],
        // #8c8fff
        emissive: [140.0 / 255.0, 143.0 / 255.0, 1.0, 1.0],
        metallic: 0.0,
        roughness: 1.0,
    };
    let model = plane_model(
        &ctx.device,
        &ctx.queue,
        ctx.config.width as f32,
        ctx.config.height as f32,
        100,
        factors,
    );

    let mut backdrop = SceneNode::with_model(BACKDROP, model, &ctx.device);
    backdrop.transform.rotation = Euler::new(Rad(-1.86), Rad(-0.204), Rad(0.0));
    backdrop.transform.position = Vector3::new(0.0, -0.44, -0.4);
    backdrop.receive_shadow = true;
    backdrop
}

/// Build a `width` x `height` plane in the xy plane with a segment grid.
fn plane_model(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: f32,
    height: f32,
    segments: u32,
    factors: MaterialFactors,
) -> Model {
    let side = segments + 1;
    let mut vertices = Vec::with_capacity((side * side) as usize);
    for j in 0..side {
        for i in 0..side {
            let u = i as f32 / segments as f32;
            let v = j as f32 / segments as f32;
            vertices.push(ModelVertex {
                position: [(u - 0.5) * width, (0.5 - v) * height, 0.0],
                tex_coords: [u, v],
                normal: [0.0, 0.0, 1.0],
                tangent: [1.0, 0.0, 0.0],
                bitangent: [0.0, 1.0, 0.0],
            });
        }
    }

    let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
    for j in 0..segments {
        for i in 0..segments {
            let a = j * side + i;
            let b = a + 1;
            let c = a + side;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Backdrop Vertex Buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Backdrop Index Buffer"),
        contents: bytemuck::cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    let material = Material::new(
        device,
        "backdrop material",
        Texture::create_solid_color([255, 255, 255, 255], device, queue),
        Texture::create_default_normal_map(2, 2, device, queue),
        factors,
        &material_layout(device),
    );

    Model {
        meshes: vec![Mesh {
            name: BACKDROP.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material: 0,
        }],
        materials: vec![material],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::ControlValue;

    #[test]
    fn spin_angle_is_half_the_elapsed_time() {
        assert_eq!(spin_angle(2.0), 1.0);
        assert_eq!(spin_angle(0.0), 0.0);
        assert_eq!(spin_angle(3.5), 1.75);
    }

    #[test]
    fn counter_rotating_rotors_are_negatives_of_each_other() {
        let mut showroom = Showroom::new();
        let mut root = SceneNode::container(MODEL_ROOT);
        for (name, _) in SPIN_TRACKS {
            root.children.push(SceneNode::container(name));
        }
        showroom.world.stage.add_root(root);
        showroom.force_phase(AssetPhase::Ready);

        let elapsed = 2.0;
        showroom.animate(elapsed);

        let stage = &showroom.world.stage;
        let hub = stage.find("RotorHub").unwrap().transform.rotation.z.0;
        let left = stage.find("RotorLeft").unwrap().transform.rotation.z.0;
        let right = stage.find("RotorRight").unwrap().transform.rotation.z.0;

        assert_eq!(hub, 0.5 * elapsed);
        assert_eq!(left, -0.5 * elapsed);
        assert_eq!(right, -0.5 * elapsed);
        assert_eq!(hub, -left);
        assert_eq!(left, right);
    }

    #[test]
    fn animation_is_a_no_op_while_loading_or_failed() {
        let mut showroom = Showroom::new();
        showroom.animate(1.0);
        assert_eq!(showroom.phase(), AssetPhase::Loading);

        showroom.note_asset_failure(anyhow::anyhow!("simulated decode failure"));
        assert_eq!(showroom.phase(), AssetPhase::Failed);
        // Still must not panic with no model in the stage.
        showroom.animate(2.0);
    }

    #[test]
    fn edit_tables_only_reference_required_nodes() {
        for name in METALLIC_OVERRIDES {
            assert!(REQUIRED_NODES.contains(&name), "{} not required", name);
        }
        for name in TINT_OVERRIDES {
            assert!(REQUIRED_NODES.contains(&name), "{} not required", name);
        }
        for (name, _) in SPIN_TRACKS {
            assert!(REQUIRED_NODES.contains(&name), "{} not required", name);
        }
    }

    #[test]
    fn adopting_a_model_with_missing_nodes_fails_and_keeps_the_stage_clean() {
        let mut showroom = Showroom::new();
        let root = SceneNode::container("WrongExport");
        assert!(showroom.adopt_model(root).is_err());
        assert!(showroom.world.stage.find(MODEL_ROOT).is_none());
        assert_eq!(showroom.phase(), AssetPhase::Loading);
    }

    #[test]
    fn panel_starts_hidden_with_the_initial_controls() {
        let showroom = Showroom::new();
        assert!(!showroom.panel().visible);
        let names: Vec<&str> = showroom.panel().controls().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                "positionY",
                "positionZ",
                "rotationPlaneX",
                "rotationPlaneY",
                "lightX",
                "lightY",
                "lightZ",
                "color",
                "colorEm",
            ]
        );
    }

    #[test]
    fn light_bindings_reach_the_rig() {
        let mut showroom = Showroom::new();
        showroom
            .apply_control("lightX", ControlValue::Number(10.0))
            .unwrap();
        assert_eq!(showroom.world().lights.directional.position.x, 10.0);

        // Clamped into the declared range.
        showroom
            .apply_control("lightY", ControlValue::Number(500.0))
            .unwrap();
        assert_eq!(showroom.world().lights.directional.position.y, 40.0);
    }

    #[test]
    fn model_bindings_appear_after_adoption() {
        let mut panel = initial_panel();
        let before = panel.len();
        register_model_bindings(&mut panel);
        let names: Vec<&str> = panel.controls().map(|(name, _)| name).collect();
        assert_eq!(panel.len(), before + 6);
        assert!(names.contains(&"metalness"));
        assert!(names.contains(&"roughness"));
        assert!(names.contains(&"rotationX"));
        assert!(names.contains(&"meshPositionY"));
    }
}
