//! GPU-free integration tests over the public scene and panel APIs.

use cgmath::{Rad, Vector3};
use vitrine::{
    data_structures::scene_graph::{SceneNode, Stage},
    experiences::showroom::{AssetPhase, REQUIRED_NODES, Showroom, spin_angle},
    panel::{ControlKind, ControlValue, Panel},
};

fn model_like_tree() -> SceneNode {
    let mut root = SceneNode::container("Scene");
    for name in REQUIRED_NODES {
        root.children.push(SceneNode::container(name));
    }
    root
}

#[test]
fn a_complete_export_passes_validation() {
    let mut stage = Stage::new();
    stage.add_root(model_like_tree());
    assert!(stage.ensure_named(&REQUIRED_NODES).is_ok());
}

#[test]
fn a_reordered_export_is_still_valid_but_a_renamed_one_is_not() {
    // Name-keyed lookups don't care about child order.
    let mut shuffled = SceneNode::container("Scene");
    for name in REQUIRED_NODES.iter().rev() {
        shuffled.children.push(SceneNode::container(name));
    }
    assert!(shuffled.ensure_named(&REQUIRED_NODES).is_ok());

    // A rename fails loudly and says which node vanished.
    let mut renamed = model_like_tree();
    renamed
        .find_mut("Dish")
        .expect("tree carries a Dish")
        .name = "Antenna".to_string();
    let err = renamed
        .ensure_named(&REQUIRED_NODES)
        .expect_err("renamed node must fail validation");
    assert!(err.to_string().contains("Dish"));
}

#[test]
fn transforms_resolve_through_nested_containers() {
    let mut stage = Stage::new();
    let mut root = SceneNode::container("Root");
    root.transform.scale = Vector3::new(0.5, 0.5, 0.5);
    let mut child = SceneNode::container("Child");
    child.transform.position = Vector3::new(4.0, 0.0, 0.0);
    root.children.push(child);
    stage.add_root(root);

    stage.update_world_transforms();
    let world = stage.find("Child").unwrap().world_transform().clone();
    assert_eq!(world.position, Vector3::new(2.0, 0.0, 0.0));
}

#[test]
fn panel_controls_drive_a_stage() {
    let mut stage = Stage::new();
    let mut node = SceneNode::container("Prop");
    node.transform.rotation.z = Rad(0.0);
    stage.add_root(node);

    let mut panel: Panel<Stage> = Panel::new();
    panel.slider(
        "spin",
        -3.14,
        3.14,
        0.01,
        |stage: &Stage| {
            stage
                .find("Prop")
                .map(|node| node.transform.rotation.z.0)
                .unwrap_or(0.0)
        },
        |stage, value| {
            if let Some(node) = stage.find_mut("Prop") {
                node.transform.rotation.z = Rad(value);
            }
        },
    );

    panel
        .set(&mut stage, "spin", ControlValue::Number(1.5))
        .unwrap();
    assert_eq!(stage.find("Prop").unwrap().transform.rotation.z.0, 1.5);

    let kinds: Vec<ControlKind> = panel.controls().map(|(_, kind)| kind).collect();
    assert_eq!(
        kinds,
        vec![ControlKind::Slider {
            min: -3.14,
            max: 3.14,
            step: 0.01
        }]
    );
}

#[test]
fn showroom_edits_apply_before_any_model_arrives() {
    let mut showroom = Showroom::new();
    assert_eq!(showroom.phase(), AssetPhase::Loading);

    // Light bindings work immediately; backdrop/model bindings no-op until
    // their nodes exist, without erroring.
    showroom
        .apply_control("lightZ", ControlValue::Number(-12.0))
        .unwrap();
    assert_eq!(showroom.world().lights.directional.position.z, -12.0);
    showroom
        .apply_control("positionY", ControlValue::Number(1.0))
        .unwrap();
}

#[test]
fn spin_matches_the_documented_rate() {
    for t in [0.0_f32, 0.5, 1.0, 10.0] {
        assert_eq!(spin_angle(t), 0.5 * t);
    }
}
