use rig_hierarchy::glam::{Quat, Vec3};
use rig_hierarchy::{
    ControlSettings, ControlValue, ElementType, ElementTypeFilter, RigHierarchy, Space,
    Transform, TransformKind,
};
use serde_json::json;

/// Spine with an arm, a space-switching null and an IK-style control parented to both.
fn build_rig() -> RigHierarchy {
    let mut rig = RigHierarchy::new();
    let hips = rig
        .add_bone("hips", None, Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)), Space::Local)
        .expect("add hips");
    let chest = rig
        .add_bone("chest", Some(hips), Transform::from_translation(Vec3::new(0.0, 0.5, 0.0)), Space::Local)
        .expect("add chest");
    let hand = rig
        .add_bone("hand", Some(chest), Transform::from_translation(Vec3::new(0.6, 0.0, 0.0)), Space::Local)
        .expect("add hand");
    let space = rig
        .add_null("hand_space", Some(hips), Transform::IDENTITY, Space::Local)
        .expect("add null");
    rig.add_parent(space, chest, 0.0, false).expect("link null");
    let control = rig
        .add_control(
            "hand_ctrl",
            Some(space),
            ControlSettings::default(),
            ControlValue::Transform(Transform::IDENTITY),
            Transform::from_translation(Vec3::new(0.6, 0.5, 0.0)),
            Transform::IDENTITY,
        )
        .expect("add control");
    rig.add_parent(control, hand, 0.0, true).expect("link control");
    rig.add_curve("grip", 0.0).expect("add curve");
    rig
}

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut initial = false;
    for arg in &args {
        match arg.as_str() {
            "--initial" => initial = true,
            other => positional.push(other.to_string()),
        }
    }
    let lean: f32 = positional
        .first()
        .cloned()
        .unwrap_or_else(|| "0.25".to_string())
        .parse()
        .unwrap_or(0.25);
    let blend: f32 = positional
        .get(1)
        .cloned()
        .unwrap_or_else(|| "0.5".to_string())
        .parse()
        .unwrap_or(0.5);

    let mut rig = build_rig();
    let chest = rig
        .get_index_by_name("chest", ElementType::Bone)
        .expect("chest");
    let space = rig
        .get_index_by_name("hand_space", ElementType::Null)
        .expect("null");
    let grip = rig
        .get_index_by_name("grip", ElementType::Curve)
        .expect("curve");

    let mut chest_pose = rig.get_transform(chest, TransformKind::CurrentLocal);
    chest_pose.rotation = Quat::from_rotation_z(lean);
    rig.set_transform(chest, chest_pose, TransformKind::CurrentLocal, true, false, false);
    rig.set_parent_weight(space, 1, blend, false, true);
    rig.set_curve_value(grip, blend, false, false);

    let pose = rig.get_pose(initial, ElementTypeFilter::ALL, &[]);
    let stats = rig.stats();
    let pose_json = pose.to_json_string().expect("serialize pose");
    let pose_value: serde_json::Value = serde_json::from_str(&pose_json).expect("reparse pose");

    let out = json!({
        "lean": lean,
        "blend": blend,
        "initial": initial,
        "stats": {
            "slotRecomputes": stats.slot_recomputes,
            "solverInvocations": stats.solver_invocations,
        },
        "pose": pose_value,
    });
    println!("{}", serde_json::to_string_pretty(&out).expect("serialize output"));
}
