use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "avatar_stage_gltf_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

const VRM1_RIG: &str = r#"{
  "asset": {"version": "2.0"},
  "extensionsUsed": ["VRMC_vrm"],
  "nodes": [
    {"name": "Root", "children": [1]},
    {"name": "J_Hips", "translation": [0.0, 0.9, 0.0], "children": [2]},
    {"name": "J_Spine", "translation": [0.0, 0.1, 0.0]}
  ],
  "extensions": {
    "VRMC_vrm": {"humanoid": {"humanBones": {"hips": {"node": 1}, "spine": {"node": 2}}}}
  }
}"#;

#[test]
fn rig_reads_hierarchy_and_vrm1_humanoid() {
    let dir = temp_dir("rig");
    let path = dir.join("avatar.gltf");
    std::fs::write(&path, VRM1_RIG).unwrap();

    let rig = import_rig(&path).unwrap();
    assert_eq!(rig.bones().len(), 3);
    assert_eq!(rig.bones()[2].parent, Some(1));
    assert_eq!(rig.humanoid_node_name("hips"), Some("J_Hips"));
    assert_eq!(rig.humanoid_node_name("spine"), Some("J_Spine"));
    assert!((rig.hip_height().unwrap() - 0.9).abs() < 1e-6);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn vrm0_humanoid_array_is_supported() {
    let json = br#"{"extensions":{"VRM":{"humanoid":{"humanBones":[
        {"bone":"hips","node":0},{"bone":"head","node":9}
    ]}}}}"#;
    let names = vec!["Hips".to_owned()];
    let table = vrm_humanoid(json, &names).unwrap();
    assert_eq!(table.get("hips").map(String::as_str), Some("Hips"));
    assert!(!table.contains_key("head"));
}

#[test]
fn duplicate_node_names_get_suffix() {
    let dir = temp_dir("dupes");
    let path = dir.join("dupes.gltf");
    std::fs::write(
        &path,
        r#"{"asset":{"version":"2.0"},"nodes":[{"name":"Bone"},{"name":"Bone"},{}]}"#,
    )
    .unwrap();
    let rig = import_rig(&path).unwrap();
    let names: Vec<&str> = rig.bones().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["Bone", "Bone#1", "node_2"]);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn clip_reads_first_animation_and_rest_translations() {
    let dir = temp_dir("clip");
    let mut bin = Vec::new();
    for v in [
        0.0f32, 1.0, // times
        0.0, 1.0, 0.0, 0.5, 1.2, 0.0, // hips translation
        0.0, 0.0, 0.0, 1.0, 0.0, 0.7071068, 0.0, 0.7071068, // spine rotation
    ] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    std::fs::write(dir.join("clip.bin"), &bin).unwrap();
    let gltf = r#"{
      "asset": {"version": "2.0"},
      "nodes": [
        {"name": "mixamorig:Hips", "translation": [0.0, 1.0, 0.0], "children": [1]},
        {"name": "mixamorig:Spine", "translation": [0.0, 0.1, 0.0]}
      ],
      "buffers": [{"byteLength": 64, "uri": "clip.bin"}],
      "bufferViews": [
        {"buffer": 0, "byteOffset": 0, "byteLength": 8},
        {"buffer": 0, "byteOffset": 8, "byteLength": 24},
        {"buffer": 0, "byteOffset": 32, "byteLength": 32}
      ],
      "accessors": [
        {"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0]},
        {"bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3"},
        {"bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC4"}
      ],
      "animations": [{
        "name": "wave",
        "channels": [
          {"sampler": 0, "target": {"node": 0, "path": "translation"}},
          {"sampler": 1, "target": {"node": 1, "path": "rotation"}}
        ],
        "samplers": [
          {"input": 0, "output": 1, "interpolation": "LINEAR"},
          {"input": 0, "output": 2, "interpolation": "LINEAR"}
        ]
      }]
    }"#;
    let path = dir.join("wave.gltf");
    std::fs::write(&path, gltf).unwrap();

    let source = import_clip(&path).unwrap();
    assert_eq!(source.clip.name, "wave");
    assert!((source.clip.duration - 1.0).abs() < 1e-6);
    assert_eq!(source.clip.tracks.len(), 2);
    let hips = source.clip.track("mixamorig:Hips", true).unwrap();
    assert_eq!(hips.times, vec![0.0, 1.0]);
    assert_eq!(
        source.skeleton.get("mixamorig:Hips"),
        Some(&Vec3::new(0.0, 1.0, 0.0))
    );
    assert!(source.clip.track("mixamorig:Spine", false).is_some());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn clip_without_animation_is_an_asset_error() {
    let dir = temp_dir("noanim");
    let path = dir.join("static.gltf");
    std::fs::write(&path, r#"{"asset":{"version":"2.0"},"nodes":[{"name":"a"}]}"#).unwrap();
    let err = import_clip(&path).unwrap_err();
    assert!(err.to_string().contains("no animations"));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn spline_keeps_middle_values() {
    assert_eq!(spline_values(vec![1, 2, 3, 4, 5, 6], true), vec![2, 5]);
    assert_eq!(spline_values(vec![1, 2], false), vec![1, 2]);
}
