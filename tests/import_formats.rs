//! Model import integration tests: generate fixture assets, import,
//! verify the processed mesh lists.

mod fixtures;

use skin_portrait::import::import_model;
use skin_portrait::mesh::process;
use tempfile::tempdir;

#[test]
fn obj_cube_imports_and_processes() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cube.obj");
    fixtures::write_cube_obj(&path);

    let meshes = import_model(&path).expect("OBJ import failed");
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].name, "cube");
    assert_eq!(meshes[0].positions.len(), 8);
    // Six quads fan-triangulated.
    assert_eq!(meshes[0].indices.len(), 36);

    let processed = process(meshes.into_iter().next().unwrap()).unwrap();
    assert_eq!(processed.normals.len(), 8);
    assert_eq!(processed.texcoords.len(), 8);
}

#[test]
fn glb_triangle_imports_with_baked_transform() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("triangle.glb");
    fixtures::write_triangle_glb(&path);

    let meshes = import_model(&path).expect("GLB import failed");
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].name, "triangle");
    assert_eq!(meshes[0].positions.len(), 3);
    assert_eq!(meshes[0].indices, vec![0, 1, 2]);

    // The node's +10 Y translation is baked into world space.
    assert_eq!(meshes[0].positions[0][1], 10.0);
    assert_eq!(meshes[0].positions[2][1], 14.0);
}

#[test]
fn misnamed_extension_falls_back_to_content() {
    // OBJ text behind a .gltf extension: the hinted codec's probe
    // rejects it and the fallback chain lands on the OBJ parser.
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("actually_an_obj.gltf");
    fixtures::write_cube_obj(&path);

    let meshes = import_model(&path).expect("fallback import failed");
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].positions.len(), 8);
}

#[test]
fn corrupt_model_fails_after_every_codec() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("corrupt.glb");
    std::fs::write(&path, b"glTF but not really").unwrap();

    let err = import_model(&path).unwrap_err();
    let message = err.to_string();
    for codec in ["obj", "gltf", "glb"] {
        assert!(message.contains(codec), "missing {codec} in: {message}");
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let result = import_model(std::path::Path::new("/nonexistent/model.obj"));
    assert!(matches!(result, Err(skin_portrait::Error::Io(_))));
}
