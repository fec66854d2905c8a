use lottie_data::model::{LottieJson, NodeInfo, PathShape, Value};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;

#[test]
fn test_parse_loader_fixture() {
    let file = File::open("tests/loader.json").expect("Failed to open loader.json");
    let reader = BufReader::new(file);
    let lottie: LottieJson = serde_json::from_reader(reader).expect("Failed to parse loader.json");

    assert_eq!(lottie.fr, 30.0);
    assert_eq!(lottie.layers.len(), 2);
    assert_eq!(lottie.assets.len(), 1);
    assert_eq!(lottie.assets[0].w, Some(64.0));
}

#[test]
fn test_fixture_free_form_path() {
    let file = File::open("tests/loader.json").expect("Failed to open loader.json");
    let lottie: LottieJson = serde_json::from_reader(BufReader::new(file)).unwrap();

    let shapes = lottie.layers[0]["shapes"].as_array().unwrap();
    let group_items = shapes[0]["it"].as_array().unwrap();
    let path_fragment = group_items
        .iter()
        .find(|item| item["ty"] == "sh")
        .expect("group should contain a path");

    let info = NodeInfo::deserialize(path_fragment).unwrap();
    assert_eq!(info.nm.as_deref(), Some("Path 1"));

    let path = PathShape::deserialize(path_fragment).unwrap();
    match path.ks.k {
        Value::Static(bezier) => {
            assert!(bezier.c);
            assert_eq!(bezier.v.len(), 4);
            assert_eq!(bezier.v[0], [0.0, -40.0]);
        }
        other => panic!("Expected static path, got {:?}", other),
    }
}
