use glam::Vec2;
use lottie_core::animatable::Animated;
use lottie_data::model::{Keyframe, Property, Value};

#[test]
fn test_spatial_bezier_interpolation() {
    // P0 = (0, 0), P3 = (100, 100)
    // Tangent out (from P0) = (50, 0)  -> P1 = (50, 0)
    // Tangent in (to P3)    = (0, -50) -> P2 = (100, 50)
    //
    // At t = 0.5 the Bernstein weights are 0.125, 0.375, 0.375, 0.125:
    // x = 0.375 * 50 + 0.375 * 100 + 0.125 * 100 = 68.75
    // y = 0.375 * 50 + 0.125 * 100 = 31.25

    let kf1 = Keyframe {
        t: 0.0,
        s: Some([0.0, 0.0]),
        e: Some([100.0, 100.0]),
        i: None,
        o: None,
        to: Some(vec![50.0, 0.0]),
        ti: Some(vec![0.0, -50.0]),
        h: false,
    };

    let kf2 = Keyframe {
        t: 10.0,
        s: Some([100.0, 100.0]),
        e: None,
        i: None,
        o: None,
        to: None,
        ti: None,
        h: false,
    };

    let prop = Property {
        a: 1,
        k: Value::Animated(vec![kf1, kf2]),
        ..Default::default()
    };

    let animated = Animated::from_property(&prop, |v| Vec2::from_slice(v), Vec2::ZERO);
    assert!(animated.is_spatial());

    // Frame 5.0 is exactly 50% between 0.0 and 10.0
    let result = animated.value_at(5.0);
    assert!((result.x - 68.75).abs() < 0.001, "X should be ~68.75, got {}", result.x);
    assert!((result.y - 31.25).abs() < 0.001, "Y should be ~31.25, got {}", result.y);

    // The end points are hit exactly.
    assert_eq!(animated.value_at(0.0), Vec2::ZERO);
    assert_eq!(animated.value_at(10.0), Vec2::new(100.0, 100.0));
}

#[test]
fn test_straight_motion_without_tangents() {
    let prop: Property<[f32; 2]> = serde_json::from_value(serde_json::json!({
        "a": 1,
        "k": [ { "t": 0, "s": [0, 0] }, { "t": 10, "s": [100, 50] } ]
    }))
    .unwrap();
    let animated = Animated::from_property(&prop, |v| Vec2::from_slice(v), Vec2::ZERO);
    assert!(!animated.is_spatial());
    let mid = animated.value_at(5.0);
    assert!((mid - Vec2::new(50.0, 25.0)).length() < 1e-3);
}
