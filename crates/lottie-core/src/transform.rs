use crate::animatable::Animated;
use glam::{Mat3, Vec2, Vec3};
use kurbo::Affine;
use lottie_data::model::{self as data, PositionProperty};

pub(crate) fn vec2(v: &data::Vec3DefaultZero) -> Vec2 {
    Vec2::new(v.0[0], v.0[1])
}

pub(crate) fn to_affine(m: Mat3) -> Affine {
    let m = m.to_cols_array();
    Affine::new([
        m[0] as f64,
        m[1] as f64,
        m[3] as f64,
        m[4] as f64,
        m[6] as f64,
        m[7] as f64,
    ])
}

#[derive(Debug, Clone)]
enum Position {
    Unified(Animated<Vec2>),
    Split { x: Animated<f32>, y: Animated<f32> },
}

/// Anchor, position, scale, rotation and opacity of a layer or group.
#[derive(Debug, Clone)]
pub struct Transform {
    anchor: Animated<Vec2>,
    position: Position,
    scale: Animated<Vec2>,
    rotation: Animated<f32>,
    opacity: Animated<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(&data::Transform::default())
    }
}

impl Transform {
    pub fn new(ks: &data::Transform) -> Self {
        let position = match &ks.p {
            PositionProperty::Unified(p) => Position::Unified(Animated::from_property(p, vec2, Vec2::ZERO)),
            PositionProperty::Split { x, y } => Position::Split {
                x: Animated::from_property(x, |v| *v, 0.0),
                y: Animated::from_property(y, |v| *v, 0.0),
            },
        };
        Self {
            anchor: Animated::from_property(&ks.a, vec2, Vec2::ZERO),
            position,
            scale: Animated::from_property(&ks.s, |v| Vec2::new(v.0[0], v.0[1]), Vec2::splat(100.0)),
            rotation: Animated::from_property(&ks.r, |v| *v, 0.0),
            opacity: Animated::from_property(&ks.o, |v| *v, 100.0),
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.anchor.update(frame);
        match &mut self.position {
            Position::Unified(p) => p.update(frame),
            Position::Split { x, y } => {
                x.update(frame);
                y.update(frame);
            }
        }
        self.scale.update(frame);
        self.rotation.update(frame);
        self.opacity.update(frame);
    }

    pub fn anchor(&self) -> Vec2 {
        *self.anchor.value()
    }

    pub fn position(&self) -> Vec2 {
        match &self.position {
            Position::Unified(p) => *p.value(),
            Position::Split { x, y } => Vec2::new(*x.value(), *y.value()),
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self.position, Position::Split { .. })
    }

    /// Scale as a fraction (1.0 = 100%).
    pub fn scale(&self) -> Vec2 {
        *self.scale.value() / 100.0
    }

    /// Rotation in degrees.
    pub fn rotation(&self) -> f32 {
        *self.rotation.value()
    }

    /// Opacity as a fraction in 0..1.
    pub fn opacity(&self) -> f32 {
        (*self.opacity.value() / 100.0).clamp(0.0, 1.0)
    }

    fn local_matrix(&self, skew: Mat3) -> Mat3 {
        let mat_t = Mat3::from_translation(self.position());
        let mat_r = Mat3::from_rotation_z(self.rotation().to_radians());
        let mat_s = Mat3::from_scale(self.scale());
        let mat_a = Mat3::from_translation(-self.anchor());
        mat_t * mat_r * skew * mat_s * mat_a
    }

    pub fn matrix(&self) -> Affine {
        to_affine(self.local_matrix(Mat3::IDENTITY))
    }
}

/// Transform of a shape group, which additionally supports skew.
#[derive(Debug, Clone)]
pub struct ShapeTransform {
    transform: Transform,
    skew: Animated<f32>,
    skew_axis: Animated<f32>,
    shear_x: f32,
    shear_y: f32,
    shear_angle: f32,
}

impl ShapeTransform {
    pub fn new(ks: &data::Transform) -> Self {
        let mut t = Self {
            transform: Transform::new(ks),
            skew: Animated::from_property(&ks.sk, |v| *v, 0.0),
            skew_axis: Animated::from_property(&ks.sa, |v| *v, 0.0),
            shear_x: 1.0,
            shear_y: 0.0,
            shear_angle: 0.0,
        };
        t.derive_shear();
        t
    }

    pub fn update(&mut self, frame: f32) {
        self.transform.update(frame);
        self.skew.update(frame);
        self.skew_axis.update(frame);
        self.derive_shear();
    }

    fn derive_shear(&mut self) {
        let axis = self.skew_axis.value().to_radians();
        self.shear_x = axis.cos();
        self.shear_y = axis.sin();
        self.shear_angle = (-self.skew.value().to_radians()).tan();
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn skew(&self) -> f32 {
        *self.skew.value()
    }

    pub fn skew_axis(&self) -> f32 {
        *self.skew_axis.value()
    }

    pub fn shear_x(&self) -> f32 {
        self.shear_x
    }

    pub fn shear_y(&self) -> f32 {
        self.shear_y
    }

    pub fn shear_angle(&self) -> f32 {
        self.shear_angle
    }

    pub fn opacity(&self) -> f32 {
        self.transform.opacity()
    }

    /// `T(position) * R(rotation) * Skew * S(scale) * T(-anchor)`, where the
    /// skew shears along the skew axis.
    pub fn matrix(&self) -> Affine {
        let axis = self.skew_axis.value().to_radians();
        let shear = Mat3::from_cols(Vec3::X, Vec3::new(self.shear_angle, 1.0, 0.0), Vec3::Z);
        let skew = Mat3::from_rotation_z(axis) * shear * Mat3::from_rotation_z(-axis);
        to_affine(self.transform.local_matrix(skew))
    }
}

/// Per-copy transform of a repeater, with the opacity ramp across copies.
#[derive(Debug, Clone)]
pub struct RepeaterTransform {
    transform: Transform,
    start_opacity: Animated<f32>,
    end_opacity: Animated<f32>,
    opacities: Vec<f32>,
}

impl RepeaterTransform {
    pub fn new(tr: &data::RepeaterTransform) -> Self {
        Self {
            transform: Transform::new(&tr.t),
            start_opacity: Animated::from_property(&tr.so, |v| *v, 100.0),
            end_opacity: Animated::from_property(&tr.eo, |v| *v, 100.0),
            opacities: Vec::new(),
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.transform.update(frame);
        self.start_opacity.update(frame);
        self.end_opacity.update(frame);
    }

    /// Recomputes the per-instance opacity as a linear ramp from start to end
    /// opacity over `copies` instances, normalized to 0..1.
    pub fn update_opacities(&mut self, copies: usize) {
        let so = *self.start_opacity.value();
        let eo = *self.end_opacity.value();
        self.opacities.clear();
        self.opacities.extend((0..copies).map(|i| {
            let percent = so + (eo - so) * i as f32 / copies as f32;
            (percent / 100.0).clamp(0.0, 1.0)
        }));
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn start_opacity(&self) -> f32 {
        *self.start_opacity.value() / 100.0
    }

    pub fn end_opacity(&self) -> f32 {
        *self.end_opacity.value() / 100.0
    }

    pub fn opacities(&self) -> &[f32] {
        &self.opacities
    }

    pub fn opacity_at(&self, index: usize) -> f32 {
        self.opacities.get(index).copied().unwrap_or(0.0)
    }

    /// Transform applied between consecutive copies: translate by position
    /// and rotate/scale around the anchor.
    pub fn step_matrix(&self) -> Mat3 {
        let t = &self.transform;
        Mat3::from_translation(t.position())
            * Mat3::from_translation(t.anchor())
            * Mat3::from_rotation_z(t.rotation().to_radians())
            * Mat3::from_scale(t.scale())
            * Mat3::from_translation(-t.anchor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> data::Transform {
        serde_json::from_value(value).unwrap()
    }

    fn approx(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-4
    }

    #[test]
    fn test_scale_and_opacity_are_fractions() {
        let t = Transform::new(&parse(json!({
            "s": { "a": 0, "k": [50, 200, 100] },
            "o": { "a": 0, "k": 40 }
        })));
        assert_eq!(t.scale(), Vec2::new(0.5, 2.0));
        assert!((t.opacity() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_defaults_are_identity() {
        let t = Transform::default();
        assert_eq!(t.matrix(), Affine::IDENTITY);
        assert_eq!(t.opacity(), 1.0);
    }

    #[test]
    fn test_matrix_order() {
        let t = Transform::new(&parse(json!({
            "a": { "a": 0, "k": [10, 0] },
            "p": { "a": 0, "k": [100, 100] },
            "s": { "a": 0, "k": [200, 200] },
            "r": { "a": 0, "k": 90 }
        })));
        // The anchor lands on the position.
        assert!(approx(t.matrix() * Point::new(10.0, 0.0), Point::new(100.0, 100.0)));
        // One unit right of the anchor, scaled by 2 then rotated a quarter turn.
        assert!(approx(t.matrix() * Point::new(11.0, 0.0), Point::new(100.0, 102.0)));
    }

    #[test]
    fn test_split_position() {
        let mut t = Transform::new(&parse(json!({
            "p": {
                "s": true,
                "x": { "a": 1, "k": [ { "t": 0, "s": [0] }, { "t": 10, "s": [100] } ] },
                "y": { "a": 0, "k": 5 }
            }
        })));
        assert!(t.is_split());
        t.update(10.0);
        assert_eq!(t.position(), Vec2::new(100.0, 5.0));
    }

    #[test]
    fn test_shear_factors() {
        let t = ShapeTransform::new(&parse(json!({
            "sk": { "a": 0, "k": 45 },
            "sa": { "a": 0, "k": 90 }
        })));
        assert!(t.shear_x().abs() < 1e-6);
        assert!((t.shear_y() - 1.0).abs() < 1e-6);
        assert!((t.shear_angle() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_skew_along_x_axis() {
        let t = ShapeTransform::new(&parse(json!({
            "sk": { "a": 0, "k": -45 },
            "sa": { "a": 0, "k": 0 }
        })));
        // tan(45deg) = 1: x is shifted by y.
        assert!(approx(t.matrix() * Point::new(0.0, 10.0), Point::new(10.0, 10.0)));
        assert!(approx(t.matrix() * Point::new(10.0, 0.0), Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_opacity_ramp() {
        let tr: data::RepeaterTransform = serde_json::from_value(json!({
            "so": { "a": 0, "k": 0 },
            "eo": { "a": 0, "k": 100 }
        }))
        .unwrap();
        let mut rt = RepeaterTransform::new(&tr);
        rt.update(0.0);
        rt.update_opacities(3);
        let expected = [0.0, 1.0 / 3.0, 2.0 / 3.0];
        assert_eq!(rt.opacities().len(), 3);
        for (got, want) in rt.opacities().iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{} vs {}", got, want);
        }
        assert_eq!(rt.opacity_at(7), 0.0);
    }
}
