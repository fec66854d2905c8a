use crate::animatable::Animated;
use crate::transform::{to_affine, RepeaterTransform};
use glam::Mat3;
use kurbo::Affine;
use lottie_data::model::RepeaterShape;
use tracing::warn;

/// Upper bound on repeater copies and on offset steps.
pub const MAX_COPIES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    Above,
    Below,
}

/// Repeats the shapes that follow it in render order, each copy stepped by
/// the repeater transform and faded along the opacity ramp.
#[derive(Debug, Clone)]
pub struct Repeater {
    copies: Animated<f32>,
    offset: Animated<f32>,
    composite: Composite,
    transform: RepeaterTransform,
}

impl Repeater {
    pub fn new(data: &RepeaterShape) -> Self {
        let mut repeater = Self {
            copies: Animated::from_property(&data.c, |v| *v, 1.0),
            offset: Animated::from_property(&data.o, |v| *v, 0.0),
            composite: if data.m == 2 {
                Composite::Below
            } else {
                Composite::Above
            },
            transform: RepeaterTransform::new(&data.tr),
        };
        repeater.warn_if_clamped();
        repeater.transform.update_opacities(repeater.copies());
        repeater
    }

    fn warn_if_clamped(&self) {
        let requested = *self.copies.value();
        if requested >= (MAX_COPIES + 1) as f32 {
            warn!(requested, max = MAX_COPIES, "Repeater copies clamped");
        }
        if self.offset().abs() > MAX_COPIES as f32 {
            warn!(offset = self.offset(), max = MAX_COPIES, "Repeater offset clamped");
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.copies.update(frame);
        self.offset.update(frame);
        self.transform.update(frame);
        self.warn_if_clamped();
        let copies = self.copies();
        self.transform.update_opacities(copies);
    }

    /// Current copy count; fractional counts are truncated and the result is
    /// capped at [`MAX_COPIES`].
    pub fn copies(&self) -> usize {
        (self.copies.value().max(0.0) as usize).min(MAX_COPIES)
    }

    pub fn offset(&self) -> f32 {
        *self.offset.value()
    }

    pub fn composite(&self) -> Composite {
        self.composite
    }

    pub fn transform(&self) -> &RepeaterTransform {
        &self.transform
    }

    pub fn instance_opacity(&self, index: usize) -> f32 {
        self.transform.opacity_at(index)
    }

    /// The step transform composed `index + offset` times.
    pub fn instance_transform(&self, index: usize) -> Affine {
        let limit = MAX_COPIES as f32;
        let offset = self.offset().clamp(-limit, limit).round() as i64;
        let steps = (index.min(MAX_COPIES) as i64 + offset).clamp(-(MAX_COPIES as i64), MAX_COPIES as i64);
        let step = self.transform.step_matrix();
        let base = if steps < 0 { step.inverse() } else { step };
        let mut m = Mat3::IDENTITY;
        for _ in 0..steps.unsigned_abs() {
            m *= base;
        }
        to_affine(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use serde_json::json;

    fn repeater(value: serde_json::Value) -> Repeater {
        Repeater::new(&serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_opacity_ramp_across_interpolated_copies() {
        let mut r = repeater(json!({
            "c": { "a": 1, "k": [ { "t": 0, "s": [1] }, { "t": 4, "s": [5] } ] },
            "o": { "a": 0, "k": 0 },
            "tr": {
                "so": { "a": 0, "k": 0 },
                "eo": { "a": 0, "k": 100 }
            }
        }));
        r.update(2.0);
        assert_eq!(r.copies(), 3);
        let expected = [0.0, 0.333, 0.667];
        for (i, want) in expected.iter().enumerate() {
            assert!((r.instance_opacity(i) - want).abs() < 1e-3);
        }
        assert_eq!(r.transform().opacities().len(), 3);
    }

    #[test]
    fn test_fractional_copies_truncate() {
        let r = repeater(json!({ "c": { "a": 0, "k": 2.9 }, "tr": {} }));
        assert_eq!(r.copies(), 2);
        assert_eq!(r.composite(), Composite::Above);
    }

    #[test]
    fn test_instance_transform_steps() {
        let r = repeater(json!({
            "c": { "a": 0, "k": 3 },
            "o": { "a": 0, "k": 1 },
            "m": 2,
            "tr": { "p": { "a": 0, "k": [10, 0] } }
        }));
        assert_eq!(r.composite(), Composite::Below);
        // Offset 1 shifts every copy by one extra step.
        assert_eq!(r.instance_transform(0) * Point::ZERO, Point::new(10.0, 0.0));
        assert_eq!(r.instance_transform(2) * Point::ZERO, Point::new(30.0, 0.0));
    }

    #[test]
    fn test_negative_offset_steps_backwards() {
        let r = repeater(json!({
            "c": { "a": 0, "k": 2 },
            "o": { "a": 0, "k": -1 },
            "tr": { "p": { "a": 0, "k": [10, 0] } }
        }));
        let p = r.instance_transform(0) * Point::ZERO;
        assert!((p.x + 10.0).abs() < 1e-4 && p.y.abs() < 1e-4);
    }

    #[test]
    fn test_huge_copies_and_offset_are_capped() {
        let r = repeater(json!({
            "c": { "a": 0, "k": 1.0e9 },
            "o": { "a": 0, "k": -1.0e12 },
            "tr": { "p": { "a": 0, "k": [1, 0] } }
        }));
        assert_eq!(r.copies(), MAX_COPIES);
        assert_eq!(r.transform().opacities().len(), MAX_COPIES);
        let p = r.instance_transform(0) * Point::ZERO;
        assert!((p.x + MAX_COPIES as f64).abs() < 1e-2);
    }
}
