use glam::{Vec2, Vec4};
use lottie_data::model::{BezierPath, EasingHandle, Keyframe, Property, Value};
use std::sync::Arc;

pub trait Interpolatable: Sized + Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;

    fn lerp_spatial(&self, other: &Self, t: f32, _tan_out: Vec2, _tan_in: Vec2) -> Self {
        self.lerp(other, t)
    }
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }

    /// Point on the cubic running from `self` to `other`, with control points
    /// offset from each end by the keyframe's spatial tangents.
    fn lerp_spatial(&self, other: &Self, t: f32, tan_out: Vec2, tan_in: Vec2) -> Self {
        let p0 = *self;
        let p3 = *other;
        let p1 = p0 + tan_out;
        let p2 = p3 + tan_in;

        let one_minus_t = 1.0 - t;
        let one_minus_t_sq = one_minus_t * one_minus_t;
        let one_minus_t_cub = one_minus_t_sq * one_minus_t;

        let t_sq = t * t;
        let t_cub = t_sq * t;

        p0 * one_minus_t_cub
            + p1 * 3.0 * one_minus_t_sq * t
            + p2 * 3.0 * one_minus_t * t_sq
            + p3 * t_cub
    }
}

impl Interpolatable for Vec4 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec4::lerp(*self, *other, t)
    }
}

// Gradient stop tables
impl Interpolatable for Vec<f32> {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if self.len() != other.len() {
            return if t < 1.0 { self.clone() } else { other.clone() };
        }
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| a + (b - a) * t)
            .collect()
    }
}

impl Interpolatable for BezierPath {
    /// Vertex-wise blend when both shapes have the same topology, otherwise
    /// the start shape is held until the segment ends.
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let same_topology = self.v.len() == other.v.len()
            && self.i.len() == other.i.len()
            && self.o.len() == other.o.len();
        if !same_topology {
            return if t < 1.0 { self.clone() } else { other.clone() };
        }

        let blend = |a: &[[f32; 2]], b: &[[f32; 2]]| -> Vec<[f32; 2]> {
            a.iter()
                .zip(b.iter())
                .map(|(p, q)| [p[0] + (q[0] - p[0]) * t, p[1] + (q[1] - p[1]) * t])
                .collect()
        };

        BezierPath {
            c: if t < 1.0 { self.c } else { other.c },
            i: blend(&self.i, &other.i),
            o: blend(&self.o, &other.o),
            v: blend(&self.v, &other.v),
        }
    }
}

// Cubic Bezier Easing
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    // Handles on the diagonal describe the identity curve.
    if p1.x == p1.y && p2.x == p2.y {
        return x;
    }

    // Newton-Raphson
    let mut t = x;
    for _ in 0..8 {
        let one_minus_t = 1.0 - t;
        let x_est = 3.0 * one_minus_t * one_minus_t * t * p1.x
            + 3.0 * one_minus_t * t * t * p2.x
            + t * t * t;

        let err = x_est - x;
        if err.abs() < 1e-4 {
            break;
        }

        let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
            + 6.0 * one_minus_t * t * (p2.x - p1.x)
            + 3.0 * t * t * (1.0 - p2.x);

        if dx_dt.abs() < 1e-6 {
            break;
        }
        t = (t - err / dx_dt).clamp(0.0, 1.0);
    }

    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * p1.y + 3.0 * one_minus_t * t * t * p2.y + t * t * t
}

/// One span between two consecutive keyframes.
#[derive(Debug, Clone, PartialEq)]
pub struct EasingSegment<T> {
    pub start_frame: f32,
    pub end_frame: f32,
    pub start_value: T,
    pub end_value: T,
    /// First control point of the time curve (the start keyframe's `o`).
    pub ease_out: Vec2,
    /// Second control point of the time curve (the start keyframe's `i`).
    pub ease_in: Vec2,
    pub hold: bool,
    pub tan_out: Vec2,
    pub tan_in: Vec2,
}

impl<T: Interpolatable> EasingSegment<T> {
    fn value_at(&self, frame: f32, spatial: bool) -> T {
        if self.hold {
            return self.start_value.clone();
        }
        let duration = self.end_frame - self.start_frame;
        if frame >= self.end_frame || duration <= 0.0 {
            return self.end_value.clone();
        }

        let local_t = ((frame - self.start_frame) / duration).clamp(0.0, 1.0);
        let eased = solve_cubic_bezier(self.ease_out, self.ease_in, local_t);
        if spatial {
            self.start_value
                .lerp_spatial(&self.end_value, eased, self.tan_out, self.tan_in)
        } else {
            self.start_value.lerp(&self.end_value, eased)
        }
    }
}

/// A frame-evaluated attribute.
///
/// Keyframe segments live behind an `Arc`, so cloning an `Animated` (for a
/// frame snapshot) copies only the cached current value.
#[derive(Debug, Clone)]
pub struct Animated<T> {
    segments: Arc<[EasingSegment<T>]>,
    value: T,
    spatial: bool,
}

impl<T: Interpolatable + Default> Default for Animated<T> {
    fn default() -> Self {
        Self::constant(T::default())
    }
}

impl<T: Interpolatable> Animated<T> {
    pub fn constant(value: T) -> Self {
        Self {
            segments: Arc::from(Vec::new()),
            value,
            spatial: false,
        }
    }

    pub fn from_property<S>(prop: &Property<S>, convert: impl Fn(&S) -> T, default: T) -> Self {
        match &prop.k {
            Value::Default => Self::constant(default),
            Value::Static(v) => Self::constant(convert(v)),
            Value::Animated(keyframes) => Self::from_keyframes(keyframes, convert, default),
        }
    }

    pub fn from_keyframes<S>(keyframes: &[Keyframe<S>], convert: impl Fn(&S) -> T, default: T) -> Self {
        if keyframes.is_empty() {
            return Self::constant(default);
        }

        let mut segments = Vec::with_capacity(keyframes.len());
        for pair in keyframes.windows(2) {
            let (kf, next) = (&pair[0], &pair[1]);
            let start_value = kf
                .s
                .as_ref()
                .map(&convert)
                .or_else(|| segments.last().map(|s: &EasingSegment<T>| s.end_value.clone()))
                .unwrap_or_else(|| default.clone());
            let end_value = kf
                .e
                .as_ref()
                .or(next.s.as_ref())
                .map(&convert)
                .unwrap_or_else(|| start_value.clone());

            segments.push(EasingSegment {
                start_frame: kf.t,
                end_frame: next.t,
                start_value,
                end_value,
                ease_out: handle(kf.o, Vec2::ZERO),
                ease_in: handle(kf.i, Vec2::ONE),
                hold: kf.h,
                tan_out: tangent(kf.to.as_deref()),
                tan_in: tangent(kf.ti.as_deref()),
            });
        }

        // The last keyframe holds its value from its own frame onwards.
        let last = &keyframes[keyframes.len() - 1];
        let final_value = last
            .s
            .as_ref()
            .map(&convert)
            .or_else(|| segments.last().map(|s| s.end_value.clone()))
            .unwrap_or_else(|| default.clone());
        segments.push(EasingSegment {
            start_frame: last.t,
            end_frame: last.t,
            start_value: final_value.clone(),
            end_value: final_value,
            ease_out: Vec2::ZERO,
            ease_in: Vec2::ONE,
            hold: true,
            tan_out: Vec2::ZERO,
            tan_in: Vec2::ZERO,
        });

        let spatial = segments
            .iter()
            .any(|s| s.tan_out != Vec2::ZERO || s.tan_in != Vec2::ZERO);
        let value = segments[0].start_value.clone();
        Self {
            segments: segments.into(),
            value,
            spatial,
        }
    }

    pub fn is_animated(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial
    }

    pub fn segments(&self) -> &[EasingSegment<T>] {
        &self.segments
    }

    /// Last value computed by [`Animated::update`].
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Recomputes the cached value for `frame`. Static values never change.
    pub fn update(&mut self, frame: f32) {
        if self.is_animated() {
            self.value = self.value_at(frame);
        }
    }

    pub fn value_at(&self, frame: f32) -> T {
        let Some(first) = self.segments.first() else {
            return self.value.clone();
        };
        let idx = self.segments.partition_point(|s| s.start_frame <= frame);
        if idx == 0 {
            return first.start_value.clone();
        }
        self.segments[idx - 1].value_at(frame, self.spatial)
    }
}

fn handle(h: Option<EasingHandle>, default: Vec2) -> Vec2 {
    h.map_or(default, |h| Vec2::new(h.x, h.y))
}

fn tangent(t: Option<&[f32]>) -> Vec2 {
    match t {
        Some([x, y, ..]) => Vec2::new(*x, *y),
        _ => Vec2::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lottie_data::model::{Keyframe, Value};

    fn kf(t: f32, s: Option<f32>, e: Option<f32>) -> Keyframe<f32> {
        Keyframe {
            t,
            s,
            e,
            i: None,
            o: None,
            to: None,
            ti: None,
            h: false,
        }
    }

    fn animated(keyframes: Vec<Keyframe<f32>>) -> Animated<f32> {
        let prop = Property {
            a: 1,
            k: Value::Animated(keyframes),
            ..Default::default()
        };
        Animated::from_property(&prop, |v| *v, -1.0)
    }

    #[test]
    fn test_binary_search_lookup() {
        let prop = animated(vec![
            kf(0.0, Some(0.0), Some(10.0)),
            kf(10.0, Some(10.0), Some(20.0)),
            kf(20.0, Some(20.0), Some(30.0)),
        ]);

        assert_eq!(prop.value_at(0.0), 0.0);
        assert_eq!(prop.value_at(10.0), 10.0);
        // The last keyframe holds its own start value.
        assert_eq!(prop.value_at(20.0), 20.0);
        assert_eq!(prop.value_at(-5.0), 0.0);
        assert_eq!(prop.value_at(25.0), 20.0);
        assert!((prop.value_at(5.0) - 5.0).abs() < 1e-3);
        assert!((prop.value_at(15.0) - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_static_value_is_frame_independent() {
        let mut prop = Animated::from_property(&Property::fixed(42.0_f32), |v| *v, 0.0);
        for frame in [-100.0, 0.0, 17.0, 1e6] {
            prop.update(frame);
            assert_eq!(*prop.value(), 42.0);
            assert_eq!(prop.value_at(frame), 42.0);
        }
        assert!(!prop.is_animated());
    }

    #[test]
    fn test_linear_pair_is_strictly_between() {
        let prop = animated(vec![kf(10.0, Some(-5.0), None), kf(30.0, Some(25.0), None)]);
        assert_eq!(prop.value_at(10.0), -5.0);
        assert_eq!(prop.value_at(30.0), 25.0);
        for frame in 11..30 {
            let v = prop.value_at(frame as f32);
            assert!(v > -5.0 && v < 25.0, "frame {} gave {}", frame, v);
        }
    }

    #[test]
    fn test_hold_keyframe_steps() {
        let mut hold = kf(0.0, Some(1.0), Some(9.0));
        hold.h = true;
        let prop = animated(vec![hold, kf(10.0, Some(9.0), None)]);
        assert_eq!(prop.value_at(0.0), 1.0);
        assert_eq!(prop.value_at(9.99), 1.0);
        assert_eq!(prop.value_at(10.0), 9.0);
    }

    #[test]
    fn test_terminal_keyframe_without_start_value() {
        let prop = animated(vec![kf(0.0, Some(0.0), Some(50.0)), kf(10.0, None, None)]);
        assert_eq!(prop.value_at(10.0), 50.0);
        assert_eq!(prop.value_at(100.0), 50.0);
    }

    #[test]
    fn test_easing_uses_start_keyframe_handles() {
        let mut eased = kf(0.0, Some(0.0), Some(100.0));
        // Ease-in-out: slow at both ends.
        eased.o = Some(EasingHandle { x: 0.42, y: 0.0 });
        eased.i = Some(EasingHandle { x: 0.58, y: 1.0 });
        let prop = animated(vec![eased, kf(100.0, Some(100.0), None)]);

        assert!(prop.value_at(10.0) < 10.0);
        assert!((prop.value_at(50.0) - 50.0).abs() < 0.5);
        assert!(prop.value_at(90.0) > 90.0);
    }

    #[test]
    fn test_update_caches_value() {
        let mut prop = animated(vec![kf(0.0, Some(0.0), Some(10.0)), kf(10.0, Some(10.0), None)]);
        prop.update(10.0);
        assert_eq!(*prop.value(), 10.0);
        // Reading without updating keeps the last computed value.
        let _ = prop.value_at(0.0);
        assert_eq!(*prop.value(), 10.0);
    }

    #[test]
    fn test_clone_shares_keyframes() {
        let prop = animated(vec![kf(0.0, Some(0.0), Some(10.0)), kf(10.0, Some(10.0), None)]);
        let copy = prop.clone();
        assert!(std::ptr::eq(prop.segments().as_ptr(), copy.segments().as_ptr()));
    }

    #[test]
    fn test_bezier_path_blends_matching_topology() {
        let a = BezierPath {
            c: false,
            i: vec![[0.0, 0.0]; 2],
            o: vec![[0.0, 0.0]; 2],
            v: vec![[0.0, 0.0], [10.0, 0.0]],
        };
        let b = BezierPath {
            v: vec![[0.0, 10.0], [10.0, 10.0]],
            ..a.clone()
        };
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid.v, vec![[0.0, 5.0], [10.0, 5.0]]);

        let other = BezierPath {
            v: vec![[0.0, 0.0]],
            i: vec![[0.0, 0.0]],
            o: vec![[0.0, 0.0]],
            c: true,
        };
        assert_eq!(a.lerp(&other, 0.5), a);
        assert_eq!(a.lerp(&other, 1.0), other);
    }
}
