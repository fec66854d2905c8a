use crate::animatable::Animated;
use crate::transform::vec2;
use glam::{Vec2, Vec4};
use lottie_data::model::{self as data, Color};

/// Normalizes a document color. Some exporters write 0..255 components.
pub(crate) fn color(c: &Color) -> Vec4 {
    let v = Vec4::from(c.0);
    if v.x > 1.0 || v.y > 1.0 || v.z > 1.0 {
        Vec4::new(v.x / 255.0, v.y / 255.0, v.z / 255.0, if v.w > 1.0 { v.w / 255.0 } else { v.w })
    } else {
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    fn from_code(code: Option<u8>) -> Self {
        match code {
            Some(2) => FillRule::EvenOdd,
            _ => FillRule::NonZero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Vec4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashPattern {
    pub array: Vec<f32>,
    pub offset: f32,
}

#[derive(Debug, Clone)]
pub struct Fill {
    color: Animated<Vec4>,
    opacity: Animated<f32>,
    fill_rule: FillRule,
}

impl Fill {
    pub fn new(data: &data::FillShape) -> Self {
        Self {
            color: Animated::from_property(&data.c, color, Vec4::new(0.0, 0.0, 0.0, 1.0)),
            opacity: Animated::from_property(&data.o, |v| *v, 100.0),
            fill_rule: FillRule::from_code(data.r),
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.color.update(frame);
        self.opacity.update(frame);
    }

    pub fn color(&self) -> Vec4 {
        *self.color.value()
    }

    pub fn opacity(&self) -> f32 {
        (*self.opacity.value() / 100.0).clamp(0.0, 1.0)
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }
}

#[derive(Debug, Clone)]
enum DashKind {
    Dash,
    Gap,
    Offset,
}

#[derive(Debug, Clone)]
pub struct Stroke {
    color: Animated<Vec4>,
    opacity: Animated<f32>,
    width: Animated<f32>,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f32,
    dashes: Vec<(DashKind, Animated<f32>)>,
}

impl Stroke {
    pub fn new(data: &data::StrokeShape) -> Self {
        let cap = match data.lc {
            2 => LineCap::Round,
            3 => LineCap::Square,
            _ => LineCap::Butt,
        };
        let join = match data.lj {
            2 => LineJoin::Round,
            3 => LineJoin::Bevel,
            _ => LineJoin::Miter,
        };
        let dashes = data
            .d
            .iter()
            .filter_map(|entry| {
                let kind = match entry.n.as_deref() {
                    Some("d") | Some("v") => DashKind::Dash,
                    Some("g") => DashKind::Gap,
                    Some("o") => DashKind::Offset,
                    _ => return None,
                };
                Some((kind, Animated::from_property(&entry.v, |v| *v, 0.0)))
            })
            .collect();
        Self {
            color: Animated::from_property(&data.c, color, Vec4::new(0.0, 0.0, 0.0, 1.0)),
            opacity: Animated::from_property(&data.o, |v| *v, 100.0),
            width: Animated::from_property(&data.w, |v| *v, 1.0),
            cap,
            join,
            miter_limit: data.ml.unwrap_or(4.0),
            dashes,
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.color.update(frame);
        self.opacity.update(frame);
        self.width.update(frame);
        for (_, v) in &mut self.dashes {
            v.update(frame);
        }
    }

    pub fn color(&self) -> Vec4 {
        *self.color.value()
    }

    pub fn opacity(&self) -> f32 {
        (*self.opacity.value() / 100.0).clamp(0.0, 1.0)
    }

    pub fn width(&self) -> f32 {
        *self.width.value()
    }

    pub fn cap(&self) -> LineCap {
        self.cap
    }

    pub fn join(&self) -> LineJoin {
        self.join
    }

    pub fn miter_limit(&self) -> f32 {
        self.miter_limit
    }

    /// Current dash pattern; odd-length patterns are repeated to even length
    /// and the offset is wrapped into one pattern period.
    pub fn dash_pattern(&self) -> Option<DashPattern> {
        let mut array = Vec::new();
        let mut offset = 0.0;
        for (kind, v) in &self.dashes {
            match kind {
                DashKind::Offset => offset = *v.value(),
                DashKind::Dash | DashKind::Gap => array.push(*v.value()),
            }
        }
        if array.is_empty() {
            return None;
        }
        if array.len() % 2 != 0 {
            let clone = array.clone();
            array.extend(clone);
        }
        let total: f32 = array.iter().sum();
        offset = if total > 0.0 { offset.rem_euclid(total) } else { 0.0 };
        Some(DashPattern { array, offset })
    }
}

#[derive(Debug, Clone)]
pub struct GradientFill {
    kind: GradientKind,
    start_point: Animated<Vec2>,
    end_point: Animated<Vec2>,
    highlight_length: Animated<f32>,
    highlight_angle: Animated<f32>,
    opacity: Animated<f32>,
    color_count: usize,
    raw_stops: Animated<Vec<f32>>,
    stops: Vec<GradientStop>,
    fill_rule: FillRule,
}

impl GradientFill {
    pub fn new(data: &data::GradientFillShape) -> Self {
        let raw_stops = Animated::from_property(&data.g.k, |v| v.clone(), Vec::new());
        let color_count = data.g.p as usize;
        let stops = parse_gradient_stops(raw_stops.value(), color_count);
        Self {
            kind: if data.t == 2 {
                GradientKind::Radial
            } else {
                GradientKind::Linear
            },
            start_point: Animated::from_property(&data.s, vec2, Vec2::ZERO),
            end_point: Animated::from_property(&data.e, vec2, Vec2::ZERO),
            highlight_length: Animated::from_property(&data.h, |v| *v, 0.0),
            highlight_angle: Animated::from_property(&data.a, |v| *v, 0.0),
            opacity: Animated::from_property(&data.o, |v| *v, 100.0),
            color_count,
            raw_stops,
            stops,
            fill_rule: FillRule::from_code(data.r),
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.start_point.update(frame);
        self.end_point.update(frame);
        self.highlight_length.update(frame);
        self.highlight_angle.update(frame);
        self.opacity.update(frame);
        if self.raw_stops.is_animated() {
            self.raw_stops.update(frame);
            self.stops = parse_gradient_stops(self.raw_stops.value(), self.color_count);
        }
    }

    pub fn kind(&self) -> GradientKind {
        self.kind
    }

    pub fn start_point(&self) -> Vec2 {
        *self.start_point.value()
    }

    pub fn end_point(&self) -> Vec2 {
        *self.end_point.value()
    }

    /// Highlight length in percent of the radius (radial gradients only).
    pub fn highlight_length(&self) -> f32 {
        *self.highlight_length.value()
    }

    pub fn highlight_angle(&self) -> f32 {
        *self.highlight_angle.value()
    }

    pub fn opacity(&self) -> f32 {
        (*self.opacity.value() / 100.0).clamp(0.0, 1.0)
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }
}

struct ColorStop {
    t: f32,
    r: f32,
    g: f32,
    b: f32,
}

struct AlphaStop {
    t: f32,
    a: f32,
}

/// Expands the flat `[t, r, g, b, ..., t, a, ...]` table into stops. Alpha
/// stops, when present, are merged by evaluating both ramps at every offset.
fn parse_gradient_stops(raw: &[f32], color_count: usize) -> Vec<GradientStop> {
    let color_data_len = (color_count * 4).min(raw.len());
    let color_stops: Vec<ColorStop> = raw[..color_data_len]
        .chunks_exact(4)
        .map(|c| ColorStop {
            t: c[0],
            r: c[1],
            g: c[2],
            b: c[3],
        })
        .collect();
    let alpha_stops: Vec<AlphaStop> = raw[color_data_len..]
        .chunks_exact(2)
        .map(|c| AlphaStop { t: c[0], a: c[1] })
        .collect();

    if alpha_stops.is_empty() {
        return color_stops
            .iter()
            .map(|c| GradientStop {
                offset: c.t,
                color: Vec4::new(c.r, c.g, c.b, 1.0),
            })
            .collect();
    }

    let mut offsets: Vec<f32> = color_stops
        .iter()
        .map(|c| c.t)
        .chain(alpha_stops.iter().map(|a| a.t))
        .collect();
    offsets.sort_by(|a, b| a.total_cmp(b));
    offsets.dedup();
    offsets
        .into_iter()
        .map(|t| {
            let (r, g, b) = interpolate_color(&color_stops, t);
            GradientStop {
                offset: t,
                color: Vec4::new(r, g, b, interpolate_alpha(&alpha_stops, t)),
            }
        })
        .collect()
}

fn ramp_position<T>(stops: &[T], t: f32, at: impl Fn(&T) -> f32) -> Option<(usize, f32)> {
    let first = stops.first()?;
    if t <= at(first) {
        return Some((0, 0.0));
    }
    for i in 0..stops.len() - 1 {
        let (t0, t1) = (at(&stops[i]), at(&stops[i + 1]));
        if t >= t0 && t <= t1 {
            let range = t1 - t0;
            let ratio = if range == 0.0 { 0.0 } else { (t - t0) / range };
            return Some((i, ratio));
        }
    }
    Some((stops.len() - 1, 0.0))
}

fn interpolate_color(stops: &[ColorStop], t: f32) -> (f32, f32, f32) {
    let Some((i, ratio)) = ramp_position(stops, t, |s| s.t) else {
        return (1.0, 1.0, 1.0);
    };
    let s1 = &stops[i];
    let s2 = stops.get(i + 1).unwrap_or(s1);
    (
        s1.r + (s2.r - s1.r) * ratio,
        s1.g + (s2.g - s1.g) * ratio,
        s1.b + (s2.b - s1.b) * ratio,
    )
}

fn interpolate_alpha(stops: &[AlphaStop], t: f32) -> f32 {
    let Some((i, ratio)) = ramp_position(stops, t, |s| s.t) else {
        return 1.0;
    };
    let s1 = &stops[i];
    let s2 = stops.get(i + 1).unwrap_or(s1);
    s1.a + (s2.a - s1.a) * ratio
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fill_color_reaches_end_keyframe() {
        let data: data::FillShape = serde_json::from_value(json!({
            "c": { "a": 1, "k": [
                { "t": 0, "s": [1, 0, 0, 1], "i": { "x": [0.833], "y": [0.833] }, "o": { "x": [0.167], "y": [0.167] } },
                { "t": 179, "s": [0, 1, 0, 1] }
            ] },
            "o": { "a": 0, "k": 100 }
        }))
        .unwrap();
        let mut fill = Fill::new(&data);
        fill.update(179.0);
        assert_eq!(fill.color(), Vec4::new(0.0, 1.0, 0.0, 1.0));
        fill.update(0.0);
        assert_eq!(fill.color(), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(fill.opacity(), 1.0);
    }

    #[test]
    fn test_byte_colors_are_normalized() {
        let c = color(&Color([255.0, 0.0, 51.0, 1.0]));
        assert_eq!(c, Vec4::new(1.0, 0.0, 0.2, 1.0));
    }

    #[test]
    fn test_stroke_style_codes() {
        let data: data::StrokeShape = serde_json::from_value(json!({
            "c": { "a": 0, "k": [0, 0, 0, 1] },
            "w": { "a": 0, "k": 3 },
            "o": { "a": 0, "k": 50 },
            "lc": 2, "lj": 3, "ml": 10,
            "d": [
                { "n": "d", "v": { "a": 0, "k": 10 } },
                { "n": "g", "v": { "a": 0, "k": 5 } },
                { "n": "o", "v": { "a": 0, "k": 20 } }
            ]
        }))
        .unwrap();
        let stroke = Stroke::new(&data);
        assert_eq!(stroke.cap(), LineCap::Round);
        assert_eq!(stroke.join(), LineJoin::Bevel);
        assert_eq!(stroke.miter_limit(), 10.0);
        assert_eq!(stroke.opacity(), 0.5);
        assert_eq!(
            stroke.dash_pattern(),
            Some(DashPattern {
                array: vec![10.0, 5.0],
                offset: 5.0
            })
        );
    }

    #[test]
    fn test_gradient_stops_with_alpha() {
        let stops = parse_gradient_stops(&[0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.5], 2);
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(stops[1].color, Vec4::new(0.0, 0.0, 1.0, 0.5));

        let stops = parse_gradient_stops(&[0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.0], 2);
        assert_eq!(stops.iter().map(|s| s.offset).collect::<Vec<_>>(), vec![0.0, 0.5, 1.0]);
        assert_eq!(stops[1].color, Vec4::new(0.5, 0.5, 0.5, 0.0));
    }

    #[test]
    fn test_radial_gradient_fill() {
        let data: data::GradientFillShape = serde_json::from_value(json!({
            "t": 2,
            "s": { "a": 0, "k": [0, 0] },
            "e": { "a": 0, "k": [50, 0] },
            "h": { "a": 0, "k": 25 },
            "o": { "a": 0, "k": 100 },
            "g": { "p": 2, "k": { "a": 0, "k": [0, 1, 1, 1, 1, 0, 0, 0] } },
            "r": 2
        }))
        .unwrap();
        let fill = GradientFill::new(&data);
        assert_eq!(fill.kind(), GradientKind::Radial);
        assert_eq!(fill.fill_rule(), FillRule::EvenOdd);
        assert_eq!(fill.highlight_length(), 25.0);
        assert_eq!(fill.end_point(), Vec2::new(50.0, 0.0));
        assert_eq!(fill.stops().len(), 2);
    }
}
