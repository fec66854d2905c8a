//! Arc-length path trimming and the trim node.

use crate::animatable::Animated;
use crate::config::{EngineConfig, TrimMode};
use kurbo::{BezPath, CubicBez, Line, ParamCurve, ParamCurveArclen, PathEl, PathSeg, Point, QuadBez};
use lottie_data::model::TrimShape;

const ARCLEN_ACCURACY: f64 = 1e-4;
const EPSILON: f64 = 1e-6;

/// Current window of a trim: start and end in percent of the path length,
/// offset in degrees (a full turn shifts the window once around the path).
#[derive(Debug, Clone, PartialEq)]
pub struct TrimWindow {
    pub name: String,
    pub start: f32,
    pub end: f32,
    pub offset: f32,
    pub mode: TrimMode,
}

impl TrimWindow {
    pub fn new(name: impl Into<String>, start: f32, end: f32, offset: f32, mode: TrimMode) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            offset,
            mode,
        }
    }

    pub fn simultaneous(&self) -> bool {
        self.mode == TrimMode::Simultaneous
    }

    pub fn offset_fraction(&self) -> f32 {
        self.offset / 360.0
    }

    /// Remaps this window into the sub-range of `window` and sums the
    /// offsets. Used when a group that already carries a trim meets a trim
    /// child of its own.
    pub fn remap_into(&self, window: &TrimWindow) -> TrimWindow {
        let span = window.end - window.start;
        TrimWindow {
            name: format!("{} & {}", self.name, window.name),
            start: window.start + self.start / 100.0 * span,
            end: window.start + self.end / 100.0 * span,
            offset: self.offset + window.offset,
            mode: self.mode,
        }
    }

    pub fn trim(&self, path: &BezPath) -> BezPath {
        trim_path(
            path,
            self.start as f64 / 100.0,
            self.end as f64 / 100.0,
            self.offset_fraction() as f64,
        )
    }

    /// Trims `paths` together, measuring the window over their combined
    /// length.
    pub fn trim_each(&self, paths: &[BezPath]) -> Vec<BezPath> {
        trim_paths(
            paths,
            self.start as f64 / 100.0,
            self.end as f64 / 100.0,
            self.offset_fraction() as f64,
        )
    }
}

/// The trim-path node: animated window parameters plus the fixed mode.
#[derive(Debug, Clone)]
pub struct Trim {
    start: Animated<f32>,
    end: Animated<f32>,
    offset: Animated<f32>,
    window: TrimWindow,
}

impl Trim {
    pub fn new(name: &str, data: &TrimShape, config: &EngineConfig) -> Self {
        let start = Animated::from_property(&data.s, |v| *v, 0.0);
        let end = Animated::from_property(&data.e, |v| *v, 100.0);
        let offset = Animated::from_property(&data.o, |v| *v, 0.0);
        let window = TrimWindow::new(
            name,
            *start.value(),
            *end.value(),
            *offset.value(),
            config.resolve_trim_mode(data.m),
        );
        Self {
            start,
            end,
            offset,
            window,
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.start.update(frame);
        self.end.update(frame);
        self.offset.update(frame);
        self.window.start = *self.start.value();
        self.window.end = *self.end.value();
        self.window.offset = *self.offset.value();
    }

    pub fn window(&self) -> &TrimWindow {
        &self.window
    }

    pub fn simultaneous(&self) -> bool {
        self.window.simultaneous()
    }
}

struct Measured {
    subpath: usize,
    seg: PathSeg,
    len: f64,
}

fn measure(path: &BezPath) -> Vec<Measured> {
    let mut out = Vec::new();
    let mut subpath = 0;
    let mut started = false;
    let mut origin = Point::ZERO;
    let mut last = Point::ZERO;

    let mut push = |subpath: usize, seg: PathSeg| {
        let len = seg.arclen(ARCLEN_ACCURACY);
        if len > EPSILON {
            out.push(Measured { subpath, seg, len });
        }
    };

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                if started {
                    subpath += 1;
                }
                started = true;
                origin = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                push(subpath, PathSeg::Line(Line::new(last, p)));
                last = p;
            }
            PathEl::QuadTo(p1, p2) => {
                push(subpath, PathSeg::Quad(QuadBez::new(last, p1, p2)));
                last = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                push(subpath, PathSeg::Cubic(CubicBez::new(last, p1, p2, p3)));
                last = p3;
            }
            PathEl::ClosePath => {
                if last != origin {
                    push(subpath, PathSeg::Line(Line::new(last, origin)));
                }
                last = origin;
            }
        }
    }
    out
}

fn append_seg(out: &mut BezPath, seg: PathSeg) {
    match seg {
        PathSeg::Line(l) => out.line_to(l.p1),
        PathSeg::Quad(q) => out.quad_to(q.p1, q.p2),
        PathSeg::Cubic(c) => out.curve_to(c.p1, c.p2, c.p3),
    }
}

/// Appends the part of the measured path between arc lengths `from` and `to`.
/// `cursor` remembers where the previous span ended so that a span continuing
/// on the same subpath is joined without a new move.
fn append_span(out: &mut BezPath, segments: &[Measured], from: f64, to: f64, cursor: &mut Option<(usize, Point)>) {
    let mut acc = 0.0;
    for m in segments {
        let seg_start = acc;
        let seg_end = acc + m.len;
        acc = seg_end;
        if seg_end <= from || seg_start >= to {
            continue;
        }

        let t0 = if from > seg_start {
            m.seg.inv_arclen(from - seg_start, ARCLEN_ACCURACY)
        } else {
            0.0
        };
        let t1 = if to < seg_end {
            m.seg.inv_arclen(to - seg_start, ARCLEN_ACCURACY)
        } else {
            1.0
        };
        if t1 - t0 <= 0.0 {
            continue;
        }

        let piece = if t0 <= 0.0 && t1 >= 1.0 {
            m.seg
        } else {
            m.seg.subsegment(t0..t1)
        };
        let start = piece.start();
        let joined = matches!(*cursor, Some((sub, p)) if sub == m.subpath && (p - start).hypot() < 1e-6);
        if !joined {
            out.move_to(start);
        }
        append_seg(out, piece);
        *cursor = Some((m.subpath, piece.end()));
    }
}

/// Cuts `path` to the arc-length window `[start, end]` (fractions of the
/// total length) rotated by `offset` (a fraction of a full turn).
///
/// Equal start and end give an empty path. A window that runs past the end
/// of the path wraps around and is emitted as two spans in one path.
pub fn trim_path(path: &BezPath, start: f64, end: f64, offset: f64) -> BezPath {
    trim_paths(std::slice::from_ref(path), start, end, offset)
        .pop()
        .unwrap_or_default()
}

/// Cuts `paths` as if they were one path laid end to end in slice order and
/// returns what survives of each, so every piece keeps its own paint.
pub fn trim_paths(paths: &[BezPath], start: f64, end: f64, offset: f64) -> Vec<BezPath> {
    let (mut s, mut e) = (start.clamp(0.0, 1.0), end.clamp(0.0, 1.0));
    if s > e {
        std::mem::swap(&mut s, &mut e);
    }
    if (e - s).abs() < EPSILON {
        return vec![BezPath::new(); paths.len()];
    }
    if s <= 0.0 && e >= 1.0 {
        return paths.to_vec();
    }

    let measured: Vec<Vec<Measured>> = paths.iter().map(measure).collect();
    let lengths: Vec<f64> = measured.iter().map(|m| m.iter().map(|seg| seg.len).sum()).collect();
    let total: f64 = lengths.iter().sum();
    if total <= EPSILON {
        return vec![BezPath::new(); paths.len()];
    }

    let shifted_start = (s + offset).rem_euclid(1.0);
    let shifted_end = shifted_start + (e - s);
    let spans = if shifted_end <= 1.0 {
        vec![(shifted_start * total, shifted_end * total)]
    } else {
        vec![(shifted_start * total, total), (0.0, (shifted_end - 1.0) * total)]
    };

    let mut base = 0.0;
    measured
        .iter()
        .zip(&lengths)
        .map(|(segments, len)| {
            let mut out = BezPath::new();
            let mut cursor = None;
            for &(from, to) in &spans {
                append_span(&mut out, segments, from - base, to - base, &mut cursor);
            }
            base += len;
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape as _;

    fn line(len: f64) -> BezPath {
        let mut p = BezPath::new();
        p.move_to((0.0, 0.0));
        p.line_to((len, 0.0));
        p
    }

    fn square() -> BezPath {
        // Perimeter 40, starting at the origin and running clockwise.
        let mut p = BezPath::new();
        p.move_to((0.0, 0.0));
        p.line_to((10.0, 0.0));
        p.line_to((10.0, 10.0));
        p.line_to((0.0, 10.0));
        p.close_path();
        p
    }

    fn points(path: &BezPath) -> Vec<(f64, f64)> {
        path.elements()
            .iter()
            .filter_map(|el| match *el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(((p.x * 1e6).round() / 1e6, (p.y * 1e6).round() / 1e6)),
                PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => Some((p.x, p.y)),
                PathEl::ClosePath => None,
            })
            .collect()
    }

    #[test]
    fn test_equal_start_and_end_is_empty() {
        assert!(trim_path(&square(), 0.3, 0.3, 0.0).elements().is_empty());
        assert!(trim_path(&square(), 0.0, 0.0, 0.25).elements().is_empty());
    }

    #[test]
    fn test_full_window_keeps_path() {
        assert_eq!(trim_path(&square(), 0.0, 1.0, 0.4), square());
    }

    #[test]
    fn test_splits_inside_segments() {
        let trimmed = trim_path(&line(100.0), 0.2, 0.8, 0.0);
        assert_eq!(points(&trimmed), vec![(20.0, 0.0), (80.0, 0.0)]);
    }

    #[test]
    fn test_window_across_vertices() {
        let trimmed = trim_path(&square(), 0.125, 0.375, 0.0);
        assert_eq!(points(&trimmed), vec![(5.0, 0.0), (10.0, 0.0), (10.0, 5.0)]);
    }

    #[test]
    fn test_offset_wraps_into_two_spans() {
        // Window 0..50% shifted by 75%: runs from 30 to 40 then 0 to 10.
        let trimmed = trim_path(&square(), 0.0, 0.5, 0.75);
        assert_eq!(
            points(&trimmed),
            vec![(0.0, 10.0), (0.0, 0.0), (10.0, 0.0)],
            "the second span continues the first without a gap"
        );
        let moves = trimmed
            .elements()
            .iter()
            .filter(|el| matches!(el, PathEl::MoveTo(_)))
            .count();
        assert_eq!(moves, 1);
    }

    #[test]
    fn test_open_path_wrap_starts_new_subpath() {
        let trimmed = trim_path(&line(100.0), 0.0, 0.2, 0.9);
        assert_eq!(points(&trimmed), vec![(90.0, 0.0), (100.0, 0.0), (0.0, 0.0), (10.0, 0.0)]);
    }

    #[test]
    fn test_curves_split_by_arc_length() {
        let mut curve = BezPath::new();
        curve.move_to((0.0, 0.0));
        curve.curve_to((0.0, 50.0), (100.0, 50.0), (100.0, 0.0));
        let half = trim_path(&curve, 0.0, 0.5, 0.0);
        let full_len = curve.perimeter(1e-6);
        let half_len = half.perimeter(1e-6);
        assert!((half_len - full_len / 2.0).abs() < 0.05, "{} vs {}", half_len, full_len);
        // Symmetric curve: the midpoint by length is the apex.
        let end = half.segments().last().unwrap().end();
        assert!((end.x - 50.0).abs() < 0.05);
    }

    #[test]
    fn test_paths_share_one_window() {
        let mut lower = BezPath::new();
        lower.move_to((0.0, 10.0));
        lower.line_to((100.0, 10.0));
        let pieces = trim_paths(&[line(100.0), lower, line(0.0)], 0.25, 0.75, 0.0);
        assert_eq!(pieces.len(), 3);
        assert_eq!(points(&pieces[0]), vec![(50.0, 0.0), (100.0, 0.0)]);
        assert_eq!(points(&pieces[1]), vec![(0.0, 10.0), (50.0, 10.0)]);
        assert!(pieces[2].elements().is_empty());

        let window = TrimWindow::new("Trim", 0.0, 100.0, 0.0, TrimMode::Simultaneous);
        assert_eq!(window.trim_each(&[square()]), vec![square()]);
    }

    #[test]
    fn test_default_mode_is_simultaneous() {
        let data: TrimShape = serde_json::from_value(serde_json::json!({
            "s": { "a": 0, "k": 20 },
            "e": { "a": 0, "k": 80 },
            "o": { "a": 0, "k": 0 }
        }))
        .unwrap();
        let trim = Trim::new("Trim", &data, &EngineConfig::default());
        assert!(trim.simultaneous());
        assert_eq!(trim.window().start, 20.0);
        assert_eq!(trim.window().end, 80.0);

        let forced = EngineConfig::default().with_trim_mode(Some(TrimMode::Individual));
        assert!(!Trim::new("Trim", &data, &forced).simultaneous());
    }

    #[test]
    fn test_remap_into_child_window() {
        let group = TrimWindow::new("Group", 20.0, 80.0, 30.0, TrimMode::Simultaneous);
        let child = TrimWindow::new("Child", 50.0, 100.0, 15.0, TrimMode::Individual);
        let effective = group.remap_into(&child);
        assert_eq!(effective.start, 60.0);
        assert_eq!(effective.end, 90.0);
        assert_eq!(effective.offset, 45.0);
        assert_eq!(effective.name, "Group & Child");
        assert!(effective.simultaneous());
    }
}
