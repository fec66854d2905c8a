//! Path builders for the primitive shape kinds.
//!
//! Angles follow the y-down screen convention used by the document format:
//! a point at angle `a` on an ellipse is `(cx + rx cos a, cy - ry sin a)`, so
//! 90 degrees is the top of the shape.

use glam::Vec2;
use kurbo::{BezPath, PathEl, Point, Vec2 as KVec2};
use lottie_data::model::BezierPath;

fn to_point(v: Vec2) -> Point {
    Point::new(v.x as f64, v.y as f64)
}

fn arc_point(center: Point, radii: KVec2, angle: f64) -> Point {
    Point::new(
        center.x + radii.x * angle.cos(),
        center.y - radii.y * angle.sin(),
    )
}

fn arc_derivative(radii: KVec2, angle: f64) -> KVec2 {
    KVec2::new(-radii.x * angle.sin(), -radii.y * angle.cos())
}

/// Appends an elliptical arc, split into cubic pieces of at most 90 degrees.
/// The path must already be positioned at the arc's start point.
fn arc_to(path: &mut BezPath, center: Point, radii: KVec2, start_deg: f64, sweep_deg: f64) {
    let pieces = (sweep_deg.abs() / 90.0).ceil().max(1.0) as usize;
    let step = (sweep_deg / pieces as f64).to_radians();
    let k = 4.0 / 3.0 * (step / 4.0).tan();

    let mut a0 = start_deg.to_radians();
    for _ in 0..pieces {
        let a1 = a0 + step;
        let p0 = arc_point(center, radii, a0);
        let p3 = arc_point(center, radii, a1);
        let c1 = p0 + arc_derivative(radii, a0) * k;
        let c2 = p3 - arc_derivative(radii, a1) * k;
        path.curve_to(c1, c2, p3);
        a0 = a1;
    }
}

/// Axis-aligned rectangle centered on `position`. A positive `roundness`
/// rounds every corner, clamped to half the shorter side.
pub fn rect_path(position: Vec2, size: Vec2, roundness: f32) -> BezPath {
    let size = size.abs();
    let top_left = position - size / 2.0;
    let (x, y) = (top_left.x as f64, top_left.y as f64);
    let (w, h) = (size.x as f64, size.y as f64);
    let r = (roundness as f64).clamp(0.0, w.min(h) / 2.0);

    let mut path = BezPath::new();
    if r <= 0.0 {
        path.move_to((x, y));
        path.line_to((x + w, y));
        path.line_to((x + w, y + h));
        path.line_to((x, y + h));
        path.close_path();
        return path;
    }

    let radii = KVec2::new(r, r);
    path.move_to((x, y + r));
    arc_to(&mut path, Point::new(x + r, y + r), radii, 180.0, -90.0);
    path.line_to((x + w - r, y));
    arc_to(&mut path, Point::new(x + w - r, y + r), radii, 90.0, -90.0);
    path.line_to((x + w, y + h - r));
    arc_to(&mut path, Point::new(x + w - r, y + h - r), radii, 0.0, -90.0);
    path.line_to((x + r, y + h));
    arc_to(&mut path, Point::new(x + r, y + h - r), radii, 270.0, -90.0);
    path.close_path();
    path
}

/// Ellipse inscribed in the `size` box around `position`, traced as two
/// half arcs starting at the top.
pub fn ellipse_path(position: Vec2, size: Vec2) -> BezPath {
    let center = to_point(position);
    let radii = KVec2::new((size.x / 2.0).abs() as f64, (size.y / 2.0).abs() as f64);

    let mut path = BezPath::new();
    path.move_to(arc_point(center, radii, 90f64.to_radians()));
    arc_to(&mut path, center, radii, 90.0, -180.0);
    arc_to(&mut path, center, radii, -90.0, -180.0);
    path
}

/// Full circle starting at the top, swept in the opposite sense from
/// [`ellipse_path`].
pub fn round_path(position: Vec2, radius: f32) -> BezPath {
    let center = to_point(position);
    let r = radius.abs() as f64;
    let radii = KVec2::new(r, r);

    let mut path = BezPath::new();
    path.move_to(arc_point(center, radii, 90f64.to_radians()));
    arc_to(&mut path, center, radii, 90.0, 360.0);
    path
}

/// Cubic path through the vertices of a free-form shape. Tangents are
/// relative to their vertex; a closed shape gets one more segment back to
/// the first vertex.
pub fn free_form_path(shape: &BezierPath) -> BezPath {
    let mut path = BezPath::new();
    let Some(first) = shape.v.first() else {
        return path;
    };

    let vertex = |i: usize| Vec2::from(shape.v[i]);
    let out_tangent = |i: usize| shape.o.get(i).copied().map_or(Vec2::ZERO, Vec2::from);
    let in_tangent = |i: usize| shape.i.get(i).copied().map_or(Vec2::ZERO, Vec2::from);
    let segment = |path: &mut BezPath, from: usize, to: usize| {
        path.curve_to(
            to_point(vertex(from) + out_tangent(from)),
            to_point(vertex(to) + in_tangent(to)),
            to_point(vertex(to)),
        );
    };

    path.move_to(to_point(Vec2::from(*first)));
    let n = shape.v.len();
    for i in 0..n.saturating_sub(1) {
        segment(&mut path, i, i + 1);
    }
    if shape.c && n > 1 {
        segment(&mut path, n - 1, 0);
    }
    path
}

/// Same subpaths traversed backwards. The set of points is unchanged; a
/// closed subpath gets its implicit closing edge made explicit first.
pub fn reverse_path(path: &BezPath) -> BezPath {
    let mut reversed = BezPath::new();
    let elements = path.elements();
    let mut start = 0;
    while start < elements.len() {
        let mut end = start + 1;
        while end < elements.len() && !matches!(elements[end], PathEl::MoveTo(_)) {
            end += 1;
        }
        reverse_subpath(&elements[start..end], &mut reversed);
        start = end;
    }
    reversed
}

fn reverse_subpath(elements: &[PathEl], out: &mut BezPath) {
    let origin = match elements.first() {
        Some(PathEl::MoveTo(p)) => *p,
        _ => return,
    };

    // (segment, point the segment starts from)
    let mut segments = Vec::with_capacity(elements.len());
    let mut current = origin;
    let mut closed = false;
    for el in &elements[1..] {
        match *el {
            PathEl::ClosePath => {
                if current != origin {
                    segments.push((PathEl::LineTo(origin), current));
                    current = origin;
                }
                closed = true;
            }
            PathEl::LineTo(p) | PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => {
                segments.push((*el, current));
                current = p;
            }
            PathEl::MoveTo(_) => {}
        }
    }

    out.move_to(current);
    for (el, from) in segments.iter().rev() {
        match *el {
            PathEl::LineTo(_) => out.line_to(*from),
            PathEl::QuadTo(c, _) => out.quad_to(c, *from),
            PathEl::CurveTo(c1, c2, _) => out.curve_to(c2, c1, *from),
            PathEl::MoveTo(_) | PathEl::ClosePath => {}
        }
    }
    if closed {
        out.close_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape as _;

    fn end_points(path: &BezPath) -> Vec<Point> {
        path.elements()
            .iter()
            .filter_map(|el| match *el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) | PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => Some(p),
                PathEl::ClosePath => None,
            })
            .collect()
    }

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-6
    }

    #[test]
    fn test_rect_starts_top_left() {
        let path = rect_path(Vec2::new(50.0, 50.0), Vec2::new(30.0, 30.0), 0.0);
        assert_eq!(end_points(&path)[0], Point::new(35.0, 35.0));
        let bbox = path.bounding_box();
        assert_eq!((bbox.x0, bbox.y0, bbox.x1, bbox.y1), (35.0, 35.0, 65.0, 65.0));
    }

    #[test]
    fn test_rounded_rect_clamps_radius() {
        let path = rect_path(Vec2::new(0.0, 0.0), Vec2::new(20.0, 10.0), 50.0);
        let bbox = path.bounding_box();
        assert!((bbox.x0 + 10.0).abs() < 1e-6 && (bbox.x1 - 10.0).abs() < 1e-6);
        assert!((bbox.y0 + 5.0).abs() < 1e-6 && (bbox.y1 - 5.0).abs() < 1e-6);
        // Radius clamped to 5: the path starts on the left edge, 5 below the top.
        assert!(close(end_points(&path)[0], Point::new(-10.0, 0.0)));
    }

    #[test]
    fn test_ellipse_and_round_start_at_top() {
        let ellipse = ellipse_path(Vec2::new(10.0, 20.0), Vec2::new(40.0, 20.0));
        let points = end_points(&ellipse);
        assert!(close(points[0], Point::new(10.0, 10.0)));
        assert!(close(*points.last().unwrap(), Point::new(10.0, 10.0)));
        // Second point is a quarter turn towards the right edge.
        assert!(close(points[1], Point::new(30.0, 20.0)));

        let round = round_path(Vec2::new(0.0, 0.0), 5.0);
        let points = end_points(&round);
        assert!(close(points[0], Point::new(0.0, -5.0)));
        // Opposite sense: the next point is on the left edge.
        assert!(close(points[1], Point::new(-5.0, 0.0)));
        assert!(close(*points.last().unwrap(), points[0]));
    }

    #[test]
    fn test_closed_free_form_returns_to_start() {
        let shape = BezierPath {
            c: true,
            v: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
            i: vec![[0.0, 0.0], [-2.0, 0.0], [0.0, -2.0]],
            o: vec![[2.0, 0.0], [0.0, 2.0], [0.0, 0.0]],
        };
        let path = free_form_path(&shape);
        let points = end_points(&path);
        assert_eq!(points.len(), 4);
        assert!(close(points[0], *points.last().unwrap()));
        match path.elements()[1] {
            PathEl::CurveTo(c1, c2, p) => {
                assert_eq!(c1, Point::new(2.0, 0.0));
                assert_eq!(c2, Point::new(8.0, 0.0));
                assert_eq!(p, Point::new(10.0, 0.0));
            }
            ref other => panic!("Expected cubic, got {:?}", other),
        }
    }

    #[test]
    fn test_open_free_form_has_no_closing_segment() {
        let shape = BezierPath {
            c: false,
            v: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
            i: vec![],
            o: vec![],
        };
        assert_eq!(end_points(&free_form_path(&shape)).len(), 3);
    }

    #[test]
    fn test_reverse_keeps_point_set() {
        let shape = BezierPath {
            c: false,
            v: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
            i: vec![[0.0, 0.0], [-3.0, 0.0], [0.0, -3.0]],
            o: vec![[3.0, 0.0], [0.0, 3.0], [0.0, 0.0]],
        };
        let forward = free_form_path(&shape);
        let backward = reverse_path(&forward);

        let mut expected = end_points(&forward);
        expected.reverse();
        assert_eq!(end_points(&backward), expected);

        // Control points swap roles on the way back.
        match backward.elements()[1] {
            PathEl::CurveTo(c1, c2, p) => {
                assert_eq!(c1, Point::new(10.0, 7.0));
                assert_eq!(c2, Point::new(10.0, 3.0));
                assert_eq!(p, Point::new(10.0, 0.0));
            }
            ref other => panic!("Expected cubic, got {:?}", other),
        }
    }

    #[test]
    fn test_reverse_closed_rect() {
        let forward = rect_path(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0), 0.0);
        let backward = reverse_path(&forward);
        assert_eq!(
            end_points(&backward),
            vec![
                Point::new(-1.0, -1.0),
                Point::new(-1.0, 1.0),
                Point::new(1.0, 1.0),
                Point::new(1.0, -1.0),
                Point::new(-1.0, -1.0),
            ]
        );
        assert_eq!(backward.elements().last(), Some(&PathEl::ClosePath));
    }
}
