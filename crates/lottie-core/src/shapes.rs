use crate::animatable::Animated;
use crate::geometry;
use crate::transform::vec2;
use crate::trim::TrimWindow;
use glam::Vec2;
use kurbo::BezPath;
use lottie_data::model::{self as data, BezierPath, Value};

/// Evaluated path of a shape node together with the trim applied to it.
#[derive(Debug, Clone, Default)]
pub struct ShapePath {
    direction: u8,
    path: BezPath,
    applied_trim: Option<TrimWindow>,
}

impl ShapePath {
    fn new(direction_code: u8) -> Self {
        Self {
            direction: u8::from(direction_code != 0),
            ..Default::default()
        }
    }

    fn set(&mut self, path: BezPath) {
        self.path = if self.direction != 0 {
            geometry::reverse_path(&path)
        } else {
            path
        };
    }

    pub(crate) fn apply_trim(&mut self, trim: Option<&TrimWindow>) {
        self.applied_trim = trim.cloned();
        if let Some(trim) = trim {
            if !trim.simultaneous() {
                self.path = trim.trim(&self.path);
            }
        }
    }

    /// 0 for the document's natural winding, 1 when reversed.
    pub fn direction(&self) -> u8 {
        self.direction
    }

    pub fn path(&self) -> &BezPath {
        &self.path
    }

    pub fn applied_trim(&self) -> Option<&TrimWindow> {
        self.applied_trim.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct Rect {
    position: Animated<Vec2>,
    size: Animated<Vec2>,
    roundness: Animated<f32>,
    shape: ShapePath,
}

impl Rect {
    pub fn new(data: &data::RectShape) -> Self {
        let mut rect = Self {
            position: Animated::from_property(&data.p, vec2, Vec2::ZERO),
            size: Animated::from_property(&data.s, vec2, Vec2::ZERO),
            roundness: Animated::from_property(&data.r, |v| *v, 0.0),
            shape: ShapePath::new(data.d),
        };
        rect.rebuild();
        rect
    }

    pub fn update(&mut self, frame: f32) {
        self.position.update(frame);
        self.size.update(frame);
        self.roundness.update(frame);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.shape.set(geometry::rect_path(
            self.position(),
            self.size(),
            self.roundness(),
        ));
    }

    pub fn position(&self) -> Vec2 {
        *self.position.value()
    }

    pub fn size(&self) -> Vec2 {
        *self.size.value()
    }

    pub fn roundness(&self) -> f32 {
        *self.roundness.value()
    }

    pub fn shape(&self) -> &ShapePath {
        &self.shape
    }

    pub(crate) fn shape_mut(&mut self) -> &mut ShapePath {
        &mut self.shape
    }
}

#[derive(Debug, Clone)]
pub struct Ellipse {
    position: Animated<Vec2>,
    size: Animated<Vec2>,
    shape: ShapePath,
}

impl Ellipse {
    pub fn new(data: &data::EllipseShape) -> Self {
        let mut ellipse = Self {
            position: Animated::from_property(&data.p, vec2, Vec2::ZERO),
            size: Animated::from_property(&data.s, vec2, Vec2::ZERO),
            shape: ShapePath::new(data.d),
        };
        ellipse.rebuild();
        ellipse
    }

    pub fn update(&mut self, frame: f32) {
        self.position.update(frame);
        self.size.update(frame);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.shape
            .set(geometry::ellipse_path(self.position(), self.size()));
    }

    pub fn position(&self) -> Vec2 {
        *self.position.value()
    }

    pub fn size(&self) -> Vec2 {
        *self.size.value()
    }

    pub fn shape(&self) -> &ShapePath {
        &self.shape
    }

    pub(crate) fn shape_mut(&mut self) -> &mut ShapePath {
        &mut self.shape
    }
}

#[derive(Debug, Clone)]
pub struct Round {
    position: Animated<Vec2>,
    radius: Animated<f32>,
    shape: ShapePath,
}

impl Round {
    pub fn new(data: &data::RoundShape) -> Self {
        let mut round = Self {
            position: Animated::from_property(&data.p, vec2, Vec2::ZERO),
            radius: Animated::from_property(&data.r, |v| *v, 0.0),
            shape: ShapePath::new(data.d),
        };
        round.rebuild();
        round
    }

    pub fn update(&mut self, frame: f32) {
        self.position.update(frame);
        self.radius.update(frame);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.shape
            .set(geometry::round_path(self.position(), self.radius()));
    }

    pub fn position(&self) -> Vec2 {
        *self.position.value()
    }

    pub fn radius(&self) -> f32 {
        *self.radius.value()
    }

    pub fn shape(&self) -> &ShapePath {
        &self.shape
    }

    pub(crate) fn shape_mut(&mut self) -> &mut ShapePath {
        &mut self.shape
    }
}

#[derive(Debug, Clone)]
pub struct FreeForm {
    vertices: Animated<BezierPath>,
    shape: ShapePath,
}

impl FreeForm {
    pub fn new(data: &data::PathShape) -> Self {
        let mut prop = data.ks.clone();
        hold_terminal_keyframe(&mut prop.k);
        let mut free_form = Self {
            vertices: Animated::from_property(&prop, |v| v.clone(), BezierPath::default()),
            shape: ShapePath::new(data.d),
        };
        free_form.rebuild();
        free_form
    }

    pub fn update(&mut self, frame: f32) {
        if self.vertices.is_animated() {
            self.vertices.update(frame);
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.shape.set(geometry::free_form_path(self.vertices.value()));
    }

    pub fn vertices(&self) -> &BezierPath {
        self.vertices.value()
    }

    pub fn closed(&self) -> bool {
        self.vertices.value().c
    }

    pub fn shape(&self) -> &ShapePath {
        &self.shape
    }

    pub(crate) fn shape_mut(&mut self) -> &mut ShapePath {
        &mut self.shape
    }
}

/// Keyframed vertex lists written as start/end pairs end with a keyframe that
/// has no end value. That terminal shape is held with zero tangents and no
/// closing segment.
fn hold_terminal_keyframe(value: &mut Value<BezierPath>) {
    let Value::Animated(keyframes) = value else {
        return;
    };
    let uses_end_values = keyframes.iter().any(|kf| kf.e.is_some());
    let previous_end = keyframes
        .iter()
        .rev()
        .skip(1)
        .find_map(|kf| kf.e.clone());
    let Some(last) = keyframes.last_mut() else {
        return;
    };
    if !uses_end_values || last.e.is_some() {
        return;
    }

    let Some(mut terminal) = last.s.clone().or(previous_end) else {
        return;
    };
    for t in terminal.i.iter_mut().chain(terminal.o.iter_mut()) {
        *t = [0.0, 0.0];
    }
    terminal.c = false;
    last.s = Some(terminal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrimMode;
    use kurbo::{PathEl, Point};
    use serde_json::json;

    fn first_point(path: &BezPath) -> Point {
        match path.elements().first() {
            Some(PathEl::MoveTo(p)) => *p,
            other => panic!("Expected a move, got {:?}", other),
        }
    }

    #[test]
    fn test_rect_first_point() {
        let rect = Rect::new(
            &serde_json::from_value(json!({
                "p": { "a": 0, "k": [50, 50] },
                "s": { "a": 0, "k": [30, 30] },
                "r": { "a": 0, "k": 0 }
            }))
            .unwrap(),
        );
        assert_eq!(first_point(rect.shape().path()), Point::new(35.0, 35.0));
        assert_eq!(rect.shape().direction(), 0);
    }

    #[test]
    fn test_nonzero_direction_reverses() {
        let vertices = json!({ "c": false, "v": [[0, 0], [10, 0], [10, 10]], "i": [], "o": [] });
        for code in [1, 3] {
            let reversed = FreeForm::new(
                &serde_json::from_value(json!({ "ks": { "a": 0, "k": vertices }, "d": code })).unwrap(),
            );
            assert_eq!(reversed.shape().direction(), 1);
            assert_eq!(first_point(reversed.shape().path()), Point::new(10.0, 10.0));
        }

        let normal = FreeForm::new(
            &serde_json::from_value(json!({ "ks": { "a": 0, "k": vertices }, "d": 0 })).unwrap(),
        );
        assert_eq!(normal.shape().direction(), 0);
        assert_eq!(first_point(normal.shape().path()), Point::new(0.0, 0.0));

        let omitted = FreeForm::new(&serde_json::from_value(json!({ "ks": { "a": 0, "k": vertices } })).unwrap());
        assert_eq!(omitted.shape().direction(), 0);
    }

    #[test]
    fn test_individual_trim_cuts_own_path() {
        let mut rect = Rect::new(
            &serde_json::from_value(json!({
                "p": { "a": 0, "k": [5, 5] },
                "s": { "a": 0, "k": [10, 10] }
            }))
            .unwrap(),
        );
        let trim = TrimWindow::new("Trim", 0.0, 25.0, 0.0, TrimMode::Individual);
        rect.shape_mut().apply_trim(Some(&trim));
        assert_eq!(rect.shape().path().elements().len(), 2);
        assert_eq!(rect.shape().applied_trim(), Some(&trim));

        let mut other = rect.clone();
        other.update(0.0);
        let simultaneous = TrimWindow::new("Trim", 0.0, 25.0, 0.0, TrimMode::Simultaneous);
        other.shape_mut().apply_trim(Some(&simultaneous));
        // Simultaneous trims are left to the renderer.
        assert_eq!(other.shape().path().elements().len(), 5);
    }

    #[test]
    fn test_terminal_keyframe_is_held_open() {
        let data = json!({
            "ks": { "a": 1, "k": [
                { "t": 0,
                  "s": [{ "c": true, "v": [[0, 0], [10, 0], [10, 10]], "i": [[0, 0], [1, 1], [0, 0]], "o": [[0, 0], [1, 1], [0, 0]] }],
                  "e": [{ "c": true, "v": [[0, 0], [20, 0], [20, 20]], "i": [[0, 0], [2, 2], [0, 0]], "o": [[0, 0], [2, 2], [0, 0]] }] },
                { "t": 10 }
            ] }
        });
        let mut shape = FreeForm::new(&serde_json::from_value(data).unwrap());
        shape.update(10.0);
        let terminal = shape.vertices();
        assert_eq!(terminal.v, vec![[0.0, 0.0], [20.0, 0.0], [20.0, 20.0]]);
        assert!(terminal.i.iter().chain(terminal.o.iter()).all(|t| *t == [0.0, 0.0]));
        assert!(!shape.closed());

        shape.update(0.0);
        assert!(shape.closed());
    }
}
