use crate::config::TrimMode;
use crate::effects::FillEffect;
use crate::layer::{ImageRef, Layer};
use crate::modifiers::Repeater;
use crate::node::{Group, Node};
use crate::paint::{Fill, GradientFill, Stroke};
use crate::shapes::{Ellipse, FreeForm, Rect, Round};
use crate::transform::{ShapeTransform, Transform};
use crate::trim::TrimWindow;
use kurbo::BezPath;

/// How trims apply to the paths currently being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimmingState {
    #[default]
    Off,
    Simultaneous,
    Individual,
}

impl From<TrimMode> for TrimmingState {
    fn from(mode: TrimMode) -> Self {
        match mode {
            TrimMode::Simultaneous => TrimmingState::Simultaneous,
            TrimMode::Individual => TrimmingState::Individual,
        }
    }
}

/// Trimming state with its own save/restore stack, kept apart from the
/// backend's graphics state stack.
#[derive(Debug, Clone, Default)]
pub struct TrimStack {
    current: TrimmingState,
    saved: Vec<TrimmingState>,
}

impl TrimStack {
    pub fn current(&self) -> TrimmingState {
        self.current
    }

    pub fn set(&mut self, state: TrimmingState) {
        self.current = state;
    }

    pub fn save(&mut self) {
        self.saved.push(self.current);
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.current = state;
        }
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

/// Drawing backend driven by the scene traversal, one method per node kind.
///
/// Containers (layers and groups) are bracketed with `save_state` and
/// `restore_state`; leaves are dispatched inside their container's state so
/// that a group transform applies to every sibling that follows it.
pub trait Renderer {
    fn save_state(&mut self);
    fn restore_state(&mut self);

    fn trim_stack(&self) -> &TrimStack;
    fn trim_stack_mut(&mut self) -> &mut TrimStack;

    fn trimming_state(&self) -> TrimmingState {
        self.trim_stack().current()
    }

    fn set_trimming_state(&mut self, state: TrimmingState) {
        self.trim_stack_mut().set(state);
    }

    fn save_trimming_state(&mut self) {
        self.trim_stack_mut().save();
    }

    fn restore_trimming_state(&mut self) {
        self.trim_stack_mut().restore();
    }

    fn render_layer(&mut self, node: &Node, layer: &Layer);

    fn render_image_layer(&mut self, _node: &Node, _layer: &Layer, _image: &ImageRef) {}

    fn render_group(&mut self, _node: &Node, _group: &Group) {}

    fn render_transform(&mut self, node: &Node, transform: &Transform);

    /// Transform of a linked parent layer. Parenting inherits the matrix
    /// only, so backends that also apply opacity in `render_transform`
    /// should override this.
    fn render_parent_transform(&mut self, node: &Node, transform: &Transform) {
        self.render_transform(node, transform);
    }

    fn render_shape_transform(&mut self, node: &Node, transform: &ShapeTransform);
    fn render_rect(&mut self, node: &Node, rect: &Rect);
    fn render_ellipse(&mut self, node: &Node, ellipse: &Ellipse);
    fn render_round(&mut self, node: &Node, round: &Round);
    fn render_free_form(&mut self, node: &Node, free_form: &FreeForm);
    fn render_fill(&mut self, node: &Node, fill: &Fill);
    fn render_gradient_fill(&mut self, node: &Node, gradient: &GradientFill);
    fn render_stroke(&mut self, node: &Node, stroke: &Stroke);

    /// Called once after a container's children when the container owns a
    /// simultaneous trim.
    fn render_trim(&mut self, node: &Node, window: &TrimWindow);

    fn render_repeater(&mut self, node: &Node, repeater: &Repeater);

    fn render_fill_effect(&mut self, _node: &Node, _effect: &FillEffect) {}
}

/// One recorded protocol call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub method: &'static str,
    pub node: String,
    pub trimming: TrimmingState,
    pub path: Option<BezPath>,
}

/// Renderer that records every call it receives.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub calls: Vec<RenderCall>,
    trim_stack: TrimStack,
    depth: usize,
    max_depth: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, method: &'static str, node: &Node, path: Option<&BezPath>) {
        self.calls.push(RenderCall {
            method,
            node: node.name.clone(),
            trimming: self.trimming_state(),
            path: path.cloned(),
        });
    }

    /// Method names in call order, save/restore included.
    pub fn methods(&self) -> Vec<&'static str> {
        self.calls.iter().map(|c| c.method).collect()
    }

    /// Calls for the named node.
    pub fn calls_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RenderCall> + 'a {
        self.calls.iter().filter(move |c| c.node == name)
    }

    /// Current save depth; zero once every save has been restored.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Renderer for RecordingRenderer {
    fn save_state(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.calls.push(RenderCall {
            method: "save",
            node: String::new(),
            trimming: self.trimming_state(),
            path: None,
        });
    }

    fn restore_state(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.calls.push(RenderCall {
            method: "restore",
            node: String::new(),
            trimming: self.trimming_state(),
            path: None,
        });
    }

    fn trim_stack(&self) -> &TrimStack {
        &self.trim_stack
    }

    fn trim_stack_mut(&mut self) -> &mut TrimStack {
        &mut self.trim_stack
    }

    fn render_layer(&mut self, node: &Node, _layer: &Layer) {
        self.record("layer", node, None);
    }

    fn render_image_layer(&mut self, node: &Node, _layer: &Layer, _image: &ImageRef) {
        self.record("image_layer", node, None);
    }

    fn render_group(&mut self, node: &Node, _group: &Group) {
        self.record("group", node, None);
    }

    fn render_transform(&mut self, node: &Node, _transform: &Transform) {
        self.record("transform", node, None);
    }

    fn render_parent_transform(&mut self, node: &Node, _transform: &Transform) {
        self.record("parent_transform", node, None);
    }

    fn render_shape_transform(&mut self, node: &Node, _transform: &ShapeTransform) {
        self.record("shape_transform", node, None);
    }

    fn render_rect(&mut self, node: &Node, rect: &Rect) {
        self.record("rect", node, Some(rect.shape().path()));
    }

    fn render_ellipse(&mut self, node: &Node, ellipse: &Ellipse) {
        self.record("ellipse", node, Some(ellipse.shape().path()));
    }

    fn render_round(&mut self, node: &Node, round: &Round) {
        self.record("round", node, Some(round.shape().path()));
    }

    fn render_free_form(&mut self, node: &Node, free_form: &FreeForm) {
        self.record("free_form", node, Some(free_form.shape().path()));
    }

    fn render_fill(&mut self, node: &Node, _fill: &Fill) {
        self.record("fill", node, None);
    }

    fn render_gradient_fill(&mut self, node: &Node, _gradient: &GradientFill) {
        self.record("gradient_fill", node, None);
    }

    fn render_stroke(&mut self, node: &Node, _stroke: &Stroke) {
        self.record("stroke", node, None);
    }

    fn render_trim(&mut self, node: &Node, _window: &TrimWindow) {
        self.record("trim", node, None);
    }

    fn render_repeater(&mut self, node: &Node, _repeater: &Repeater) {
        self.record("repeater", node, None);
    }

    fn render_fill_effect(&mut self, node: &Node, _effect: &FillEffect) {
        self.record("fill_effect", node, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_stack_restores_saved_state() {
        let mut stack = TrimStack::default();
        assert_eq!(stack.current(), TrimmingState::Off);
        stack.save();
        stack.set(TrimmingState::Individual);
        stack.save();
        stack.set(TrimmingState::Simultaneous);
        assert_eq!(stack.depth(), 2);
        stack.restore();
        assert_eq!(stack.current(), TrimmingState::Individual);
        stack.restore();
        assert_eq!(stack.current(), TrimmingState::Off);
        // Unbalanced restores keep the current state.
        stack.restore();
        assert_eq!(stack.current(), TrimmingState::Off);
    }

    #[test]
    fn test_trimming_state_from_mode() {
        assert_eq!(TrimmingState::from(TrimMode::Simultaneous), TrimmingState::Simultaneous);
        assert_eq!(TrimmingState::from(TrimMode::Individual), TrimmingState::Individual);
    }
}
