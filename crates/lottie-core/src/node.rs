//! The scene tree: an arena of nodes addressed by [`NodeId`], with the
//! per-frame update pass and the renderer traversal.

use crate::effects::{FillEffect, SliderEffect};
use crate::layer::{Layer, LayerKind};
use crate::modifiers::Repeater;
use crate::paint::{Fill, GradientFill, Stroke};
use crate::renderer::{Renderer, TrimmingState};
use crate::shapes::{Ellipse, FreeForm, Rect, Round, ShapePath};
use crate::transform::ShapeTransform;
use crate::trim::{Trim, TrimWindow};
use kurbo::BezPath;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Layer,
    Group,
    ShapeTransform,
    Rect,
    Ellipse,
    Round,
    FreeForm,
    Fill,
    GradientFill,
    Stroke,
    Trim,
    Repeater,
    EffectGroup,
    Slider,
    FillEffect,
}

impl NodeType {
    /// Whether an enclosing trim applies to nodes of this type.
    pub fn accepts_trim(self) -> bool {
        matches!(
            self,
            NodeType::Rect | NodeType::Ellipse | NodeType::Round | NodeType::FreeForm | NodeType::Group
        )
    }
}

/// A shape group. `applied_trim` is the trim in effect for its children,
/// either declared inside the group or inherited from an enclosing one.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub(crate) applied_trim: Option<TrimWindow>,
    pub(crate) owns_trim: bool,
}

impl Group {
    pub fn applied_trim(&self) -> Option<&TrimWindow> {
        self.applied_trim.as_ref()
    }

    /// True when the applied trim comes from a trim child of this group.
    pub fn owns_trim(&self) -> bool {
        self.owns_trim
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root,
    Layer(Box<Layer>),
    Group(Group),
    ShapeTransform(Box<ShapeTransform>),
    Rect(Rect),
    Ellipse(Ellipse),
    Round(Round),
    FreeForm(FreeForm),
    Fill(Fill),
    GradientFill(Box<GradientFill>),
    Stroke(Stroke),
    Trim(Trim),
    Repeater(Box<Repeater>),
    EffectGroup,
    Slider(SliderEffect),
    FillEffect(FillEffect),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Root => NodeType::Root,
            NodeKind::Layer(_) => NodeType::Layer,
            NodeKind::Group(_) => NodeType::Group,
            NodeKind::ShapeTransform(_) => NodeType::ShapeTransform,
            NodeKind::Rect(_) => NodeType::Rect,
            NodeKind::Ellipse(_) => NodeType::Ellipse,
            NodeKind::Round(_) => NodeType::Round,
            NodeKind::FreeForm(_) => NodeType::FreeForm,
            NodeKind::Fill(_) => NodeType::Fill,
            NodeKind::GradientFill(_) => NodeType::GradientFill,
            NodeKind::Stroke(_) => NodeType::Stroke,
            NodeKind::Trim(_) => NodeType::Trim,
            NodeKind::Repeater(_) => NodeType::Repeater,
            NodeKind::EffectGroup => NodeType::EffectGroup,
            NodeKind::Slider(_) => NodeType::Slider,
            NodeKind::FillEffect(_) => NodeType::FillEffect,
        }
    }

    fn shape(&self) -> Option<&ShapePath> {
        match self {
            NodeKind::Rect(s) => Some(s.shape()),
            NodeKind::Ellipse(s) => Some(s.shape()),
            NodeKind::Round(s) => Some(s.shape()),
            NodeKind::FreeForm(s) => Some(s.shape()),
            _ => None,
        }
    }

    fn shape_mut(&mut self) -> Option<&mut ShapePath> {
        match self {
            NodeKind::Rect(s) => Some(s.shape_mut()),
            NodeKind::Ellipse(s) => Some(s.shape_mut()),
            NodeKind::Round(s) => Some(s.shape_mut()),
            NodeKind::FreeForm(s) => Some(s.shape_mut()),
            _ => None,
        }
    }

    fn update_leaf(&mut self, frame: f32) {
        match self {
            NodeKind::ShapeTransform(t) => t.update(frame),
            NodeKind::Rect(s) => s.update(frame),
            NodeKind::Ellipse(s) => s.update(frame),
            NodeKind::Round(s) => s.update(frame),
            NodeKind::FreeForm(s) => s.update(frame),
            NodeKind::Fill(p) => p.update(frame),
            NodeKind::GradientFill(p) => p.update(frame),
            NodeKind::Stroke(p) => p.update(frame),
            NodeKind::Trim(t) => t.update(frame),
            NodeKind::Repeater(r) => r.update(frame),
            NodeKind::Slider(e) => e.update(frame),
            NodeKind::FillEffect(e) => e.update(frame),
            NodeKind::Root | NodeKind::Layer(_) | NodeKind::Group(_) | NodeKind::EffectGroup => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub match_name: Option<String>,
    /// Hidden nodes and their subtrees are skipped by update and render.
    pub hidden: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            match_name: None,
            hidden: false,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn accepts_trim(&self) -> bool {
        self.node_type().accepts_trim()
    }

    /// Evaluated path of a shape node.
    pub fn path(&self) -> Option<&BezPath> {
        self.kind.shape().map(ShapePath::path)
    }

    pub fn shape(&self) -> Option<&ShapePath> {
        self.kind.shape()
    }

    pub fn as_layer(&self) -> Option<&Layer> {
        match &self.kind {
            NodeKind::Layer(layer) => Some(layer.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("", NodeKind::Root)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Adds a node owned by `parent` without listing it among the parent's
    /// children. Layer effects are attached this way.
    pub fn insert(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        id
    }

    /// Adds a node as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.insert(parent, node);
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.children = children;
        }
    }

    /// Depth-first search by display name, starting at (and including)
    /// `from`. Layer effects are searched before layer contents.
    pub fn find_child(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let node = self.get(from)?;
        if node.name == name {
            return Some(from);
        }
        if let NodeKind::Layer(layer) = &node.kind {
            if let Some(found) = layer.effects.iter().find_map(|&e| self.find_child(e, name)) {
                return Some(found);
            }
        }
        node.children.iter().find_map(|&c| self.find_child(c, name))
    }

    /// Top-level layer with the given document index.
    pub fn find_layer(&self, index: u32) -> Option<NodeId> {
        self.children(self.root()).iter().copied().find(|&id| {
            self.get(id)
                .and_then(Node::as_layer)
                .is_some_and(|l| l.index() == Some(index))
        })
    }

    /// Linked parent of a layer, resolved by index on first use.
    pub fn linked_parent(&self, id: NodeId) -> Option<NodeId> {
        let layer = self.get(id)?.as_layer()?;
        let index = layer.parent_index()?;
        *layer.linked_parent.get_or_init(|| {
            let found = self.find_layer(index);
            if found.is_none() {
                warn!(parent = index, "Linked parent layer not found");
            }
            found
        })
    }

    /// Linked parent chain of a layer, nearest first.
    pub fn parent_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent) = self.linked_parent(current) {
            if parent == id || chain.contains(&parent) {
                warn!(layer = %self.nodes[id.0].name, "Cyclic layer parenting");
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Evaluates every animated attribute at `frame`.
    pub fn update(&mut self, frame: f32) {
        self.update_node(self.root(), frame, None);
    }

    fn update_node(&mut self, id: NodeId, frame: f32, inherited: Option<&TrimWindow>) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        if node.hidden {
            return;
        }
        let child_frame = match &mut node.kind {
            NodeKind::Layer(layer) => {
                layer.update(frame);
                layer.local_frame(frame)
            }
            NodeKind::Root | NodeKind::Group(_) | NodeKind::EffectGroup => frame,
            kind => {
                kind.update_leaf(frame);
                if kind.node_type().accepts_trim() {
                    if let Some(shape) = kind.shape_mut() {
                        shape.apply_trim(inherited);
                    }
                }
                return;
            }
        };

        match self.nodes[id.0].node_type() {
            NodeType::Layer => {
                for effect in self.layer_effects(id) {
                    self.update_node(effect, child_frame, None);
                }
                let (applied, _) = self.update_children(id, child_frame, None);
                if let NodeKind::Layer(layer) = &mut self.nodes[id.0].kind {
                    layer.applied_trim = applied;
                }
            }
            NodeType::Group => {
                let (applied, owns) = self.update_children(id, child_frame, inherited);
                if let NodeKind::Group(group) = &mut self.nodes[id.0].kind {
                    group.applied_trim = applied;
                    group.owns_trim = owns;
                }
            }
            _ => {
                self.update_children(id, child_frame, None);
            }
        }
    }

    fn layer_effects(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id)
            .and_then(Node::as_layer)
            .map(|l| l.effects().to_vec())
            .unwrap_or_default()
    }

    /// Updates the children of a container. Trim children are evaluated
    /// first and composed into the applied trim, which every other child
    /// then receives. Returns the applied trim and whether one was declared
    /// here.
    fn update_children(
        &mut self,
        id: NodeId,
        frame: f32,
        inherited: Option<&TrimWindow>,
    ) -> (Option<TrimWindow>, bool) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let mut applied = inherited.cloned();
        let mut owns = false;

        for &child in &children {
            let node = &mut self.nodes[child.0];
            let NodeKind::Trim(trim) = &mut node.kind else {
                continue;
            };
            if node.hidden {
                continue;
            }
            trim.update(frame);
            let own = trim.window();
            if owns {
                warn!(trim = %own.name, "Only one trim per group is supported, merging into the first");
            }
            applied = Some(match applied {
                Some(current) => current.remap_into(own),
                None => own.clone(),
            });
            owns = true;
        }

        for &child in &children {
            if self.nodes[child.0].node_type() == NodeType::Trim {
                continue;
            }
            self.update_node(child, frame, applied.as_ref());
        }

        self.nodes[id.0].children = children;
        (applied, owns)
    }

    /// Pre-order render traversal from the root.
    pub fn render<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        self.render_node(self.root(), renderer);
    }

    fn render_children<R: Renderer + ?Sized>(&self, node: &Node, renderer: &mut R) {
        for &child in &node.children {
            self.render_node(child, renderer);
        }
    }

    fn render_node<R: Renderer + ?Sized>(&self, id: NodeId, r: &mut R) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.hidden {
            return;
        }
        trace!(node = %node.name, kind = ?node.node_type(), "render");
        match &node.kind {
            NodeKind::Root => {
                r.save_state();
                self.render_children(node, r);
                r.restore_state();
            }
            NodeKind::Layer(layer) => self.render_layer(id, node, layer, r),
            NodeKind::Group(group) => {
                r.save_state();
                r.save_trimming_state();
                if let Some(trim) = &group.applied_trim {
                    r.set_trimming_state(TrimmingState::from(trim.mode));
                }
                r.render_group(node, group);
                self.render_children(node, r);
                if let Some(trim) = group.applied_trim.as_ref().filter(|t| group.owns_trim && t.simultaneous()) {
                    r.render_trim(node, trim);
                }
                r.restore_trimming_state();
                r.restore_state();
            }
            NodeKind::EffectGroup => self.render_children(node, r),
            NodeKind::ShapeTransform(t) => r.render_shape_transform(node, t),
            NodeKind::Rect(s) => r.render_rect(node, s),
            NodeKind::Ellipse(s) => r.render_ellipse(node, s),
            NodeKind::Round(s) => r.render_round(node, s),
            NodeKind::FreeForm(s) => r.render_free_form(node, s),
            NodeKind::Fill(p) => r.render_fill(node, p),
            NodeKind::GradientFill(p) => r.render_gradient_fill(node, p),
            NodeKind::Stroke(p) => r.render_stroke(node, p),
            NodeKind::Repeater(rp) => r.render_repeater(node, rp),
            NodeKind::FillEffect(e) => r.render_fill_effect(node, e),
            // Trims are consumed by their container.
            NodeKind::Trim(_) | NodeKind::Slider(_) => {}
        }
    }

    fn render_layer<R: Renderer + ?Sized>(&self, id: NodeId, node: &Node, layer: &Layer, r: &mut R) {
        if !layer.is_active() {
            return;
        }
        r.save_state();
        for &effect in layer.effects() {
            self.render_node(effect, r);
        }
        for parent in self.parent_chain(id).into_iter().rev() {
            if let Some(parent_node) = self.get(parent) {
                if let Some(parent_layer) = parent_node.as_layer() {
                    r.render_parent_transform(parent_node, parent_layer.transform());
                }
            }
        }
        match layer.kind() {
            LayerKind::Shape => r.render_layer(node, layer),
            LayerKind::Image(image) => r.render_image_layer(node, layer, image),
        }
        r.render_transform(node, layer.transform());

        r.save_trimming_state();
        if let Some(trim) = layer.applied_trim() {
            r.set_trimming_state(TrimmingState::from(trim.mode));
        }
        self.render_children(node, r);
        if let Some(trim) = layer.applied_trim().filter(|t| t.simultaneous()) {
            r.render_trim(node, trim);
        }
        r.restore_trimming_state();
        r.restore_state();
    }
}
