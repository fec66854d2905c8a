//! Construction of tree nodes from document fragments.
//!
//! Fragments are parsed one at a time so a malformed or unsupported node is
//! logged and skipped while the rest of the document still loads.

use crate::config::EngineConfig;
use crate::effects::{FillEffect, SliderEffect, EFFECT_FILL, EFFECT_GROUP, EFFECT_SLIDER};
use crate::expressions::resolve_expressions;
use crate::layer::{ImageRef, Layer, LayerKind, LAYER_IMAGE, LAYER_SHAPE};
use crate::modifiers::Repeater;
use crate::node::{Group, Node, NodeId, NodeKind, NodeType, Tree};
use crate::paint::{Fill, GradientFill, Stroke};
use crate::shapes::{Ellipse, FreeForm, Rect, Round};
use crate::transform::ShapeTransform;
use crate::trim::Trim;
use lottie_data::model::{self as data, Asset, LottieJson, NodeInfo};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Inputs shared by every constructor.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a EngineConfig,
    pub assets: &'a [Asset],
}

fn parse<T: DeserializeOwned>(fragment: &Value, what: &str) -> Option<T> {
    match T::deserialize(fragment) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(%err, "Skipping malformed {}", what);
            None
        }
    }
}

fn node(info: &NodeInfo, kind: NodeKind) -> Node {
    let mut node = Node::new(info.nm.clone().unwrap_or_default(), kind);
    node.match_name = info.mn.clone();
    node.hidden = info.hd;
    node
}

/// Builds the whole tree for a document, in render order.
pub fn build_tree(model: &LottieJson, config: &EngineConfig) -> Tree {
    let mut tree = Tree::new();
    let ctx = BuildContext {
        config,
        assets: &model.assets,
    };
    let root = tree.root();

    // Layer headers and effects come first so that expressions in any layer
    // can reference effects declared on any other.
    let layers: Vec<(NodeId, &Value)> = model
        .layers
        .iter()
        .filter_map(|fragment| construct_layer_header(&mut tree, root, fragment, &ctx).map(|id| (id, fragment)))
        .collect();
    for (id, fragment) in layers {
        let resolved = resolve_expressions(&tree, fragment);
        populate_layer(&mut tree, id, &resolved, &ctx);
    }
    arrange_layers(&mut tree);
    debug!(nodes = tree.len(), "Built scene tree");
    tree
}

/// Constructs a layer with its effects and contents and appends it to
/// `parent`. Unsupported layer types yield `None`.
pub fn construct_layer(tree: &mut Tree, parent: NodeId, fragment: &Value, ctx: &BuildContext) -> Option<NodeId> {
    let id = construct_layer_header(tree, parent, fragment, ctx)?;
    let resolved = resolve_expressions(tree, fragment);
    populate_layer(tree, id, &resolved, ctx);
    Some(id)
}

fn construct_layer_header(tree: &mut Tree, parent: NodeId, fragment: &Value, ctx: &BuildContext) -> Option<NodeId> {
    let info: NodeInfo = parse(fragment, "layer")?;
    let layer: data::Layer = parse(fragment, "layer")?;
    let name = info.nm.as_deref().unwrap_or_default();

    let kind = match layer.ty {
        LAYER_SHAPE => LayerKind::Shape,
        LAYER_IMAGE => {
            let asset_id = layer.ref_id.clone().unwrap_or_default();
            let asset = ctx.assets.iter().find(|a| a.id == asset_id);
            if asset.is_none() {
                warn!(layer = name, asset = %asset_id, "Image asset not found");
            }
            LayerKind::Image(ImageRef {
                asset_id,
                width: asset.and_then(|a| a.w).unwrap_or(0.0),
                height: asset.and_then(|a| a.h).unwrap_or(0.0),
            })
        }
        other => {
            warn!(layer = name, ty = other, "Unsupported layer type");
            return None;
        }
    };

    if info.ao {
        warn!(layer = name, "Auto-orient is not supported");
    }
    if layer.ddd != 0 {
        warn!(layer = name, "3D layers are not supported");
    }
    if layer.bm != 0 {
        warn!(layer = name, mode = layer.bm, "Blend modes are not supported");
    }
    if layer.sr != 1.0 {
        warn!(layer = name, stretch = layer.sr, "Time stretch is not supported");
    }

    let id = tree.append(parent, node(&info, NodeKind::Layer(Box::new(Layer::new(&layer, kind)))));

    let effects: Vec<NodeId> = layer
        .ef
        .iter()
        .filter_map(|fragment| parse::<data::Effect>(fragment, "effect"))
        .filter_map(|effect| construct_effect(tree, id, &effect, false))
        .collect();
    if let Some(NodeKind::Layer(l)) = tree.get_mut(id).map(|n| &mut n.kind) {
        l.effects = effects;
    }
    Some(id)
}

fn construct_effect(tree: &mut Tree, parent: NodeId, effect: &data::Effect, nested: bool) -> Option<NodeId> {
    let kind = match effect.ty {
        EFFECT_SLIDER => NodeKind::Slider(SliderEffect::new(effect)),
        EFFECT_GROUP => NodeKind::EffectGroup,
        EFFECT_FILL => NodeKind::FillEffect(FillEffect::new(effect)),
        other => {
            if nested {
                debug!(effect = ?effect.nm, ty = other, "Skipping effect control");
            } else {
                warn!(effect = ?effect.nm, ty = other, "Unsupported effect type");
            }
            return None;
        }
    };
    let mut node = Node::new(effect.nm.clone().unwrap_or_default(), kind);
    node.match_name = effect.mn.clone();
    let id = if nested {
        tree.append(parent, node)
    } else {
        tree.insert(parent, node)
    };
    if effect.ty == EFFECT_GROUP {
        for child in &effect.ef {
            construct_effect(tree, id, child, true);
        }
    }
    Some(id)
}

/// Fills in the transform and contents of a layer constructed by
/// [`construct_layer`], from a fragment whose expressions are resolved.
fn populate_layer(tree: &mut Tree, id: NodeId, fragment: &Value, ctx: &BuildContext) {
    let Some(layer) = parse::<data::Layer>(fragment, "layer") else {
        return;
    };
    if let Some(NodeKind::Layer(l)) = tree.get_mut(id).map(|n| &mut n.kind) {
        l.set_transform(&layer.ks);
    }
    construct_children(tree, id, &layer.shapes, ctx);
}

fn construct_children(tree: &mut Tree, parent: NodeId, items: &[Value], ctx: &BuildContext) {
    for item in items {
        construct_shape(tree, parent, item, ctx);
    }
    arrange_children(tree, parent);
}

/// Constructs the shape described by `fragment` and appends it to `parent`.
/// Unknown and unimplemented shape types yield `None`.
pub fn construct_shape(tree: &mut Tree, parent: NodeId, fragment: &Value, ctx: &BuildContext) -> Option<NodeId> {
    let Some(tag) = fragment.get("ty").and_then(Value::as_str) else {
        warn!("Skipping shape without a type tag");
        return None;
    };
    let info: NodeInfo = parse(fragment, "shape")?;
    let name = info.nm.as_deref().unwrap_or_default();

    let kind = match tag {
        "gr" => NodeKind::Group(Group::default()),
        "rc" => NodeKind::Rect(Rect::new(&parse(fragment, "rectangle")?)),
        "el" => NodeKind::Ellipse(Ellipse::new(&parse(fragment, "ellipse")?)),
        "rd" => NodeKind::Round(Round::new(&parse(fragment, "round")?)),
        "sh" => NodeKind::FreeForm(FreeForm::new(&parse(fragment, "path")?)),
        "fl" => NodeKind::Fill(Fill::new(&parse(fragment, "fill")?)),
        "gf" => NodeKind::GradientFill(Box::new(GradientFill::new(&parse(fragment, "gradient fill")?))),
        "st" => NodeKind::Stroke(Stroke::new(&parse(fragment, "stroke")?)),
        "tr" => NodeKind::ShapeTransform(Box::new(ShapeTransform::new(&parse(fragment, "transform")?))),
        "tm" => NodeKind::Trim(Trim::new(name, &parse(fragment, "trim")?, ctx.config)),
        "rp" => NodeKind::Repeater(Box::new(Repeater::new(&parse(fragment, "repeater")?))),
        "sr" | "gs" => {
            warn!(shape = name, tag, "Shape type is not implemented");
            return None;
        }
        other => {
            warn!(shape = name, tag = other, "Unknown shape type");
            return None;
        }
    };

    if info.ao {
        warn!(shape = name, "Auto-orient is not supported");
    }
    let id = tree.append(parent, node(&info, kind));
    if tag == "gr" {
        if let Some(group) = parse::<data::GroupShape>(fragment, "group") {
            construct_children(tree, id, &group.it, ctx);
        }
    }
    Some(id)
}

/// Puts a container's children in render order: reversed document order,
/// with its shape transform first.
fn arrange_children(tree: &mut Tree, id: NodeId) {
    let mut children: Vec<NodeId> = tree.children(id).iter().rev().copied().collect();
    children.sort_by_key(|&c| {
        tree.get(c)
            .map_or(true, |n| n.node_type() != NodeType::ShapeTransform)
    });
    tree.set_children(id, children);
}

/// Puts the layers in render order: reversed document order, with each
/// matte source moved in front of the layer it clips.
fn arrange_layers(tree: &mut Tree) {
    let root = tree.root();
    let mut layers: Vec<NodeId> = tree.children(root).iter().rev().copied().collect();
    let is_matte_source = |tree: &Tree, id: NodeId| {
        tree.get(id)
            .and_then(Node::as_layer)
            .is_some_and(Layer::is_matte_source)
    };
    let mut i = 1;
    while i < layers.len() {
        if is_matte_source(tree, layers[i]) {
            layers.swap(i - 1, i);
            i += 2;
        } else {
            i += 1;
        }
    }
    tree.set_children(root, layers);
}
