use crate::node::NodeId;
use crate::transform::Transform;
use crate::trim::TrimWindow;
use lottie_data::model as data;
use std::sync::OnceLock;
use tracing::warn;

pub const LAYER_IMAGE: u8 = 2;
pub const LAYER_SHAPE: u8 = 4;

/// How a layer is clipped by the matte layer rendered before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipMode {
    #[default]
    None,
    Alpha,
    InvertedAlpha,
    Luma,
    InvertedLuma,
}

impl ClipMode {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ClipMode::Alpha,
            2 => ClipMode::InvertedAlpha,
            3 => ClipMode::Luma,
            4 => ClipMode::InvertedLuma,
            _ => ClipMode::None,
        }
    }
}

/// Image asset referenced by an image layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub asset_id: String,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Shape,
    Image(ImageRef),
}

#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerKind,
    index: Option<u32>,
    parent_index: Option<u32>,
    in_point: f32,
    out_point: f32,
    start_time: f32,
    transform: Transform,
    pub(crate) effects: Vec<NodeId>,
    clip_mode: ClipMode,
    matte_source: bool,
    active: bool,
    pub(crate) applied_trim: Option<TrimWindow>,
    pub(crate) linked_parent: OnceLock<Option<NodeId>>,
}

impl Layer {
    pub fn new(data: &data::Layer, kind: LayerKind) -> Self {
        let clip_mode = ClipMode::from_code(data.tt);
        if matches!(clip_mode, ClipMode::Luma | ClipMode::InvertedLuma) {
            warn!(mode = ?clip_mode, "Luma mattes are treated as alpha mattes");
        }
        Self {
            kind,
            index: data.ind,
            parent_index: data.parent,
            in_point: data.ip,
            out_point: data.op,
            start_time: data.st,
            transform: Transform::new(&data.ks),
            effects: Vec::new(),
            clip_mode,
            matte_source: data.td,
            active: false,
            applied_trim: None,
            linked_parent: OnceLock::new(),
        }
    }

    pub(crate) fn set_transform(&mut self, ks: &data::Transform) {
        self.transform = Transform::new(ks);
    }

    /// Updates activity from the global frame and the transform at the
    /// layer-local frame.
    pub fn update(&mut self, frame: f32) {
        self.active = self.in_point <= frame && frame <= self.out_point;
        self.transform.update(self.local_frame(frame));
    }

    pub fn local_frame(&self, frame: f32) -> f32 {
        frame - self.start_time
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn parent_index(&self) -> Option<u32> {
        self.parent_index
    }

    pub fn in_point(&self) -> f32 {
        self.in_point
    }

    pub fn out_point(&self) -> f32 {
        self.out_point
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn effects(&self) -> &[NodeId] {
        &self.effects
    }

    pub fn clip_mode(&self) -> ClipMode {
        self.clip_mode
    }

    pub fn is_matte_source(&self) -> bool {
        self.matte_source
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn applied_trim(&self) -> Option<&TrimWindow> {
        self.applied_trim.as_ref()
    }
}
