use crate::config::EngineConfig;
use crate::error::Result;
use crate::factory::build_tree;
use crate::node::{Node, NodeId, Tree};
use crate::renderer::Renderer;
use lottie_data::model::LottieJson;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Document-level metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f32,
    pub in_point: f32,
    pub out_point: f32,
}

impl DocumentInfo {
    fn from_model(model: &LottieJson) -> Self {
        Self {
            name: model.nm.clone(),
            version: model.v.clone(),
            width: model.w,
            height: model.h,
            frame_rate: model.fr,
            in_point: model.ip,
            out_point: model.op,
        }
    }

    /// Number of frames in `[in_point, out_point)`.
    pub fn frame_count(&self) -> u32 {
        (self.out_point - self.in_point).max(0.0) as u32
    }
}

/// The live scene: owned by the thread that calls
/// [`Scene::update_properties`].
#[derive(Debug, Clone)]
pub struct Scene {
    info: DocumentInfo,
    tree: Tree,
    frame: f32,
}

impl Scene {
    pub fn from_json_str(json: &str, config: &EngineConfig) -> Result<Self> {
        let model: LottieJson = serde_json::from_str(json)?;
        Ok(Self::from_model(&model, config))
    }

    pub fn from_reader<R: Read>(reader: R, config: &EngineConfig) -> Result<Self> {
        let model: LottieJson = serde_json::from_reader(reader)?;
        Ok(Self::from_model(&model, config))
    }

    pub fn from_path(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file), config)
    }

    /// Builds the tree and evaluates it at the document's in point.
    pub fn from_model(model: &LottieJson, config: &EngineConfig) -> Self {
        let info = DocumentInfo::from_model(model);
        let mut scene = Self {
            frame: info.in_point,
            tree: build_tree(model, config),
            info,
        };
        scene.update_properties(scene.frame);
        scene
    }

    pub fn update_properties(&mut self, frame: f32) {
        debug!(frame, "Updating scene");
        self.frame = frame;
        self.tree.update(frame);
    }

    pub fn render<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        self.tree.render(renderer);
    }

    pub fn find_child(&self, name: &str) -> Option<NodeId> {
        self.tree.find_child(self.tree.root(), name)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.tree.get(id)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    /// Frame of the last update.
    pub fn frame(&self) -> f32 {
        self.frame
    }

    /// Copies the evaluated state of the current frame. Keyframe tables are
    /// shared, not copied.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            frame: self.frame,
            info: self.info.clone(),
            tree: self.tree.clone(),
        }
    }

    /// Like [`Scene::snapshot`], reusing the allocations of `target`.
    pub fn snapshot_into(&self, target: &mut Snapshot) {
        target.frame = self.frame;
        target.info.clone_from(&self.info);
        target.tree.clone_from(&self.tree);
    }
}

/// Read-only evaluated state of one frame, safe to hand to another thread.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    frame: f32,
    info: DocumentInfo,
    tree: Tree,
}

impl Snapshot {
    pub fn frame(&self) -> f32 {
        self.frame
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn render<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        self.tree.render(renderer);
    }

    pub fn find_child(&self, name: &str) -> Option<NodeId> {
        self.tree.find_child(self.tree.root(), name)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.tree.get(id)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}
