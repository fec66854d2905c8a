pub mod animatable;
pub mod config;
pub mod effects;
pub mod error;
pub mod expressions;
pub mod factory;
pub mod geometry;
pub mod layer;
pub mod modifiers;
pub mod node;
pub mod paint;
pub mod renderer;
pub mod scene;
pub mod shapes;
pub mod transform;
pub mod trim;

pub use config::{EngineConfig, TrimMode};
pub use error::{LottieError, Result};
pub use node::{Node, NodeId, NodeKind, NodeType, Tree};
pub use renderer::*;
pub use scene::{DocumentInfo, Scene, Snapshot};

use lottie_data::model::LottieJson;

/// Drives a [`Scene`] from wall-clock time, looping over the document's
/// frame range.
#[derive(Debug, Clone)]
pub struct LottiePlayer {
    scene: Scene,
    current_frame: f32,
}

impl LottiePlayer {
    pub fn new(scene: Scene) -> Self {
        let current_frame = scene.info().in_point;
        let mut player = Self {
            scene,
            current_frame,
        };
        player.refresh();
        player
    }

    pub fn load(json: &str, config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(Scene::from_json_str(json, config)?))
    }

    pub fn from_model(model: &LottieJson, config: &EngineConfig) -> Self {
        Self::new(Scene::from_model(model, config))
    }

    /// Advances by `dt` seconds at the document frame rate.
    pub fn advance(&mut self, dt: f32) {
        let info = self.scene.info();
        let (ip, op) = (info.in_point, info.out_point);
        self.current_frame += dt * info.frame_rate;

        let duration = op - ip;
        if duration > 0.0 && (self.current_frame >= op || self.current_frame < ip) {
            self.current_frame = ip + (self.current_frame - ip).rem_euclid(duration);
        }
        self.refresh();
    }

    /// Jumps to `frame`, clamped to the document's frame range.
    pub fn seek(&mut self, frame: i32) {
        let info = self.scene.info();
        let last = (info.out_point - 1.0).max(info.in_point);
        self.current_frame = (frame as f32).clamp(info.in_point, last);
        self.refresh();
    }

    pub fn current_frame(&self) -> i32 {
        self.current_frame.floor() as i32
    }

    fn refresh(&mut self) {
        let frame = self.current_frame.floor();
        if frame != self.scene.frame() {
            self.scene.update_properties(frame);
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn snapshot(&self) -> Snapshot {
        self.scene.snapshot()
    }
}
