use crate::animatable::Animated;
use crate::paint::color;
use glam::Vec4;
use lottie_data::model::{Color, Effect, Property};
use serde::de::DeserializeOwned;
use tracing::warn;

pub const EFFECT_SLIDER: u8 = 0;
pub const EFFECT_GROUP: u8 = 5;
pub const EFFECT_FILL: u8 = 21;

// Value slots of the fill effect.
const FILL_COLOR_SLOT: usize = 2;
const FILL_OPACITY_SLOT: usize = 6;

fn property<T: DeserializeOwned + Default>(effect: Option<&Effect>) -> Property<T> {
    let Some(value) = effect.and_then(|e| e.v.as_ref()) else {
        return Property::default();
    };
    match serde_json::from_value(value.clone()) {
        Ok(prop) => prop,
        Err(err) => {
            warn!(effect = ?effect.and_then(|e| e.nm.as_deref()), %err, "Malformed effect value");
            Property::default()
        }
    }
}

/// Expression control holding a single scalar. The authored value fragment
/// is kept so that expressions referencing the slider can substitute it.
#[derive(Debug, Clone)]
pub struct SliderEffect {
    value: Animated<f32>,
    authored: serde_json::Value,
}

impl SliderEffect {
    pub fn new(effect: &Effect) -> Self {
        Self {
            value: Animated::from_property(&property(Some(effect)), |v| *v, 0.0),
            authored: effect.v.clone().unwrap_or_default(),
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.value.update(frame);
    }

    pub fn value(&self) -> f32 {
        *self.value.value()
    }

    pub fn authored(&self) -> &serde_json::Value {
        &self.authored
    }
}

/// Floods the layer with a solid color.
#[derive(Debug, Clone)]
pub struct FillEffect {
    color: Animated<Vec4>,
    opacity: Animated<f32>,
}

impl FillEffect {
    pub fn new(effect: &Effect) -> Self {
        let color_prop: Property<Color> = property(effect.ef.get(FILL_COLOR_SLOT));
        let opacity_prop: Property<f32> = property(effect.ef.get(FILL_OPACITY_SLOT));
        Self {
            color: Animated::from_property(&color_prop, color, Vec4::new(0.0, 0.0, 0.0, 1.0)),
            opacity: Animated::from_property(&opacity_prop, |v| *v, 1.0),
        }
    }

    pub fn update(&mut self, frame: f32) {
        self.color.update(frame);
        self.opacity.update(frame);
    }

    pub fn color(&self) -> Vec4 {
        *self.color.value()
    }

    /// Opacity in 0..1.
    pub fn opacity(&self) -> f32 {
        self.opacity.value().clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn effect(value: serde_json::Value) -> Effect {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_slider_keeps_authored_fragment() {
        let slider = SliderEffect::new(&effect(json!({
            "ty": 0, "nm": "Slider", "v": { "a": 0, "k": 42 }
        })));
        assert_eq!(slider.value(), 42.0);
        assert_eq!(slider.authored(), &json!({ "a": 0, "k": 42 }));
    }

    #[test]
    fn test_fill_effect_reads_its_slots() {
        let mut ef: Vec<serde_json::Value> = (0..7)
            .map(|i| json!({ "ty": 0, "nm": format!("slot {}", i), "v": { "a": 0, "k": 0 } }))
            .collect();
        ef[2] = json!({ "ty": 2, "nm": "Color", "v": { "a": 0, "k": [0, 0, 1, 1] } });
        ef[6] = json!({ "ty": 0, "nm": "Opacity", "v": { "a": 0, "k": 0.5 } });
        let fill = FillEffect::new(&effect(json!({ "ty": 21, "nm": "Fill", "ef": ef })));
        assert_eq!(fill.color(), Vec4::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(fill.opacity(), 0.5);
    }

    #[test]
    fn test_fill_effect_defaults_when_slots_missing() {
        let fill = FillEffect::new(&effect(json!({ "ty": 21, "nm": "Fill" })));
        assert_eq!(fill.color(), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(fill.opacity(), 1.0);
    }
}
