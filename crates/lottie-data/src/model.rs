use serde::{de::DeserializeOwned, de::Error as _, de::SeqAccess, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Root of an animation document.
///
/// Layers are kept as raw fragments: each one is parsed on its own by the
/// engine so that a malformed layer degrades locally instead of failing the
/// whole document, and so that expression substitution can rewrite a fragment
/// before its properties are read.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LottieJson {
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    pub ip: f32,
    pub op: f32,
    pub fr: f32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub layers: Vec<serde_json::Value>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// Fields every node carries regardless of its kind.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct NodeInfo {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub mn: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub hd: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub ao: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Layer {
    #[serde(default)]
    pub ty: u8,
    #[serde(default)]
    pub ind: Option<u32>,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub st: f32,
    #[serde(default)]
    pub ddd: u8, // 3D layer flag
    #[serde(default)]
    pub bm: u8, // Blend mode, 0 = normal
    #[serde(default = "default_stretch")]
    pub sr: f32,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub td: bool, // Matte source
    #[serde(default)]
    pub tt: u8, // Matte (clip) mode of the layer below
    #[serde(default)]
    pub ks: Transform,
    #[serde(default, rename = "refId")]
    pub ref_id: Option<String>, // Image
    #[serde(default)]
    pub ef: Vec<serde_json::Value>,
    #[serde(default)]
    pub shapes: Vec<serde_json::Value>,
}

fn default_stretch() -> f32 {
    1.0
}

/// One entry of a layer's effect chain. Groups nest further effects in `ef`,
/// leaf values carry their authored property fragment in `v`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Effect {
    #[serde(default)]
    pub ty: u8,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub mn: Option<String>,
    #[serde(default)]
    pub ef: Vec<Effect>,
    #[serde(default)]
    pub v: Option<serde_json::Value>,
}

// Shapes

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupShape {
    #[serde(default)]
    pub it: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RectShape {
    #[serde(default)]
    pub p: Property<Vec3DefaultZero>,
    #[serde(default)]
    pub s: Property<Vec3DefaultZero>,
    #[serde(default)]
    pub r: Property<f32>,
    #[serde(default)]
    pub d: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EllipseShape {
    #[serde(default)]
    pub p: Property<Vec3DefaultZero>,
    #[serde(default)]
    pub s: Property<Vec3DefaultZero>,
    #[serde(default)]
    pub d: u8,
}

/// Circular marker ("rd"): a full circle of radius `r` around `p`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoundShape {
    #[serde(default)]
    pub p: Property<Vec3DefaultZero>,
    #[serde(default)]
    pub r: Property<f32>,
    #[serde(default)]
    pub d: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathShape {
    #[serde(default)]
    pub ks: Property<BezierPath>,
    #[serde(default)]
    pub d: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FillShape {
    #[serde(default)]
    pub c: Property<Color>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub r: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StrokeShape {
    #[serde(default)]
    pub c: Property<Color>,
    #[serde(default)]
    pub w: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<DashProperty>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DashProperty {
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub v: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientFillShape {
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub s: Property<Vec3DefaultZero>,
    #[serde(default)]
    pub e: Property<Vec3DefaultZero>,
    #[serde(default = "default_gradient_type")]
    pub t: u8,
    #[serde(default)]
    pub h: Property<f32>, // Highlight length
    #[serde(default)]
    pub a: Property<f32>, // Highlight angle
    #[serde(default)]
    pub g: GradientColors,
    #[serde(default)]
    pub r: Option<u8>,
}

fn default_gradient_type() -> u8 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GradientColors {
    #[serde(default)]
    pub p: u32,
    #[serde(default)]
    pub k: Property<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrimShape {
    #[serde(default)]
    pub s: Property<f32>,
    #[serde(default)]
    pub e: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub m: u8, // 1 = simultaneous, 2 = individual
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RepeaterShape {
    #[serde(default)]
    pub c: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub m: u8,
    #[serde(default)]
    pub tr: RepeaterTransform,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepeaterTransform {
    #[serde(flatten)]
    pub t: Transform,
    #[serde(default)]
    pub so: Property<f32>,
    #[serde(default)]
    pub eo: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub a: Property<Vec3DefaultZero>, // Anchor
    #[serde(default)]
    pub p: PositionProperty,
    #[serde(default)]
    pub s: Property<Vec3Scale>, // Scale in percent
    #[serde(default, alias = "rz")]
    pub r: Property<f32>, // Rotation in degrees
    #[serde(default)]
    pub o: Property<f32>, // Opacity 0..100
    #[serde(default)]
    pub sk: Property<f32>, // Skew
    #[serde(default)]
    pub sa: Property<f32>, // Skew axis
}

/// Split must be tried first: a split position object would otherwise match
/// `Unified` with every field defaulted.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        x: Property<f32>,
        y: Property<f32>,
    },
    Unified(Property<Vec3DefaultZero>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
    #[serde(default)]
    pub ix: Option<u32>,
    #[serde(default)]
    pub x: Option<String>,
    /// Set on fragments substituted in place of an `effect(..)(..)` expression.
    #[serde(default, rename = "fromExpression")]
    pub from_expression: bool,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
            x: None,
            from_expression: false,
        }
    }
}

impl<T> Property<T> {
    pub fn fixed(value: T) -> Self {
        Property {
            k: Value::Static(value),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(Value::Default);
        }

        if let Ok(keyframes) = serde_json::from_value::<Vec<Keyframe<T>>>(v.clone()) {
            return Ok(Value::Animated(keyframes));
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(Value::Static(val));
        }

        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(Value::Static(first));
            }
        }

        Ok(Value::Default)
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<EasingHandle>,
    #[serde(default)]
    pub o: Option<EasingHandle>,
    #[serde(default)]
    pub to: Option<Vec<f32>>,
    #[serde(default)]
    pub ti: Option<Vec<f32>>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub h: bool,
}

fn deserialize_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    // Structured values (paths) come wrapped in a one-element array. Derived
    // structs also accept the sequence form, so the wrapper is tried first.
    let wrapped = v
        .as_array()
        .and_then(|items| items.first())
        .is_some_and(serde_json::Value::is_object);
    if wrapped {
        if let Some(first) = first_of::<T>(&v) {
            return Ok(Some(first));
        }
    }

    if let Ok(val) = serde_json::from_value(v.clone()) {
        return Ok(Some(val));
    }

    Ok(first_of(&v))
}

fn first_of<T: DeserializeOwned>(v: &serde_json::Value) -> Option<T> {
    serde_json::from_value::<Vec<T>>(v.clone())
        .ok()
        .and_then(|vec| vec.into_iter().next())
}

/// Accepts `true`/`false` as well as the integer form (`0`, `1`) some
/// exporters write for boolean fields.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        _ => false,
    })
}

/// Control point of a keyframe's temporal easing curve.
///
/// Exporters write either `{"x": 0.5, "y": 0.5}`, the per-dimension form
/// `{"x": [0.5], "y": [0.5]}` or a bare pair. Only the first dimension is
/// used.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct EasingHandle {
    pub x: f32,
    pub y: f32,
}

impl<'de> Deserialize<'de> for EasingHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        fn first(v: &serde_json::Value) -> Option<f32> {
            match v {
                serde_json::Value::Number(n) => n.as_f64().map(|f| f as f32),
                serde_json::Value::Array(arr) => arr.first().and_then(first),
                _ => None,
            }
        }

        let v = serde_json::Value::deserialize(deserializer)?;
        let handle = match &v {
            serde_json::Value::Object(map) => map
                .get("x")
                .and_then(first)
                .zip(map.get("y").and_then(first)),
            serde_json::Value::Array(arr) if arr.len() >= 2 => first(&arr[0]).zip(first(&arr[1])),
            _ => None,
        };
        handle
            .map(|(x, y)| EasingHandle { x, y })
            .ok_or_else(|| D::Error::custom("expected an easing handle"))
    }
}

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];

// Wrapper for Vec3 with Z defaulting to 0.0
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Vec3DefaultZero(pub Vec3);

impl Default for Vec3DefaultZero {
    fn default() -> Self {
        Vec3DefaultZero([0.0, 0.0, 0.0])
    }
}

impl<'de> Deserialize<'de> for Vec3DefaultZero {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Vec3Visitor;
        impl<'de> serde::de::Visitor<'de> for Vec3Visitor {
            type Value = Vec3DefaultZero;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(0.0);
                let y = seq.next_element()?.unwrap_or(0.0);
                let z = seq.next_element()?.unwrap_or(0.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Vec3DefaultZero([x, y, z]))
            }
        }
        deserializer.deserialize_seq(Vec3Visitor)
    }
}

// Wrapper for Vec3 with Z defaulting to 100.0 (for Scale)
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Vec3Scale(pub Vec3);

impl Default for Vec3Scale {
    fn default() -> Self {
        Vec3Scale([100.0, 100.0, 100.0])
    }
}

impl<'de> Deserialize<'de> for Vec3Scale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Vec3ScaleVisitor;
        impl<'de> serde::de::Visitor<'de> for Vec3ScaleVisitor {
            type Value = Vec3Scale;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(100.0);
                let y = seq.next_element()?.unwrap_or(100.0);
                let z = seq.next_element()?.unwrap_or(100.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Vec3Scale([x, y, z]))
            }
        }
        deserializer.deserialize_seq(Vec3ScaleVisitor)
    }
}

/// RGBA color; a missing alpha component defaults to opaque.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Color(pub Vec4);

impl Default for Color {
    fn default() -> Self {
        Color([0.0, 0.0, 0.0, 1.0])
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ColorVisitor;
        impl<'de> serde::de::Visitor<'de> for ColorVisitor {
            type Value = Color;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 3 or 4 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let r = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(0, &self))?;
                let g = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(1, &self))?;
                let b = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(2, &self))?;
                let a = seq.next_element()?.unwrap_or(1.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Color([r, g, b, a]))
            }
        }
        deserializer.deserialize_seq(ColorVisitor)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BezierPath {
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<Vec2>,
    #[serde(default)]
    pub o: Vec<Vec2>,
    #[serde(default)]
    pub v: Vec<Vec2>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub w: Option<f32>,
    #[serde(default)]
    pub h: Option<f32>,
    #[serde(default)]
    pub u: Option<String>,
    #[serde(default)]
    pub p: Option<String>,
    #[serde(default)]
    pub e: Option<u8>,
}
