use crate::error::LottieError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// How a trim window is applied to the paths it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimMode {
    /// Trim the combined path of the whole group or layer once.
    Simultaneous,
    /// Trim every shape separately.
    Individual,
}

impl TrimMode {
    /// Document `m` field: 2 requests individual trimming, anything else is
    /// simultaneous.
    pub fn from_code(code: u8) -> Self {
        if code == 2 {
            TrimMode::Individual
        } else {
            TrimMode::Simultaneous
        }
    }
}

impl fmt::Display for TrimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrimMode::Simultaneous => write!(f, "simultaneous"),
            TrimMode::Individual => write!(f, "individual"),
        }
    }
}

impl FromStr for TrimMode {
    type Err = LottieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simultaneous" => Ok(TrimMode::Simultaneous),
            "individual" => Ok(TrimMode::Individual),
            _ => Err(LottieError::InvalidTrimMode(s.to_string())),
        }
    }
}

/// Process-level options, passed explicitly to scene construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Forces every trim node into one mode, ignoring the document's `m` flag.
    #[serde(default)]
    pub trim_mode: Option<TrimMode>,
}

impl EngineConfig {
    pub const TRIM_MODE_ENV: &'static str = "LOTTIE_FORCE_TRIM_MODE";

    /// Reads the overrides from the environment. Invalid values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        let trim_mode = match std::env::var(Self::TRIM_MODE_ENV) {
            Ok(raw) => match raw.parse::<TrimMode>() {
                Ok(mode) => {
                    debug!(%mode, "Trim mode forced from environment");
                    Some(mode)
                }
                Err(e) => {
                    warn!("Ignoring {}: {}", Self::TRIM_MODE_ENV, e);
                    None
                }
            },
            Err(_) => None,
        };
        Self { trim_mode }
    }

    pub fn with_trim_mode(mut self, mode: Option<TrimMode>) -> Self {
        if mode.is_some() {
            self.trim_mode = mode;
        }
        self
    }

    /// Effective mode for a trim node declaring `code`.
    pub fn resolve_trim_mode(&self, code: u8) -> TrimMode {
        self.trim_mode.unwrap_or_else(|| TrimMode::from_code(code))
    }
}
