//! Run configuration loaded from YAML
//!
//! Every section and every field is optional; missing values fall back to the
//! defaults below.

use cutmark_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Scores at or above this value are cuts
    pub cut_point_threshold: f32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { cut_point_threshold: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Clouds per inference call
    pub batch_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { batch_size: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub num_points: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { num_points: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurvatureConfig {
    pub radius: f32,
    pub threshold: f32,
}

impl Default for CurvatureConfig {
    fn default() -> Self {
        Self { radius: 0.02, threshold: -0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub point_size: u32,
    /// Degrees around the vertical axis
    pub yaw: f32,
    /// Degrees above the horizon
    pub pitch: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { width: 800, height: 800, point_size: 2, yaw: 30.0, pitch: 20.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    pub distance_threshold: f32,
    pub max_iterations: usize,
    pub min_inliers: usize,
    pub max_planes: usize,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self { distance_threshold: 0.01, max_iterations: 500, min_inliers: 30, max_planes: 8 }
    }
}

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutmarkConfig {
    pub general: GeneralConfig,
    pub model: ModelConfig,
    pub sampling: SamplingConfig,
    pub curvature: CurvatureConfig,
    pub render: RenderConfig,
    pub decomposition: DecompositionConfig,
}

impl CutmarkConfig {
    /// Parse a YAML document
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no stage can run with
    pub fn validate(&self) -> Result<()> {
        if self.model.batch_size == 0 {
            return Err(Error::Config("model.batch_size must be at least 1".to_string()));
        }
        if self.sampling.num_points == 0 {
            return Err(Error::Config("sampling.num_points must be at least 1".to_string()));
        }
        if !(self.curvature.radius > 0.0) {
            return Err(Error::Config("curvature.radius must be positive".to_string()));
        }
        if !self.general.cut_point_threshold.is_finite() {
            return Err(Error::Config("general.cut_point_threshold must be finite".to_string()));
        }
        if self.render.width == 0 || self.render.height == 0 || self.render.point_size == 0 {
            return Err(Error::Config("render dimensions must be positive".to_string()));
        }
        if !(self.decomposition.distance_threshold > 0.0) || self.decomposition.max_iterations == 0 {
            return Err(Error::Config(
                "decomposition needs a positive distance_threshold and max_iterations".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Load and validate a configuration file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CutmarkConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let config = CutmarkConfig::from_yaml(&text).map_err(|e| match e {
        Error::Config(reason) => Error::Config(format!("{}: {}", path.display(), reason)),
        other => other,
    })?;
    log::debug!("loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}
