//! JSON configuration loading for tracking runs and the demo tool.
use crate::density::DensityFilterParams;
use crate::error::{Result, TrackingError};
use crate::tracker::TrackerParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Load tracking parameters from a JSON file. Missing fields keep their
/// defaults.
pub fn load_params(path: &Path) -> Result<TrackerParams> {
    let params: TrackerParams = load_json(path)?;
    params.validate()?;
    Ok(params)
}

/// Configuration of the `tracking_demo` binary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub tracking: TrackerParams,
    /// Perturb peak directions instead of following them exactly.
    pub probabilistic: bool,
    pub phantom: PhantomConfig,
    /// Density outlier filter applied to the tractogram, if any.
    pub density_filter: Option<DensityFilterParams>,
    pub output: DemoOutputConfig,
}

/// Synthetic curved bundle tracked by the demo.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PhantomConfig {
    pub dims: [usize; 3],
    pub spacing: f32,
    /// Radius of the bundle's arc, in voxels.
    pub arc_radius: f32,
    /// Half thickness of the bundle tube, in voxels.
    pub tube_radius: f32,
}

impl Default for PhantomConfig {
    fn default() -> Self {
        Self {
            dims: [48, 48, 12],
            spacing: 1.0,
            arc_radius: 28.0,
            tube_radius: 4.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DemoOutputConfig {
    /// Where to write the JSON run report.
    pub report_path: Option<PathBuf>,
    /// Where to write the accepted fibres as JSON.
    pub fibers_path: Option<PathBuf>,
}

pub fn load_demo_config(path: &Path) -> Result<DemoConfig> {
    let config: DemoConfig = load_json(path)?;
    config.tracking.validate()?;
    Ok(config)
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).map_err(|e| {
        TrackingError::Config(format!("Failed to read config {}: {e}", path.display()))
    })?;
    serde_json::from_str(&data).map_err(|e| {
        TrackingError::Config(format!("Failed to parse config {}: {e}", path.display()))
    })
}
