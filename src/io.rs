//! JSON output helpers for reports and tractograms.
use crate::error::{Result, TrackingError};
use crate::types::Streamline;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        TrackingError::Io(format!("Failed to serialize JSON for {}: {e}", path.display()))
    })?;
    fs::write(path, json)
        .map_err(|e| TrackingError::Io(format!("Failed to write JSON {}: {e}", path.display())))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                TrackingError::Io(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct TractogramFile<'a> {
    count: usize,
    fibers: Vec<Vec<[f32; 3]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a std::collections::BTreeMap<&'static str, &'static str>>,
}

/// Write fibres as nested `[x, y, z]` point lists, optionally with
/// provenance tags.
pub fn write_tractogram(
    path: &Path,
    fibers: &[Streamline],
    tags: Option<&std::collections::BTreeMap<&'static str, &'static str>>,
) -> Result<()> {
    let file = TractogramFile {
        count: fibers.len(),
        fibers: fibers
            .iter()
            .map(|f| f.points.iter().map(|p| [p.x, p.y, p.z]).collect())
            .collect(),
        tags,
    };
    write_json_file(path, &file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn tractogram_is_written_with_nested_dirs() {
        let dir = std::env::temp_dir().join(format!("fiber_tracker_io_{}", std::process::id()));
        let path = dir.join("nested").join("fibers.json");
        let fibers = vec![Streamline::from_points([
            Point3::new(0.0, 1.0, 2.0),
            Point3::new(0.5, 1.0, 2.0),
        ])];
        write_tractogram(&path, &fibers, None).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["fibers"][0][1][0], 0.5);
        assert!(json.get("tags").is_none());
        let _ = fs::remove_dir_all(dir);
    }
}
