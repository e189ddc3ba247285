use fiber_tracker::config::{self, DemoConfig, PhantomConfig};
use fiber_tracker::density::{filter_by_density, tract_density};
use fiber_tracker::io::{write_json_file, write_tractogram};
use fiber_tracker::volume::{GridGeometry, ScalarVolume, VectorVolume};
use fiber_tracker::{
    MaskInputs, PeakProposer, StreamlineTracker, TrackingMode, TrackingResult, TractogramOutput,
};
use nalgebra::Vector3;
use std::env;
use std::path::Path;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config = match env::args().nth(1) {
        Some(path) => config::load_demo_config(Path::new(&path)).map_err(|e| e.to_string())?,
        None => DemoConfig::default(),
    };

    let (peaks, tracking) = curved_phantom(&config.phantom);
    let mode = if config.probabilistic {
        TrackingMode::Probabilistic
    } else {
        TrackingMode::Deterministic
    };
    let mut tracker = StreamlineTracker::new(
        Box::new(PeakProposer::new(peaks, mode)),
        config.tracking.clone(),
    );
    tracker.set_masks(MaskInputs {
        tracking: Some(tracking),
        ..Default::default()
    });
    let result = tracker.run().map_err(|e| e.to_string())?;
    print_text_summary(&result);

    let mut fibers = match &result.output {
        TractogramOutput::Fibers(fibers) => fibers.clone(),
        TractogramOutput::Density(_) => Vec::new(),
    };
    if let (Some(filter), false) = (&config.density_filter, fibers.is_empty()) {
        let geometry = tracker_geometry(&config.phantom);
        let density = tract_density(&fibers, &geometry, false);
        let before = fibers.len();
        fibers = filter_by_density(&fibers, &density, filter);
        println!("  density filter: kept {}/{}", fibers.len(), before);
    }

    if let Some(path) = &config.output.report_path {
        write_json_file(path, &result.report).map_err(|e| e.to_string())?;
        println!("\nJSON report written to {}", path.display());
    }
    if let Some(path) = &config.output.fibers_path {
        let tags = result.report.provenance.tags();
        write_tractogram(path, &fibers, Some(&tags)).map_err(|e| e.to_string())?;
        println!("Fibers written to {}", path.display());
    }
    Ok(())
}

fn print_text_summary(result: &TrackingResult) {
    println!("Tracking summary");
    for line in result.report.summary().lines() {
        println!("  {line}");
    }
    match &result.output {
        TractogramOutput::Fibers(fibers) => {
            let mean = if fibers.is_empty() {
                0.0
            } else {
                fibers.iter().map(|f| f.arc_length()).sum::<f32>() / fibers.len() as f32
            };
            println!("  fibers: {} (mean length {:.1}mm)", fibers.len(), mean);
        }
        TractogramOutput::Density(map) => {
            let (lo, hi) = map.min_max();
            println!("  density map: range [{lo:.3}, {hi:.3}]");
        }
    }
}

fn tracker_geometry(phantom: &PhantomConfig) -> GridGeometry {
    GridGeometry::isotropic(phantom.dims, phantom.spacing)
}

/// Quarter-circle bundle around the grid corner in the xy plane.
fn curved_phantom(phantom: &PhantomConfig) -> (VectorVolume, ScalarVolume) {
    let geometry = tracker_geometry(phantom);
    let cz = (phantom.dims[2].max(1) - 1) as f32 / 2.0;
    let peaks = VectorVolume::from_fn(geometry.clone(), |x, y, _| {
        Vector3::new(-(y as f32), x as f32, 0.0)
            .try_normalize(1e-6)
            .unwrap_or_else(Vector3::zeros)
    });
    let tracking = ScalarVolume::from_fn(geometry, |x, y, z| {
        let r = ((x * x + y * y) as f32).sqrt();
        let inside = (r - phantom.arc_radius).abs() <= phantom.tube_radius
            && (z as f32 - cz).abs() <= phantom.tube_radius;
        if inside {
            1.0
        } else {
            0.0
        }
    });
    (peaks, tracking)
}
