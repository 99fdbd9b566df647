use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use flock_core::{
    Behavior, Centroid, Containment, FlockParams, Integration, SeparationFalloff, Vector3,
};
use flock_shared::{
    CentroidStyle, ContainmentStyle, Coords, FlockSettings, IntegrationStyle, SeparationStyle,
};

/// Reads a JSON settings file.
pub fn load_settings(path: &Path) -> Result<FlockSettings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    FlockSettings::from_json(&text)
        .with_context(|| format!("Invalid settings in {}", path.display()))
}

/// Converts host settings into simulation parameters. With `clamp` set,
/// out-of-range values are forced into range instead of rejected.
pub fn to_params(settings: &FlockSettings, clamp: bool) -> Result<FlockParams> {
    let params = FlockParams {
        coherence_factor: settings.coherence_factor,
        min_distance: settings.min_distance,
        avoidance_factor: settings.avoidance_factor,
        alignment_factor: settings.alignment_factor,
        visual_range: settings.visual_range,
        speed: settings.speed,
        max_speed: settings.max_speed,
        stay_in_bounds_factor: settings.stay_in_bounds_factor,
        center: vector(settings.center),
        bounds: vector(settings.bounds),
        spawn_position: vector(settings.spawn_position),
        count: settings.agent_count(),
        behavior: Behavior {
            separation: match settings.separation {
                SeparationStyle::InverseDistance => SeparationFalloff::InverseDistance,
                SeparationStyle::Unweighted => SeparationFalloff::Unweighted,
            },
            containment: match settings.containment {
                ContainmentStyle::LimitThenSteer => Containment::LimitThenSteer,
                ContainmentStyle::HardClamp => Containment::HardClamp,
            },
            integration: match settings.integration {
                IntegrationStyle::TimeScaled => Integration::TimeScaled,
                IntegrationStyle::PerTick => Integration::PerTick,
            },
            centroid: match settings.centroid {
                CentroidStyle::Neighbors => Centroid::Neighbors,
                CentroidStyle::IncludeSelf => Centroid::IncludeSelf,
            },
        },
    };

    if settings.count <= 0 {
        log::info!("Settings request {} agents; flock will be empty", settings.count);
    }
    if params.behavior.integration == Integration::PerTick {
        log::warn!("per_tick integration ignores dt; motion will follow the frame rate");
    }

    if clamp {
        let clamped = params.clamped();
        if clamped != params {
            log::warn!("Out-of-range settings were clamped");
        }
        return Ok(clamped);
    }

    params.validate().context("Invalid flock settings")?;
    Ok(params)
}

pub fn vector(coords: Coords) -> Vector3 {
    Vector3::new(coords.x, coords.y, coords.z)
}

pub fn coords(vector: Vector3) -> Coords {
    Coords::new(vector.x, vector.y, vector.z)
}

/// Polls a settings file and hands back new parameters whenever it changes
pub struct SettingsWatcher {
    path: PathBuf,
    clamp: bool,
    last_modified: Option<SystemTime>,
}

impl SettingsWatcher {
    /// Starts watching `path`. The file as it is now counts as already seen.
    pub fn new(path: impl Into<PathBuf>, clamp: bool) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            clamp,
            last_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns freshly loaded parameters if the file changed since the last
    /// poll. A file that fails to load is reported and skipped.
    pub fn poll(&mut self) -> Option<FlockParams> {
        let modified = modified(&self.path)?;
        if self.last_modified == Some(modified) {
            return None;
        }
        self.last_modified = Some(modified);

        match load_settings(&self.path).and_then(|s| to_params(&s, self.clamp)) {
            Ok(params) => {
                log::info!("Reloaded settings from {}", self.path.display());
                Some(params)
            }
            Err(e) => {
                log::warn!("Ignoring settings reload: {:#}", e);
                None
            }
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
