#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// A 3D point or direction in world coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Coords {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Coords {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn splat(value: f32) -> Self {
        Self::new(value, value, value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeparationStyle {
    #[default]
    InverseDistance,
    Unweighted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentStyle {
    #[default]
    LimitThenSteer,
    HardClamp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStyle {
    #[default]
    TimeScaled,
    PerTick,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CentroidStyle {
    #[default]
    Neighbors,
    IncludeSelf,
}

/// Flock configuration as hosts write it. Every field has a default, so a
/// settings file only needs the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlockSettings {
    pub coherence_factor: f32,
    pub min_distance: f32,
    pub avoidance_factor: f32,
    pub alignment_factor: f32,
    pub visual_range: f32,
    pub speed: f32,
    pub max_speed: f32,
    pub stay_in_bounds_factor: f32,
    pub center: Coords,
    pub bounds: Coords,
    pub spawn_position: Coords,
    /// Zero or less spawns an empty flock.
    pub count: i64,
    pub separation: SeparationStyle,
    pub containment: ContainmentStyle,
    pub integration: IntegrationStyle,
    pub centroid: CentroidStyle,
}

impl Default for FlockSettings {
    fn default() -> Self {
        Self {
            coherence_factor: 0.01,
            min_distance: 2.0,
            avoidance_factor: 0.5,
            alignment_factor: 0.05,
            visual_range: 10.0,
            speed: 5.0,
            max_speed: 3.0,
            stay_in_bounds_factor: 1.0,
            center: Coords::default(),
            bounds: Coords::splat(50.0),
            spawn_position: Coords::default(),
            count: 30,
            separation: SeparationStyle::default(),
            containment: ContainmentStyle::default(),
            integration: IntegrationStyle::default(),
            centroid: CentroidStyle::default(),
        }
    }
}

impl FlockSettings {
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[cfg(feature = "std")]
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Number of agents to spawn, with non-positive counts mapped to zero.
    pub fn agent_count(&self) -> usize {
        usize::try_from(self.count).unwrap_or(0)
    }
}

/// One agent as seen by a rendering host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgentReport {
    pub id: u32,
    pub position: Coords,
    pub heading: Coords,
    /// Unit facing direction.
    pub forward: Coords,
    pub neighbors: usize,
}

/// Every agent of a flock after one tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameReport {
    pub tick: u64,
    /// Simulated seconds since the first tick.
    pub elapsed: f32,
    pub agents: Vec<AgentReport>,
}

/// Summary written when a run ends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlockStatus {
    pub ticks: u64,
    pub agent_count: usize,
    pub contacts: usize,
    pub elapsed: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings =
            FlockSettings::from_json(r#"{ "coherence_factor": 0.5, "count": 2 }"#).unwrap();
        assert_eq!(settings.coherence_factor, 0.5);
        assert_eq!(settings.count, 2);
        assert_eq!(settings.visual_range, FlockSettings::default().visual_range);
        assert_eq!(settings.integration, IntegrationStyle::TimeScaled);
    }

    #[test]
    fn test_variant_names_are_snake_case() {
        let settings = FlockSettings::from_json(
            r#"{
                "separation": "unweighted",
                "containment": "hard_clamp",
                "integration": "per_tick",
                "centroid": "include_self",
                "bounds": { "x": 1.0, "y": 2.0, "z": 3.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.separation, SeparationStyle::Unweighted);
        assert_eq!(settings.containment, ContainmentStyle::HardClamp);
        assert_eq!(settings.integration, IntegrationStyle::PerTick);
        assert_eq!(settings.centroid, CentroidStyle::IncludeSelf);
        assert_eq!(settings.bounds, Coords::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_non_positive_count_means_no_agents() {
        let settings = FlockSettings {
            count: -5,
            ..FlockSettings::default()
        };
        assert_eq!(settings.agent_count(), 0);
        assert_eq!(FlockSettings::default().agent_count(), 30);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(FlockSettings::from_json(r#"{ "integration": "warp" }"#).is_err());
    }

    #[test]
    fn test_settings_survive_json() {
        let settings = FlockSettings {
            max_speed: 7.5,
            spawn_position: Coords::new(1.0, -1.0, 0.5),
            ..FlockSettings::default()
        };
        let json = settings.to_json_pretty().unwrap();
        assert_eq!(FlockSettings::from_json(&json).unwrap(), settings);
    }
}
