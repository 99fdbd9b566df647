//! Shared, read-only flock parameters and the variant toggles.

use thiserror::Error;

use crate::vector::Vector3;

/// Configuration values rejected by [`FlockParams::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
    #[error("{count} agents exceed the id space")]
    TooManyAgents { count: usize },
}

/// How the separation term weighs a close neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeparationFalloff {
    /// `(position - other).normalize() / distance`, coincident neighbors skipped.
    #[default]
    InverseDistance,
    /// `(position - other).normalize()` with no distance weighting and no
    /// coincidence guard. A coincident neighbor contributes nothing because
    /// the zero vector normalizes to zero.
    Unweighted,
}

/// How the heading is kept inside the containment volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Containment {
    /// Clamp to `max_speed`, then add `|heading|` per escaping axis pointed
    /// back inward and scaled by `stay_in_bounds_factor`. An axis the
    /// correction leaves at zero or still outward is mirrored inward.
    #[default]
    LimitThenSteer,
    /// No speed limit. Any heading axis pointing further out of the volume is
    /// flipped inward with its magnitude kept.
    HardClamp,
}

/// How the heading moves the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integration {
    /// `position += heading.normalize() * speed * dt`. Frame-rate independent.
    #[default]
    TimeScaled,
    /// `position += heading` once per tick. Ignores `dt`, so the flock speeds
    /// up and slows down with the frame rate.
    PerTick,
}

/// Which positions the cohesion centroid averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Centroid {
    #[default]
    Neighbors,
    /// The agent's own position is averaged in with its neighbors.
    IncludeSelf,
}

/// Named switches reproducing each historical variant of the update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Behavior {
    pub separation: SeparationFalloff,
    pub containment: Containment,
    pub integration: Integration,
    pub centroid: Centroid,
}

/// Parameters shared by every agent of a flock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockParams {
    pub coherence_factor: f32,
    pub min_distance: f32,
    pub avoidance_factor: f32,
    pub alignment_factor: f32,
    pub visual_range: f32,
    pub speed: f32,
    pub max_speed: f32,
    pub stay_in_bounds_factor: f32,
    /// Centre of the containment volume.
    pub center: Vector3,
    /// Full extents of the containment volume.
    pub bounds: Vector3,
    pub spawn_position: Vector3,
    pub count: usize,
    pub behavior: Behavior,
}

impl Default for FlockParams {
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
            center: Vector3::zero(),
            bounds: Vector3::splat(50.0),
            spawn_position: Vector3::zero(),
            count: 30,
            behavior: Behavior::default(),
        }
    }
}

impl FlockParams {
    fn scalar_fields(&self) -> [(&'static str, f32); 8] {
        [
            ("coherence_factor", self.coherence_factor),
            ("min_distance", self.min_distance),
            ("avoidance_factor", self.avoidance_factor),
            ("alignment_factor", self.alignment_factor),
            ("visual_range", self.visual_range),
            ("speed", self.speed),
            ("max_speed", self.max_speed),
            ("stay_in_bounds_factor", self.stay_in_bounds_factor),
        ]
    }

    /// Checks every range invariant. Run at configuration time so the per-tick
    /// rule never has to.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (field, value) in self.scalar_fields() {
            check_non_negative(field, value)?;
        }
        check_non_negative("bounds.x", self.bounds.x)?;
        check_non_negative("bounds.y", self.bounds.y)?;
        check_non_negative("bounds.z", self.bounds.z)?;

        if !self.center.is_finite() {
            return Err(ParamsError::NotFinite { field: "center" });
        }
        if !self.spawn_position.is_finite() {
            return Err(ParamsError::NotFinite {
                field: "spawn_position",
            });
        }
        Ok(())
    }

    /// Copy with every range-limited field forced into range. Non-finite
    /// values become zero.
    pub fn clamped(&self) -> Self {
        let mut params = *self;
        params.coherence_factor = clamp_non_negative(self.coherence_factor);
        params.min_distance = clamp_non_negative(self.min_distance);
        params.avoidance_factor = clamp_non_negative(self.avoidance_factor);
        params.alignment_factor = clamp_non_negative(self.alignment_factor);
        params.visual_range = clamp_non_negative(self.visual_range);
        params.speed = clamp_non_negative(self.speed);
        params.max_speed = clamp_non_negative(self.max_speed);
        params.stay_in_bounds_factor = clamp_non_negative(self.stay_in_bounds_factor);
        params.bounds = Vector3::new(
            clamp_non_negative(self.bounds.x),
            clamp_non_negative(self.bounds.y),
            clamp_non_negative(self.bounds.z),
        );
        params.center = finite_or_zero(self.center);
        params.spawn_position = finite_or_zero(self.spawn_position);
        params
    }

    pub fn min_corner(&self) -> Vector3 {
        self.center - self.bounds / 2.0
    }

    pub fn max_corner(&self) -> Vector3 {
        self.center + self.bounds / 2.0
    }
}

fn check_non_negative(field: &'static str, value: f32) -> Result<(), ParamsError> {
    if !value.is_finite() {
        return Err(ParamsError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ParamsError::Negative { field, value });
    }
    Ok(())
}

fn clamp_non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

fn finite_or_zero(v: Vector3) -> Vector3 {
    let fix = |c: f32| if c.is_finite() { c } else { 0.0 };
    Vector3::new(fix(v.x), fix(v.y), fix(v.z))
}
