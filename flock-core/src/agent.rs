//! A single flocking agent and the per-tick steering rule.
//!
//! Each tick the heading collects three steering contributions from the
//! neighbor snapshot, in this order:
//! 1. Cohesion: toward the centroid of the neighbors
//! 2. Separation: away from neighbors closer than `min_distance`
//! 3. Alignment: toward the average neighbor heading
//!
//! then gets speed-limited and kept inside the containment volume before
//! the position is integrated.

use alloc::collections::BTreeSet;

use crate::params::{Centroid, Containment, FlockParams, Integration, SeparationFalloff};
use crate::proximity::ProximityEvent;
use crate::vector::Vector3;

/// Identifier of an agent inside its flock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub u32);

/// Identifier of the flock an agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GroupId(pub u32);

/// The part of an agent its neighbors are allowed to read.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentState {
    pub position: Vector3,
    pub heading: Vector3,
}

impl AgentState {
    pub fn new(position: Vector3, heading: Vector3) -> Self {
        Self { position, heading }
    }
}

/// A single boid
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub group: GroupId,
    pub state: AgentState,
    forward: Vector3,
    neighbors: BTreeSet<AgentId>,
}

impl Agent {
    pub fn new(id: AgentId, group: GroupId, state: AgentState) -> Self {
        let forward = match state.heading.normalize() {
            f if f == Vector3::zero() => Vector3::new(0.0, 0.0, 1.0),
            f => f,
        };
        Self {
            id,
            group,
            state,
            forward,
            neighbors: BTreeSet::new(),
        }
    }

    pub fn position(&self) -> Vector3 {
        self.state.position
    }

    pub fn heading(&self) -> Vector3 {
        self.state.heading
    }

    /// Unit facing direction for rendering. Holds the last non-zero heading.
    pub fn forward(&self) -> Vector3 {
        self.forward
    }

    pub fn neighbors(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.neighbors.iter().copied()
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn has_neighbor(&self, other: AgentId) -> bool {
        self.neighbors.contains(&other)
    }

    /// Adds `other` when it belongs to the same flock. Returns whether the
    /// neighbor set changed.
    pub fn on_proximity_enter(&mut self, other: AgentId, other_group: GroupId) -> bool {
        if other == self.id || other_group != self.group {
            return false;
        }
        self.neighbors.insert(other)
    }

    /// Removes `other` when it belongs to the same flock. Returns whether the
    /// neighbor set changed.
    pub fn on_proximity_exit(&mut self, other: AgentId, other_group: GroupId) -> bool {
        if other_group != self.group {
            return false;
        }
        self.neighbors.remove(&other)
    }

    /// Routes a proximity delta addressed to this agent.
    pub fn on_proximity(&mut self, event: &ProximityEvent) -> bool {
        if event.observer() != self.id || event.observer_group() != self.group {
            return false;
        }
        match *event {
            ProximityEvent::Enter {
                other, other_group, ..
            } => self.on_proximity_enter(other, other_group),
            ProximityEvent::Exit {
                other, other_group, ..
            } => self.on_proximity_exit(other, other_group),
        }
    }

    /// Computes the next state from a neighbor snapshot. Pure: the agent is
    /// not touched, so every agent of a tick can read the same snapshot.
    pub fn tick(&self, dt: f32, params: &FlockParams, neighbors: &[AgentState]) -> AgentState {
        behavior::step(&self.state, dt, params, neighbors)
    }

    /// Installs the state computed by [`Agent::tick`].
    pub fn commit(&mut self, next: AgentState) {
        self.state = next;
        let facing = next.heading.normalize();
        if facing != Vector3::zero() {
            self.forward = facing;
        }
    }
}

/// Steering contributions as free functions over a neighbor snapshot
pub mod behavior {
    use super::*;
    use crate::math;
    use crate::vector::Axis;

    /// Full update rule: cohesion, separation, alignment, speed limit,
    /// containment, integration.
    pub fn step(
        state: &AgentState,
        dt: f32,
        params: &FlockParams,
        neighbors: &[AgentState],
    ) -> AgentState {
        let mut heading = state.heading;
        heading += cohesion(state, neighbors, params);
        heading += separation(state, neighbors, params);
        heading += alignment(neighbors, params);

        if params.behavior.containment == Containment::LimitThenSteer {
            heading = limit_speed(heading, params.max_speed);
        }
        heading = contain(state.position, heading, params);

        AgentState {
            position: integrate(state.position, heading, params, dt),
            heading,
        }
    }

    pub fn cohesion(state: &AgentState, neighbors: &[AgentState], params: &FlockParams) -> Vector3 {
        if neighbors.is_empty() {
            return Vector3::zero();
        }

        let sum: Vector3 = neighbors.iter().map(|n| n.position).sum();
        let centroid = match params.behavior.centroid {
            Centroid::Neighbors => sum / neighbors.len() as f32,
            Centroid::IncludeSelf => (sum + state.position) / (neighbors.len() + 1) as f32,
        };
        (centroid - state.position) * params.coherence_factor
    }

    pub fn separation(
        state: &AgentState,
        neighbors: &[AgentState],
        params: &FlockParams,
    ) -> Vector3 {
        let mut push = Vector3::zero();

        for other in neighbors {
            let distance = state.position.distance(&other.position);
            if distance >= params.min_distance {
                continue;
            }
            let away = (state.position - other.position).normalize();
            match params.behavior.separation {
                SeparationFalloff::InverseDistance => {
                    if distance > 0.0 {
                        push += away / distance;
                    }
                }
                SeparationFalloff::Unweighted => push += away,
            }
        }

        push * params.avoidance_factor
    }

    pub fn alignment(neighbors: &[AgentState], params: &FlockParams) -> Vector3 {
        if neighbors.is_empty() {
            return Vector3::zero();
        }

        let sum: Vector3 = neighbors.iter().map(|n| n.heading).sum();
        sum / neighbors.len() as f32 * params.alignment_factor
    }

    pub fn limit_speed(heading: Vector3, max_speed: f32) -> Vector3 {
        heading.limit(max_speed)
    }

    /// Steers each axis on which `position` lies outside the volume back
    /// toward the interior. Axes inside the volume are left alone.
    pub fn contain(position: Vector3, heading: Vector3, params: &FlockParams) -> Vector3 {
        let min = params.min_corner();
        let max = params.max_corner();
        let mut out = heading;

        for axis in Axis::ALL {
            let p = position.get(axis);
            let inward = if p < min.get(axis) {
                1.0
            } else if p > max.get(axis) {
                -1.0
            } else {
                continue;
            };
            let magnitude = math::abs(heading.get(axis));

            match params.behavior.containment {
                Containment::LimitThenSteer => {
                    let mut corrected =
                        heading.get(axis) + inward * magnitude * params.stay_in_bounds_factor;
                    // A weak factor can cancel the outward axis without
                    // turning it; the axis must end up pointing inward.
                    if corrected * inward <= 0.0 {
                        corrected = inward * magnitude;
                    }
                    out.set(axis, corrected);
                }
                Containment::HardClamp => out.set(axis, inward * magnitude),
            }
        }

        out
    }

    pub fn integrate(position: Vector3, heading: Vector3, params: &FlockParams, dt: f32) -> Vector3 {
        match params.behavior.integration {
            Integration::TimeScaled => {
                let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
                position + heading.normalize() * params.speed * dt
            }
            Integration::PerTick => position + heading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::behavior::*;
    use super::*;
    use crate::params::Behavior;

    const EPS: f32 = 1e-5;

    fn quiet_params() -> FlockParams {
        FlockParams {
            coherence_factor: 0.0,
            min_distance: 0.0,
            avoidance_factor: 0.0,
            alignment_factor: 0.0,
            visual_range: 100.0,
            speed: 1.0,
            max_speed: 1000.0,
            stay_in_bounds_factor: 1.0,
            center: Vector3::zero(),
            bounds: Vector3::splat(1000.0),
            spawn_position: Vector3::zero(),
            count: 0,
            behavior: Behavior::default(),
        }
    }

    fn at(x: f32, y: f32, z: f32) -> AgentState {
        AgentState::new(Vector3::new(x, y, z), Vector3::zero())
    }

    fn approx(a: Vector3, b: Vector3) -> bool {
        (a - b).magnitude() < EPS
    }

    #[test]
    fn test_isolated_agent_has_no_social_terms() {
        let params = FlockParams {
            coherence_factor: 3.0,
            alignment_factor: 2.0,
            avoidance_factor: 5.0,
            min_distance: 10.0,
            ..quiet_params()
        };
        let state = AgentState::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.5, 0.0, 0.0));

        assert_eq!(cohesion(&state, &[], &params), Vector3::zero());
        assert_eq!(alignment(&[], &params), Vector3::zero());
        assert_eq!(separation(&state, &[], &params), Vector3::zero());

        let next = step(&state, 1.0, &params, &[]);
        assert_eq!(next.heading, state.heading);
    }

    #[test]
    fn test_cohesion_pulls_toward_centroid() {
        let params = FlockParams {
            coherence_factor: 0.5,
            ..quiet_params()
        };
        let me = at(0.0, 0.0, 0.0);
        let neighbors = [at(10.0, 0.0, 0.0), at(0.0, 10.0, 0.0)];

        let pull = cohesion(&me, &neighbors, &params);
        assert!(approx(pull, Vector3::new(2.5, 2.5, 0.0)));
    }

    #[test]
    fn test_cohesion_centroid_including_self() {
        let mut params = FlockParams {
            coherence_factor: 0.5,
            ..quiet_params()
        };
        params.behavior.centroid = Centroid::IncludeSelf;

        let pull = cohesion(&at(0.0, 0.0, 0.0), &[at(10.0, 0.0, 0.0)], &params);
        assert!(approx(pull, Vector3::new(2.5, 0.0, 0.0)));
    }

    #[test]
    fn test_separation_boundary_is_exclusive() {
        let params = FlockParams {
            min_distance: 2.0,
            avoidance_factor: 1.0,
            ..quiet_params()
        };
        let push = separation(&at(0.0, 0.0, 0.0), &[at(2.0, 0.0, 0.0)], &params);
        assert_eq!(push, Vector3::zero());
    }

    #[test]
    fn test_separation_points_away_and_grows_when_closer() {
        let params = FlockParams {
            min_distance: 5.0,
            avoidance_factor: 1.0,
            ..quiet_params()
        };
        let me = at(0.0, 0.0, 0.0);

        let far = separation(&me, &[at(4.0, 0.0, 0.0)], &params);
        let near = separation(&me, &[at(1.0, 0.0, 0.0)], &params);

        assert!(approx(far, Vector3::new(-0.25, 0.0, 0.0)));
        assert!(approx(near, Vector3::new(-1.0, 0.0, 0.0)));
        assert!(near.magnitude() > far.magnitude());
    }

    #[test]
    fn test_separation_skips_coincident_neighbor() {
        let params = FlockParams {
            min_distance: 5.0,
            avoidance_factor: 1.0,
            ..quiet_params()
        };
        let push = separation(&at(1.0, 1.0, 1.0), &[at(1.0, 1.0, 1.0)], &params);
        assert_eq!(push, Vector3::zero());
        assert!(push.is_finite());
    }

    #[test]
    fn test_unweighted_separation_ignores_distance() {
        let mut params = FlockParams {
            min_distance: 5.0,
            avoidance_factor: 2.0,
            ..quiet_params()
        };
        params.behavior.separation = SeparationFalloff::Unweighted;
        let me = at(0.0, 0.0, 0.0);

        let far = separation(&me, &[at(0.0, 4.0, 0.0)], &params);
        let near = separation(&me, &[at(0.0, 1.0, 0.0)], &params);
        assert!(approx(far, Vector3::new(0.0, -2.0, 0.0)));
        assert!(approx(near, far));

        let coincident = separation(&me, &[me], &params);
        assert_eq!(coincident, Vector3::zero());
    }

    #[test]
    fn test_alignment_averages_headings() {
        let params = FlockParams {
            alignment_factor: 0.5,
            ..quiet_params()
        };
        let neighbors = [
            AgentState::new(Vector3::zero(), Vector3::new(2.0, 0.0, 0.0)),
            AgentState::new(Vector3::zero(), Vector3::new(0.0, 0.0, 4.0)),
        ];
        let steer = alignment(&neighbors, &params);
        assert!(approx(steer, Vector3::new(0.5, 0.0, 1.0)));
    }

    #[test]
    fn test_speed_limit_exact_magnitude() {
        let heading = Vector3::new(3.0, -4.0, 12.0);
        let limited = limit_speed(heading, 2.0);
        assert!((limited.magnitude() - 2.0).abs() < EPS);
        assert!(approx(limited.normalize(), heading.normalize()));
    }

    #[test]
    fn test_containment_steers_back_inside() {
        let params = FlockParams {
            bounds: Vector3::splat(10.0),
            stay_in_bounds_factor: 2.0,
            ..quiet_params()
        };
        let heading = Vector3::new(-1.0, 1.0, 0.5);

        let below_x = contain(Vector3::new(-6.0, 0.0, 0.0), heading, &params);
        assert!(approx(below_x, Vector3::new(1.0, 1.0, 0.5)));

        let above_y = contain(Vector3::new(0.0, 6.0, 0.0), heading, &params);
        assert!(approx(above_y, Vector3::new(-1.0, -1.0, 0.5)));

        let inside = contain(Vector3::zero(), heading, &params);
        assert_eq!(inside, heading);
    }

    #[test]
    fn test_containment_turns_escaping_axis_with_unit_factor() {
        let params = FlockParams {
            bounds: Vector3::splat(10.0),
            ..quiet_params()
        };
        assert_eq!(params.stay_in_bounds_factor, 1.0);

        let out = contain(
            Vector3::new(6.0, 0.0, -6.0),
            Vector3::new(2.0, 1.0, -0.5),
            &params,
        );
        assert_eq!(out, Vector3::new(-2.0, 1.0, 0.5));

        let mut weak = params;
        weak.stay_in_bounds_factor = 0.0;
        let out = contain(Vector3::new(6.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0), &weak);
        assert_eq!(out, Vector3::new(-2.0, 0.0, 0.0));

        let inward = contain(Vector3::new(6.0, 0.0, 0.0), Vector3::new(-2.0, 0.0, 0.0), &weak);
        assert_eq!(inward, Vector3::new(-2.0, 0.0, 0.0));
    }

    #[test]
    fn test_hard_clamp_flips_escaping_axes() {
        let mut params = FlockParams {
            bounds: Vector3::splat(10.0),
            ..quiet_params()
        };
        params.behavior.containment = Containment::HardClamp;

        let out = contain(
            Vector3::new(6.0, -6.0, 0.0),
            Vector3::new(3.0, -2.0, 1.0),
            &params,
        );
        assert_eq!(out, Vector3::new(-3.0, 2.0, 1.0));

        let already_inward = contain(
            Vector3::new(6.0, 0.0, 0.0),
            Vector3::new(-3.0, 0.0, 0.0),
            &params,
        );
        assert_eq!(already_inward, Vector3::new(-3.0, 0.0, 0.0));
    }

    #[test]
    fn test_hard_clamp_skips_speed_limit() {
        let mut params = FlockParams {
            max_speed: 1.0,
            ..quiet_params()
        };
        params.behavior.containment = Containment::HardClamp;
        let state = AgentState::new(Vector3::zero(), Vector3::new(5.0, 0.0, 0.0));

        let next = step(&state, 1.0, &params, &[]);
        assert_eq!(next.heading, Vector3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_time_scaled_integration() {
        let params = FlockParams {
            speed: 4.0,
            ..quiet_params()
        };
        let moved = integrate(Vector3::zero(), Vector3::new(0.0, 10.0, 0.0), &params, 0.5);
        assert!(approx(moved, Vector3::new(0.0, 2.0, 0.0)));

        let frozen = integrate(Vector3::zero(), Vector3::new(0.0, 10.0, 0.0), &params, -1.0);
        assert_eq!(frozen, Vector3::zero());
    }

    #[test]
    fn test_per_tick_integration_ignores_dt() {
        let mut params = quiet_params();
        params.behavior.integration = Integration::PerTick;
        let heading = Vector3::new(1.0, 2.0, 3.0);

        assert_eq!(integrate(Vector3::zero(), heading, &params, 0.016), heading);
        assert_eq!(integrate(Vector3::zero(), heading, &params, 1.0), heading);
    }

    #[test]
    fn test_tick_is_pure() {
        let params = FlockParams::default();
        let agent = Agent::new(
            AgentId(0),
            GroupId(0),
            AgentState::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.3, -0.2, 0.9)),
        );
        let neighbors = [
            AgentState::new(Vector3::new(2.0, 2.0, 3.0), Vector3::new(1.0, 0.0, 0.0)),
            AgentState::new(Vector3::new(1.0, 5.0, 3.0), Vector3::new(0.0, 0.0, -1.0)),
        ];

        let first = agent.tick(0.1, &params, &neighbors);
        let second = agent.tick(0.1, &params, &neighbors);
        assert_eq!(first, second);
        assert_eq!(agent.position(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_neighbor_membership_filters_group_and_self() {
        let mut agent = Agent::new(AgentId(1), GroupId(7), AgentState::default());

        assert!(!agent.on_proximity_enter(AgentId(1), GroupId(7)));
        assert!(!agent.on_proximity_enter(AgentId(2), GroupId(8)));
        assert!(agent.on_proximity_enter(AgentId(3), GroupId(7)));
        assert!(!agent.on_proximity_enter(AgentId(3), GroupId(7)));
        assert_eq!(agent.neighbor_count(), 1);

        assert!(!agent.on_proximity_exit(AgentId(3), GroupId(8)));
        assert!(agent.has_neighbor(AgentId(3)));
        assert!(agent.on_proximity_exit(AgentId(3), GroupId(7)));
        assert_eq!(agent.neighbor_count(), 0);
    }

    #[test]
    fn test_events_route_to_their_observer() {
        let mut agent = Agent::new(AgentId(0), GroupId(2), AgentState::default());
        let enter = |observer, observer_group| ProximityEvent::Enter {
            observer: AgentId(observer),
            observer_group: GroupId(observer_group),
            other: AgentId(5),
            other_group: GroupId(2),
        };

        assert!(!agent.on_proximity(&enter(1, 2)));
        assert!(!agent.on_proximity(&enter(0, 3)));
        assert!(agent.on_proximity(&enter(0, 2)));
        assert!(agent.has_neighbor(AgentId(5)));

        assert!(agent.on_proximity(&ProximityEvent::Exit {
            observer: AgentId(0),
            observer_group: GroupId(2),
            other: AgentId(5),
            other_group: GroupId(2),
        }));
        assert_eq!(agent.neighbor_count(), 0);
    }

    #[test]
    fn test_forward_keeps_last_facing() {
        let mut agent = Agent::new(
            AgentId(0),
            GroupId(0),
            AgentState::new(Vector3::zero(), Vector3::new(0.0, 3.0, 0.0)),
        );
        assert_eq!(agent.forward(), Vector3::new(0.0, 1.0, 0.0));

        agent.commit(AgentState::new(Vector3::zero(), Vector3::zero()));
        assert_eq!(agent.forward(), Vector3::new(0.0, 1.0, 0.0));

        let still = Agent::new(AgentId(1), GroupId(0), AgentState::default());
        assert_eq!(still.forward(), Vector3::new(0.0, 0.0, 1.0));
    }
}
