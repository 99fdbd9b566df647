//! The flock: shared parameters, the agents, and the tick that drives them.

use alloc::vec::Vec;

use rand::Rng;

use crate::agent::{Agent, AgentId, AgentState, GroupId};
use crate::params::{FlockParams, ParamsError};
use crate::proximity::{Body, ProximityGrid};
use crate::vector::Vector3;

/// Counters describing a flock at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlockCounters {
    pub ticks: u64,
    pub agents: usize,
    pub contacts: usize,
}

/// A collection of agents sharing one set of parameters
#[derive(Debug, Clone)]
pub struct FlockSystem {
    group: GroupId,
    params: FlockParams,
    agents: Vec<Agent>,
    proximity: ProximityGrid,
    ticks: u64,
}

impl FlockSystem {
    /// Validates `params` and spawns `params.count` agents at the spawn
    /// position, each with a random unit heading drawn from `rng`.
    pub fn spawn<R: Rng + ?Sized>(
        group: GroupId,
        params: FlockParams,
        rng: &mut R,
    ) -> Result<Self, ParamsError> {
        params.validate()?;
        agent_id(params.count)?;

        let agents = (0..params.count)
            .map(|i| {
                let state = AgentState::new(params.spawn_position, random_heading(rng));
                agent_id(i).map(|id| Agent::new(id, group, state))
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Spawned flock {:?} with {} agents at {:?}",
            group,
            params.count,
            params.spawn_position
        );

        Ok(Self {
            group,
            params,
            agents,
            proximity: ProximityGrid::new(params.visual_range),
            ticks: 0,
        })
    }

    #[cfg(feature = "std")]
    pub fn new(group: GroupId, params: FlockParams) -> Result<Self, ParamsError> {
        Self::spawn(group, params, &mut rand::thread_rng())
    }

    /// Flock with explicitly placed agents, for hosts that restore or script
    /// a layout. Agent ids follow the order of `states`.
    pub fn from_states(
        group: GroupId,
        params: FlockParams,
        states: impl IntoIterator<Item = AgentState>,
    ) -> Result<Self, ParamsError> {
        params.validate()?;

        let agents = states
            .into_iter()
            .enumerate()
            .map(|(i, state)| agent_id(i).map(|id| Agent::new(id, group, state)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            group,
            params,
            agents,
            proximity: ProximityGrid::new(params.visual_range),
            ticks: 0,
        })
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    /// Replaces the parameters. Invalid values are rejected and the current
    /// parameters stay in force.
    pub fn set_params(&mut self, params: FlockParams) -> Result<(), ParamsError> {
        params.validate()?;
        log::debug!("Flock {:?} parameters updated", self.group);
        self.params = params;
        Ok(())
    }

    /// Edits the parameters in place, rolling back if the result is invalid.
    pub fn update_params<F>(&mut self, edit: F) -> Result<(), ParamsError>
    where
        F: FnOnce(&mut FlockParams),
    {
        let mut params = self.params;
        edit(&mut params);
        self.set_params(params)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.0 as usize)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn counters(&self) -> FlockCounters {
        FlockCounters {
            ticks: self.ticks,
            agents: self.agents.len(),
            contacts: self.proximity.contact_count(),
        }
    }

    pub fn bodies(&self) -> impl Iterator<Item = Body> + '_ {
        self.agents
            .iter()
            .map(|agent| Body::new(agent.id, agent.group, agent.position()))
    }

    /// Advances the flock by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.step_with(dt, &[]);
    }

    /// Advances the flock by `dt` seconds while `foreign` bodies from other
    /// flocks share the space. They take part in proximity detection but are
    /// never adopted as neighbors. Bodies carrying this flock's own group are
    /// ignored.
    pub fn step_with(&mut self, dt: f32, foreign: &[Body]) {
        let params = self.params;
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.refresh_neighbors(&params, foreign);

        let snapshot: Vec<AgentState> = self.agents.iter().map(|agent| agent.state).collect();
        let next = compute_next(&self.agents, &snapshot, &params, dt);

        for (agent, state) in self.agents.iter_mut().zip(next) {
            agent.commit(state);
        }
        self.ticks += 1;
    }

    fn refresh_neighbors(&mut self, params: &FlockParams, foreign: &[Body]) {
        self.proximity.set_radius(params.visual_range);

        let mut bodies: Vec<Body> = self.bodies().collect();
        bodies.extend(foreign.iter().filter(|body| body.group != self.group));

        for event in self.proximity.update(&bodies) {
            if event.observer_group() != self.group {
                continue;
            }
            if let Some(agent) = self.agents.get_mut(event.observer().0 as usize) {
                agent.on_proximity(&event);
            }
        }
    }
}

/// Id of the agent at `index`, which must fit the `u32` id space.
fn agent_id(index: usize) -> Result<AgentId, ParamsError> {
    u32::try_from(index)
        .map(AgentId)
        .map_err(|_| ParamsError::TooManyAgents { count: index })
}

fn neighbor_states(agent: &Agent, snapshot: &[AgentState]) -> Vec<AgentState> {
    agent
        .neighbors()
        .filter_map(|id| snapshot.get(id.0 as usize).copied())
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn compute_next(
    agents: &[Agent],
    snapshot: &[AgentState],
    params: &FlockParams,
    dt: f32,
) -> Vec<AgentState> {
    agents
        .iter()
        .map(|agent| agent.tick(dt, params, &neighbor_states(agent, snapshot)))
        .collect()
}

#[cfg(feature = "parallel")]
fn compute_next(
    agents: &[Agent],
    snapshot: &[AgentState],
    params: &FlockParams,
    dt: f32,
) -> Vec<AgentState> {
    use rayon::prelude::*;

    agents
        .par_iter()
        .map(|agent| agent.tick(dt, params, &neighbor_states(agent, snapshot)))
        .collect()
}

/// Random unit vector with components drawn uniformly from [-1, 1].
pub fn random_heading<R: Rng + ?Sized>(rng: &mut R) -> Vector3 {
    loop {
        let heading = Vector3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if heading.magnitude_squared() > 1.0e-6 {
            return heading.normalize();
        }
    }
}
