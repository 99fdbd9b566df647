#![cfg_attr(not(feature = "std"), no_std)]

//! Engine-agnostic boid flocking core.
//!
//! A [`FlockSystem`] owns the shared [`FlockParams`] and its agents. Every
//! call to [`FlockSystem::step`] refreshes neighbor sets through the
//! [`ProximityGrid`], computes each agent's next heading and position from
//! the previous tick's snapshot, then commits them all at once.

extern crate alloc;

mod math;

pub mod agent;
pub mod params;
pub mod proximity;
pub mod system;
pub mod vector;

pub use agent::{behavior, Agent, AgentId, AgentState, GroupId};
pub use params::{
    Behavior, Centroid, Containment, FlockParams, Integration, ParamsError, SeparationFalloff,
};
pub use proximity::{Body, BodyKey, ProximityEvent, ProximityGrid};
pub use system::{random_heading, FlockCounters, FlockSystem};
pub use vector::{Axis, Vector3};
