//! Event-driven neighbor tracking.
//!
//! Bodies are bucketed into a uniform grid whose cell edge equals the
//! detection radius, so a body only has to be compared against the 27 cells
//! around it. The grid remembers which pairs were in range after the last
//! update and reports only what changed, the way trigger volumes report
//! enter and exit.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::agent::{AgentId, GroupId};
use crate::math;
use crate::vector::Vector3;

const MIN_CELL_SIZE: f32 = 1.0e-3;

/// Identity of a body across every flock sharing the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyKey {
    pub group: GroupId,
    pub id: AgentId,
}

/// What the spatial backend knows about an agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: AgentId,
    pub group: GroupId,
    pub position: Vector3,
}

impl Body {
    pub fn new(id: AgentId, group: GroupId, position: Vector3) -> Self {
        Self {
            id,
            group,
            position,
        }
    }

    pub fn key(&self) -> BodyKey {
        BodyKey {
            group: self.group,
            id: self.id,
        }
    }
}

/// A change in the in-range relation, addressed to one side of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityEvent {
    Enter {
        observer: AgentId,
        observer_group: GroupId,
        other: AgentId,
        other_group: GroupId,
    },
    Exit {
        observer: AgentId,
        observer_group: GroupId,
        other: AgentId,
        other_group: GroupId,
    },
}

impl ProximityEvent {
    pub fn observer(&self) -> AgentId {
        match *self {
            ProximityEvent::Enter { observer, .. } | ProximityEvent::Exit { observer, .. } => {
                observer
            }
        }
    }

    pub fn observer_group(&self) -> GroupId {
        match *self {
            ProximityEvent::Enter { observer_group, .. }
            | ProximityEvent::Exit { observer_group, .. } => observer_group,
        }
    }

    fn enter(observer: BodyKey, other: BodyKey) -> Self {
        ProximityEvent::Enter {
            observer: observer.id,
            observer_group: observer.group,
            other: other.id,
            other_group: other.group,
        }
    }

    fn exit(observer: BodyKey, other: BodyKey) -> Self {
        ProximityEvent::Exit {
            observer: observer.id,
            observer_group: observer.group,
            other: other.id,
            other_group: other.group,
        }
    }
}

type CellKey = (i32, i32, i32);

/// Uniform grid proximity tracker
#[derive(Debug, Clone)]
pub struct ProximityGrid {
    radius: f32,
    cell_size: f32,
    cells: BTreeMap<CellKey, Vec<usize>>,
    // Pairs are stored once, smaller key first.
    contacts: BTreeSet<(BodyKey, BodyKey)>,
}

impl ProximityGrid {
    pub fn new(radius: f32) -> Self {
        let mut grid = Self {
            radius: 0.0,
            cell_size: MIN_CELL_SIZE,
            cells: BTreeMap::new(),
            contacts: BTreeSet::new(),
        };
        grid.set_radius(radius);
        grid
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Changes the detection radius. Takes effect on the next update.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        self.cell_size = self.radius.max(MIN_CELL_SIZE);
    }

    /// Re-buckets `bodies` and returns the enter/exit deltas since the last
    /// update. Two bodies are in range when strictly closer than the radius.
    /// Bodies missing from `bodies` leave all their pairs.
    pub fn update(&mut self, bodies: &[Body]) -> Vec<ProximityEvent> {
        self.cells.clear();
        for (slot, body) in bodies.iter().enumerate() {
            let cell = self.cell_of(body.position);
            self.cells.entry(cell).or_default().push(slot);
        }

        let radius_sq = self.radius * self.radius;
        let mut current = BTreeSet::new();

        for (slot, body) in bodies.iter().enumerate() {
            let (cx, cy, cz) = self.cell_of(body.position);
            for dz in -1..=1 {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let cell = (
                            cx.saturating_add(dx),
                            cy.saturating_add(dy),
                            cz.saturating_add(dz),
                        );
                        let Some(candidates) = self.cells.get(&cell) else {
                            continue;
                        };
                        for &other_slot in candidates {
                            if other_slot <= slot {
                                continue;
                            }
                            let other = &bodies[other_slot];
                            if body.position.distance_squared(&other.position) < radius_sq {
                                current.insert(ordered(body.key(), other.key()));
                            }
                        }
                    }
                }
            }
        }

        let mut events = Vec::new();
        for &(a, b) in current.difference(&self.contacts) {
            events.push(ProximityEvent::enter(a, b));
            events.push(ProximityEvent::enter(b, a));
        }
        for &(a, b) in self.contacts.difference(&current) {
            events.push(ProximityEvent::exit(a, b));
            events.push(ProximityEvent::exit(b, a));
        }

        log::trace!(
            "proximity update: {} bodies, {} contacts, {} events",
            bodies.len(),
            current.len(),
            events.len()
        );

        self.contacts = current;
        events
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn in_contact(&self, a: BodyKey, b: BodyKey) -> bool {
        self.contacts.contains(&ordered(a, b))
    }

    fn cell_of(&self, position: Vector3) -> CellKey {
        (
            math::floor(position.x / self.cell_size) as i32,
            math::floor(position.y / self.cell_size) as i32,
            math::floor(position.z / self.cell_size) as i32,
        )
    }
}

fn ordered(a: BodyKey, b: BodyKey) -> (BodyKey, BodyKey) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
