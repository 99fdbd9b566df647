use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use flock_core::FlockSystem;
use flock_shared::{AgentReport, FlockStatus, FrameReport};

use crate::config::{coords, SettingsWatcher};

/// Longest step a realtime clock will hand out, so a stalled host does not
/// throw the flock across the volume in one tick.
const MAX_REALTIME_DT: f32 = 0.25;

/// Source of the elapsed time fed to each tick
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    Fixed(f32),
    Realtime { last: Instant },
}

impl Clock {
    pub fn fixed(dt: f32) -> Self {
        Clock::Fixed(dt.max(0.0))
    }

    pub fn realtime() -> Self {
        Clock::Realtime {
            last: Instant::now(),
        }
    }

    /// Seconds since the previous tick.
    pub fn next_dt(&mut self) -> f32 {
        match self {
            Clock::Fixed(dt) => *dt,
            Clock::Realtime { last } => {
                let now = Instant::now();
                let dt = now.duration_since(*last).as_secs_f32();
                *last = now;
                dt.min(MAX_REALTIME_DT)
            }
        }
    }
}

/// How long to run and how often to report
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub ticks: u64,
    /// Write a frame every this many ticks; zero writes none.
    pub sample_every: u64,
    /// Minimum wall time per tick, for paced realtime runs.
    pub frame_interval: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 600,
            sample_every: 1,
            frame_interval: None,
        }
    }
}

/// Host loop around a flock: supplies `dt`, applies live settings and
/// publishes frames for a renderer.
pub struct Driver {
    system: FlockSystem,
    clock: Clock,
    elapsed: f32,
}

impl Driver {
    pub fn new(system: FlockSystem, clock: Clock) -> Self {
        Self {
            system,
            clock,
            elapsed: 0.0,
        }
    }

    pub fn system(&self) -> &FlockSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut FlockSystem {
        &mut self.system
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advances one tick and returns the `dt` used.
    pub fn tick(&mut self) -> f32 {
        let dt = self.clock.next_dt();
        self.system.step(dt);
        self.elapsed += dt;
        dt
    }

    pub fn frame(&self) -> FrameReport {
        let agents = self
            .system
            .agents()
            .iter()
            .map(|agent| AgentReport {
                id: agent.id.0,
                position: coords(agent.position()),
                heading: coords(agent.heading()),
                forward: coords(agent.forward()),
                neighbors: agent.neighbor_count(),
            })
            .collect();

        FrameReport {
            tick: self.system.ticks(),
            elapsed: self.elapsed,
            agents,
        }
    }

    pub fn status(&self) -> FlockStatus {
        let counters = self.system.counters();
        FlockStatus {
            ticks: counters.ticks,
            agent_count: counters.agents,
            contacts: counters.contacts,
            elapsed: self.elapsed,
        }
    }

    /// Runs the loop, writing sampled frames to `out` as JSON lines.
    pub fn run<W: Write>(
        &mut self,
        options: &RunOptions,
        out: &mut W,
        mut watcher: Option<&mut SettingsWatcher>,
    ) -> Result<FlockStatus> {
        log::info!(
            "Running {} ticks over {} agents",
            options.ticks,
            self.system.agents().len()
        );

        for _ in 0..options.ticks {
            let started = Instant::now();

            if let Some(params) = watcher.as_deref_mut().and_then(SettingsWatcher::poll) {
                if params.count != self.system.params().count {
                    log::debug!("Agent count changes only apply to a new run");
                }
                if let Err(e) = self.system.set_params(params) {
                    log::warn!("Rejected reloaded settings: {}", e);
                }
            }

            self.tick();

            let tick = self.system.ticks();
            if options.sample_every > 0 && tick % options.sample_every == 0 {
                serde_json::to_writer(&mut *out, &self.frame())
                    .context("Failed to encode frame")?;
                writeln!(out).context("Failed to write frame")?;
                log::debug!("Frame {} written", tick);
            }

            if let Some(interval) = options.frame_interval {
                if let Some(rest) = interval.checked_sub(started.elapsed()) {
                    thread::sleep(rest);
                }
            }
        }

        out.flush().context("Failed to flush output")?;

        let status = self.status();
        log::info!(
            "Finished after {} ticks ({:.2}s simulated, {} contacts)",
            status.ticks,
            status.elapsed,
            status.contacts
        );
        Ok(status)
    }
}
