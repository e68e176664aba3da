// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Simulation context: time step, seeds and run lifecycle.

Everything a backend would otherwise keep in process-wide state lives in a
[`SimulationContext`] value, so several simulations can be set up side by side.

Seeding follows two streams derived from the global seed:
- *properties* seeds drive anything sampled while building the network
  (random connection properties, connectivity);
- *dynamics* seeds drive anything sampled while running (stochastic
  transitions, Poisson sources).

Either stream can be pinned on its own, which keeps the built network fixed
while the run-time randomness changes (or the reverse). Per-object seeds are
xxh64 digests of the object name under the stream seed, so they depend only
on the seeds and the name.
*/

use crate::error::{BackendError, BackendResult};
use ninefold_dynamics::{Dimension, Quantity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use xxhash_rust::xxh64::xxh64;

const PROPERTIES_STREAM: &[u8] = b"properties";
const DYNAMICS_STREAM: &[u8] = b"dynamics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationState::Idle => write!(f, "idle"),
            SimulationState::Running => write!(f, "running"),
            SimulationState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationContextBuilder {
    dt: Quantity,
    seed: Option<u64>,
    properties_seed: Option<u64>,
    dynamics_seed: Option<u64>,
}

impl SimulationContextBuilder {
    /// Global seed; drawn from the thread RNG when not set
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pin the properties stream independently of the global seed
    pub fn properties_seed(mut self, seed: u64) -> Self {
        self.properties_seed = Some(seed);
        self
    }

    /// Pin the dynamics stream independently of the global seed
    pub fn dynamics_seed(mut self, seed: u64) -> Self {
        self.dynamics_seed = Some(seed);
        self
    }

    pub fn build(self) -> BackendResult<SimulationContext> {
        if self.dt.dimension() != Dimension::TIME {
            return Err(BackendError::Invalid {
                context: "simulation time step".to_string(),
                detail: format!("{} is not a time", self.dt),
            });
        }
        match self.dt.value.as_single() {
            Some(dt) if dt > 0.0 && dt.is_finite() => {}
            _ => {
                return Err(BackendError::Invalid {
                    context: "simulation time step".to_string(),
                    detail: format!("{} must be a single positive value", self.dt),
                })
            }
        }

        let global_seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let properties_seed = self
            .properties_seed
            .unwrap_or_else(|| xxh64(PROPERTIES_STREAM, global_seed));
        let dynamics_seed = self
            .dynamics_seed
            .unwrap_or_else(|| xxh64(DYNAMICS_STREAM, global_seed));
        debug!(
            target: "ninefold-backend",
            "Simulation context: dt={}, global seed {}, properties seed {}, dynamics seed {}",
            self.dt,
            global_seed,
            properties_seed,
            dynamics_seed
        );
        Ok(SimulationContext {
            dt: self.dt,
            global_seed,
            properties_seed,
            dynamics_seed,
            state: SimulationState::Idle,
            elapsed: 0.0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationContext {
    dt: Quantity,
    global_seed: u64,
    properties_seed: u64,
    dynamics_seed: u64,
    state: SimulationState,
    /// Simulated time in units of `dt`
    elapsed: f64,
}

impl SimulationContext {
    pub fn builder(dt: Quantity) -> SimulationContextBuilder {
        SimulationContextBuilder {
            dt,
            seed: None,
            properties_seed: None,
            dynamics_seed: None,
        }
    }

    /// Context with a fixed global seed
    pub fn new(dt: Quantity, seed: u64) -> BackendResult<Self> {
        Self::builder(dt).seed(seed).build()
    }

    pub fn dt(&self) -> &Quantity {
        &self.dt
    }

    pub fn global_seed(&self) -> u64 {
        self.global_seed
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Simulated time so far, in the units of `dt`
    pub fn time(&self) -> Quantity {
        Quantity::new(self.elapsed, self.dt.units.clone())
    }

    /// Seed for sampling the properties of `name` (a population, projection...)
    pub fn properties_seed(&self, name: &str) -> u64 {
        xxh64(name.as_bytes(), self.properties_seed)
    }

    /// Seed for the run-time randomness of `name`
    pub fn dynamics_seed(&self, name: &str) -> u64 {
        xxh64(name.as_bytes(), self.dynamics_seed)
    }

    pub fn properties_rng(&self, name: &str) -> StdRng {
        StdRng::seed_from_u64(self.properties_seed(name))
    }

    pub fn dynamics_rng(&self, name: &str) -> StdRng {
        StdRng::seed_from_u64(self.dynamics_seed(name))
    }

    pub fn start(&mut self) -> BackendResult<()> {
        self.transition("start", SimulationState::Idle, SimulationState::Running)?;
        info!(target: "ninefold-backend", "▶️ Simulation started (dt={})", self.dt);
        Ok(())
    }

    /// Advance simulated time by `duration`, rounded up to whole steps
    pub fn run(&mut self, duration: &Quantity) -> BackendResult<u64> {
        if self.state != SimulationState::Running {
            return Err(BackendError::Lifecycle {
                action: "run",
                state: self.state,
            });
        }
        if duration.dimension() != Dimension::TIME {
            return Err(BackendError::Invalid {
                context: "run duration".to_string(),
                detail: format!("{} is not a time", duration),
            });
        }
        let (Some(value), Some(dt)) = (duration.value.as_single(), self.dt.value.as_single())
        else {
            return Err(BackendError::Invalid {
                context: "run duration".to_string(),
                detail: format!("{} must be a single value", duration),
            });
        };
        if value < 0.0 {
            return Err(BackendError::Invalid {
                context: "run duration".to_string(),
                detail: format!("{} is negative", duration),
            });
        }
        // Express the duration in the units of dt
        let scale = 10f64.powi(i32::from(duration.units.power) - i32::from(self.dt.units.power));
        let steps = (value * scale / dt).ceil() as u64;
        self.elapsed += steps as f64 * dt;
        Ok(steps)
    }

    pub fn stop(&mut self) -> BackendResult<()> {
        self.transition("stop", SimulationState::Running, SimulationState::Stopped)?;
        info!(
            target: "ninefold-backend",
            "⏹️ Simulation stopped at t={}",
            self.time()
        );
        Ok(())
    }

    fn transition(
        &mut self,
        action: &'static str,
        from: SimulationState,
        to: SimulationState,
    ) -> BackendResult<()> {
        if self.state != from {
            return Err(BackendError::Lifecycle {
                action,
                state: self.state,
            });
        }
        self.state = to;
        Ok(())
    }
}
