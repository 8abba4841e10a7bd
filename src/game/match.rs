//! Match context and authoritative tick loop

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::util::time::tick_interval;
use crate::ws::registry::{ConnId, ConnectionHandle, ConnectionRegistry};

use super::input::{parse_command, PaddleCommand};
use super::physics::{BounceRng, PhysicsSystem, StepOutcome};
use super::snapshot::SnapshotBuilder;
use super::state::GameState;
use super::EdgeMode;

/// Static rules for a match
#[derive(Debug, Clone, Copy)]
pub struct MatchRules {
    pub tick_interval: Duration,
    pub edge_mode: EdgeMode,
}

impl MatchRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_interval: tick_interval(config.tick_rate),
            edge_mode: config.edge_mode,
        }
    }
}

/// State plus the randomness that drives it, locked together
struct Engine {
    state: GameState,
    rng: Box<dyn BounceRng>,
}

/// Running simulation loop owned by the match
struct SimulationTask {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Lifecycle of the tick loop. `Closed` is terminal.
enum Simulation {
    Idle,
    Running(SimulationTask),
    Closed,
}

/// What happened to one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Unparseable; dropped
    Rejected,
    /// Parsed but named nobody we know
    Ignored,
    /// Applied and broadcast to the other peers
    Applied {
        match_started: bool,
    },
}

/// The single two-player match: game state, connected peers and the
/// simulation lifecycle.
///
/// Every snapshot is queued to peers while the engine lock is held, so
/// peers observe states in the order they were produced. Queueing never
/// blocks (`try_send`), which keeps the critical section short.
pub struct PongMatch {
    engine: Mutex<Engine>,
    connections: ConnectionRegistry,
    rules: MatchRules,
    simulation: Mutex<Simulation>,
}

impl PongMatch {
    pub fn new(rules: MatchRules, rng: Box<dyn BounceRng>) -> Self {
        Self {
            engine: Mutex::new(Engine {
                state: GameState::new(),
                rng,
            }),
            connections: ConnectionRegistry::new(),
            rules,
            simulation: Mutex::new(Simulation::Idle),
        }
    }

    /// Build a match from configuration, seeding the bounce RNG
    pub fn from_config(config: &Config) -> Self {
        let rng = match config.ball_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::new(MatchRules::from_config(config), Box::new(rng))
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Copy of the current state
    pub fn state(&self) -> GameState {
        self.engine.lock().state.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.simulation.lock(), Simulation::Running(_))
    }

    /// Register a new peer and send it the current snapshot
    pub fn connect(&self, handle: ConnectionHandle) {
        let id = handle.id;

        // Registered under the engine lock so no tick frame can reach the
        // peer ahead of its initial snapshot
        let engine = self.engine.lock();
        self.connections.add(handle.clone());

        match SnapshotBuilder::encode(&engine.state) {
            Ok(payload) => {
                if let Err(e) = handle.send(payload) {
                    debug!(conn_id = %id, error = %e, "Initial snapshot not delivered");
                    self.connections.remove(&id);
                }
            }
            Err(e) => error!(conn_id = %id, error = %e, "Failed to encode snapshot"),
        }
    }

    pub fn disconnect(&self, id: &ConnId) {
        self.connections.remove(id);
    }

    /// Apply one raw client message from `sender`
    pub fn handle_message(self: &Arc<Self>, sender: ConnId, raw: &str) -> InputOutcome {
        let command = match parse_command(raw) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(conn_id = %sender, "Ignoring command for unknown player");
                return InputOutcome::Ignored;
            }
            Err(e) => {
                warn!(conn_id = %sender, error = %e, "Discarding client message");
                return InputOutcome::Rejected;
            }
        };

        let match_started = self.apply_command(sender, command);
        if match_started {
            self.start_simulation();
        }

        InputOutcome::Applied { match_started }
    }

    fn apply_command(&self, sender: ConnId, command: PaddleCommand) -> bool {
        let mut engine = self.engine.lock();
        let outcome = engine.state.apply_move(command.slot, command.direction);

        match SnapshotBuilder::encode(&engine.state) {
            Ok(payload) => {
                self.connections.broadcast(&payload, Some(sender));
            }
            Err(e) => error!(error = %e, "Failed to encode snapshot"),
        }
        drop(engine);

        if outcome.became_ready {
            info!(conn_id = %sender, player = %command.slot, "Player ready");
        }

        outcome.match_started
    }

    /// Spawn the tick loop unless it is already running or the match has
    /// been shut down
    pub fn start_simulation(self: &Arc<Self>) {
        let mut slot = self.simulation.lock();
        match *slot {
            Simulation::Idle => {}
            Simulation::Running(_) => return,
            Simulation::Closed => {
                debug!("Match is shut down, not starting simulation");
                return;
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(self.clone().run(stop_rx));
        *slot = Simulation::Running(SimulationTask { stop_tx, join });

        info!(
            tick_ms = self.rules.tick_interval.as_millis() as u64,
            "Both players ready, match started"
        );
    }

    /// Tick until told to stop
    async fn run(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let period = self.rules.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                // Stop requested, or the owner is gone
                _ = stop_rx.changed() => break,
            }
        }

        debug!("Simulation loop stopped");
    }

    /// Run one simulation step and broadcast the result to everyone
    pub fn tick(&self) -> StepOutcome {
        let mut engine = self.engine.lock();
        let Engine { state, rng } = &mut *engine;
        let outcome = PhysicsSystem::step(state, &mut **rng, self.rules.edge_mode);

        if outcome != StepOutcome::Idle {
            match SnapshotBuilder::encode(state) {
                Ok(payload) => {
                    self.connections.broadcast(&payload, None);
                }
                Err(e) => error!(error = %e, "Failed to encode snapshot"),
            }
        }

        let scores = state.scores();
        drop(engine);

        if let StepOutcome::Scored(slot) = outcome {
            info!(
                player = %slot,
                score_p1 = scores.0,
                score_p2 = scores.1,
                "Point scored"
            );
        }

        outcome
    }

    /// Stop the loop, wait for it, then close every connection.
    /// Safe to call more than once; the loop can never start afterwards.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.simulation.lock(), Simulation::Closed);

        if let Simulation::Running(task) = previous {
            let _ = task.stop_tx.send(true);
            if let Err(e) = task.join.await {
                error!(error = %e, "Simulation task failed");
            }
        }

        let closed = self.connections.close_all();
        info!(closed, "Match shut down");
    }
}
