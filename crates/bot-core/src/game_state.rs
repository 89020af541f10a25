// game_state.rs
//
// Owns the avatar's predicted position/orientation and drives the fixed
// 20 Hz movement tick. Server corrections overwrite the prediction
// wholesale; there is no blending.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::events::{MovePlayerPacket, OutboundPacket, Rotation, StartGamePacket, Vec3};
use crate::player::auth_input::{AuthInputPacket, build_auth_input};
use crate::player::movement::Wander;

/// Avatar state proper. Created empty at startup, populated once by
/// `start_game`, then advanced by the tick and by server corrections.
#[derive(Debug)]
pub struct GameState {
    position: Option<Vec3>,
    rotation: Rotation,
    runtime_entity_id: Option<u64>,
    current_tick: u64,
    seed: Option<i64>,
    spawned: bool,
    started: bool,
    wander: Wander,
}

impl GameState {
    pub fn new(wander: Wander) -> Self {
        Self {
            position: None,
            rotation: Rotation::default(),
            runtime_entity_id: None,
            current_tick: 0,
            seed: None,
            spawned: false,
            started: false,
            wander,
        }
    }

    pub fn spawn(&mut self) {
        self.spawned = true;
    }

    /// Captures the session baseline. Returns `false` when the session
    /// already started; a second `start_game` is ignored.
    pub fn start_game(&mut self, packet: &StartGamePacket) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        self.spawned = true;
        self.seed = Some(packet.seed);
        self.runtime_entity_id = Some(packet.runtime_entity_id);
        self.position = Some(packet.player_position);
        self.rotation = Rotation {
            pitch: packet.rotation.x,
            yaw: packet.rotation.y,
            head_yaw: packet.rotation.y,
        };
        self.current_tick = packet.current_tick;
        true
    }

    pub fn set_tick(&mut self, tick: u64) {
        self.current_tick = tick;
    }

    /// Authoritative correction from the server: last write wins.
    pub fn set_position_from_server(
        &mut self,
        position: Vec3,
        pitch: f64,
        yaw: f64,
        head_yaw: f64,
    ) {
        self.position = Some(position);
        self.rotation = Rotation {
            pitch,
            yaw,
            head_yaw,
        };
    }

    /// One movement tick: draw a wander displacement, assemble the auth
    /// input packet, and advance the predicted state. `None` until a
    /// baseline position is known.
    pub fn random_move(&mut self) -> Option<AuthInputPacket> {
        let position = self.position?;
        let delta = self.wander.next_vector();
        let (state, packet) = build_auth_input(
            position,
            self.rotation,
            delta,
            self.current_tick.saturating_add(1),
            false,
            false,
        );
        self.position = Some(state.position);
        self.rotation = state.rotation;
        Some(packet)
    }

    pub fn position(&self) -> Option<Vec3> {
        self.position
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn runtime_entity_id(&self) -> Option<u64> {
        self.runtime_entity_id
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn seed(&self) -> Option<i64> {
        self.seed
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

/// Controller handle: shares the state with the tick task and routes
/// session events into it.
pub struct GameStateHandle {
    state: Arc<Mutex<GameState>>,
    outbound: mpsc::Sender<OutboundPacket>,
    tick_interval: Duration,
    tick_task: Option<JoinHandle<()>>,
}

impl GameStateHandle {
    pub fn new(
        wander: Wander,
        tick_interval: Duration,
        outbound: mpsc::Sender<OutboundPacket>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(GameState::new(wander))),
            outbound,
            tick_interval,
            tick_task: None,
        }
    }

    pub fn state(&self) -> Arc<Mutex<GameState>> {
        Arc::clone(&self.state)
    }

    pub async fn handle_spawn(&self) {
        self.state.lock().await.spawn();
        info!("spawned");
    }

    /// Session start: capture the baseline, run the loading-screen
    /// handshake, and kick off the movement timer.
    pub async fn handle_start_game(&mut self, packet: StartGamePacket) -> anyhow::Result<()> {
        let runtime_entity_id = packet.runtime_entity_id;
        let started = self.state.lock().await.start_game(&packet);
        if !started {
            debug!("duplicate start_game ignored");
            return Ok(());
        }
        info!(
            runtime_entity_id,
            tick = packet.current_tick,
            "session started"
        );

        self.outbound
            .send(OutboundPacket::LoadingScreen { screen_type: 1 })
            .await?;
        self.outbound
            .send(OutboundPacket::LoadingScreen { screen_type: 2 })
            .await?;
        self.outbound
            .send(OutboundPacket::Interact {
                action_id: "mouse_over_entity".to_string(),
                target_entity_id: 0,
                position: Vec3::default(),
            })
            .await?;
        self.outbound
            .send(OutboundPacket::LocalPlayerInitialized { runtime_entity_id })
            .await?;

        self.start_tick();
        Ok(())
    }

    /// Every `move_player` refreshes the authoritative tick; one that
    /// targets our own runtime id also overwrites the prediction.
    pub async fn handle_move_player(&self, packet: MovePlayerPacket) {
        let mut state = self.state.lock().await;
        state.set_tick(packet.tick);
        match state.runtime_entity_id() {
            Some(id) if id == packet.runtime_id => {
                state.set_position_from_server(
                    packet.position,
                    packet.pitch,
                    packet.yaw,
                    packet.head_yaw,
                );
            }
            Some(_) => {}
            None => {
                warn!(
                    runtime_id = packet.runtime_id,
                    "move_player before identity is bound, dropping"
                );
            }
        }
    }

    /// (Re)starts the movement timer. An already-running task is torn
    /// down first so a stray second start never doubles the tick rate.
    pub fn start_tick(&mut self) {
        if let Some(task) = self.tick_task.take() {
            warn!("tick task already running, restarting");
            task.abort();
        }

        let state = Arc::clone(&self.state);
        let outbound = self.outbound.clone();
        let period = self.tick_interval;
        self.tick_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let packet = {
                    let mut state = state.lock().await;
                    let packet = state.random_move();
                    match &packet {
                        Some(_) => {
                            if state.current_tick() % 50 == 0 {
                                if let Some(pos) = state.position() {
                                    let rot = state.rotation();
                                    debug!(
                                        tick = state.current_tick(),
                                        x = pos.x,
                                        y = pos.y,
                                        z = pos.z,
                                        yaw = rot.yaw,
                                        pitch = rot.pitch,
                                        "wandering"
                                    );
                                }
                            }
                        }
                        None => debug!("tick with no position reported"),
                    }
                    packet
                };
                if let Some(packet) = packet {
                    if outbound
                        .send(OutboundPacket::AuthInput(packet))
                        .await
                        .is_err()
                    {
                        // transport sink closed, nothing left to drive
                        break;
                    }
                }
            }
        }));
    }

    pub fn stop_tick(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }

    pub fn is_tick_running(&self) -> bool {
        self.tick_task.is_some()
    }
}

impl Drop for GameStateHandle {
    fn drop(&mut self) {
        self.stop_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Vec2;
    use crate::player::movement::{DT, Wander, WanderOptions};

    fn start_packet() -> StartGamePacket {
        StartGamePacket {
            seed: 424242,
            runtime_entity_id: 9,
            player_position: Vec3 {
                x: 10.0,
                y: 64.0,
                z: 10.0,
            },
            rotation: Vec2 { x: 0.0, y: 90.0 },
            current_tick: 5,
        }
    }

    fn seeded_state() -> GameState {
        GameState::new(Wander::with_seed(WanderOptions::default(), 77))
    }

    #[test]
    fn start_game_captures_baseline_once() {
        let mut state = seeded_state();
        assert!(state.start_game(&start_packet()));
        assert_eq!(
            state.position(),
            Some(Vec3 {
                x: 10.0,
                y: 64.0,
                z: 10.0
            })
        );
        assert_eq!(state.rotation().yaw, 90.0);
        assert_eq!(state.current_tick(), 5);
        assert_eq!(state.runtime_entity_id(), Some(9));
        assert!(state.is_started());
        assert!(state.is_spawned());

        // a second session start is ignored
        let mut second = start_packet();
        second.player_position.x = -1.0;
        assert!(!state.start_game(&second));
        assert_eq!(state.position().map(|p| p.x), Some(10.0));
    }

    #[test]
    fn random_move_requires_baseline() {
        let mut state = seeded_state();
        assert!(state.random_move().is_none());
    }

    #[test]
    fn first_tick_stays_within_one_step_of_baseline() {
        let mut state = seeded_state();
        state.start_game(&start_packet());
        let packet = state.random_move().expect("baseline set");

        let max_step = WanderOptions::default().max_speed_bps * DT;
        let dx = packet.position.x - 10.0;
        let dz = packet.position.z - 10.0;
        assert!(dx.hypot(dz) <= max_step + 1e-9);
        assert_eq!(packet.tick, 6);
    }

    #[tokio::test]
    async fn correction_overwrites_prediction_for_own_runtime_id() {
        let (tx, _rx) = mpsc::channel(8);
        let mut handle = GameStateHandle::new(
            Wander::with_seed(WanderOptions::default(), 3),
            Duration::from_millis(50),
            tx,
        );
        handle.handle_start_game(start_packet()).await.unwrap();
        handle.stop_tick();

        handle
            .handle_move_player(MovePlayerPacket {
                runtime_id: 9,
                position: Vec3 {
                    x: 1.0,
                    y: 2.0,
                    z: 3.0,
                },
                pitch: 4.0,
                yaw: 5.0,
                head_yaw: 6.0,
                tick: 100,
            })
            .await;

        let state = handle.state();
        let state = state.lock().await;
        assert_eq!(
            state.position(),
            Some(Vec3 {
                x: 1.0,
                y: 2.0,
                z: 3.0
            })
        );
        assert_eq!(state.rotation().yaw, 5.0);
        assert_eq!(state.current_tick(), 100);
    }

    #[tokio::test]
    async fn foreign_move_player_only_refreshes_tick() {
        let (tx, _rx) = mpsc::channel(8);
        let mut handle = GameStateHandle::new(
            Wander::with_seed(WanderOptions::default(), 3),
            Duration::from_millis(50),
            tx,
        );
        handle.handle_start_game(start_packet()).await.unwrap();
        handle.stop_tick();

        handle
            .handle_move_player(MovePlayerPacket {
                runtime_id: 1000,
                position: Vec3 {
                    x: -50.0,
                    y: 0.0,
                    z: -50.0,
                },
                pitch: 0.0,
                yaw: 0.0,
                head_yaw: 0.0,
                tick: 200,
            })
            .await;

        let state = handle.state();
        let state = state.lock().await;
        assert_eq!(state.position().map(|p| p.x), Some(10.0));
        assert_eq!(state.current_tick(), 200);
    }

    #[tokio::test]
    async fn move_player_before_identity_bound_is_dropped() {
        let (tx, _rx) = mpsc::channel(8);
        let handle = GameStateHandle::new(
            Wander::with_seed(WanderOptions::default(), 3),
            Duration::from_millis(50),
            tx,
        );
        handle
            .handle_move_player(MovePlayerPacket {
                runtime_id: 9,
                position: Vec3 {
                    x: 1.0,
                    y: 1.0,
                    z: 1.0,
                },
                pitch: 0.0,
                yaw: 0.0,
                head_yaw: 0.0,
                tick: 7,
            })
            .await;

        let state = handle.state();
        let state = state.lock().await;
        assert!(state.position().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn start_game_runs_handshake_then_ticks() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut handle = GameStateHandle::new(
            Wander::with_seed(WanderOptions::default(), 11),
            Duration::from_millis(50),
            tx,
        );
        handle.handle_start_game(start_packet()).await.unwrap();
        assert!(handle.is_tick_running());

        assert_eq!(
            rx.recv().await,
            Some(OutboundPacket::LoadingScreen { screen_type: 1 })
        );
        assert_eq!(
            rx.recv().await,
            Some(OutboundPacket::LoadingScreen { screen_type: 2 })
        );
        assert_eq!(
            rx.recv().await,
            Some(OutboundPacket::Interact {
                action_id: "mouse_over_entity".to_string(),
                target_entity_id: 0,
                position: Vec3::default(),
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(OutboundPacket::LocalPlayerInitialized {
                runtime_entity_id: 9
            })
        );

        match rx.recv().await {
            Some(OutboundPacket::AuthInput(packet)) => assert_eq!(packet.tick, 6),
            other => panic!("expected auth input, got {other:?}"),
        }

        handle.stop_tick();
        assert!(!handle.is_tick_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_tick_does_not_duplicate_timers() {
        let (tx, mut rx) = mpsc::channel(256);
        let mut handle = GameStateHandle::new(
            Wander::with_seed(WanderOptions::default(), 11),
            Duration::from_millis(50),
            tx,
        );
        handle.handle_start_game(start_packet()).await.unwrap();
        handle.start_tick();
        handle.start_tick();

        // drain for a simulated quarter second; a doubled timer would
        // emit roughly twice as many packets
        tokio::time::sleep(Duration::from_millis(260)).await;
        handle.stop_tick();

        let mut auth_inputs = 0;
        while let Ok(packet) = rx.try_recv() {
            if matches!(packet, OutboundPacket::AuthInput(_)) {
                auth_inputs += 1;
            }
        }
        assert!(
            (1..=7).contains(&auth_inputs),
            "unexpected tick count {auth_inputs}"
        );
    }
}
