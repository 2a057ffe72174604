//! Server network layer: WebSocket connections and the authoritative loop

use crate::client_manager::ClientManager;
use crate::game::GameState;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{
    now_millis, ClientMessage, EventKind, JoinNotice, LeaveNotice, ServerMessage,
    TIME_SYNC_INTERVAL_MS,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How often `time` messages are broadcast
    pub time_sync_interval: Duration,
    pub enemy_count: usize,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            time_sync_interval: Duration::from_millis(TIME_SYNC_INTERVAL_MS),
            enemy_count: 2,
            max_connections: 32,
        }
    }
}

/// Events sent from connection tasks to the server loop
#[derive(Debug)]
pub enum ServerEvent {
    Connected { client_id: u32 },
    MessageReceived { client_id: u32, message: ClientMessage },
    Disconnected { client_id: u32 },
}

/// Owns the authoritative game state and serializes every inbound event
/// through a single loop
pub struct Server {
    listener: Arc<TcpListener>,
    clients: Arc<RwLock<ClientManager>>,
    game: GameState,
    config: ServerConfig,

    server_tx: mpsc::UnboundedSender<ServerEvent>,
    server_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(addr: &str, config: ServerConfig) -> ServerResult<Self> {
        let listener = Arc::new(TcpListener::bind(addr).await?);
        info!("Server listening on {}", listener.local_addr()?);

        let mut game = GameState::new(now_millis());
        game.seed_enemies(config.enemy_count, &mut rand::thread_rng());

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_connections))),
            game,
            config,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Spawns the task accepting TCP connections
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let clients = Arc::clone(&clients);
                        let server_tx = server_tx.clone();
                        tokio::spawn(async move {
                            let result = handle_connection(stream, addr, clients, server_tx).await;
                            if let Err(e) = result {
                                warn!("Connection from {} failed: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    async fn send_to(&self, client_id: u32, message: &ServerMessage) {
        match message.to_json() {
            Ok(text) => {
                self.clients.read().await.send_to(client_id, &text);
            }
            Err(e) => error!("Failed to serialize message: {}", e),
        }
    }

    async fn broadcast(&self, message: &ServerMessage) {
        match message.to_json() {
            Ok(text) => {
                self.clients.read().await.broadcast(&text, None);
            }
            Err(e) => error!("Failed to serialize message: {}", e),
        }
    }

    async fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected { client_id } => {
                let start = ServerMessage::Start {
                    state: self.game.snapshot(),
                };
                self.send_to(client_id, &start).await;
            }

            ServerEvent::MessageReceived { client_id, message } => {
                self.handle_message(client_id, message).await;
            }

            ServerEvent::Disconnected { client_id } => {
                let removed = self.clients.write().await.remove_client(&client_id);
                if let Some(client) = removed {
                    if let Some(name) = client.name.clone() {
                        self.game.leave(&name);
                    }
                    client.close();
                }
            }
        }
    }

    async fn handle_message(&mut self, client_id: u32, message: ClientMessage) {
        let bound_name = {
            let clients = self.clients.read().await;
            clients.name_of(client_id).map(str::to_string)
        };

        match message {
            ClientMessage::Join { name } => {
                if let Some(current) = bound_name {
                    let rejected = ServerMessage::Rejected {
                        name,
                        reason: format!("already joined as '{}'", current),
                    };
                    self.send_to(client_id, &rejected).await;
                    return;
                }

                match self.game.join(&name) {
                    Ok(_) => {
                        self.clients.write().await.bind_name(client_id, &name);
                    }
                    Err(e) => {
                        info!("Rejected join '{}' from client {}: {}", name, client_id, e);
                        let rejected = ServerMessage::Rejected {
                            name,
                            reason: e.to_string(),
                        };
                        self.send_to(client_id, &rejected).await;
                    }
                }
            }

            ClientMessage::Leave { name } => {
                if bound_name.as_deref() != Some(name.as_str()) {
                    warn!("Client {} tried to remove '{}'", client_id, name);
                    return;
                }
                self.game.leave(&name);
            }

            ClientMessage::State => {
                let reply = ServerMessage::State {
                    state: self.game.snapshot(),
                };
                self.send_to(client_id, &reply).await;
            }

            ClientMessage::Move { vx, vy } => {
                let Some(name) = bound_name else {
                    debug!("Move from client {} before joining", client_id);
                    return;
                };
                if self.game.set_velocity(&name, vx, vy) {
                    let update = ServerMessage::State {
                        state: self.game.snapshot(),
                    };
                    self.broadcast(&update).await;
                }
            }
        }
    }

    /// Turns queued lifecycle events into `join` / `leave` broadcasts
    async fn flush_world_events(&mut self) {
        let time_stamp = self.game.time_stamp();

        for event in self.game.drain_events() {
            let name = event.name().to_string();
            match event.kind() {
                EventKind::Joined => {
                    let clients = self.clients.read().await;
                    clients.broadcast_with(|client| {
                        let isme = (client.name.as_deref() == Some(name.as_str())).then_some(true);
                        ServerMessage::Join(JoinNotice {
                            name: name.clone(),
                            time_stamp,
                            isme,
                        })
                        .to_json()
                        .ok()
                    });
                }
                EventKind::Left | EventKind::Died => {
                    self.clients.write().await.unbind_name(&name);
                    let leave = ServerMessage::Leave(LeaveNotice { name, time_stamp });
                    self.broadcast(&leave).await;
                }
            }
        }
    }

    async fn broadcast_time(&mut self) {
        let now = now_millis();
        self.game.advance_to(now);
        self.flush_world_events().await;

        let observers = self.clients.read().await.len();
        if observers == 0 {
            return;
        }

        let sync = self.game.time_sync(now, observers);
        debug!(
            "Time sync: lastUpdate={} updates={} observers={}",
            sync.last_update, sync.update_count, sync.observer_count
        );
        self.broadcast(&ServerMessage::Time(sync)).await;
    }

    /// Brings the world up to `now`, then handles one event. Deaths found
    /// while advancing are broadcast (and their names unbound) before the
    /// event runs, so a join can never reuse a name still bound elsewhere.
    async fn process(&mut self, event: ServerEvent, now: u64) {
        self.game.advance_to(now);
        self.flush_world_events().await;
        self.handle_event(event).await;
        self.flush_world_events().await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(mut self) -> ServerResult<()> {
        self.spawn_acceptor();

        let mut time_interval = interval(self.config.time_sync_interval);
        time_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick fires immediately
        time_interval.tick().await;

        info!("Server started successfully");

        loop {
            tokio::select! {
                event = self.server_rx.recv() => {
                    let Some(event) = event else {
                        info!("Server shutting down");
                        break;
                    };
                    self.process(event, now_millis()).await;
                },

                _ = time_interval.tick() => {
                    self.broadcast_time().await;
                },
            }
        }

        Ok(())
    }
}

/// Performs the WebSocket handshake, registers the connection and pumps
/// inbound frames into the server loop until the peer goes away
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    clients: Arc<RwLock<ClientManager>>,
    server_tx: mpsc::UnboundedSender<ServerEvent>,
) -> ServerResult<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!("Write to {} failed: {}", addr, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let client_id = clients.write().await.add_client(addr, outbound_tx, writer);
    let Some(client_id) = client_id else {
        warn!("Refusing connection from {}: server full", addr);
        return Ok(());
    };

    server_tx.send(ServerEvent::Connected { client_id })?;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match ClientMessage::from_json(&text) {
                Ok(message) => {
                    server_tx.send(ServerEvent::MessageReceived { client_id, message })?;
                }
                Err(e) => warn!("Malformed message from client {}: {}", client_id, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read from client {} failed: {}", client_id, e);
                break;
            }
        }
    }

    server_tx.send(ServerEvent::Disconnected { client_id })?;
    Ok(())
}
