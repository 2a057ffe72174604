use crate::game::Session;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{now_millis, ClientMessage, ServerMessage, SKEW_THRESHOLD_MS, UPDATE_INTERVAL_MS};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Player name to join as; `None` connects as an observer
    pub name: Option<String>,
    pub skew_threshold_ms: i64,
    /// Replica projection tick
    pub update_interval: Duration,
    /// Velocity requested once the join is confirmed
    pub velocity: Option<(f64, f64)>,
    /// How often the replica is summarized in the log
    pub report_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: None,
            skew_threshold_ms: SKEW_THRESHOLD_MS,
            update_interval: Duration::from_millis(UPDATE_INTERVAL_MS),
            velocity: None,
            report_interval: Duration::from_secs(2),
        }
    }
}

pub struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    session: Session,
    config: ClientConfig,
    velocity_sent: bool,
}

impl Client {
    pub async fn connect(url: &str, config: ClientConfig) -> ClientResult<Self> {
        info!("Connecting to {}...", url);
        let (ws, _) = connect_async(url).await?;
        info!("Connected to {}", url);

        Ok(Client {
            ws,
            session: Session::new(config.skew_threshold_ms),
            config,
            velocity_sent: false,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn send(&mut self, message: &ClientMessage) -> ClientResult<()> {
        let text = message.to_json()?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn handle_text(&mut self, text: &str) -> ClientResult<()> {
        let message = match ServerMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Malformed message from server: {}", e);
                return Ok(());
            }
        };

        let replies = self.session.handle_message(message, now_millis());
        for reply in &replies {
            self.send(reply).await?;
        }

        if self.session.is_joined() && !self.velocity_sent {
            if let Some((vx, vy)) = self.config.velocity {
                self.send(&ClientMessage::Move { vx, vy }).await?;
                self.velocity_sent = true;
            }
        }

        Ok(())
    }

    fn report(&self) {
        let world = self.session.world();
        info!(
            "t={} players={} entities={} skew={}ms",
            world.time_stamp(),
            world.player_count(),
            world.state.objects.len(),
            self.session.clock().total_skew()
        );
        for player in world.state.players() {
            debug!(
                "  {} at ({:.1}, {:.1})",
                player.name().unwrap_or("?"),
                player.x,
                player.y
            );
        }
    }

    /// Joins (if configured) and keeps the replica in step until the server
    /// closes the connection
    pub async fn run(&mut self) -> ClientResult<()> {
        if let Some(name) = self.config.name.clone() {
            let join = self.session.request_join(&name);
            self.send(&join).await?;
        }

        let mut update_interval = interval(self.config.update_interval);
        update_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut report_interval = interval(self.config.report_interval);

        loop {
            tokio::select! {
                frame = self.ws.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text).await?,
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Server closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("Error receiving message: {}", e);
                            break;
                        }
                    }
                },

                _ = update_interval.tick() => {
                    for id in self.session.tick(now_millis()) {
                        debug!("Entity {} died in local projection", id);
                    }
                },

                _ = report_interval.tick() => {
                    self.report();
                },
            }
        }

        Ok(())
    }

    /// Leaves the game (if joined) and closes the socket
    pub async fn shutdown(&mut self) -> ClientResult<()> {
        if self.session.is_joined() {
            if let Some(name) = self.session.name().map(str::to_string) {
                self.send(&ClientMessage::Leave { name }).await?;
            }
        }
        self.ws.close(None).await?;
        Ok(())
    }
}
