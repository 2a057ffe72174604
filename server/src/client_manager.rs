//! Connection registry for the game server
//!
//! This module tracks every open WebSocket connection, including:
//! - Connection ids, addresses and capacity limits
//! - The player name a connection has joined as, if any
//! - The outbound queue and writer task of each connection
//!
//! Observers (connections that never joined) count towards `observerCount`
//! in `time` messages, the same as players.

use log::{debug, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One open connection and its outbound side
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    /// Player name this connection joined as
    pub name: Option<String>,
    outbound: mpsc::UnboundedSender<String>,
    writer: JoinHandle<()>,
}

impl Client {
    pub fn new(
        id: u32,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<String>,
        writer: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            name: None,
            outbound,
            writer,
        }
    }

    /// Queues a text frame. Returns false once the writer has gone away.
    pub fn send(&self, text: &str) -> bool {
        self.outbound.send(text.to_string()).is_ok()
    }

    /// Stops the writer task so nothing is written to a closed socket
    pub fn close(self) {
        self.writer.abort();
    }
}

/// Manages all open connections
///
/// Shared between the accept task (which registers connections) and the
/// server loop (which binds names, sends and broadcasts).
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a connection. Returns `None` when the server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<String>,
        writer: JoinHandle<()>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            writer.abort();
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, outbound, writer));

        Some(client_id)
    }

    pub fn remove_client(&mut self, client_id: &u32) -> Option<Client> {
        let client = self.clients.remove(client_id)?;
        info!(
            "Client {} disconnected after {:.1}s",
            client.id,
            client.connected_at.elapsed().as_secs_f32()
        );
        Some(client)
    }

    pub fn name_of(&self, client_id: u32) -> Option<&str> {
        self.clients.get(&client_id)?.name.as_deref()
    }

    pub fn bind_name(&mut self, client_id: u32, name: &str) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.name = Some(name.to_string());
                true
            }
            None => false,
        }
    }

    /// Clears whichever connection is bound to `name`
    pub fn unbind_name(&mut self, name: &str) -> Option<u32> {
        let client = self
            .clients
            .values_mut()
            .find(|client| client.name.as_deref() == Some(name))?;
        client.name = None;
        Some(client.id)
    }

    pub fn send_to(&self, client_id: u32, text: &str) -> bool {
        match self.clients.get(&client_id) {
            Some(client) => client.send(text),
            None => {
                debug!("Dropping message for unknown client {}", client_id);
                false
            }
        }
    }

    /// Sends to every connection except `exclude`; returns the number reached
    pub fn broadcast(&self, text: &str, exclude: Option<u32>) -> usize {
        self.clients
            .values()
            .filter(|client| Some(client.id) != exclude)
            .filter(|client| client.send(text))
            .count()
    }

    /// Sends a per-connection message built from each client
    pub fn broadcast_with<F>(&self, mut build: F) -> usize
    where
        F: FnMut(&Client) -> Option<String>,
    {
        self.clients
            .values()
            .filter(|client| match build(client) {
                Some(text) => client.send(&text),
                None => false,
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn connect(
        manager: &mut ClientManager,
        port: u16,
    ) -> (Option<u32>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(async {});
        (manager.add_client(test_addr(port), tx, writer), rx)
    }

    #[tokio::test]
    async fn test_client_ids_increment() {
        let mut manager = ClientManager::new(4);
        let (first, _rx1) = connect(&mut manager, 9001);
        let (second, _rx2) = connect(&mut manager, 9002);

        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let mut manager = ClientManager::new(1);
        let (first, _rx1) = connect(&mut manager, 9001);
        let (second, _rx2) = connect(&mut manager, 9002);

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_name_binding() {
        let mut manager = ClientManager::new(4);
        let (id, _rx) = connect(&mut manager, 9001);
        let id = id.unwrap();

        assert_eq!(manager.name_of(id), None);
        assert!(manager.bind_name(id, "alice"));
        assert_eq!(manager.name_of(id), Some("alice"));

        assert_eq!(manager.unbind_name("alice"), Some(id));
        assert_eq!(manager.name_of(id), None);
        assert_eq!(manager.unbind_name("alice"), None);
        assert!(!manager.bind_name(404, "ghost"));
    }

    #[tokio::test]
    async fn test_broadcast_with_exclusion() {
        let mut manager = ClientManager::new(4);
        let (a, mut rx_a) = connect(&mut manager, 9001);
        let (_b, mut rx_b) = connect(&mut manager, 9002);

        let reached = manager.broadcast("hello", a);
        assert_eq!(reached, 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_broadcast_with_per_client_payload() {
        let mut manager = ClientManager::new(4);
        let (a, mut rx_a) = connect(&mut manager, 9001);
        let (_b, mut rx_b) = connect(&mut manager, 9002);
        manager.bind_name(a.unwrap(), "alice");

        manager.broadcast_with(|client| {
            Some(format!("me={}", client.name.as_deref() == Some("alice")))
        });
        assert_eq!(rx_a.try_recv().unwrap(), "me=true");
        assert_eq!(rx_b.try_recv().unwrap(), "me=false");
    }

    #[tokio::test]
    async fn test_removed_client_stops_receiving() {
        let mut manager = ClientManager::new(4);
        let (id, rx) = connect(&mut manager, 9001);
        let id = id.unwrap();

        let client = manager.remove_client(&id).unwrap();
        client.close();
        drop(rx);

        assert!(!manager.send_to(id, "late"));
        assert!(manager.remove_client(&id).is_none());
        assert!(manager.is_empty());
    }
}
