//! Connection registry for the arena server
//!
//! This module tracks which socket addresses hold a session, including:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Capacity limits and connection id assignment
//! - Last-activity tracking for idle expiry
//!
//! The registry knows nothing about the simulation. It hands out connection
//! ids, and the server uses those ids to drive joins and leaves on the world.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client session
#[derive(Debug)]
pub struct Client {
    /// Connection id assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing has been heard from this client within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected client sessions
///
/// Connection ids start at 1 and are never reused during the lifetime of the
/// server, so a player identity derived from one is unique per connection.
pub struct ClientManager {
    /// Connected clients indexed by connection id
    clients: HashMap<u32, Client>,
    /// Next available id for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    /// Silence after which a client is dropped
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Attempts to register a new connection
    ///
    /// Returns `Some(client_id)` on success, `None` if the server is full.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a client. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Refreshes the activity timestamp of the client at `addr`.
    ///
    /// Returns the client's id, or `None` if the address has no session.
    pub fn touch(&mut self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .values_mut()
            .find(|client| client.addr == addr)
            .map(|client| {
                client.touch();
                client.id
            })
    }

    /// Removes and returns the ids of clients that have gone silent.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timeout = self.timeout;
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// All connection ids and their addresses, for broadcasting.
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
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

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn manager(max_clients: usize) -> ClientManager {
        ClientManager::new(max_clients, Duration::from_secs(5))
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new(1, test_addr());

        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));

        client.touch();
        assert!(!client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_multiple_clients() {
        let mut manager = manager(3);

        assert_eq!(manager.add_client(test_addr()), Some(1));
        assert_eq!(manager.add_client(test_addr2()), Some(2));
        assert_eq!(manager.len(), 2);
        assert!(!manager.is_empty());
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = manager(1);

        assert!(manager.add_client(test_addr()).is_some());
        assert!(manager.add_client(test_addr2()).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = manager(2);

        let first = manager.add_client(test_addr()).unwrap();
        assert!(manager.remove_client(&first));
        let second = manager.add_client(test_addr()).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_remove_nonexistent_client() {
        let mut manager = manager(2);
        assert!(!manager.remove_client(&999));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_find_client_by_addr() {
        let mut manager = manager(2);
        let client_id = manager.add_client(test_addr()).unwrap();

        assert_eq!(manager.find_client_by_addr(test_addr()), Some(client_id));
        assert_eq!(manager.find_client_by_addr(test_addr2()), None);
    }

    #[test]
    fn test_touch_refreshes_known_client() {
        let mut manager = manager(2);
        let client_id = manager.add_client(test_addr()).unwrap();

        assert_eq!(manager.touch(test_addr()), Some(client_id));
        assert_eq!(manager.touch(test_addr2()), None);
    }

    #[test]
    fn test_check_timeouts_removes_silent_clients() {
        let mut manager = ClientManager::new(4, Duration::from_millis(50));
        let stale = manager.add_client(test_addr()).unwrap();
        let fresh = manager.add_client(test_addr2()).unwrap();

        manager.clients.get_mut(&stale).unwrap().last_seen =
            Instant::now() - Duration::from_secs(1);

        assert_eq!(manager.check_timeouts(), vec![stale]);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.find_client_by_addr(test_addr2()), Some(fresh));
    }

    #[test]
    fn test_get_client_addrs() {
        let mut manager = manager(3);
        manager.add_client(test_addr());
        manager.add_client(test_addr2());

        let mut addrs = manager.get_client_addrs();
        addrs.sort_by_key(|(id, _)| *id);
        assert_eq!(addrs, vec![(1, test_addr()), (2, test_addr2())]);
    }
}
