//! # Submarine Arena Server Library
//!
//! This library provides the authoritative server for the submarine arena: a
//! wrap-around 2-D field where players steer submarines, collect air pockets
//! to keep from suffocating, and pick up missiles. The server owns the only
//! true copy of the world and streams compact snapshots to every client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every tick each live submarine moves one cell along its heading, wrapping
//! at the field edges. Once per simulated second its score goes up and its air
//! goes down; a submarine that runs out of air dies and stays frozen in place
//! until its client disconnects.
//!
//! ### Pickup Resolution
//! After movement, live submarines collect any missile item or air pocket
//! within reach on both axes of the torus. Each consumed pickup is replaced
//! immediately, so the field always holds the configured number of each.
//!
//! ### Snapshot Broadcasting
//! On its own, slower clock the server serializes the entire world into
//! positional tuples and sends it to every connected client. Lost snapshots
//! are never resent; the next one supersedes them.
//!
//! ## Architecture Design
//!
//! ### Single Owning Task
//! [`network::Server::run`] owns the [`game::GameState`] and `select!`s over
//! inbound packets, the tick clock and the broadcast clock. Socket I/O and
//! idle-client expiry run in helper tasks that talk to the loop over
//! channels, so world updates are never interleaved.
//!
//! ### UDP-Based Communication
//! Packets are `bincode`-encoded [`shared::Packet`] values, one per datagram.
//!
//! ## Module Organization
//!
//! - [`config`]: command-line configuration and validation
//! - [`game`]: world state, sessions and the movement tick
//! - [`collision`]: pickup collection in toroidal space
//! - [`spawner`]: pickup collections with unique positions
//! - [`snapshot`]: `map data` payloads
//! - [`client_manager`]: connection registry and idle timeouts
//! - [`network`]: UDP tasks and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig::default();
//!     config.validate()?;
//!
//!     let mut server = Server::new(&config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod collision;
pub mod config;
pub mod game;
pub mod network;
pub mod snapshot;
pub mod spawner;
