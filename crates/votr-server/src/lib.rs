//! votr production server.
//!
//! Real-time planning-poker rooms over WebSocket, using axum for HTTP and
//! WebSocket transport, Tokio for the async runtime, and the OS RNG for room
//! identifiers and secrets.
//!
//! # Architecture
//!
//! ```text
//! votr-server
//!   ├─ Gateway        (axum routes, connection upgrade, join sequence)
//!   ├─ Session        (per-member read/write pumps, keepalive)
//!   ├─ RoomRegistry   (room id → running room)
//!   ├─ Room           (one task per room, owns RoomState)
//!   └─ SystemEnv      (production Environment, crypto RNG)
//! ```
//!
//! Message flow: gateway → `RoomRegistry::add_member` → read pump → room
//! task → [`votr_core::MessageProcessor`] → every member's delivery channel
//! → write pump → network.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod gateway;
mod registry;
mod room;
pub mod session;
pub mod stats;
mod system_env;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

pub use error::ServerError;
pub use gateway::GatewayState;
pub use registry::{RegistryError, RegistryStats, RoomLink, RoomRegistry};
pub use room::{Membership, OWNER_GREETING, Room, RoomHandle};
pub use session::{DeliveryError, MemberHandle, Outbox, SessionConfig};
pub use system_env::SystemEnv;
use tokio::net::TcpListener;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:12345")
    pub bind_address: String,
    /// Directory with `index.html` and client assets
    pub static_dir: PathBuf,
    /// Interval between room statistics log lines
    pub stats_interval: Duration,
    /// Capacity of each room's input queues
    pub room_queue_capacity: usize,
    /// Member session settings (keepalive, frame limit, buffering)
    pub session: SessionConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:12345".to_string(),
            static_dir: PathBuf::from("static"),
            stats_interval: Duration::from_secs(10),
            room_queue_capacity: 64,
            session: SessionConfig::default(),
        }
    }
}

impl ServerRuntimeConfig {
    /// Reject settings the runtime cannot honour.
    ///
    /// Every interval drives a tokio timer, and a zero period would panic
    /// the task that owns it.
    pub fn validate(&self) -> Result<(), ServerError> {
        let intervals = [
            ("stats interval", self.stats_interval),
            ("ping interval", self.session.ping_interval),
            ("read timeout", self.session.read_timeout),
            ("write timeout", self.session.write_timeout),
        ];

        for (name, value) in intervals {
            if value.is_zero() {
                return Err(ServerError::Config(format!("{name} must be greater than zero")));
            }
        }

        Ok(())
    }
}

/// Production votr server.
///
/// Wraps the gateway router with a TCP listener and the system environment.
pub struct Server {
    /// Bound listener
    listener: TcpListener,
    /// Rooms served by this process
    registry: Arc<RoomRegistry<SystemEnv>>,
    /// Environment
    env: SystemEnv,
    /// Runtime configuration
    config: ServerRuntimeConfig,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ServerError::Config(format!("invalid bind address '{}': {e}", config.bind_address))
        })?;

        let listener = TcpListener::bind(addr).await?;
        let env = SystemEnv::new();
        let registry = Arc::new(RoomRegistry::new(env.clone(), config.room_queue_capacity));

        Ok(Self { listener, registry, env, config })
    }

    /// Registry of rooms served by this server.
    pub fn registry(&self) -> Arc<RoomRegistry<SystemEnv>> {
        Arc::clone(&self.registry)
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections and serving rooms.
    ///
    /// This method runs until the process exits or the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.local_addr()?);

        let registry = Arc::clone(&self.registry);
        let stats = tokio::spawn(stats::report(registry, self.config.stats_interval));

        let state = Arc::new(GatewayState {
            registry: self.registry,
            env: self.env,
            static_dir: self.config.static_dir,
            session: self.config.session,
        });

        let result = axum::serve(self.listener, gateway::router(state)).await;
        stats.abort();

        result.map_err(|e| ServerError::Transport(format!("server stopped: {e}")))
    }
}
