//! W2W servers: the command server with its request router and collaborators,
//! and the broadcast chat server with its peer registry.

pub mod chat_server;
pub mod command_server;
pub mod registry;
pub mod router;
pub mod services;

pub use chat_server::ChatServer;
pub use command_server::CommandServer;
pub use registry::PeerRegistry;
pub use router::Router;
