//! W2W client library: wire envelopes, line framing, config, and the TCP clients.
//! Shared by the `w2w` CLI and the servers in `w2w_server`.

pub mod client;
pub mod config;
pub mod messages;
pub mod transport;

pub use client::{ChatClient, ChatReceiver, ChatSender, Client, ClientError, DEFAULT_TIMEOUT};
pub use config::{default_config_path, ApiSection, ClientSection, Config, ConfigError, ServerSection};
pub use messages::{Action, Request, Response, Status};
pub use transport::{Connection, EnvelopeCodec, TransportError};
