// directadmin-api: Async Rust client for the DirectAdmin legacy CMD_API surface

pub mod config;
pub mod connection;
pub mod error;
pub mod response;
pub mod transport;

pub use config::ConnectionConfig;
pub use connection::{Connection, Params};
pub use error::Error;
pub use response::{ResponseMap, ResponseValue, parse_pairs};
pub use transport::TransportConfig;
