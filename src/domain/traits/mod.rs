//! Domain traits - Abstractions for infrastructure implementations

pub mod store;
pub mod transport;

pub use store::{DataStore, GuildData};
pub use transport::{Target, Transport, TransportEvent};
