//! Transports - Chat service integrations

pub mod console;
pub mod loopback;

pub use console::ConsoleTransport;
pub use loopback::LoopbackTransport;
