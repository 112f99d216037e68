//! Message handling - Event-driven message processing

pub mod context;
pub mod dispatcher;
pub mod help;
pub mod middleware;
pub mod parser;

pub use context::{ActionContext, CommandContext};
pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use middleware::{Filter, FilterChain, FilterOutcome};
pub use parser::{MessageParser, ParsedInput, Tokenizer};
