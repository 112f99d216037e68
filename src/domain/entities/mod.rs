//! Domain entities - Core business objects

pub mod command;
pub mod config_action;
pub mod guild;
pub mod message;
pub mod permission_level;
pub mod response;
pub mod user;

pub use command::{handler_fn, Arg, Command, CommandHandler, Flag, FlagType, Value, OWNER_PREFIX};
pub use config_action::{ConfigAction, ConfigActionHandler};
pub use guild::{Channel, ChannelKind, Guild, Role};
pub use message::Message;
pub use permission_level::{PermissionLevel, PermissionLevelData};
pub use response::{Embed, EmbedField, Response, ResponseType};
pub use user::{parse_mention, User};
