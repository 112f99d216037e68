//! Application layer errors

use std::fmt;
use thiserror::Error;

/// Kind of registered or looked-up entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Command,
    Plugin,
    Service,
    ConfigAction,
    PermissionLevel,
    Role,
    User,
    Guild,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Command => "command",
            Entity::Plugin => "plugin",
            Entity::Service => "service",
            Entity::ConfigAction => "config action",
            Entity::PermissionLevel => "permission level",
            Entity::Role => "role",
            Entity::User => "user",
            Entity::Guild => "guild",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat classification of a [`BotError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    NotFound,
    AlreadyExists,
    PermissionLevel,
    Validation,
    Load,
    Type,
    Storage,
    Config,
    Transport,
    Lifecycle,
    Denied,
    Handler,
    Internal,
}

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{entity} '{key}' could not be found")]
    NotFound { entity: Entity, key: String },

    #[error("{entity} '{key}' already exists")]
    AlreadyExists { entity: Entity, key: String },

    #[error("{entity} is missing required field '{field}'")]
    Validation { entity: Entity, field: String },

    #[error("Unable to load plugin '{package}': {reason}")]
    Load { package: String, reason: String },

    #[error("{reason} ({level})")]
    PermissionLevel { level: String, reason: String },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Boot failed: {0}")]
    Boot(#[source] std::sync::Arc<BotError>),

    /// Refusal shown to the invoking user as is
    #[error("{0}")]
    Denied(String),

    #[error("{message}")]
    Handler {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    pub fn not_found(entity: Entity, key: impl Into<String>) -> Self {
        BotError::NotFound { entity, key: key.into() }
    }

    pub fn already_exists(entity: Entity, key: impl Into<String>) -> Self {
        BotError::AlreadyExists { entity, key: key.into() }
    }

    pub fn validation(entity: Entity, field: impl Into<String>) -> Self {
        BotError::Validation { entity, field: field.into() }
    }

    pub fn permission_level(level: impl Into<String>, reason: impl Into<String>) -> Self {
        BotError::PermissionLevel { level: level.into(), reason: reason.into() }
    }

    /// Unclassified failure raised from inside a command or hook
    pub fn handler(message: impl Into<String>) -> Self {
        BotError::Handler { message: message.into(), source: None }
    }

    pub fn handler_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BotError::Handler { message: message.into(), source: Some(Box::new(source)) }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::Parse(_) => ErrorKind::Parse,
            BotError::NotFound { .. } => ErrorKind::NotFound,
            BotError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            BotError::Validation { .. } => ErrorKind::Validation,
            BotError::Load { .. } => ErrorKind::Load,
            BotError::PermissionLevel { .. } => ErrorKind::PermissionLevel,
            BotError::Type(_) => ErrorKind::Type,
            BotError::Storage(_) => ErrorKind::Storage,
            BotError::Config(_) => ErrorKind::Config,
            BotError::Transport(_) => ErrorKind::Transport,
            BotError::Lifecycle(_) | BotError::Boot(_) => ErrorKind::Lifecycle,
            BotError::Denied(_) => ErrorKind::Denied,
            BotError::Handler { .. } => ErrorKind::Handler,
            BotError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Name shown in owner failure reports
    pub fn report_name(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Parse => "ParseError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::AlreadyExists => "AlreadyExistsError",
            ErrorKind::PermissionLevel => "PermissionLevelError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Load => "LoadPluginError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Storage => "StorageError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::Lifecycle => "LifecycleError",
            ErrorKind::Denied => "DeniedError",
            ErrorKind::Handler => "Error",
            ErrorKind::Internal => "InternalError",
        }
    }

    /// The error followed by its chain of sources, one line each
    pub fn trace_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: {}", self.report_name(), self)];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            lines.push(format!("    caused by: {}", cause));
            source = cause.source();
        }
        lines
    }

    pub fn is_not_found(&self, entity: Entity) -> bool {
        matches!(self, BotError::NotFound { entity: e, .. } if *e == entity)
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_report_name() {
        let err = BotError::not_found(Entity::Command, "ping");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.report_name(), "NotFoundError");
        assert_eq!(err.to_string(), "command 'ping' could not be found");
        assert!(err.is_not_found(Entity::Command));
        assert!(!err.is_not_found(Entity::Plugin));
    }

    #[test]
    fn test_trace_lines_follow_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = BotError::handler_with_source("boom", io);
        let lines = err.trace_lines();
        assert_eq!(lines[0], "Error: boom");
        assert_eq!(lines[1], "    caused by: disk gone");
    }
}
