use serde::{Deserialize, Serialize};

/// A registered permission level name, e.g. `admin`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionLevel {
    pub name: String,
    pub plugin_name: String,
}

impl PermissionLevel {
    pub fn new(name: impl Into<String>, plugin_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugin_name: plugin_name.into(),
        }
    }
}

/// Per-guild membership of a permission level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevelData {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl PermissionLevelData {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn grants(&self, user_id: &str, role_ids: &[String]) -> bool {
        self.users.iter().any(|u| u == user_id) || self.roles.iter().any(|r| role_ids.contains(r))
    }
}
