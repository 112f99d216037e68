use std::fmt;

/// Case-insensitive registry key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryKey(String);

impl RegistryKey {
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// `plugin.name` key used by services and config actions
    pub fn namespaced(plugin_name: &str, name: &str) -> Self {
        Self(format!("{}.{}", plugin_name, name).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegistryKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
