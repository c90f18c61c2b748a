use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepositoryConfig {
    /// Delete whole subtrees instead of refusing entries that have children
    #[serde(default)]
    pub allow_delete_with_children: bool,
}

impl RepositoryConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
