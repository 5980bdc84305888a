//! Board configuration.
//!
//! Plain structs meant to be embedded in a host's own config file. Every
//! field has a default, so an empty section is valid.

use serde::Deserialize;

use liteboard_perms::{MutatorConfig, ShareTokenConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Grant mutation retries.
    pub mutator: MutatorConfig,
    /// Share token lifetime and size.
    pub tokens: ShareTokenConfig,
}
