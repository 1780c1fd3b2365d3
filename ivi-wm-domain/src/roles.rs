//! Translation between the drawing names clients send and canonical roles.
//!
//! Legacy clients identify themselves with names such as `"Navigation"`;
//! internally everything is keyed by canonical roles such as `"map"`.
//! Events are reported back under the name the client last used.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::layer_map::defaults::DEFAULT_OLD_ROLES_JSON;
use crate::layer_map::{full_match, LayerMap, LayerMapError};

#[derive(Debug, Clone, Deserialize)]
pub struct OldRolesDocument {
    pub old_roles: Vec<OldRoleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OldRoleEntry {
    pub name: String,
    pub new: String,
}

#[derive(Debug, Clone)]
struct Alias {
    pattern: Regex,
    role: String,
}

#[derive(Debug, Clone, Default)]
pub struct RoleAliasTable {
    aliases: Vec<Alias>,
    labels: HashMap<String, String>,
}

impl RoleAliasTable {
    pub fn from_document(doc: OldRolesDocument) -> Result<Self, LayerMapError> {
        let aliases = doc
            .old_roles
            .into_iter()
            .map(|entry| {
                Ok(Alias {
                    pattern: full_match(&entry.name)?,
                    role: entry.new,
                })
            })
            .collect::<Result<Vec<_>, LayerMapError>>()?;
        Ok(Self {
            aliases,
            labels: HashMap::new(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, LayerMapError> {
        Self::from_document(serde_json::from_str(json)?)
    }

    pub fn with_defaults() -> Result<Self, LayerMapError> {
        Self::from_json(DEFAULT_OLD_ROLES_JSON)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, LayerMapError> {
        Self::from_json(&LayerMap::read_document(path, DEFAULT_OLD_ROLES_JSON)?)
    }

    /// Canonical role for an external drawing name. Names without an alias
    /// are already canonical.
    pub fn canonical(&self, drawing_name: &str) -> String {
        match self.aliases.iter().find(|a| a.pattern.is_match(drawing_name)) {
            Some(alias) => {
                debug!(drawing_name, role = %alias.role, "Converted legacy role");
                alias.role.clone()
            }
            None => drawing_name.to_string(),
        }
    }

    /// Remembers which external name a client used for `role`.
    pub fn remember_label(&mut self, role: &str, drawing_name: &str) {
        self.labels.insert(role.to_string(), drawing_name.to_string());
    }

    /// External name to report `role` under.
    pub fn label<'a>(&'a self, role: &'a str) -> &'a str {
        self.labels.get(role).map(String::as_str).unwrap_or(role)
    }

    pub fn forget_label(&mut self, role: &str) {
        self.labels.remove(role);
    }
}
