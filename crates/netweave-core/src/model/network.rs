// ── NetworkConfiguration ──
//
// Snapshot of every configured interface. Loops treat instances as
// immutable: a fresh one is built from the property map on each change.

use std::sync::OnceLock;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::interface::{InterfaceConfig, InterfaceKind};
use crate::error::{NetError, Result};
use crate::interpret;
use crate::properties::Properties;

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkConfiguration {
    interfaces: IndexMap<String, InterfaceConfig>,
    modified_interface_names: IndexSet<String>,
    #[serde(skip)]
    properties: OnceLock<Properties>,
}

impl PartialEq for NetworkConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.interfaces == other.interfaces
            && self.modified_interface_names == other.modified_interface_names
    }
}

impl Eq for NetworkConfiguration {}

impl NetworkConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a property map. Interfaces that fail to interpret are
    /// left out and logged.
    pub fn from_properties(props: &Properties) -> Self {
        let parsed = interpret::network::parse(props);
        for rejected in &parsed.rejected {
            tracing::warn!(
                interface = %rejected.name,
                error = %rejected.error,
                "interface left unconfigured"
            );
        }
        parsed.configuration
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceConfig> {
        self.interfaces.get(name)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceConfig> {
        self.interfaces.values()
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    /// Interfaces of one class, in configuration order.
    pub fn interfaces_of(&self, kind: InterfaceKind) -> impl Iterator<Item = &InterfaceConfig> {
        self.interfaces.values().filter(move |i| i.kind == kind)
    }

    pub fn modified_interface_names(&self) -> impl Iterator<Item = &str> {
        self.modified_interface_names.iter().map(String::as_str)
    }

    /// Interfaces named in the modified set that exist in this snapshot.
    pub fn modified_interfaces(&self) -> impl Iterator<Item = &InterfaceConfig> {
        self.modified_interface_names
            .iter()
            .filter_map(|n| self.interfaces.get(n))
    }

    // ── Mutation (invalidates the cached property view) ──────────────

    pub fn add_interface(&mut self, config: InterfaceConfig) {
        self.properties.take();
        self.interfaces.insert(config.name.clone(), config);
    }

    pub fn remove_interface(&mut self, name: &str) -> Option<InterfaceConfig> {
        self.properties.take();
        self.interfaces.shift_remove(name)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut InterfaceConfig> {
        self.properties.take();
        self.interfaces.get_mut(name)
    }

    pub fn set_modified_interface_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties.take();
        self.modified_interface_names = names.into_iter().map(Into::into).collect();
    }

    /// Copy of `self` where each interface in `names` is taken from
    /// `previous` instead, or dropped when `previous` has no such interface.
    pub fn with_interfaces_from(&self, previous: &Self, names: &[String]) -> Self {
        let mut merged = self.clone();
        for name in names {
            match previous.interface(name) {
                Some(iface) => merged.add_interface(iface.clone()),
                None => {
                    merged.remove_interface(name);
                }
            }
        }
        merged
    }

    /// Flat property view, computed on first use.
    pub fn properties(&self) -> &Properties {
        self.properties
            .get_or_init(|| interpret::network::serialize(self))
    }

    // ── Validity ─────────────────────────────────────────────────────

    pub fn validate(&self) -> Result<()> {
        for iface in self.interfaces.values() {
            iface
                .validate()
                .map_err(|message| NetError::ValidationFailed { message })?;
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
