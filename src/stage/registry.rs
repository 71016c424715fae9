use std::collections::BTreeMap;

use crate::stage::config::{ActionConfig, StageConfig};

/// Index of an action in its [`ActionTable`]; also the action's mixer and audio slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct ActionId(pub usize);

/// Fixed table of action definitions, closed at configuration time.
#[derive(Clone, Debug)]
pub struct ActionTable {
    defs: Vec<ActionConfig>,
    by_name: BTreeMap<String, ActionId>,
    idle: ActionId,
}

impl ActionTable {
    /// Build the table from a validated configuration.
    ///
    /// Returns `None` when the idle action is not among the configured actions.
    pub fn from_config(config: &StageConfig) -> Option<Self> {
        let defs = config.actions.clone();
        let by_name: BTreeMap<String, ActionId> = defs
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name.clone(), ActionId(i)))
            .collect();
        let idle = *by_name.get(&config.idle)?;
        Some(Self { defs, by_name, idle })
    }

    /// Look up an action by name.
    pub fn id(&self, name: &str) -> Option<ActionId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionConfig> {
        self.defs.get(id.0)
    }

    pub fn name(&self, id: ActionId) -> &str {
        self.defs.get(id.0).map_or("", |a| a.name.as_str())
    }

    /// The looping rest action.
    pub fn idle(&self) -> ActionId {
        self.idle
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Every action with its id, in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &ActionConfig)> + '_ {
        self.defs.iter().enumerate().map(|(i, a)| (ActionId(i), a))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/registry.rs"]
mod tests;
