//! Per-agent tool mode selections and the resolution algorithm.
//!
//! Each agent has three independent maps:
//!
//! - **group**: group code → mode code, shared by every object declaring that group
//! - **item**: item code → mode code ("own" selection of an item)
//! - **block**: block code → mode code ("own" selection of a block)
//!
//! Reads prefer the object's own selection over the inherited group selection. Writes of a
//! mode that belongs to the object's group go to the group map and clear the own entry, so
//! a group-level pick sticks across every member of the group.

pub mod storage;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::code::{AssetCode, GroupCode, ModeCode, ObjectCode};
use crate::errors::ToolModeError;
use crate::mode::ModeInstance;
use crate::object::ItemClass;
use crate::sync::SyncMessage;

pub use storage::{SelectionDb, SelectionDbBuilder, SelectionRecord, SELECTION_SCHEMA_VERSION};

/// Identity of an agent (player). Case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: &str) -> Self {
        Self(id.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Which of the three selection maps a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TreeKey {
    Group,
    Item,
    Block,
}

impl TreeKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeKey::Group => "toolmodes:group",
            TreeKey::Item => "toolmodes:item",
            TreeKey::Block => "toolmodes:block",
        }
    }

    /// The "own" tree for an object class.
    pub fn for_class(class: ItemClass) -> Self {
        match class {
            ItemClass::Item => TreeKey::Item,
            ItemClass::Block => TreeKey::Block,
        }
    }
}

impl fmt::Display for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeKey {
    type Err = ToolModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toolmodes:group" => Ok(TreeKey::Group),
            "toolmodes:item" => Ok(TreeKey::Item),
            "toolmodes:block" => Ok(TreeKey::Block),
            other => Err(ToolModeError::InvalidCode(format!("unknown tree '{}'", other))),
        }
    }
}

impl TryFrom<String> for TreeKey {
    type Error = ToolModeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TreeKey> for String {
    fn from(tree: TreeKey) -> Self {
        tree.as_str().to_string()
    }
}

/// One agent's selections. A missing key means "no explicit selection".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub group: BTreeMap<GroupCode, ModeCode>,
    pub item: BTreeMap<ObjectCode, ModeCode>,
    pub block: BTreeMap<ObjectCode, ModeCode>,
}

impl SelectionState {
    pub fn tree(&self, tree: TreeKey) -> &BTreeMap<AssetCode, ModeCode> {
        match tree {
            TreeKey::Group => &self.group,
            TreeKey::Item => &self.item,
            TreeKey::Block => &self.block,
        }
    }

    fn tree_mut(&mut self, tree: TreeKey) -> &mut BTreeMap<AssetCode, ModeCode> {
        match tree {
            TreeKey::Group => &mut self.group,
            TreeKey::Item => &mut self.item,
            TreeKey::Block => &mut self.block,
        }
    }

    pub fn get(&self, tree: TreeKey, key: &AssetCode) -> Option<&ModeCode> {
        self.tree(tree).get(key)
    }

    /// Set or clear (`None`) one entry. Returns whether the state changed.
    pub fn set(&mut self, tree: TreeKey, key: AssetCode, value: Option<ModeCode>) -> bool {
        let map = self.tree_mut(tree);
        match value {
            Some(mode) => map.insert(key, mode.clone()).as_ref() != Some(&mode),
            None => map.remove(&key).is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.item.is_empty() && self.block.is_empty()
    }
}

/// Object identity as needed by resolution.
#[derive(Debug, Clone, Copy)]
pub struct SelectionKey<'a> {
    pub code: &'a ObjectCode,
    pub class: ItemClass,
    pub group: Option<&'a GroupCode>,
}

/// Per-agent selection maps, optionally backed by a [`SelectionDb`].
#[derive(Default)]
pub struct SelectionStore {
    agents: HashMap<AgentId, SelectionState>,
    db: Option<SelectionDb>,
}

impl SelectionStore {
    /// In-memory store (observing side, tests).
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by `db`; every stored agent is loaded up front.
    pub fn persistent(db: SelectionDb) -> Result<Self, ToolModeError> {
        let mut agents = HashMap::new();
        for record in db.load_all()? {
            agents.insert(record.agent, record.state);
        }
        log::debug!("loaded tool mode selections for {} agents", agents.len());
        Ok(Self {
            agents,
            db: Some(db),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.db.is_some()
    }

    pub fn state(&self, agent: &AgentId) -> Option<&SelectionState> {
        self.agents.get(agent)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn get(&self, agent: &AgentId, tree: TreeKey, key: &AssetCode) -> Option<&ModeCode> {
        self.agents.get(agent)?.get(tree, key)
    }

    /// Copy of an agent's state, e.g. to seed the observing side on join.
    pub fn snapshot(&self, agent: &AgentId) -> SelectionState {
        self.agents.get(agent).cloned().unwrap_or_default()
    }

    /// Replace an agent's state wholesale. Does not sync.
    pub fn restore(&mut self, agent: &AgentId, state: SelectionState) -> Result<(), ToolModeError> {
        if let Some(db) = &self.db {
            db.put_state(agent, &state)?;
        }
        if state.is_empty() {
            self.agents.remove(agent);
        } else {
            self.agents.insert(agent.clone(), state);
        }
        Ok(())
    }

    /// Apply one write exactly as given. Never produces outbound sync traffic.
    ///
    /// The new state is persisted before it replaces the in-memory one, so a failed
    /// write leaves both untouched.
    pub fn write_raw(
        &mut self,
        agent: &AgentId,
        tree: TreeKey,
        key: AssetCode,
        value: Option<ModeCode>,
    ) -> Result<bool, ToolModeError> {
        let mut next = self.snapshot(agent);
        if !next.set(tree, key, value) {
            return Ok(false);
        }
        self.restore(agent, next)?;
        Ok(true)
    }

    /// Resolve the stored mode code for `object`: own selection beats group selection.
    pub fn resolve_code(&self, agent: &AgentId, object: SelectionKey<'_>) -> Option<&ModeCode> {
        let state = self.agents.get(agent)?;
        let own = state.get(TreeKey::for_class(object.class), object.code);
        match object.group {
            None => own,
            Some(group) => own.or_else(|| state.get(TreeKey::Group, group)),
        }
    }

    /// Index of the active mode in `modes`; `None` only when `modes` is empty.
    ///
    /// Missing or stale selections fall back to index 0.
    pub fn resolve_index(
        &self,
        agent: &AgentId,
        object: SelectionKey<'_>,
        modes: &[ModeInstance],
    ) -> Option<usize> {
        if modes.is_empty() {
            return None;
        }
        let Some(code) = self.resolve_code(agent, object) else {
            return Some(0);
        };
        match modes.iter().position(|mode| mode.code() == code) {
            Some(index) => Some(index),
            None => {
                log::debug!(
                    "stale tool mode selection {} for {} ({}); using default",
                    code,
                    object.code,
                    agent
                );
                Some(0)
            }
        }
    }

    /// Record `mode` as the agent's choice for `object` (`None` clears the own selection).
    ///
    /// Returns every write performed, in order, for propagation.
    pub fn select(
        &mut self,
        agent: &AgentId,
        object: SelectionKey<'_>,
        mode: Option<&ModeInstance>,
    ) -> Result<Vec<SyncMessage>, ToolModeError> {
        self.select_code(
            agent,
            object,
            mode.map(ModeInstance::code),
            mode.and_then(ModeInstance::group),
        )
    }

    /// [`select`](Self::select) by code, for modes that are not in the object's array.
    /// `mode_group` is the group the mode was instantiated under, if any.
    pub fn select_code(
        &mut self,
        agent: &AgentId,
        object: SelectionKey<'_>,
        mode: Option<&ModeCode>,
        mode_group: Option<&GroupCode>,
    ) -> Result<Vec<SyncMessage>, ToolModeError> {
        let own_tree = TreeKey::for_class(object.class);
        let writes = match (object.group, mode_group) {
            (Some(group), Some(mode_group)) if group == mode_group => vec![
                SyncMessage::new(TreeKey::Group, group.clone(), mode.cloned()),
                SyncMessage::new(own_tree, object.code.clone(), None),
            ],
            _ => vec![SyncMessage::new(own_tree, object.code.clone(), mode.cloned())],
        };

        for write in &writes {
            self.write_raw(agent, write.tree, write.key.clone(), write.value.clone())?;
        }
        Ok(writes)
    }
}
