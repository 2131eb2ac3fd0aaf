//! One side's view of the tool mode system.
//!
//! [`ToolModeSystem`] ties the shared registry to this side's mode cache and selection
//! store. The host drives it through the definition lifecycle hooks, the display and
//! selection contract, and [`interceptor`](ToolModeSystem::interceptor) at event points.
//! The observing side originates selections and forwards every write over the sync
//! channel; the authoritative side persists and applies them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::ModeInstanceCache;
use crate::code::{GroupCode, ModeCode, ObjectCode};
use crate::dispatch::DispatchInterceptor;
use crate::errors::ToolModeError;
use crate::mode::{InteractionHint, ModeInstance, ModeListing, Target};
use crate::object::ObjectDefinition;
use crate::registry::ModeRegistry;
use crate::selection::{AgentId, SelectionKey, SelectionState, SelectionStore};
use crate::sync::{SyncMessage, SyncReceiver, SyncSender};

pub const SELECT_HINT_ACTION: &str = "heldhelp-settoolmode";
pub const SELECT_HINT_HOTKEY: &str = "toolmodeselect";

/// Which half of the simulation this system runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Owns persisted selections and applies incoming sync messages.
    #[default]
    Authoritative,
    /// Where the agent picks modes; originates every selection write.
    Observing,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Authoritative => f.write_str("authoritative"),
            Side::Observing => f.write_str("observing"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authoritative" | "server" => Ok(Side::Authoritative),
            "observing" | "client" => Ok(Side::Observing),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

pub struct ToolModeSystem {
    registry: Arc<ModeRegistry>,
    side: Side,
    cache: ModeInstanceCache,
    store: SelectionStore,
    sync: Option<SyncSender>,
}

impl ToolModeSystem {
    pub fn new(registry: Arc<ModeRegistry>, side: Side, store: SelectionStore) -> Self {
        Self {
            registry,
            side,
            cache: ModeInstanceCache::new(),
            store,
            sync: None,
        }
    }

    /// Attach the channel selection writes are forwarded on (observing side).
    pub fn with_sync(mut self, sender: SyncSender) -> Self {
        self.sync = Some(sender);
        self
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn registry(&self) -> &Arc<ModeRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ModeInstanceCache {
        &self.cache
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    // ---------------------------------------------------------------------
    // Definition lifecycle
    // ---------------------------------------------------------------------

    /// Build the mode array for a freshly loaded definition. Returns the number of modes.
    pub fn on_definition_loaded(&mut self, definition: &ObjectDefinition) -> Result<usize, ToolModeError> {
        if !definition.declares_modes() {
            return Ok(0);
        }
        match self.cache.load(&self.registry, definition) {
            Ok(count) => Ok(count),
            Err(e) => {
                log::error!("failed to load tool modes for {}: {}", definition.code, e);
                Err(e)
            }
        }
    }

    pub fn on_definition_unloaded(&mut self, code: &ObjectCode) -> usize {
        self.cache.unload(code)
    }

    // ---------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------

    pub fn modes(&self, code: &ObjectCode) -> &[ModeInstance] {
        self.cache.modes(code)
    }

    /// Group the loaded definition declared, if any.
    pub fn group_of(&self, code: &ObjectCode) -> Option<&GroupCode> {
        self.cache.get(code)?.group.as_ref()
    }

    fn key<'a>(&'a self, definition: &'a ObjectDefinition) -> SelectionKey<'a> {
        SelectionKey {
            code: &definition.code,
            class: definition.class,
            group: self.group_of(&definition.code),
        }
    }

    pub fn active_index(&self, agent: &AgentId, definition: &ObjectDefinition) -> Option<usize> {
        let modes = self.modes(&definition.code);
        self.store.resolve_index(agent, self.key(definition), modes)
    }

    pub fn active_mode(&self, agent: &AgentId, definition: &ObjectDefinition) -> Option<&ModeInstance> {
        let index = self.active_index(agent, definition)?;
        self.modes(&definition.code).get(index)
    }

    /// Code of the active mode; `None` when the object has no modes.
    pub fn resolve(&self, agent: &AgentId, definition: &ObjectDefinition) -> Option<&ModeCode> {
        self.active_mode(agent, definition).map(ModeInstance::code)
    }

    /// Array indices of the modes the agent can currently see, in array order.
    fn visible_indices(&self, agent: &AgentId, definition: &ObjectDefinition, target: &Target) -> Vec<usize> {
        self.modes(&definition.code)
            .iter()
            .enumerate()
            .filter(|(_, mode)| mode.behavior().should_display(definition, agent, target))
            .map(|(index, _)| index)
            .collect()
    }

    /// Modes to show in the selection UI. Position in the result is the display index.
    pub fn list_visible_modes(
        &self,
        agent: &AgentId,
        definition: &ObjectDefinition,
        target: &Target,
    ) -> Vec<ModeListing> {
        let modes = self.modes(&definition.code);
        self.visible_indices(agent, definition, target)
            .into_iter()
            .map(|index| modes[index].listing())
            .collect()
    }

    /// Held-item help: the active mode's hints, then the mode selection hint.
    pub fn interaction_help(&self, agent: &AgentId, definition: &ObjectDefinition) -> Vec<InteractionHint> {
        let Some(mode) = self.active_mode(agent, definition) else {
            return Vec::new();
        };
        let mut hints = mode.behavior().interaction_help();
        hints.push(InteractionHint::new(SELECT_HINT_ACTION).with_hotkey(SELECT_HINT_HOTKEY));
        hints
    }

    pub fn interceptor(&self) -> DispatchInterceptor<'_> {
        DispatchInterceptor::new(&self.cache, &self.store)
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    fn ensure_observing(&self) -> Result<(), ToolModeError> {
        if self.side == Side::Authoritative {
            return Err(ToolModeError::InvalidSide);
        }
        Ok(())
    }

    fn forward(&self, agent: &AgentId, writes: &[SyncMessage]) {
        let Some(sync) = &self.sync else {
            return;
        };
        for write in writes {
            sync.send(agent, write);
        }
    }

    /// Select the mode shown at `display_index` of [`list_visible_modes`](Self::list_visible_modes).
    pub fn set_selection(
        &mut self,
        agent: &AgentId,
        definition: &ObjectDefinition,
        target: &Target,
        display_index: usize,
    ) -> Result<(), ToolModeError> {
        self.ensure_observing()?;
        let visible = self.visible_indices(agent, definition, target);
        let Some(&index) = visible.get(display_index) else {
            return Err(ToolModeError::SelectionOutOfRange {
                index: display_index,
                visible: visible.len(),
            });
        };

        let modes = self.cache.modes(&definition.code);
        let mode = &modes[index];
        let key = SelectionKey {
            code: &definition.code,
            class: definition.class,
            group: self.cache.get(&definition.code).and_then(|set| set.group.as_ref()),
        };
        log::debug!("{} selected {} for {}", agent, mode.code(), definition.code);
        let writes = self.store.select(agent, key, Some(mode))?;
        self.forward(agent, &writes);
        Ok(())
    }

    /// Select by code; `None` clears the object's own selection.
    ///
    /// A code that is not in the object's array is stored as an own selection and falls
    /// back to the default when resolved.
    pub fn select(
        &mut self,
        agent: &AgentId,
        definition: &ObjectDefinition,
        mode: Option<&ModeCode>,
    ) -> Result<(), ToolModeError> {
        self.ensure_observing()?;
        let set = self.cache.get(&definition.code);
        let mode_group = match (mode, set) {
            (Some(code), Some(set)) => set
                .modes
                .iter()
                .find(|m| m.code() == code)
                .and_then(ModeInstance::group),
            _ => None,
        };
        let key = SelectionKey {
            code: &definition.code,
            class: definition.class,
            group: set.and_then(|set| set.group.as_ref()),
        };
        let writes = self.store.select_code(agent, key, mode, mode_group)?;
        self.forward(agent, &writes);
        Ok(())
    }

    /// Apply one incoming sync message as a raw write. Nothing is re-sent.
    pub fn apply_sync(&mut self, agent: &AgentId, msg: &SyncMessage) -> Result<bool, ToolModeError> {
        let changed = self
            .store
            .write_raw(agent, msg.tree, msg.key.clone(), msg.value.clone())?;
        log::trace!(
            "applied {} {} = {:?} for {} (changed: {})",
            msg.tree,
            msg.key,
            msg.value.as_ref().map(ToString::to_string),
            agent,
            changed
        );
        Ok(changed)
    }

    /// Apply everything already waiting on `receiver`. Returns the number of messages seen.
    pub fn drain_sync(&mut self, receiver: &mut SyncReceiver) -> usize {
        let mut seen = 0;
        while let Some((agent, msg)) = receiver.try_recv() {
            seen += 1;
            if let Err(e) = self.apply_sync(&agent, &msg) {
                log::warn!("failed to apply tool mode sync for {}: {}", agent, e);
            }
        }
        seen
    }

    pub fn snapshot(&self, agent: &AgentId) -> SelectionState {
        self.store.snapshot(agent)
    }

    /// Seed an agent's selections, e.g. on the observing side when the agent joins.
    pub fn restore(&mut self, agent: &AgentId, state: SelectionState) -> Result<(), ToolModeError> {
        self.store.restore(agent, state)
    }
}

/// Apply sync messages to a shared system until every sender is dropped.
///
/// Returns the number of messages received.
pub async fn run_sync_loop(system: Arc<Mutex<ToolModeSystem>>, mut receiver: SyncReceiver) -> u64 {
    let mut received = 0u64;
    while let Some((agent, msg)) = receiver.recv().await {
        received += 1;
        let mut guard = system.lock().await;
        if let Err(e) = guard.apply_sync(&agent, &msg) {
            log::warn!("failed to apply tool mode sync for {}: {}", agent, e);
        }
    }
    log::debug!(
        "tool mode sync loop finished after {} messages ({} dropped)",
        received,
        receiver.dropped()
    );
    received
}
