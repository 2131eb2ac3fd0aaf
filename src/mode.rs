//! The tool mode contract and its runtime wrapper.
//!
//! A concrete mode implements [`ToolMode`]; every handler has a pass-through default so
//! a mode only overrides the events it cares about. The system never hands the trait
//! object out bare: it lives inside a [`ModeInstance`] that carries the code the mode was
//! created under, the group (if any), its configuration and its load state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::code::{GroupCode, ModeCode, ObjectCode};
use crate::errors::ToolModeError;
use crate::object::ObjectDefinition;
use crate::selection::AgentId;

/// Tri-state result of a mode handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlingSignal {
    /// The mode declined; default behavior runs unmodified.
    #[default]
    PassThrough,
    /// Default behavior is skipped, secondary side effects still apply.
    PreventDefault,
    /// Default behavior and secondary side effects are both skipped.
    PreventSubsequent,
}

/// Handler result: the signal plus the mode's value when it takes over.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeOutcome<T> {
    PassThrough,
    PreventDefault(T),
    PreventSubsequent(T),
}

impl<T> ModeOutcome<T> {
    pub fn signal(&self) -> HandlingSignal {
        match self {
            ModeOutcome::PassThrough => HandlingSignal::PassThrough,
            ModeOutcome::PreventDefault(_) => HandlingSignal::PreventDefault,
            ModeOutcome::PreventSubsequent(_) => HandlingSignal::PreventSubsequent,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            ModeOutcome::PassThrough => None,
            ModeOutcome::PreventDefault(v) | ModeOutcome::PreventSubsequent(v) => Some(v),
        }
    }
}

impl<T> Default for ModeOutcome<T> {
    fn default() -> Self {
        ModeOutcome::PassThrough
    }
}

/// Context a mode instance was created under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModeScope {
    /// Auto-attached through a group.
    Group(GroupCode),
    /// Declared directly on one object definition.
    Object(ObjectCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// What the agent is pointing at when the event fires.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Target {
    #[default]
    Nothing,
    Block {
        pos: BlockPos,
        block: Option<ObjectCode>,
    },
    Entity {
        id: u64,
    },
}

/// How a start event was handled by the hand holding the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandHandling {
    #[default]
    NotHandled,
    Handled,
    PreventDefault,
    PreventDefaultAction,
    PreventDefaultAnimation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    ReleasedButton,
    ChangedSlot,
    Death,
    Destroyed,
    Interrupted,
}

/// Shared payload of every held-object event.
#[derive(Debug, Clone, Copy)]
pub struct HeldEvent<'a> {
    pub agent: &'a AgentId,
    pub object: &'a ObjectDefinition,
    pub target: &'a Target,
    /// Seconds since the attack/interaction began; zero for start events.
    pub seconds_used: f32,
}

impl<'a> HeldEvent<'a> {
    pub fn new(agent: &'a AgentId, object: &'a ObjectDefinition, target: &'a Target) -> Self {
        Self {
            agent,
            object,
            target,
            seconds_used: 0.0,
        }
    }

    pub fn at(mut self, seconds_used: f32) -> Self {
        self.seconds_used = seconds_used;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakingProgress {
    pub remaining_resistance: f32,
    pub dt: f32,
    pub counter: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrokenWith {
    pub drop_multiplier: f32,
}

impl Default for BrokenWith {
    fn default() -> Self {
        Self {
            drop_multiplier: 1.0,
        }
    }
}

/// How a mode appears in the selection UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
}

impl DisplayDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            hotkey: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.hotkey = Some(hotkey.into());
        self
    }
}

/// One visible entry of a mode list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeListing {
    pub code: ModeCode,
    pub display: DisplayDescriptor,
}

/// Held-item help line shown while an object is in hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionHint {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
}

impl InteractionHint {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            hotkey: None,
        }
    }

    pub fn with_hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.hotkey = Some(hotkey.into());
        self
    }
}

/// Behavior contract implemented by every concrete mode.
pub trait ToolMode: Send + Sync {
    /// Apply the configuration blob declared in object metadata. Runs before `on_loaded`.
    fn initialize(&mut self, properties: &serde_json::Value) -> Result<(), String> {
        let _ = properties;
        Ok(())
    }

    fn on_loaded(&mut self) {}

    fn on_unloaded(&mut self) {}

    fn should_display(&self, object: &ObjectDefinition, agent: &AgentId, target: &Target) -> bool {
        let _ = (object, agent, target);
        true
    }

    fn display(&self) -> DisplayDescriptor;

    fn interaction_help(&self) -> Vec<InteractionHint> {
        Vec::new()
    }

    fn on_attack_start(&self, event: &HeldEvent<'_>) -> ModeOutcome<HandHandling> {
        let _ = event;
        ModeOutcome::PassThrough
    }

    fn on_attack_step(&self, event: &HeldEvent<'_>) -> ModeOutcome<bool> {
        let _ = event;
        ModeOutcome::PassThrough
    }

    fn on_attack_cancel(&self, event: &HeldEvent<'_>, reason: CancelReason) -> ModeOutcome<bool> {
        let _ = (event, reason);
        ModeOutcome::PassThrough
    }

    fn on_attack_stop(&self, event: &HeldEvent<'_>) -> ModeOutcome<()> {
        let _ = event;
        ModeOutcome::PassThrough
    }

    fn on_interact_start(
        &self,
        event: &HeldEvent<'_>,
        first_event: bool,
    ) -> ModeOutcome<HandHandling> {
        let _ = (event, first_event);
        ModeOutcome::PassThrough
    }

    fn on_interact_step(&self, event: &HeldEvent<'_>) -> ModeOutcome<bool> {
        let _ = event;
        ModeOutcome::PassThrough
    }

    fn on_interact_cancel(
        &self,
        event: &HeldEvent<'_>,
        reason: CancelReason,
    ) -> ModeOutcome<bool> {
        let _ = (event, reason);
        ModeOutcome::PassThrough
    }

    fn on_interact_stop(&self, event: &HeldEvent<'_>) -> ModeOutcome<()> {
        let _ = event;
        ModeOutcome::PassThrough
    }

    fn on_block_breaking(
        &self,
        event: &HeldEvent<'_>,
        progress: &BreakingProgress,
    ) -> ModeOutcome<f32> {
        let _ = (event, progress);
        ModeOutcome::PassThrough
    }

    /// Runs after the breaking chain with its result, whatever the signal was.
    fn on_block_breaking_after(
        &self,
        event: &HeldEvent<'_>,
        progress: &BreakingProgress,
        remaining_resistance: f32,
    ) -> f32 {
        let _ = (event, progress);
        remaining_resistance
    }

    fn on_block_broken_with(
        &self,
        event: &HeldEvent<'_>,
        broken: &BrokenWith,
    ) -> ModeOutcome<bool> {
        let _ = (event, broken);
        ModeOutcome::PassThrough
    }
}

/// A mode attached to one object definition.
pub struct ModeInstance {
    code: ModeCode,
    scope: ModeScope,
    properties: Option<serde_json::Value>,
    loaded: bool,
    behavior: Box<dyn ToolMode>,
}

impl ModeInstance {
    pub(crate) fn new(code: ModeCode, scope: ModeScope, behavior: Box<dyn ToolMode>) -> Self {
        Self {
            code,
            scope,
            properties: None,
            loaded: false,
            behavior,
        }
    }

    pub fn code(&self) -> &ModeCode {
        &self.code
    }

    pub fn scope(&self) -> &ModeScope {
        &self.scope
    }

    /// Group this instance was created under; `None` for object-specific modes.
    pub fn group(&self) -> Option<&GroupCode> {
        match &self.scope {
            ModeScope::Group(group) => Some(group),
            ModeScope::Object(_) => None,
        }
    }

    pub fn properties(&self) -> Option<&serde_json::Value> {
        self.properties.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn behavior(&self) -> &dyn ToolMode {
        self.behavior.as_ref()
    }

    pub fn initialize(&mut self, properties: &serde_json::Value) -> Result<(), ToolModeError> {
        self.behavior
            .initialize(properties)
            .map_err(|reason| ToolModeError::ModeInit {
                code: self.code.clone(),
                reason,
            })?;
        self.properties = Some(properties.clone());
        Ok(())
    }

    pub fn load(&mut self) {
        if !self.loaded {
            self.behavior.on_loaded();
            self.loaded = true;
        }
    }

    pub fn unload(&mut self) {
        if self.loaded {
            self.behavior.on_unloaded();
            self.loaded = false;
        }
    }

    pub fn listing(&self) -> ModeListing {
        ModeListing {
            code: self.code.clone(),
            display: self.behavior.display(),
        }
    }
}

impl fmt::Debug for ModeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeInstance")
            .field("code", &self.code)
            .field("scope", &self.scope)
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}
