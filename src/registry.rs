//! Mode and group registry.
//!
//! Mode providers register constructors and group membership during start-up, before any
//! object definition that uses them loads. After that the registry is frozen behind an
//! `Arc` and only read.

use std::collections::HashMap;
use std::sync::Arc;

use crate::code::{GroupCode, ModeCode};
use crate::errors::ToolModeError;
use crate::mode::{ModeInstance, ModeScope, ToolMode};

/// Factory for one mode type. Receives the scope the instance is created under.
pub type ModeConstructor = Arc<dyn Fn(&ModeScope) -> Box<dyn ToolMode> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ModeRegistry {
    constructors: HashMap<ModeCode, ModeConstructor>,
    groups: HashMap<GroupCode, Vec<ModeCode>>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mode constructor. A code can only be registered once.
    pub fn register_mode(
        &mut self,
        code: ModeCode,
        constructor: ModeConstructor,
    ) -> Result<(), ToolModeError> {
        if self.constructors.contains_key(&code) {
            return Err(ToolModeError::DuplicateRegistration(code));
        }
        log::debug!("registered tool mode {}", code);
        self.constructors.insert(code, constructor);
        Ok(())
    }

    /// Convenience wrapper over [`register_mode`](Self::register_mode) for closures.
    pub fn register_mode_fn<F>(&mut self, code: ModeCode, constructor: F) -> Result<(), ToolModeError>
    where
        F: Fn(&ModeScope) -> Box<dyn ToolMode> + Send + Sync + 'static,
    {
        self.register_mode(code, Arc::new(constructor))
    }

    /// Append members to a group, creating it if needed. Order is preserved.
    pub fn register_group<I>(&mut self, code: GroupCode, members: I)
    where
        I: IntoIterator<Item = ModeCode>,
    {
        let list = self.groups.entry(code.clone()).or_default();
        let before = list.len();
        list.extend(members);
        log::debug!(
            "group {} now has {} members (+{})",
            code,
            list.len(),
            list.len() - before
        );
    }

    pub fn is_registered(&self, code: &ModeCode) -> bool {
        self.constructors.contains_key(code)
    }

    pub fn group_members(&self, group: &GroupCode) -> Option<&[ModeCode]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn mode_count(&self) -> usize {
        self.constructors.len()
    }

    /// Registered group codes, sorted for stable output.
    pub fn group_codes(&self) -> Vec<&GroupCode> {
        let mut codes: Vec<&GroupCode> = self.groups.keys().collect();
        codes.sort();
        codes
    }

    /// Instantiate one mode under `scope`. The instance's code is the requested code.
    pub fn create_mode(&self, scope: ModeScope, code: &ModeCode) -> Result<ModeInstance, ToolModeError> {
        let constructor = self
            .constructors
            .get(code)
            .ok_or_else(|| ToolModeError::UnknownModeCode(code.clone()))?;
        let behavior = constructor(&scope);
        Ok(ModeInstance::new(code.clone(), scope, behavior))
    }

    /// Instantiate every member of `group`, in registration order.
    pub fn create_mode_group(&self, group: &GroupCode) -> Result<Vec<ModeInstance>, ToolModeError> {
        let members = self
            .groups
            .get(group)
            .ok_or_else(|| ToolModeError::UnknownGroup(group.clone()))?;
        members
            .iter()
            .map(|code| self.create_mode(ModeScope::Group(group.clone()), code))
            .collect()
    }

    /// Freeze the registry for shared read-only use.
    pub fn freeze(self) -> Arc<ModeRegistry> {
        Arc::new(self)
    }
}
