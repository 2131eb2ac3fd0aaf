//! Per-definition mode arrays.
//!
//! The array built for a definition is the index space shared by display lists and
//! event resolution: group members first, in registration order, then the definition's
//! own modes in declaration order.

use std::collections::HashMap;

use crate::code::{GroupCode, ObjectCode};
use crate::errors::ToolModeError;
use crate::mode::{ModeInstance, ModeScope};
use crate::object::ObjectDefinition;
use crate::registry::ModeRegistry;

/// Loaded modes of one object definition.
#[derive(Debug)]
pub struct ModeSet {
    pub group: Option<GroupCode>,
    pub modes: Vec<ModeInstance>,
}

#[derive(Debug, Default)]
pub struct ModeInstanceCache {
    entries: HashMap<ObjectCode, ModeSet>,
}

impl ModeInstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and load the mode array for `definition`.
    ///
    /// Any configuration error aborts before the cache is touched, so a failed load leaves
    /// no partial entry behind. Definitions without modes get no entry.
    pub fn load(
        &mut self,
        registry: &ModeRegistry,
        definition: &ObjectDefinition,
    ) -> Result<usize, ToolModeError> {
        let group = definition.group_code()?;
        let mut modes = match &group {
            Some(group) => registry.create_mode_group(group)?,
            None => Vec::new(),
        };

        for (code, properties) in definition.declared_modes()? {
            let mut mode =
                registry.create_mode(ModeScope::Object(definition.code.clone()), &code)?;
            if let Some(properties) = properties {
                mode.initialize(properties)?;
            }
            modes.push(mode);
        }

        if modes.is_empty() {
            self.unload(&definition.code);
            return Ok(0);
        }

        for mode in modes.iter_mut() {
            mode.load();
        }
        let count = modes.len();
        log::debug!("loaded {} tool modes for {}", count, definition.code);
        if let Some(mut previous) = self.entries.insert(definition.code.clone(), ModeSet { group, modes }) {
            for mode in previous.modes.iter_mut() {
                mode.unload();
            }
        }
        Ok(count)
    }

    /// Unload and drop the entry for `code`. Unknown codes are a no-op.
    pub fn unload(&mut self, code: &ObjectCode) -> usize {
        let Some(mut set) = self.entries.remove(code) else {
            return 0;
        };
        for mode in set.modes.iter_mut() {
            mode.unload();
        }
        log::debug!("unloaded {} tool modes for {}", set.modes.len(), code);
        set.modes.len()
    }

    pub fn get(&self, code: &ObjectCode) -> Option<&ModeSet> {
        self.entries.get(code)
    }

    /// Mode array for `code`; empty when the definition has none.
    pub fn modes(&self, code: &ObjectCode) -> &[ModeInstance] {
        self.entries
            .get(code)
            .map(|set| set.modes.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::AssetCode;
    use crate::mode::{DisplayDescriptor, ToolMode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        loads: Arc<AtomicUsize>,
        unloads: Arc<AtomicUsize>,
    }

    impl ToolMode for Counting {
        fn on_loaded(&mut self) {
            self.loads.fetch_add(1, Ordering::SeqCst);
        }
        fn on_unloaded(&mut self) {
            self.unloads.fetch_add(1, Ordering::SeqCst);
        }
        fn display(&self) -> DisplayDescriptor {
            DisplayDescriptor::new("counting")
        }
    }

    fn code(s: &str) -> AssetCode {
        AssetCode::parse(s).unwrap()
    }

    fn registry(loads: &Arc<AtomicUsize>, unloads: &Arc<AtomicUsize>) -> ModeRegistry {
        let mut reg = ModeRegistry::new();
        for c in ["a", "b", "c"] {
            let (l, u) = (loads.clone(), unloads.clone());
            reg.register_mode_fn(code(c), move |_| {
                Box::new(Counting {
                    loads: l.clone(),
                    unloads: u.clone(),
                })
            })
            .unwrap();
        }
        reg.register_group(code("g"), vec![code("a"), code("b")]);
        reg
    }

    #[test]
    fn group_modes_come_before_own_modes() {
        let (loads, unloads) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));
        let reg = registry(&loads, &unloads);
        let def = ObjectDefinition::item(code("tool")).with_mode("c").with_group("g");
        let mut cache = ModeInstanceCache::new();
        assert_eq!(cache.load(&reg, &def).unwrap(), 3);

        let codes: Vec<_> = cache.modes(&def.code).iter().map(|m| m.code().path().to_string()).collect();
        assert_eq!(codes, vec!["a", "b", "c"]);
        assert_eq!(loads.load(Ordering::SeqCst), 3);
        assert!(cache.modes(&def.code).iter().all(|m| m.is_loaded()));
        assert_eq!(cache.get(&def.code).unwrap().group, Some(code("g")));
    }

    #[test]
    fn unload_runs_hooks_and_tolerates_unknown() {
        let (loads, unloads) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));
        let reg = registry(&loads, &unloads);
        let def = ObjectDefinition::item(code("tool")).with_group("g");
        let mut cache = ModeInstanceCache::new();
        cache.load(&reg, &def).unwrap();

        assert_eq!(cache.unload(&def.code), 2);
        assert_eq!(unloads.load(Ordering::SeqCst), 2);
        assert!(cache.modes(&def.code).is_empty());
        assert_eq!(cache.unload(&code("never-loaded")), 0);
    }

    #[test]
    fn failed_load_leaves_no_entry() {
        let (loads, unloads) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));
        let reg = registry(&loads, &unloads);
        let def = ObjectDefinition::item(code("tool")).with_group("g").with_mode("missing");
        let mut cache = ModeInstanceCache::new();
        assert!(matches!(
            cache.load(&reg, &def),
            Err(ToolModeError::UnknownModeCode(_))
        ));
        assert!(cache.is_empty());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn definition_without_modes_gets_no_entry() {
        let reg = ModeRegistry::new();
        let mut cache = ModeInstanceCache::new();
        let def = ObjectDefinition::item(code("stick"));
        assert_eq!(cache.load(&reg, &def).unwrap(), 0);
        assert!(cache.get(&def.code).is_none());
    }
}
