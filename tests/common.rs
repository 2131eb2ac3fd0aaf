//! Shared fixtures: a small scythe registry and a host that records what ran.
#![allow(dead_code)]

use std::sync::Arc;

use toolmodes::code::AssetCode;
use toolmodes::dispatch::{CollectibleBehavior, EventFamily};
use toolmodes::mode::{
    BreakingProgress, BrokenWith, CancelReason, DisplayDescriptor, HandHandling, HeldEvent,
};
use toolmodes::modes::LabelMode;
use toolmodes::object::ObjectDefinition;
use toolmodes::registry::ModeRegistry;

pub fn code(s: &str) -> AssetCode {
    AssetCode::parse(s).expect("valid code")
}

fn label(name: &str) -> LabelMode {
    LabelMode::new(DisplayDescriptor::new(name))
}

/// Group `item-scythe = [scythe-trim, scythe-remove]` plus loose modes `scythe-stamp`
/// and `hoe-till`.
pub fn scythe_registry() -> Arc<ModeRegistry> {
    let mut reg = ModeRegistry::new();
    for (c, name) in [
        ("scythe-trim", "Trim"),
        ("scythe-remove", "Remove"),
        ("scythe-stamp", "Stamp"),
        ("hoe-till", "Till"),
    ] {
        let mode = label(name);
        reg.register_mode_fn(code(c), move |_| Box::new(mode.clone()))
            .expect("unique code");
    }
    reg.register_group(code("item-scythe"), [code("scythe-trim"), code("scythe-remove")]);
    reg.freeze()
}

pub fn scythe(path: &str) -> ObjectDefinition {
    ObjectDefinition::item(code(path)).with_group("item-scythe")
}

/// Host whose defaults return fixed values and record every call.
#[derive(Default)]
pub struct RecordingHost {
    pub defaults: Vec<EventFamily>,
    pub effects: Vec<EventFamily>,
}

impl CollectibleBehavior for RecordingHost {
    fn attack_start(&mut self, _: &HeldEvent<'_>) -> HandHandling {
        self.defaults.push(EventFamily::AttackStart);
        HandHandling::Handled
    }
    fn attack_step(&mut self, event: &HeldEvent<'_>) -> bool {
        self.defaults.push(EventFamily::AttackStep);
        event.seconds_used < 1.0
    }
    fn attack_cancel(&mut self, _: &HeldEvent<'_>, reason: CancelReason) -> bool {
        self.defaults.push(EventFamily::AttackCancel);
        reason != CancelReason::Death
    }
    fn attack_stop(&mut self, _: &HeldEvent<'_>) {
        self.defaults.push(EventFamily::AttackStop);
    }
    fn interact_start(&mut self, _: &HeldEvent<'_>, first_event: bool) -> HandHandling {
        self.defaults.push(EventFamily::InteractStart);
        if first_event {
            HandHandling::PreventDefaultAnimation
        } else {
            HandHandling::NotHandled
        }
    }
    fn interact_step(&mut self, event: &HeldEvent<'_>) -> bool {
        self.defaults.push(EventFamily::InteractStep);
        event.seconds_used < 2.0
    }
    fn interact_cancel(&mut self, _: &HeldEvent<'_>, _: CancelReason) -> bool {
        self.defaults.push(EventFamily::InteractCancel);
        true
    }
    fn interact_stop(&mut self, _: &HeldEvent<'_>) {
        self.defaults.push(EventFamily::InteractStop);
    }
    fn block_breaking(&mut self, _: &HeldEvent<'_>, progress: &BreakingProgress) -> f32 {
        self.defaults.push(EventFamily::BlockBreaking);
        progress.remaining_resistance - progress.dt * 1.5
    }
    fn block_broken_with(&mut self, _: &HeldEvent<'_>, broken: &BrokenWith) -> bool {
        self.defaults.push(EventFamily::BlockBrokenWith);
        broken.drop_multiplier > 0.5
    }
    fn secondary_effects(&mut self, family: EventFamily, _: &HeldEvent<'_>) {
        self.effects.push(family);
    }
}
