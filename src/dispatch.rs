//! Event interception for mode-bearing objects.
//!
//! The host calls the interceptor at each event point instead of running its default
//! behavior directly. For every event the active mode is resolved once and given first
//! right of refusal:
//!
//! | signal              | default behavior | secondary effects | result         |
//! |---------------------|------------------|-------------------|----------------|
//! | `PassThrough`       | runs             | run               | host's value   |
//! | `PreventDefault`    | skipped          | run               | mode's value   |
//! | `PreventSubsequent` | skipped          | skipped           | mode's value   |
//!
//! With no active mode (no modes for the object) the host's default behavior and side
//! effects run exactly as they would without this crate.

use crate::cache::ModeInstanceCache;
use crate::mode::{
    BreakingProgress, BrokenWith, CancelReason, HandHandling, HeldEvent, ModeInstance,
    ModeOutcome, ToolMode,
};
use crate::selection::{SelectionKey, SelectionStore};

/// Event families routed through the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
    AttackStart,
    AttackStep,
    AttackCancel,
    AttackStop,
    InteractStart,
    InteractStep,
    InteractCancel,
    InteractStop,
    BlockBreaking,
    BlockBrokenWith,
}

/// Default behavior of the host object, called when no mode takes over.
pub trait CollectibleBehavior {
    fn attack_start(&mut self, event: &HeldEvent<'_>) -> HandHandling;
    fn attack_step(&mut self, event: &HeldEvent<'_>) -> bool;
    fn attack_cancel(&mut self, event: &HeldEvent<'_>, reason: CancelReason) -> bool;
    fn attack_stop(&mut self, event: &HeldEvent<'_>);
    fn interact_start(&mut self, event: &HeldEvent<'_>, first_event: bool) -> HandHandling;
    fn interact_step(&mut self, event: &HeldEvent<'_>) -> bool;
    fn interact_cancel(&mut self, event: &HeldEvent<'_>, reason: CancelReason) -> bool;
    fn interact_stop(&mut self, event: &HeldEvent<'_>);
    fn block_breaking(&mut self, event: &HeldEvent<'_>, progress: &BreakingProgress) -> f32;
    fn block_broken_with(&mut self, event: &HeldEvent<'_>, broken: &BrokenWith) -> bool;

    /// Side effects the host adds on top of its default behavior (e.g. a swing sound).
    fn secondary_effects(&mut self, family: EventFamily, event: &HeldEvent<'_>) {
        let _ = (family, event);
    }
}

/// Borrowed view over the cache and selections of one side.
#[derive(Clone, Copy)]
pub struct DispatchInterceptor<'a> {
    cache: &'a ModeInstanceCache,
    selections: &'a SelectionStore,
}

impl<'a> DispatchInterceptor<'a> {
    pub fn new(cache: &'a ModeInstanceCache, selections: &'a SelectionStore) -> Self {
        Self { cache, selections }
    }

    /// Resolve the active mode for the event's agent and object.
    pub fn active_mode(&self, event: &HeldEvent<'_>) -> Option<&'a ModeInstance> {
        let set = self.cache.get(&event.object.code)?;
        let key = SelectionKey {
            code: &event.object.code,
            class: event.object.class,
            group: set.group.as_ref(),
        };
        let index = self.selections.resolve_index(event.agent, key, &set.modes)?;
        set.modes.get(index)
    }

    fn chain<H, T>(
        mode: Option<&ModeInstance>,
        host: &mut H,
        family: EventFamily,
        event: &HeldEvent<'_>,
        handler: impl FnOnce(&dyn ToolMode) -> ModeOutcome<T>,
        default: impl FnOnce(&mut H) -> T,
    ) -> T
    where
        H: CollectibleBehavior + ?Sized,
    {
        let outcome = match mode {
            Some(mode) => {
                let outcome = handler(mode.behavior());
                log::trace!(
                    "{:?} on {} by {}: mode {} -> {:?}",
                    family,
                    event.object.code,
                    event.agent,
                    mode.code(),
                    outcome.signal()
                );
                outcome
            }
            None => ModeOutcome::PassThrough,
        };

        match outcome {
            ModeOutcome::PassThrough => {
                let value = default(host);
                host.secondary_effects(family, event);
                value
            }
            ModeOutcome::PreventDefault(value) => {
                host.secondary_effects(family, event);
                value
            }
            ModeOutcome::PreventSubsequent(value) => value,
        }
    }

    pub fn attack_start<H>(&self, host: &mut H, event: &HeldEvent<'_>) -> HandHandling
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::AttackStart,
            event,
            |m| m.on_attack_start(event),
            |h| h.attack_start(event),
        )
    }

    pub fn attack_step<H>(&self, host: &mut H, event: &HeldEvent<'_>) -> bool
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::AttackStep,
            event,
            |m| m.on_attack_step(event),
            |h| h.attack_step(event),
        )
    }

    pub fn attack_cancel<H>(&self, host: &mut H, event: &HeldEvent<'_>, reason: CancelReason) -> bool
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::AttackCancel,
            event,
            |m| m.on_attack_cancel(event, reason),
            |h| h.attack_cancel(event, reason),
        )
    }

    pub fn attack_stop<H>(&self, host: &mut H, event: &HeldEvent<'_>)
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::AttackStop,
            event,
            |m| m.on_attack_stop(event),
            |h| h.attack_stop(event),
        )
    }

    pub fn interact_start<H>(&self, host: &mut H, event: &HeldEvent<'_>, first_event: bool) -> HandHandling
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::InteractStart,
            event,
            |m| m.on_interact_start(event, first_event),
            |h| h.interact_start(event, first_event),
        )
    }

    pub fn interact_step<H>(&self, host: &mut H, event: &HeldEvent<'_>) -> bool
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::InteractStep,
            event,
            |m| m.on_interact_step(event),
            |h| h.interact_step(event),
        )
    }

    pub fn interact_cancel<H>(&self, host: &mut H, event: &HeldEvent<'_>, reason: CancelReason) -> bool
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::InteractCancel,
            event,
            |m| m.on_interact_cancel(event, reason),
            |h| h.interact_cancel(event, reason),
        )
    }

    pub fn interact_stop<H>(&self, host: &mut H, event: &HeldEvent<'_>)
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::InteractStop,
            event,
            |m| m.on_interact_stop(event),
            |h| h.interact_stop(event),
        )
    }

    /// Remaining resistance after this breaking tick. The active mode's post-breaking hook
    /// sees the chain's result.
    pub fn block_breaking<H>(&self, host: &mut H, event: &HeldEvent<'_>, progress: &BreakingProgress) -> f32
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        let remaining = Self::chain(
            mode,
            host,
            EventFamily::BlockBreaking,
            event,
            |m| m.on_block_breaking(event, progress),
            |h| h.block_breaking(event, progress),
        );
        match mode {
            Some(mode) => mode
                .behavior()
                .on_block_breaking_after(event, progress, remaining),
            None => remaining,
        }
    }

    pub fn block_broken_with<H>(&self, host: &mut H, event: &HeldEvent<'_>, broken: &BrokenWith) -> bool
    where
        H: CollectibleBehavior + ?Sized,
    {
        let mode = self.active_mode(event);
        Self::chain(
            mode,
            host,
            EventFamily::BlockBrokenWith,
            event,
            |m| m.on_block_broken_with(event, broken),
            |h| h.block_broken_with(event, broken),
        )
    }
}
