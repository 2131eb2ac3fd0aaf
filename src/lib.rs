//! # toolmodes - Selectable behavior modes for tool-like objects
//!
//! Tool-like objects (a scythe, a hoe, a chisel) can expose several interchangeable
//! behavior modes that a player picks from a radial menu. This crate keeps the registry
//! of mode types, the per-definition mode arrays, each player's selections, the sync of
//! those selections between the two halves of a simulation, and the interception of
//! held-object events so the selected mode runs before (or instead of) the object's
//! default behavior.
//!
//! ## Features
//!
//! - **Registry**: mode constructors keyed by namespaced code, plus ordered mode groups that
//!   attach automatically to every object declaring the group.
//! - **Three-scope selections**: per agent, a group tree, an item tree and a block tree; an
//!   object's own selection beats the selection inherited from its group.
//! - **Sync**: every selection write on the observing side is forwarded as a small framed
//!   message and applied verbatim on the authoritative side.
//! - **Dispatch**: attack, interact and block-breaking events are offered to the active mode
//!   first; a tri-state signal decides what of the default behavior still runs.
//! - **Persistence**: authoritative selections live in a sled database.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use toolmodes::code::AssetCode;
//! use toolmodes::modes::LabelMode;
//! use toolmodes::mode::{DisplayDescriptor, Target};
//! use toolmodes::object::ObjectDefinition;
//! use toolmodes::registry::ModeRegistry;
//! use toolmodes::selection::{AgentId, SelectionStore};
//! use toolmodes::system::{Side, ToolModeSystem};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = ModeRegistry::new();
//!     for (code, name) in [("scythe-trim", "Trim"), ("scythe-remove", "Remove")] {
//!         let mode = LabelMode::new(DisplayDescriptor::new(name));
//!         registry.register_mode_fn(AssetCode::parse(code)?, move |_| Box::new(mode.clone()))?;
//!     }
//!     registry.register_group(
//!         AssetCode::parse("item-scythe")?,
//!         [AssetCode::parse("scythe-trim")?, AssetCode::parse("scythe-remove")?],
//!     );
//!
//!     let mut system = ToolModeSystem::new(registry.freeze(), Side::Observing, SelectionStore::new());
//!     let scythe = ObjectDefinition::item(AssetCode::parse("scythe-copper")?).with_group("item-scythe");
//!     system.on_definition_loaded(&scythe)?;
//!
//!     let agent = AgentId::new("alice");
//!     system.set_selection(&agent, &scythe, &Target::Nothing, 1)?;
//!     assert_eq!(system.resolve(&agent, &scythe).map(|c| c.to_string()).as_deref(), Some("game:scythe-remove"));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`code`] - namespaced `domain:path` identifiers
//! - [`object`] - object definitions and their mode metadata
//! - [`mode`] - the [`mode::ToolMode`] contract, events and instances
//! - [`registry`] - mode constructors and groups
//! - [`cache`] - per-definition mode arrays
//! - [`selection`] - per-agent selections, resolution and sled persistence
//! - [`sync`] - framed selection messages and the in-process channel
//! - [`dispatch`] - event interception
//! - [`system`] - the per-side facade
//! - [`loader`] - JSON group and object definitions
//! - [`modes`] - data-driven label modes
//! - [`config`] - TOML configuration
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   SyncMessage    ┌──────────────────┐
//! │  Observing side  │ ───────────────▶ │ Authoritative    │
//! │  (selects)       │   framed, CRC    │ side (persists)  │
//! └──────────────────┘                  └──────────────────┘
//!          │                                     │
//! ┌──────────────────┐                  ┌──────────────────┐
//! │ Cache + Store    │                  │ Cache + Store    │
//! └──────────────────┘                  └──────────────────┘
//!          │                                     │
//!          └──────────── ModeRegistry (Arc) ─────┘
//! ```

pub mod cache;
pub mod code;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod loader;
pub mod mode;
pub mod modes;
pub mod object;
pub mod registry;
pub mod selection;
pub mod sync;
pub mod system;

pub use errors::ToolModeError;
