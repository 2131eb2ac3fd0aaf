mod common;

use common::{code, scythe, scythe_registry};
use toolmodes::mode::Target;
use toolmodes::object::ObjectDefinition;
use toolmodes::selection::{AgentId, SelectionStore, TreeKey};
use toolmodes::sync::SyncMessage;
use toolmodes::system::{Side, ToolModeSystem};

fn observing() -> ToolModeSystem {
    ToolModeSystem::new(scythe_registry(), Side::Observing, SelectionStore::new())
}

fn authoritative() -> ToolModeSystem {
    ToolModeSystem::new(scythe_registry(), Side::Authoritative, SelectionStore::new())
}

#[test]
fn group_default_then_explicit_pick() {
    let mut sys = observing();
    let x = scythe("scythe-copper");
    sys.on_definition_loaded(&x).unwrap();
    let agent = AgentId::new("alice");

    assert_eq!(sys.resolve(&agent, &x), Some(&code("scythe-trim")));
    sys.select(&agent, &x, Some(&code("scythe-remove"))).unwrap();
    assert_eq!(sys.resolve(&agent, &x), Some(&code("scythe-remove")));
}

#[test]
fn own_selection_shadows_group_until_cleared() {
    let mut sys = observing();
    let x = scythe("scythe-copper").with_mode("scythe-stamp");
    let y = scythe("scythe-iron");
    sys.on_definition_loaded(&x).unwrap();
    sys.on_definition_loaded(&y).unwrap();
    let agent = AgentId::new("bob");

    sys.select(&agent, &x, Some(&code("scythe-stamp"))).unwrap();
    sys.select(&agent, &y, Some(&code("scythe-remove"))).unwrap();
    assert_eq!(sys.resolve(&agent, &x), Some(&code("scythe-stamp")));
    assert_eq!(sys.resolve(&agent, &y), Some(&code("scythe-remove")));

    sys.select(&agent, &x, None).unwrap();
    assert_eq!(sys.resolve(&agent, &x), Some(&code("scythe-remove")));
}

#[test]
fn group_pick_clears_own_entry() {
    let mut sys = observing();
    let x = scythe("scythe-copper").with_mode("scythe-stamp");
    sys.on_definition_loaded(&x).unwrap();
    let agent = AgentId::new("carol");

    sys.select(&agent, &x, Some(&code("scythe-stamp"))).unwrap();
    sys.select(&agent, &x, Some(&code("scythe-trim"))).unwrap();
    assert_eq!(sys.resolve(&agent, &x), Some(&code("scythe-trim")));
    assert!(sys.store().get(&agent, TreeKey::Item, &x.code).is_none());
    assert_eq!(
        sys.store().get(&agent, TreeKey::Group, &code("item-scythe")),
        Some(&code("scythe-trim"))
    );
}

#[test]
fn clear_message_restores_default_on_authoritative_side() {
    let mut sys = authoritative();
    let x = scythe("scythe-copper").with_mode("scythe-stamp");
    sys.on_definition_loaded(&x).unwrap();
    let agent = AgentId::new("dave");

    sys.apply_sync(&agent, &SyncMessage::new(TreeKey::Item, x.code.clone(), Some(code("scythe-stamp"))))
        .unwrap();
    assert_eq!(sys.resolve(&agent, &x), Some(&code("scythe-stamp")));

    sys.apply_sync(&agent, &SyncMessage::new(TreeKey::Item, x.code.clone(), None))
        .unwrap();
    assert_eq!(sys.active_index(&agent, &x), Some(0));
    assert_eq!(sys.resolve(&agent, &x), Some(&code("scythe-trim")));
}

#[test]
fn listing_and_resolution_share_one_array() {
    let mut sys = observing();
    let x = scythe("scythe-copper").with_mode("scythe-stamp").with_mode("hoe-till");
    sys.on_definition_loaded(&x).unwrap();
    let agent = AgentId::new("erin");

    let listed: Vec<_> = sys
        .list_visible_modes(&agent, &x, &Target::Nothing)
        .into_iter()
        .map(|l| l.code)
        .collect();
    assert_eq!(
        listed,
        vec![code("scythe-trim"), code("scythe-remove"), code("scythe-stamp"), code("hoe-till")]
    );

    for index in 0..listed.len() {
        sys.set_selection(&agent, &x, &Target::Nothing, index).unwrap();
        assert_eq!(sys.active_index(&agent, &x), Some(index));
        assert_eq!(sys.resolve(&agent, &x), Some(&listed[index]));
    }
}

#[test]
fn no_selection_falls_back_to_first_or_nothing() {
    let mut sys = observing();
    let x = scythe("scythe-copper");
    let plain = ObjectDefinition::item(code("stick"));
    sys.on_definition_loaded(&x).unwrap();
    assert_eq!(sys.on_definition_loaded(&plain).unwrap(), 0);
    let agent = AgentId::new("frank");

    assert_eq!(sys.active_index(&agent, &x), Some(0));
    assert_eq!(sys.active_index(&agent, &plain), None);
    assert!(sys.active_mode(&agent, &plain).is_none());
}

#[test]
fn stale_selection_after_reload_falls_back() {
    let mut sys = observing();
    let x = scythe("scythe-copper").with_mode("scythe-stamp");
    sys.on_definition_loaded(&x).unwrap();
    let agent = AgentId::new("gina");
    sys.select(&agent, &x, Some(&code("scythe-stamp"))).unwrap();

    sys.on_definition_unloaded(&x.code);
    let trimmed = scythe("scythe-copper");
    sys.on_definition_loaded(&trimmed).unwrap();
    assert_eq!(sys.resolve(&agent, &trimmed), Some(&code("scythe-trim")));
}

#[test]
fn applying_a_message_twice_is_idempotent() {
    let mut sys = authoritative();
    let agent = AgentId::new("hank");
    let msg = SyncMessage::new(TreeKey::Group, code("item-scythe"), Some(code("scythe-remove")));

    assert!(sys.apply_sync(&agent, &msg).unwrap());
    let once = sys.snapshot(&agent);
    assert!(!sys.apply_sync(&agent, &msg).unwrap());
    assert_eq!(sys.snapshot(&agent), once);
}

#[test]
fn selections_do_not_leak_between_agents() {
    let mut sys = observing();
    let x = scythe("scythe-copper");
    sys.on_definition_loaded(&x).unwrap();

    sys.select(&AgentId::new("ivy"), &x, Some(&code("scythe-remove"))).unwrap();
    assert_eq!(sys.resolve(&AgentId::new("jack"), &x), Some(&code("scythe-trim")));
    assert_eq!(sys.resolve(&AgentId::new("IVY"), &x), Some(&code("scythe-remove")));
}

#[test]
fn blocks_resolve_from_block_tree() {
    let mut sys = observing();
    let anvil = ObjectDefinition::block(code("anvil")).with_mode("scythe-stamp").with_mode("hoe-till");
    sys.on_definition_loaded(&anvil).unwrap();
    let agent = AgentId::new("kim");

    sys.select(&agent, &anvil, Some(&code("hoe-till"))).unwrap();
    assert_eq!(sys.store().get(&agent, TreeKey::Block, &anvil.code), Some(&code("hoe-till")));
    assert_eq!(sys.active_index(&agent, &anvil), Some(1));
}

#[test]
fn grouped_block_prefers_own_entry_and_group_pick_clears_it() {
    let mut sys = observing();
    let hay = ObjectDefinition::block(code("hay"))
        .with_group("item-scythe")
        .with_mode("scythe-stamp");
    sys.on_definition_loaded(&hay).unwrap();
    let agent = AgentId::new("lena");
    let group = code("item-scythe");

    sys.apply_sync(&agent, &SyncMessage::new(TreeKey::Group, group.clone(), Some(code("scythe-remove"))))
        .unwrap();
    sys.select(&agent, &hay, Some(&code("scythe-stamp"))).unwrap();
    assert_eq!(sys.store().get(&agent, TreeKey::Block, &hay.code), Some(&code("scythe-stamp")));
    assert!(sys.store().get(&agent, TreeKey::Item, &hay.code).is_none());
    assert_eq!(sys.resolve(&agent, &hay), Some(&code("scythe-stamp")));

    sys.select(&agent, &hay, Some(&code("scythe-trim"))).unwrap();
    assert_eq!(sys.resolve(&agent, &hay), Some(&code("scythe-trim")));
    assert!(sys.store().get(&agent, TreeKey::Block, &hay.code).is_none());
    assert_eq!(sys.store().get(&agent, TreeKey::Group, &group), Some(&code("scythe-trim")));
}

#[test]
fn unknown_group_fails_the_definition_load() {
    let mut sys = observing();
    let bad = ObjectDefinition::item(code("sickle")).with_group("item-sickle");
    assert!(sys.on_definition_loaded(&bad).is_err());
    assert!(sys.modes(&bad.code).is_empty());
}
