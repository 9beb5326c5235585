mod support;

use support::TestStore;
use taskgraph::config::Config;

#[test]
fn load_from_store_defaults_on_invalid_config() {
    let store = TestStore::init();
    store.write_raw("config.toml", "author = 123");

    let cfg = Config::load_from_store(store.storage());
    assert_eq!(cfg.author, "human");
    assert_eq!(cfg.list.default_status, "active");
}

#[test]
fn load_from_store_defaults_on_unknown_status() {
    let store = TestStore::init();
    let content = r#"
[list]
default_status = "someday"
"#;
    store.write_raw("config.toml", content.trim());

    let cfg = Config::load_from_store(store.storage());
    assert_eq!(cfg.list.default_status, "active");
}

#[test]
fn partial_config_keeps_other_defaults() {
    let store = TestStore::init();
    let content = r#"
author = "robot"

[context]
recent_days = 14
"#;
    store.write_raw("config.toml", content.trim());

    let cfg = Config::load_from_store(store.storage());
    assert_eq!(cfg.author, "robot");
    assert_eq!(cfg.context.recent_days, 14);
    assert_eq!(cfg.context.recent_limit, 5);
    assert_eq!(cfg.serve.port, 8080);
}

#[test]
fn configured_author_is_used_for_notes() {
    let store = TestStore::init();
    store.write_raw("config.toml", "author = \"robot\"");
    store.create("noted");

    store
        .cmd()
        .args(["update", "1", "--note", "checked"])
        .assert()
        .success();
    assert_eq!(store.task(1).notes[0].author, "robot");

    store
        .cmd()
        .args(["update", "1", "--note", "again", "--author", "alice"])
        .assert()
        .success();
    assert_eq!(store.task(1).notes[1].author, "alice");
}

#[test]
fn oversized_context_window_falls_back_to_defaults() {
    let store = TestStore::init();
    store.write_raw("config.toml", "[context]\nrecent_days = 4000000000\n");

    let cfg = Config::load_from_store(store.storage());
    assert_eq!(cfg.context.recent_days, 7);

    store
        .cmd()
        .arg("context")
        .assert()
        .success()
        .stdout(predicates::str::contains("PROJECT CONTEXT"));
}
