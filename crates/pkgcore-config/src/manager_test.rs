// Copyright (c) Contributors to the pkgcore project.
// SPDX-License-Identifier: BSD-3-Clause

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rstest::rstest;

use super::*;
use crate::configurable::{Configurable, Signature};
use crate::fixtures::{self, manager, source, strings, Repo};
use crate::hint::ConfigHint;
use crate::section::{DictSection, Rendered};
use crate::types::TypeTag;

fn repo_cache(instance: &Instance) -> String {
    instance
        .downcast_ref::<Repo>()
        .map(|r| r.cache.clone())
        .expect("should be a repo")
}

#[rstest]
fn test_objects_instantiates_by_typename() {
    let m = manager(vec![source(vec![
        ("r", strings(&[("class", fixtures::REPO), ("cache", "hot")])),
        ("d", strings(&[("class", fixtures::DRAWER)])),
    ])]);
    let repos = m.objects("repo");

    let first = repos.get("r").unwrap().expect("r is a repo");
    assert_eq!(repo_cache(&first), "hot");
    let second = repos.get("r").unwrap().unwrap();
    assert!(first.ptr_eq(&second));

    assert!(repos.contains("r").unwrap());
    assert!(!repos.contains("d").unwrap());
    assert!(!repos.contains("missing").unwrap());
    assert!(repos.get("d").unwrap().is_none());
    assert_eq!(repos.names(), ["r"]);
    assert_eq!(m.objects("drawer").iter().count(), 1);
}

#[rstest]
fn test_objects_names_skip_broken_sections() {
    let m = manager(vec![source(vec![
        ("broken", strings(&[("class", fixtures::REPO)])),
        ("r", strings(&[("class", fixtures::REPO), ("cache", "x")])),
    ])]);
    assert_eq!(m.objects("repo").names(), ["r"]);
}

#[rstest]
fn test_earlier_sources_win() {
    let m = manager(vec![
        source(vec![("r", strings(&[("class", fixtures::REPO), ("cache", "first")]))]),
        source(vec![("r", strings(&[("class", fixtures::REPO), ("cache", "second")]))]),
    ]);
    let instance = m.objects("repo").get("r").unwrap().unwrap();
    assert_eq!(repo_cache(&instance), "first");
    assert_eq!(m.sections(), ["r"]);
    assert_eq!(m.sources().len(), 2);
}

#[rstest]
fn test_missing_section() {
    let m = manager(vec![]);
    assert!(m.collapse_named_section_if_present("nope").unwrap().is_none());
    let err = m.collapse_named_section("nope").unwrap_err();
    assert_eq!(err.to_string(), "no section called \"nope\"");
}

#[rstest]
fn test_recursive_reference() {
    let m = manager(vec![source(vec![
        ("a", strings(&[("class", fixtures::DRAWER), ("content", "b")])),
        ("b", strings(&[("class", fixtures::DRAWER), ("content", "a")])),
    ])]);
    let err = m.collapse_named_section("a").unwrap_err();
    let expected = [
        "Collapsing section named \"a\"",
        "Failed collapsing section key \"content\"",
        "Collapsing section named \"b\"",
        "Failed collapsing section key \"content\"",
        "Reference to \"a\" is recursive",
    ]
    .join(":\n");
    assert_eq!(err.to_string(), expected);
}

#[rstest]
fn test_get_default() {
    let m = manager(vec![source(vec![
        (
            "r",
            strings(&[("class", fixtures::REPO), ("cache", "x"), ("default", "true")]),
        ),
        ("other", strings(&[("class", fixtures::REPO), ("cache", "y")])),
    ])]);
    let default = m.get_default("repo").unwrap().expect("a default repo");
    assert_eq!(repo_cache(&default), "x");
    assert!(m.get_default("drawer").unwrap().is_none());
}

#[rstest]
fn test_get_default_conflict() {
    let m = manager(vec![source(vec![
        ("thing2", strings(&[("class", fixtures::DRAWER), ("default", "yes")])),
        ("thing1", strings(&[("class", fixtures::DRAWER), ("default", "yes")])),
    ])]);
    let err = m.get_default("drawer").unwrap_err();
    assert_eq!(
        err.to_string(),
        "type drawer incorrectly has multiple default sections: \"thing1\", \"thing2\""
    );
}

#[rstest]
fn test_types_skip_inherit_only() {
    let m = manager(vec![source(vec![
        ("base", strings(&[("inherit-only", "true"), ("cache", "x")])),
        ("r", strings(&[("class", fixtures::REPO), ("inherit", "base")])),
        ("d", strings(&[("class", fixtures::DRAWER)])),
    ])]);
    let types = m.types().unwrap();
    let mut typenames: Vec<&String> = types.keys().collect();
    typenames.sort();
    assert_eq!(typenames, ["drawer", "repo"]);
    assert!(types["repo"].contains_key("r"));
    assert!(Rc::ptr_eq(&types, &m.types().unwrap()));
}

fn configsection(name: &'static str, typename: &str, source: fn() -> ConfigSource) -> Configurable {
    Configurable::new(name, Signature::new(), move |_| Ok(Some(Instance::new(source()))))
        .with_hint(ConfigHint::new().typename(typename))
}

fn spork_source() -> ConfigSource {
    source(vec![(
        "spork",
        strings(&[("class", fixtures::REPO), ("cache", "spork")]),
    )])
}

fn nested_source() -> ConfigSource {
    source(vec![("autoload-nested", strings(&[("class", "tests.sub")]))])
}

fn autoload_registry() -> crate::Registry {
    let mut registry = fixtures::registry();
    registry.register(configsection("tests.sub", CONFIGSECTION_TYPENAME, spork_source));
    registry.register(configsection("tests.nested", CONFIGSECTION_TYPENAME, nested_source));
    registry.register(configsection(
        "tests.remote",
        REMOTE_CONFIGSECTION_TYPENAME,
        nested_source,
    ));
    registry
}

#[rstest]
fn test_autoload_adds_source() {
    let m = ConfigManager::new(
        autoload_registry(),
        [source(vec![("autoload-sub", strings(&[("class", "tests.sub")]))])],
    )
    .unwrap();
    let spork = m.objects("repo").get("spork").unwrap().expect("spork");
    assert_eq!(repo_cache(&spork), "spork");
    assert_eq!(m.sources().len(), 2);
}

#[rstest]
fn test_autoload_recurses() {
    let m = ConfigManager::new(
        autoload_registry(),
        [source(vec![("autoload-top", strings(&[("class", "tests.nested")]))])],
    )
    .unwrap();
    assert!(m.objects("repo").contains("spork").unwrap());
    assert_eq!(m.sources().len(), 3);
}

#[rstest]
fn test_remote_configsection_not_scanned() {
    let m = ConfigManager::new(
        autoload_registry(),
        [source(vec![("autoload-remote", strings(&[("class", "tests.remote")]))])],
    )
    .unwrap();
    assert!(m.sections().contains(&"autoload-nested".to_string()));
    assert!(!m.sections().contains(&"spork".to_string()));
}

#[rstest]
fn test_duplicate_autoload_is_an_error() {
    let err = ConfigManager::new(
        autoload_registry(),
        [
            source(vec![("autoload-sub", strings(&[("class", "tests.sub")]))]),
            source(vec![("autoload-sub", strings(&[("class", "tests.sub")]))]),
        ],
    )
    .unwrap_err();
    assert!(err.to_string().contains("already instantiated"), "{err}");
}

#[rstest]
fn test_autoload_wrong_type_is_not_instantiated() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut registry = autoload_registry();
    registry.register(
        Configurable::new("tests.counted", Signature::new(), move |_| {
            counter.set(counter.get() + 1);
            Ok(Some(Instance::new(Repo { cache: "x".into() })))
        })
        .with_hint(ConfigHint::new().typename("repo")),
    );

    let err = ConfigManager::new(
        registry,
        [source(vec![("autoload-repo", strings(&[("class", "tests.counted")]))])],
    )
    .unwrap_err();
    assert!(
        err.to_string()
            .contains("is marked as autoload but type is repo, not configsection"),
        "{err}"
    );
    assert_eq!(calls.get(), 0);
}

#[rstest]
fn test_add_config_source_collision() {
    let m = manager(vec![source(vec![(
        "r",
        strings(&[("class", fixtures::REPO), ("cache", "x")]),
    )])]);
    m.add_config_source(source(vec![("other", strings(&[("class", fixtures::DRAWER)]))]))
        .unwrap();
    assert!(m.objects("drawer").contains("other").unwrap());

    m.collapse_named_section("r").unwrap();
    let err = m
        .add_config_source(source(vec![("r", strings(&[("class", fixtures::DRAWER)]))]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "New config is trying to modify existing section(s) \"r\" that was already instantiated."
    );
}

#[derive(Debug)]
struct Shared(Rc<RefCell<DictSection>>);

impl Section for Shared {
    fn contains(&self, key: &str) -> bool {
        self.0.borrow().contains(key)
    }

    fn keys(&self) -> Vec<String> {
        self.0.borrow().keys()
    }

    fn render_value(&self, manager: &ConfigManager, key: &str, ty: &TypeTag) -> Result<Rendered> {
        self.0.borrow().render_value(manager, key, ty)
    }
}

#[rstest]
fn test_reload_discards_caches() {
    let shared = Rc::new(RefCell::new(strings(&[
        ("class", fixtures::REPO),
        ("cache", "before"),
    ])));
    let m = manager(vec![ConfigSource::new().with("r", Shared(Rc::clone(&shared)))]);
    let before = m.objects("repo").get("r").unwrap().unwrap();
    assert_eq!(repo_cache(&before), "before");

    shared.borrow_mut().insert("cache", "after");
    let cached = m.objects("repo").get("r").unwrap().unwrap();
    assert!(cached.ptr_eq(&before));

    m.reload().unwrap();
    let after = m.objects("repo").get("r").unwrap().unwrap();
    assert_eq!(repo_cache(&after), "after");
    assert_eq!(repo_cache(&before), "before");
}

#[rstest]
fn test_reload_drops_runtime_sources() {
    let m = manager(vec![]);
    m.add_config_source(source(vec![("d", strings(&[("class", fixtures::DRAWER)]))]))
        .unwrap();
    assert_eq!(m.sections(), ["d"]);
    m.reload().unwrap();
    assert!(m.sections().is_empty());
}

#[rstest]
fn test_weak_manager_outlived() {
    let weak = manager(vec![]).downgrade();
    assert!(weak.upgrade().is_err());
}
