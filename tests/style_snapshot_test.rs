mod support;

use fastmount::error::IsolationError;
use fastmount::{Document, DomTree, Error, NodeId};
use futures::executor::LocalPool;
use std::rc::Rc;
use support::{clear, container, interceptor, page, RecordingSandbox};

const RULES: [&str; 3] = [
  ".sc-a{color:red}",
  ".sc-b{margin:0 auto}",
  "@media (max-width: 600px){.sc-a{display:none}}",
];

/// A CSS-in-JS style tag: appended empty, then filled through the CSSOM.
fn programmatic_style(doc: &Document, rules: &[&str]) -> NodeId {
  let style = doc.create_element("style");
  doc.head_append_child(style).expect("append style");
  let mut tree = doc.tree_mut();
  let sheet = tree.sheet_mut(style).expect("connected style has a sheet");
  for rule in rules {
    sheet.append_rule(rule).expect("insert rule");
  }
  style
}

fn live_rules(doc: &Document, style: NodeId) -> Vec<String> {
  doc
    .tree()
    .sheet(style)
    .map(|sheet| sheet.css_rules().to_vec())
    .unwrap_or_default()
}

#[test]
fn detached_style_loses_programmatic_rules() {
  let mut tree = DomTree::new();
  let head = tree.head();
  let style = tree.create_element("style");
  tree.append_child(head, style).expect("append");
  tree
    .sheet_mut(style)
    .expect("sheet")
    .append_rule(".x{color:red}")
    .expect("insert");
  tree.remove_child(head, style).expect("remove");
  tree.append_child(head, style).expect("re-append");
  assert_eq!(tree.sheet(style).map(|s| s.len()), Some(0));
}

#[test]
fn programmatic_rules_survive_deactivate_reactivate() {
  let doc = page("https://host.example/shop/");
  let pool = LocalPool::new();
  let shop = interceptor(&doc, "shop", &pool, Rc::new(RecordingSandbox::default()));
  let handle = shop.install().expect("install");

  let style = programmatic_style(&doc, &RULES);
  assert_eq!(live_rules(&doc, style), RULES);

  let reactivator = handle.deactivate().expect("deactivate");
  assert_eq!(shop.cached_rules(style).expect("cached"), RULES);
  let shop_container = container(&doc, "shop");
  clear(&doc, shop_container);
  assert!(doc.tree().sheet(style).is_none());

  reactivator.reactivate(false).expect("reactivate");
  assert_eq!(doc.tree().parent(style), Some(shop_container));
  assert_eq!(live_rules(&doc, style), RULES);
}

#[test]
fn replay_preserves_original_append_order() {
  let doc = page("https://host.example/shop/");
  let pool = LocalPool::new();
  let shop = interceptor(&doc, "shop", &pool, Rc::new(RecordingSandbox::default()));
  let handle = shop.install().expect("install");

  let first = programmatic_style(&doc, &RULES[..1]);
  let link = doc.create_element("link");
  doc.tree_mut().set_attribute(link, "rel", "stylesheet");
  doc.head_append_child(link).expect("append link");
  let plain = doc.create_element("style");
  doc.tree_mut().set_text_content(plain, ".static{color:blue}");
  doc.head_append_child(plain).expect("append plain style");
  let script = doc.create_element("script");
  doc.tree_mut().set_text_content(script, "window.ready = true");
  doc.head_append_child(script).expect("append script");

  let reactivator = handle.deactivate().expect("deactivate");
  let shop_container = container(&doc, "shop");
  clear(&doc, shop_container);
  reactivator.reactivate(true).expect("reactivate");

  assert_eq!(doc.tree().child_elements(shop_container), vec![first, link, plain]);
  assert_eq!(live_rules(&doc, first), RULES[..1]);
  assert_eq!(live_rules(&doc, plain), vec![".static{color:blue}".to_string()]);
  assert!(shop.cached_rules(plain).is_none());
}

#[test]
fn mounting_reactivation_clears_the_registry() {
  let doc = page("https://host.example/shop/");
  let pool = LocalPool::new();
  let shop = interceptor(&doc, "shop", &pool, Rc::new(RecordingSandbox::default()));

  let handle = shop.install().expect("install");
  let style = programmatic_style(&doc, &RULES);
  handle
    .deactivate()
    .expect("deactivate")
    .reactivate(false)
    .expect("remount");
  assert_eq!(shop.registry_entries(), vec![style]);

  let handle = shop.install().expect("install again");
  handle
    .deactivate()
    .expect("deactivate")
    .reactivate(true)
    .expect("final mount");
  assert!(shop.registry_entries().is_empty());

  // Cached rules belong to the element, not the registry.
  assert_eq!(shop.cached_rules(style).expect("cached"), RULES);
}

#[test]
fn rules_replay_across_repeated_cycles() {
  let doc = page("https://host.example/shop/");
  let pool = LocalPool::new();
  let shop = interceptor(&doc, "shop", &pool, Rc::new(RecordingSandbox::default()));
  let shop_container = container(&doc, "shop");

  let handle = shop.install().expect("install");
  let style = programmatic_style(&doc, &RULES[..2]);
  let mut handle = Some(handle);
  for _ in 0..3 {
    let reactivator = handle.take().expect("handle").deactivate().expect("deactivate");
    clear(&doc, shop_container);
    reactivator.reactivate(false).expect("reactivate");
    assert_eq!(live_rules(&doc, style), RULES[..2]);
    handle = Some(shop.install().expect("reinstall"));
  }

  // Fresher rules replace the previous snapshot.
  doc
    .tree_mut()
    .sheet_mut(style)
    .expect("sheet")
    .append_rule(RULES[2])
    .expect("insert");
  let reactivator = handle.take().expect("handle").deactivate().expect("deactivate");
  clear(&doc, shop_container);
  reactivator.reactivate(false).expect("reactivate");
  assert_eq!(live_rules(&doc, style), RULES);
}

#[test]
fn reactivation_without_container_is_fatal() {
  let doc = page("https://host.example/shop/");
  let pool = LocalPool::new();
  let shop = interceptor(&doc, "shop", &pool, Rc::new(RecordingSandbox::default()));
  let handle = shop.install().expect("install");
  programmatic_style(&doc, &RULES);
  let reactivator = handle.deactivate().expect("deactivate");

  let shop_container = container(&doc, "shop");
  let body = doc.body();
  doc
    .tree_mut()
    .remove_child(body, shop_container)
    .expect("host removes container");

  match reactivator.reactivate(true) {
    Err(Error::Isolation(IsolationError::ContainerNotReady { app })) => assert_eq!(app, "shop"),
    other => panic!("expected ContainerNotReady, got {other:?}"),
  }
  // A failed reactivation leaves the registry untouched.
  assert_eq!(shop.registry_entries().len(), 1);
}

#[test]
fn failed_mounting_reactivation_keeps_entries_for_retry() {
  let doc = page("https://host.example/shop/");
  let pool = LocalPool::new();
  let host = doc.create_element("div");
  let body = doc.body();
  doc.tree_mut().append_child(body, host).expect("attach host");
  let shop = interceptor(&doc, "shop", &pool, Rc::new(RecordingSandbox::default()))
    .with_container_lookup(move |_: &Document, _: &str| -> Option<NodeId> { Some(host) });
  let handle = shop.install().expect("install");
  let first = programmatic_style(&doc, &RULES[..1]);
  let second = programmatic_style(&doc, &RULES[1..]);
  let reactivator = handle.deactivate().expect("deactivate");

  doc.tree_mut().remove_child(body, host).expect("host detaches container");
  match reactivator.reactivate(true) {
    Err(Error::Isolation(IsolationError::SheetUnavailable { .. })) => {}
    other => panic!("expected SheetUnavailable, got {other:?}"),
  }
  assert_eq!(shop.registry_entries(), vec![first, second]);

  let retry = shop
    .install()
    .expect("install again")
    .deactivate()
    .expect("deactivate again");
  assert_eq!(shop.cached_rules(first).expect("cached"), RULES[..1]);
  doc.tree_mut().append_child(body, host).expect("host reattaches container");
  retry.reactivate(true).expect("retry");
  assert_eq!(live_rules(&doc, first), RULES[..1]);
  assert_eq!(live_rules(&doc, second), RULES[1..]);
  assert!(shop.registry_entries().is_empty());
}
