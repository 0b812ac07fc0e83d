// Resolver cache behaviour through the public API.
//
// The factory is single-writer; these tests share it behind a Mutex the way
// a multi-threaded caller would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use bids::resolver::{kinds, ResolveOptions, ResolverError, ResolverFactory};

#[derive(Debug)]
struct Resolver {
    options: ResolveOptions,
}

fn options(extensions: &[&str]) -> ResolveOptions {
    ResolveOptions {
        extensions: extensions.iter().map(|e| e.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn equal_options_share_one_resolver_across_threads() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let factory = Arc::new(Mutex::new(ResolverFactory::new(
        move |o: &ResolveOptions| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(Resolver { options: o.clone() })
        },
    )));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let factory = Arc::clone(&factory);
            thread::spawn(move || {
                // Fresh allocation each time: only the value tier can hit.
                let opts = Arc::new(options(&[".js", ".json"]));
                factory.lock().unwrap().get(kinds::NORMAL, &opts).unwrap()
            })
        })
        .collect();
    let resolvers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    for r in &resolvers[1..] {
        assert!(Arc::ptr_eq(&resolvers[0], r));
    }
    assert_eq!(resolvers[0].options.extensions, vec![".js", ".json"]);
}

#[test]
fn extra_options_are_part_of_the_cache_key() {
    let mut factory = ResolverFactory::new(|o: &ResolveOptions| Some(Resolver { options: o.clone() }));
    let plain = Arc::new(options(&[".js"]));
    let mut with_extra = options(&[".js"]);
    with_extra
        .extra
        .insert("fullySpecified".into(), serde_json::Value::Bool(true));
    let with_extra = Arc::new(with_extra);

    let a = factory.get(kinds::NORMAL, &plain).unwrap();
    let b = factory.get(kinds::NORMAL, &with_extra).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(factory.len(), 2);
    assert_eq!(
        b.options.extra.get("fullySpecified"),
        Some(&serde_json::Value::Bool(true))
    );
}

#[test]
fn options_deserialize_from_camel_case_json() {
    let opts: ResolveOptions = serde_json::from_str(
        r#"{ "extensions": [".ts"], "mainFields": ["module", "main"], "preferRelative": true }"#,
    )
    .unwrap();
    assert_eq!(opts.main_fields, vec!["module", "main"]);
    assert!(opts.prefer_relative);
    assert!(!opts.symlinks);
}

#[test]
fn failed_construction_surfaces_kind() {
    let mut factory = ResolverFactory::new(|o: &ResolveOptions| {
        (!o.extensions.is_empty()).then(|| Resolver { options: o.clone() })
    });
    let empty = Arc::new(ResolveOptions::default());
    match factory.get(kinds::CONTEXT, &empty) {
        Err(ResolverError::Construction { kind }) => assert_eq!(kind, "context"),
        other => panic!("expected construction error, got {:?}", other.map(|_| ())),
    }
    assert!(factory.get(kinds::CONTEXT, &Arc::new(options(&[".js"]))).is_ok());
    assert_eq!(factory.constructed(), 1);
}
