// hooks.rs — Keyed callback registries
//
// Two flavors of ordered callback lists:
// - `WaterfallHook<T>` folds a value through every tap; each tap may replace it.
// - `BroadcastHook<A, B>` hands the same borrowed arguments to every tap and
//   ignores what they do with them.
// `HookMap<H>` holds one hook per key, created on first access.
//
// Taps run in ascending stage order; taps sharing a stage run in
// registration order. Taps are `Send` so a hook can move with its owner
// across threads.

use std::collections::HashMap;
use std::fmt;

struct Tap<F: ?Sized> {
    name: String,
    stage: i32,
    callback: Box<F>,
}

fn insert_by_stage<F: ?Sized>(taps: &mut Vec<Tap<F>>, tap: Tap<F>) {
    let pos = taps
        .iter()
        .position(|t| t.stage > tap.stage)
        .unwrap_or(taps.len());
    taps.insert(pos, tap);
}

// ── Waterfall ───────────────────────────────────────────────────────────────

pub struct WaterfallHook<T> {
    taps: Vec<Tap<dyn FnMut(T) -> T + Send>>,
}

impl<T> Default for WaterfallHook<T> {
    fn default() -> Self {
        WaterfallHook { taps: Vec::new() }
    }
}

impl<T> WaterfallHook<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at stage 0.
    pub fn tap(&mut self, name: impl Into<String>, callback: impl FnMut(T) -> T + Send + 'static) {
        self.tap_with_stage(name, 0, callback);
    }

    pub fn tap_with_stage(
        &mut self,
        name: impl Into<String>,
        stage: i32,
        callback: impl FnMut(T) -> T + Send + 'static,
    ) {
        let callback: Box<dyn FnMut(T) -> T + Send> = Box::new(callback);
        insert_by_stage(
            &mut self.taps,
            Tap {
                name: name.into(),
                stage,
                callback,
            },
        );
    }

    /// Run `value` through every tap and return the final value.
    pub fn call(&mut self, value: T) -> T {
        let mut value = value;
        for tap in &mut self.taps {
            tracing::trace!(tap = %tap.name, "waterfall tap");
            value = (tap.callback)(value);
        }
        value
    }

    pub fn is_used(&self) -> bool {
        !self.taps.is_empty()
    }

    pub fn tap_names(&self) -> Vec<&str> {
        self.taps.iter().map(|t| t.name.as_str()).collect()
    }
}

impl<T> fmt::Debug for WaterfallHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaterfallHook")
            .field("taps", &self.tap_names())
            .finish()
    }
}

// ── Broadcast ───────────────────────────────────────────────────────────────

pub struct BroadcastHook<A: ?Sized, B: ?Sized> {
    taps: Vec<Tap<dyn FnMut(&A, &B) + Send>>,
}

impl<A: ?Sized, B: ?Sized> Default for BroadcastHook<A, B> {
    fn default() -> Self {
        BroadcastHook { taps: Vec::new() }
    }
}

impl<A: ?Sized, B: ?Sized> BroadcastHook<A, B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at stage 0.
    pub fn tap(&mut self, name: impl Into<String>, callback: impl FnMut(&A, &B) + Send + 'static) {
        self.tap_with_stage(name, 0, callback);
    }

    pub fn tap_with_stage(
        &mut self,
        name: impl Into<String>,
        stage: i32,
        callback: impl FnMut(&A, &B) + Send + 'static,
    ) {
        let callback: Box<dyn FnMut(&A, &B) + Send> = Box::new(callback);
        insert_by_stage(
            &mut self.taps,
            Tap {
                name: name.into(),
                stage,
                callback,
            },
        );
    }

    pub fn call(&mut self, a: &A, b: &B) {
        for tap in &mut self.taps {
            tracing::trace!(tap = %tap.name, "broadcast tap");
            (tap.callback)(a, b);
        }
    }

    pub fn is_used(&self) -> bool {
        !self.taps.is_empty()
    }

    pub fn tap_names(&self) -> Vec<&str> {
        self.taps.iter().map(|t| t.name.as_str()).collect()
    }
}

impl<A: ?Sized, B: ?Sized> fmt::Debug for BroadcastHook<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHook")
            .field("taps", &self.tap_names())
            .finish()
    }
}

// ── Keyed map ───────────────────────────────────────────────────────────────

/// One hook per key, created lazily and kept for the map's lifetime.
#[derive(Debug)]
pub struct HookMap<H> {
    hooks: HashMap<String, H>,
}

impl<H> Default for HookMap<H> {
    fn default() -> Self {
        HookMap {
            hooks: HashMap::new(),
        }
    }
}

impl<H: Default> HookMap<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hook for `key`, created empty on first access.
    pub fn for_key(&mut self, key: &str) -> &mut H {
        self.hooks.entry(key.to_string()).or_default()
    }

    /// Number of keys accessed so far.
    pub fn key_count(&self) -> usize {
        self.hooks.len()
    }
}
