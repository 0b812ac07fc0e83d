// resolver.rs — Cached resolver construction
//
// `ResolverFactory::get(kind, options)` returns a shared resolver for a
// resolve-options value, building it at most once per distinct value.
//
// Lookup tiers:
// 1. options identity (`Arc` pointer), per kind
// 2. `"{kind}|{compact JSON of options}"`
// On a miss in both, the per-kind waterfall hook may rewrite the options,
// the constructor builds the resolver, and the per-kind broadcast hook
// observes the result. The resolver is then stored in both tiers.
//
// Preconditions: none.
// Postconditions: a returned resolver is cached for the factory's lifetime.
// Failure modes: constructor returns `None` → `ResolverError::Construction`.
//                Nothing is cached on failure.
// Side effects: runs registered hook taps on construction.
//
// The factory is single-writer (`get` takes `&mut self`). Callers sharing it
// across threads put the whole factory behind one lock.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, trace};

use crate::hooks::{BroadcastHook, HookMap, WaterfallHook};

/// Well-known resolver kinds.
pub mod kinds {
    pub const NORMAL: &str = "normal";
    pub const CONTEXT: &str = "context";
    pub const LOADER: &str = "loader";
}

/// Configuration a resolver is built from. Maps are ordered so that equal
/// values always serialize to the same string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    pub extensions: Vec<String>,
    pub alias: BTreeMap<String, String>,
    pub modules: Vec<String>,
    pub main_fields: Vec<String>,
    pub condition_names: Vec<String>,
    pub prefer_relative: bool,
    pub symlinks: bool,
    /// Options this crate does not interpret, passed through to the
    /// constructor.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ResolveOptions {
    /// Compact JSON with sorted keys. Equal options give equal keys.
    pub fn cache_key(&self) -> String {
        json!({
            "extensions": self.extensions,
            "alias": self.alias,
            "modules": self.modules,
            "mainFields": self.main_fields,
            "conditionNames": self.condition_names,
            "preferRelative": self.prefer_relative,
            "symlinks": self.symlinks,
            "extra": self.extra,
        })
        .to_string()
    }
}

/// Builds a resolver from finalized options. `None` means no resolver could
/// be built.
pub trait ResolverConstructor {
    type Resolver;

    fn construct(&self, options: &ResolveOptions) -> Option<Self::Resolver>;
}

impl<R, F> ResolverConstructor for F
where
    F: Fn(&ResolveOptions) -> Option<R>,
{
    type Resolver = R;

    fn construct(&self, options: &ResolveOptions) -> Option<R> {
        self(options)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("no resolver created for `{kind}` requests")]
    Construction { kind: String },
}

/// Per-kind customization points.
pub struct ResolverHooks<R> {
    /// Rewrites options before construction.
    pub resolve_options: HookMap<WaterfallHook<ResolveOptions>>,
    /// Observes each newly built resolver with its finalized options.
    pub resolver: HookMap<BroadcastHook<R, ResolveOptions>>,
}

impl<R> Default for ResolverHooks<R> {
    fn default() -> Self {
        ResolverHooks {
            resolve_options: HookMap::default(),
            resolver: HookMap::default(),
        }
    }
}

struct IdentityEntry<R> {
    /// Keeps the options allocation (and so its address) alive while the
    /// entry exists; dead entries are pruned on insert.
    options: Weak<ResolveOptions>,
    resolver: Arc<R>,
}

pub struct ResolverFactory<C: ResolverConstructor> {
    constructor: C,
    hooks: ResolverHooks<C::Resolver>,
    by_identity: HashMap<String, HashMap<usize, IdentityEntry<C::Resolver>>>,
    by_value: HashMap<String, Arc<C::Resolver>>,
    constructed: usize,
}

impl<C: ResolverConstructor> ResolverFactory<C> {
    pub fn new(constructor: C) -> Self {
        ResolverFactory {
            constructor,
            hooks: ResolverHooks::default(),
            by_identity: HashMap::new(),
            by_value: HashMap::new(),
            constructed: 0,
        }
    }

    pub fn hooks_mut(&mut self) -> &mut ResolverHooks<C::Resolver> {
        &mut self.hooks
    }

    /// Return the resolver for `kind` and `options`, building it on a miss.
    pub fn get(
        &mut self,
        kind: &str,
        options: &Arc<ResolveOptions>,
    ) -> Result<Arc<C::Resolver>, ResolverError> {
        let addr = Arc::as_ptr(options) as usize;
        if let Some(entry) = self.by_identity.get(kind).and_then(|m| m.get(&addr)) {
            trace!(kind, "resolver cache hit (identity)");
            return Ok(Arc::clone(&entry.resolver));
        }

        let ident = format!("{}|{}", kind, options.cache_key());

        let resolver = match self.by_value.get(&ident) {
            Some(resolver) => {
                trace!(kind, "resolver cache hit (value)");
                Arc::clone(resolver)
            }
            None => {
                let resolver = self.create(kind, options)?;
                self.by_value.insert(ident, Arc::clone(&resolver));
                resolver
            }
        };

        let identities = self.by_identity.entry(kind.to_string()).or_default();
        identities.retain(|_, e| e.options.strong_count() > 0);
        identities.insert(
            addr,
            IdentityEntry {
                options: Arc::downgrade(options),
                resolver: Arc::clone(&resolver),
            },
        );
        Ok(resolver)
    }

    fn create(
        &mut self,
        kind: &str,
        options: &ResolveOptions,
    ) -> Result<Arc<C::Resolver>, ResolverError> {
        let rewrite = self.hooks.resolve_options.for_key(kind);
        let rewritten = rewrite.is_used();
        let finalized = rewrite.call(options.clone());
        let resolver =
            self.constructor
                .construct(&finalized)
                .ok_or_else(|| ResolverError::Construction {
                    kind: kind.to_string(),
                })?;
        let notify = self.hooks.resolver.for_key(kind);
        let observed = notify.is_used();
        notify.call(&resolver, &finalized);
        self.constructed += 1;
        debug!(
            kind,
            rewritten,
            observed,
            total = self.constructed,
            "constructed resolver"
        );
        Ok(Arc::new(resolver))
    }

    /// Number of resolvers built so far.
    pub fn constructed(&self) -> usize {
        self.constructed
    }

    /// Number of distinct cached resolvers.
    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }

    /// Drop every cached resolver. Hooks are kept.
    pub fn clear(&mut self) {
        self.by_identity.clear();
        self.by_value.clear();
    }
}

impl<C: ResolverConstructor> fmt::Debug for ResolverFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverFactory")
            .field("cached", &self.by_value.len())
            .field("constructed", &self.constructed)
            .field("option_hook_kinds", &self.hooks.resolve_options.key_count())
            .field("resolver_hook_kinds", &self.hooks.resolver.key_count())
            .finish()
    }
}
