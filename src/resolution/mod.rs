//! Layered resolution of logical view names to presentation types.
//!
//! Lookup order: manual registrations, cached short names, cached
//! fully-qualified names, cached misses, then a fresh discovery scan over the
//! injected [`CandidateSource`]. A miss is answered with a placeholder view
//! carrying a diagnostic instead of an error.

mod descriptor;
mod exclusion;

pub use descriptor::{CandidateSource, CandidateUnit, StaticCandidateSource, ViewDescriptor, ViewType, Visibility};
pub use exclusion::ExclusionPolicy;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

#[cfg(feature = "ahash")]
type Map<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
#[cfg(not(feature = "ahash"))]
type Map<K, V> = std::collections::HashMap<K, V>;

/// Where a resolved view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOrigin {
    /// Explicit manual registration
    Registered,
    /// Cached short-name match
    ShortName,
    /// Cached fully-qualified match
    FullName,
    /// Found by the discovery scan triggered by this call
    Scanned,
    /// Nothing matched; the view is the error placeholder
    Fallback,
}

/// Outcome of resolving a logical name.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub view: ViewType,
    pub origin: ResolutionOrigin,
}

impl Resolution {
    pub fn is_fallback(&self) -> bool {
        self.origin == ResolutionOrigin::Fallback
    }
}

/// Resolution cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Number of discovery scans performed
    pub scans: u64,
    /// Lookups answered by a manual registration
    pub registered_hits: u64,
    /// Lookups answered by the short, full or miss caches
    pub cache_hits: u64,
    /// Lookups that ended in a placeholder
    pub fallbacks: u64,
}

impl ResolutionStats {
    /// Share of lookups answered without scanning.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.scans + self.registered_hits + self.cache_hits;
        if total == 0 {
            0.0
        } else {
            (self.registered_hits + self.cache_hits) as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    scans: AtomicU64,
    registered_hits: AtomicU64,
    cache_hits: AtomicU64,
    fallbacks: AtomicU64,
}

/// Resolves logical view names to concrete presentation types.
///
/// Manual registrations and discovered mappings are independent invalidation
/// domains: [`clear_cache`](Self::clear_cache) drops only what scans found,
/// [`clear_registered_types`](Self::clear_registered_types) drops only manual
/// registrations. All maps tolerate concurrent readers and populators.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ferrous_docs::{
///     CandidateUnit, ResolutionOrigin, StaticCandidateSource, TypeResolutionCache, ViewType,
/// };
///
/// let source = Arc::new(StaticCandidateSource::with_units(vec![CandidateUnit::new(
///     "app",
///     vec![ViewType::new("app::views", "ReportView")],
/// )]));
/// let cache = TypeResolutionCache::new(source);
///
/// let first = cache.resolve("ReportView");
/// assert_eq!(first.origin, ResolutionOrigin::Scanned);
///
/// let again = cache.resolve("app::views::ReportView");
/// assert_eq!(again.origin, ResolutionOrigin::FullName);
///
/// let missing = cache.resolve("Foo");
/// assert!(missing.is_fallback());
/// assert!(missing.view.is_placeholder());
/// ```
pub struct TypeResolutionCache {
    source: Arc<dyn CandidateSource>,
    policy: ExclusionPolicy,
    registered: RwLock<Map<String, ViewType>>,
    short_names: RwLock<Map<String, ViewType>>,
    full_names: RwLock<Map<String, ViewType>>,
    misses: RwLock<Map<String, ViewType>>,
    unit_exclusions: RwLock<Map<String, bool>>,
    counters: Counters,
}

impl TypeResolutionCache {
    /// Creates a cache scanning `source` with the default exclusion policy.
    pub fn new(source: Arc<dyn CandidateSource>) -> Self {
        Self::with_policy(source, ExclusionPolicy::default())
    }

    pub fn with_policy(source: Arc<dyn CandidateSource>, policy: ExclusionPolicy) -> Self {
        Self {
            source,
            policy,
            registered: RwLock::new(Map::default()),
            short_names: RwLock::new(Map::default()),
            full_names: RwLock::new(Map::default()),
            misses: RwLock::new(Map::default()),
            unit_exclusions: RwLock::new(Map::default()),
            counters: Counters::default(),
        }
    }

    /// A cache with no candidates; only manual registrations resolve.
    pub fn empty() -> Self {
        Self::new(Arc::new(StaticCandidateSource::new()))
    }

    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    /// Registers an explicit mapping. Always wins over discovered mappings.
    pub fn register(&self, name: impl Into<String>, view: ViewType) {
        let name = name.into();
        tracing::debug!(name = %name, view = %view, "registered view mapping");
        self.registered.write().insert(name, view);
    }

    pub fn unregister(&self, name: &str) -> Option<ViewType> {
        self.registered.write().remove(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.read().contains_key(name)
    }

    /// Resolves `name`, scanning candidates only when no cache answers.
    pub fn resolve(&self, name: &str) -> Resolution {
        let name = name.trim();

        if let Some(view) = self.registered.read().get(name).cloned() {
            self.counters.registered_hits.fetch_add(1, Ordering::Relaxed);
            return Resolution { view, origin: ResolutionOrigin::Registered };
        }

        if let Some(resolution) = self.lookup_cached(name) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            if resolution.is_fallback() {
                self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
            }
            return resolution;
        }

        self.scan();

        if let Some(view) = self.lookup_discovered(name) {
            return Resolution { view, origin: ResolutionOrigin::Scanned };
        }

        let message = format!("No presentation type found for '{name}'");
        tracing::debug!(name = %name, "view not found, using placeholder");
        let view = self
            .misses
            .write()
            .entry(name.to_string())
            .or_insert_with(|| ViewType::placeholder(name, message))
            .clone();
        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        Resolution { view, origin: ResolutionOrigin::Fallback }
    }

    /// Resolves `name` to a real type, or `None` when only a placeholder is available.
    pub fn resolve_type(&self, name: &str) -> Option<ViewType> {
        let resolution = self.resolve(name);
        (!resolution.is_fallback()).then_some(resolution.view)
    }

    /// Drops every discovered mapping, cached miss and unit verdict.
    pub fn clear_cache(&self) {
        self.short_names.write().clear();
        self.full_names.write().clear();
        self.misses.write().clear();
        self.unit_exclusions.write().clear();
    }

    /// Drops manual registrations only.
    pub fn clear_registered_types(&self) {
        self.registered.write().clear();
    }

    pub fn stats(&self) -> ResolutionStats {
        ResolutionStats {
            scans: self.counters.scans.load(Ordering::Relaxed),
            registered_hits: self.counters.registered_hits.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            fallbacks: self.counters.fallbacks.load(Ordering::Relaxed),
        }
    }

    fn lookup_cached(&self, name: &str) -> Option<Resolution> {
        if let Some(view) = self.short_names.read().get(name).cloned() {
            return Some(Resolution { view, origin: ResolutionOrigin::ShortName });
        }
        if let Some(view) = self.full_names.read().get(name).cloned() {
            return Some(Resolution { view, origin: ResolutionOrigin::FullName });
        }
        self.misses
            .read()
            .get(name)
            .cloned()
            .map(|view| Resolution { view, origin: ResolutionOrigin::Fallback })
    }

    fn lookup_discovered(&self, name: &str) -> Option<ViewType> {
        if is_fully_qualified(name) {
            self.full_names.read().get(name).cloned()
        } else {
            self.short_names.read().get(name).cloned()
        }
    }

    /// Walks every candidate unit and populates the short and full caches.
    ///
    /// First discovered candidate wins per name, so repeated or concurrent
    /// scans converge on the same mapping.
    fn scan(&self) {
        self.counters.scans.fetch_add(1, Ordering::Relaxed);
        let mut accepted = 0usize;
        for unit in self.source.units() {
            if self.unit_excluded(&unit.name) {
                continue;
            }
            for view in unit.views {
                if self.policy.excludes_view(&view) {
                    continue;
                }
                accepted += 1;
                self.full_names
                    .write()
                    .entry(view.full_name())
                    .or_insert_with(|| view.clone());
                self.short_names
                    .write()
                    .entry(view.name().to_string())
                    .or_insert(view);
            }
        }
        tracing::debug!(accepted, "view discovery scan finished");
    }

    fn unit_excluded(&self, unit: &str) -> bool {
        if let Some(excluded) = self.unit_exclusions.read().get(unit) {
            return *excluded;
        }
        let excluded = self.policy.excludes_unit(unit);
        self.unit_exclusions.write().insert(unit.to_string(), excluded);
        excluded
    }
}

fn is_fully_qualified(name: &str) -> bool {
    name.contains("::")
}
