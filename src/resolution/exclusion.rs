//! Exclusion policy applied during discovery scans.

use super::descriptor::{ViewType, Visibility};

/// Pure predicate deciding which candidates a discovery scan may consider.
///
/// Skips abstract, interface, generic and compiler-generated candidates, and
/// whole libraries or namespaces known to contain no presentation types.
///
/// # Examples
///
/// ```
/// use ferrous_docs::{ExclusionPolicy, ViewType};
///
/// let policy = ExclusionPolicy::default();
/// assert!(policy.excludes_unit("tokio"));
/// assert!(!policy.excludes_unit("app"));
/// assert!(policy.excludes_view(&ViewType::new("app", "Base").as_abstract()));
/// assert!(!policy.excludes_view(&ViewType::new("app", "Home")));
/// ```
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    library_prefixes: Vec<String>,
    namespace_prefixes: Vec<String>,
    include_crate_visible: bool,
}

const DEFAULT_EXCLUDED_LIBRARIES: &[&str] = &[
    "std",
    "core",
    "alloc",
    "tokio",
    "futures",
    "serde",
    "tracing",
    "parking_lot",
    "ferrous_docs",
];

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            library_prefixes: DEFAULT_EXCLUDED_LIBRARIES.iter().map(|s| s.to_string()).collect(),
            namespace_prefixes: Vec::new(),
            include_crate_visible: false,
        }
    }
}

impl ExclusionPolicy {
    /// Policy that excludes no library or namespace, only structural kinds.
    pub fn structural_only() -> Self {
        Self {
            library_prefixes: Vec::new(),
            namespace_prefixes: Vec::new(),
            include_crate_visible: false,
        }
    }

    pub fn exclude_library(mut self, prefix: impl Into<String>) -> Self {
        self.library_prefixes.push(prefix.into());
        self
    }

    pub fn exclude_namespace(mut self, prefix: impl Into<String>) -> Self {
        self.namespace_prefixes.push(prefix.into());
        self
    }

    /// Lets crate-visible candidates through.
    pub fn include_crate_visible(mut self, include: bool) -> Self {
        self.include_crate_visible = include;
        self
    }

    /// Whether a whole unit is skipped without looking at its candidates.
    pub fn excludes_unit(&self, unit: &str) -> bool {
        self.library_prefixes
            .iter()
            .any(|prefix| matches_prefix(unit, prefix))
    }

    /// Whether a single candidate is skipped.
    pub fn excludes_view(&self, view: &ViewType) -> bool {
        if view.is_abstract()
            || view.is_interface()
            || view.generic_arity() > 0
            || view.is_compiler_generated()
            || view.is_placeholder()
        {
            return true;
        }
        if view.visibility() == Visibility::Crate && !self.include_crate_visible {
            return true;
        }
        self.namespace_prefixes
            .iter()
            .any(|prefix| matches_prefix(view.namespace(), prefix))
    }
}

/// `prefix` matches itself or any `prefix::…`/`prefix_…` path below it.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with("::") || rest.starts_with('_') || rest.starts_with('-'),
        None => false,
    }
}
