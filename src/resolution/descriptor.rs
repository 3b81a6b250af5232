//! Presentation type descriptors and candidate sources.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Visibility of a presentation type inside its library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Exported from its library
    Public,
    /// Visible only inside its own library
    Crate,
}

/// Metadata describing one concrete presentation type.
///
/// Descriptors are what a [`CandidateSource`] hands to the resolution cache
/// and what a host adapter receives when it materializes a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewDescriptor {
    name: String,
    namespace: String,
    library: String,
    visibility: Visibility,
    is_abstract: bool,
    is_interface: bool,
    generic_arity: usize,
    compiler_generated: bool,
    diagnostic: Option<String>,
}

/// Shared handle to a [`ViewDescriptor`].
///
/// Cheap to clone. Two handles compare equal when their descriptors do.
///
/// # Examples
///
/// ```
/// use ferrous_docs::ViewType;
///
/// let view = ViewType::new("app::views", "ReportView").with_library("app");
/// assert_eq!(view.name(), "ReportView");
/// assert_eq!(view.full_name(), "app::views::ReportView");
/// assert!(!view.is_placeholder());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ViewType(Arc<ViewDescriptor>);

impl ViewType {
    /// Creates a public, concrete, non-generic view descriptor.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let library = namespace.split("::").next().unwrap_or_default().to_string();
        Self(Arc::new(ViewDescriptor {
            name: name.into(),
            namespace,
            library,
            visibility: Visibility::Public,
            is_abstract: false,
            is_interface: false,
            generic_arity: 0,
            compiler_generated: false,
            diagnostic: None,
        }))
    }

    /// Synthesizes the error placeholder shown when `requested` resolves to nothing.
    pub fn placeholder(requested: &str, message: impl Into<String>) -> Self {
        let mut view = Self::new("", format!("Unresolved<{requested}>"));
        Arc::make_mut(&mut view.0).diagnostic = Some(message.into());
        view
    }

    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.0).library = library.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        Arc::make_mut(&mut self.0).visibility = visibility;
        self
    }

    pub fn with_generic_arity(mut self, arity: usize) -> Self {
        Arc::make_mut(&mut self.0).generic_arity = arity;
        self
    }

    pub fn as_abstract(mut self) -> Self {
        Arc::make_mut(&mut self.0).is_abstract = true;
        self
    }

    pub fn as_interface(mut self) -> Self {
        Arc::make_mut(&mut self.0).is_interface = true;
        self
    }

    pub fn as_compiler_generated(mut self) -> Self {
        Arc::make_mut(&mut self.0).compiler_generated = true;
        self
    }

    /// Short name, e.g. `ReportView`.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn namespace(&self) -> &str {
        &self.0.namespace
    }

    pub fn library(&self) -> &str {
        &self.0.library
    }

    /// Fully-qualified name, e.g. `app::views::ReportView`.
    pub fn full_name(&self) -> String {
        if self.0.namespace.is_empty() {
            self.0.name.clone()
        } else {
            format!("{}::{}", self.0.namespace, self.0.name)
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.0.visibility
    }

    pub fn is_abstract(&self) -> bool {
        self.0.is_abstract
    }

    pub fn is_interface(&self) -> bool {
        self.0.is_interface
    }

    pub fn generic_arity(&self) -> usize {
        self.0.generic_arity
    }

    /// True when flagged as generated, or when the name carries generated-code markers.
    pub fn is_compiler_generated(&self) -> bool {
        self.0.compiler_generated
            || self.0.name.starts_with('<')
            || self.0.name.contains("{{closure}}")
    }

    /// True for synthesized error placeholders.
    pub fn is_placeholder(&self) -> bool {
        self.0.diagnostic.is_some()
    }

    /// Diagnostic message carried by an error placeholder.
    pub fn diagnostic(&self) -> Option<&str> {
        self.0.diagnostic.as_deref()
    }

    pub fn descriptor(&self) -> &ViewDescriptor {
        &self.0
    }
}

impl fmt::Debug for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diagnostic() {
            Some(msg) => write!(f, "ViewType({} [placeholder: {}])", self.full_name(), msg),
            None => write!(f, "ViewType({})", self.full_name()),
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A scannable group of candidates, typically one library.
#[derive(Debug, Clone)]
pub struct CandidateUnit {
    pub name: String,
    pub views: Vec<ViewType>,
}

impl CandidateUnit {
    pub fn new(name: impl Into<String>, views: Vec<ViewType>) -> Self {
        Self {
            name: name.into(),
            views,
        }
    }
}

/// Supplies the currently loaded presentation candidates.
///
/// Called on every discovery scan; implementations may return a different
/// set each time.
pub trait CandidateSource: Send + Sync {
    fn units(&self) -> Vec<CandidateUnit>;
}

/// In-memory candidate source that can grow at runtime.
///
/// # Examples
///
/// ```
/// use ferrous_docs::{CandidateSource, CandidateUnit, StaticCandidateSource, ViewType};
///
/// let source = StaticCandidateSource::new();
/// source.add_unit(CandidateUnit::new("app", vec![ViewType::new("app::views", "Home")]));
/// assert_eq!(source.units().len(), 1);
/// ```
#[derive(Default)]
pub struct StaticCandidateSource {
    units: RwLock<Vec<CandidateUnit>>,
}

impl StaticCandidateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(units: Vec<CandidateUnit>) -> Self {
        Self {
            units: RwLock::new(units),
        }
    }

    pub fn add_unit(&self, unit: CandidateUnit) {
        self.units.write().push(unit);
    }
}

impl CandidateSource for StaticCandidateSource {
    fn units(&self) -> Vec<CandidateUnit> {
        self.units.read().clone()
    }
}
