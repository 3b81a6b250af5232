use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::traits::{AnyArc, Content};

/// Opaque document identity used for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DocumentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Everything needed to create a document.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ferrous_docs::{Content, DocumentRequest};
///
/// struct Report;
/// impl Content for Report {}
///
/// let request = DocumentRequest::new("ReportView", Arc::new(Report))
///     .with_id("report-42")
///     .with_title("Quarterly report")
///     .dispose_content_on_close(true);
/// assert_eq!(request.view_name(), "ReportView");
/// ```
pub struct DocumentRequest {
    pub(crate) view_name: String,
    pub(crate) content: Arc<dyn Content>,
    pub(crate) parent_context: Option<AnyArc>,
    pub(crate) parameter: Option<AnyArc>,
    pub(crate) title: Option<String>,
    pub(crate) id: Option<DocumentId>,
    pub(crate) dispose_content_on_close: bool,
    pub(crate) hide_instead_of_close: bool,
}

impl DocumentRequest {
    pub fn new(view_name: impl Into<String>, content: Arc<dyn Content>) -> Self {
        Self {
            view_name: view_name.into(),
            content,
            parent_context: None,
            parameter: None,
            title: None,
            id: None,
            dispose_content_on_close: false,
            hide_instead_of_close: false,
        }
    }

    pub fn with_parent_context(mut self, context: AnyArc) -> Self {
        self.parent_context = Some(context);
        self
    }

    pub fn with_parameter(mut self, parameter: AnyArc) -> Self {
        self.parameter = Some(parameter);
        self
    }

    /// Overrides the content's own title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Assigns the document id before registration.
    pub fn with_id(mut self, id: impl Into<DocumentId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn dispose_content_on_close(mut self, enabled: bool) -> Self {
        self.dispose_content_on_close = enabled;
        self
    }

    pub fn hide_instead_of_close(mut self, enabled: bool) -> Self {
        self.hide_instead_of_close = enabled;
        self
    }

    pub fn view_name(&self) -> &str {
        &self.view_name
    }
}

impl fmt::Debug for DocumentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRequest")
            .field("view_name", &self.view_name)
            .field("title", &self.title)
            .field("id", &self.id)
            .field("dispose_content_on_close", &self.dispose_content_on_close)
            .field("hide_instead_of_close", &self.hide_instead_of_close)
            .finish_non_exhaustive()
    }
}
