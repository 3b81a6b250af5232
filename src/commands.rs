//! Document commands keyed by stable identifiers.
//!
//! Hosts bind buttons and menu entries to a command id; the document decides
//! whether the command can run and executes it.

use std::fmt;

/// Operation a host can invoke on a document.
///
/// # Examples
///
/// ```
/// use ferrous_docs::DocumentCommand;
///
/// let cmd = DocumentCommand::from_id("document.close").unwrap();
/// assert_eq!(cmd, DocumentCommand::Close);
/// assert_eq!(cmd.id(), "document.close");
/// assert!(DocumentCommand::from_id("document.print").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentCommand {
    Show,
    Hide,
    /// Cooperative close, subject to the content's veto
    Close,
    /// Close that bypasses the veto
    ForceClose,
}

impl DocumentCommand {
    pub const ALL: [DocumentCommand; 4] = [
        DocumentCommand::Show,
        DocumentCommand::Hide,
        DocumentCommand::Close,
        DocumentCommand::ForceClose,
    ];

    pub fn id(self) -> &'static str {
        match self {
            DocumentCommand::Show => "document.show",
            DocumentCommand::Hide => "document.hide",
            DocumentCommand::Close => "document.close",
            DocumentCommand::ForceClose => "document.force_close",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.id() == id)
    }
}

impl fmt::Display for DocumentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
