//! Core traits: disposal contracts and the collaborator seams.

mod content;
mod dispose;
mod host;

pub use content::{AnyArc, Content, InitGate};
pub use dispose::{AsyncDispose, Dispose};
pub use host::{ContainerHandle, HostAdapter};
