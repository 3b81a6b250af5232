//! Host adapter seam: the presentation technology behind documents.

use std::sync::Arc;

use async_trait::async_trait;

use super::Content;
use crate::error::DocResult;
use crate::resolution::ViewType;

/// Opaque handle to a container materialized by a [`HostAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerHandle(u64);

impl ContainerHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Presentation host that materializes and manages containers.
///
/// A window system, a tab strip, or a test double. All methods are called
/// on the manager's owner thread. Containers move through
/// `create_container -> bind_content -> attach` on creation and
/// `detach -> detach_content -> destroy` on teardown.
#[async_trait]
pub trait HostAdapter: Send + Sync + 'static {
    /// Materializes a container for `view`.
    async fn create_container(&self, view: &ViewType) -> DocResult<ContainerHandle>;

    /// Binds `content` into `container`.
    async fn bind_content(&self, container: ContainerHandle, content: Arc<dyn Content>) -> DocResult<()>;

    /// Clears the content-to-container binding.
    fn detach_content(&self, container: ContainerHandle) -> DocResult<()>;

    /// Places the container into the host (tab strip, window list).
    fn attach(&self, container: ContainerHandle) -> DocResult<()>;

    /// Removes the container from the host.
    fn detach(&self, container: ContainerHandle) -> DocResult<()>;

    /// Releases the container itself.
    fn destroy(&self, container: ContainerHandle) -> DocResult<()>;

    fn set_visible(&self, _container: ContainerHandle, _visible: bool) -> DocResult<()> {
        Ok(())
    }

    /// Brings the container to the foreground.
    fn activate(&self, _container: ContainerHandle) -> DocResult<()> {
        Ok(())
    }

    fn set_title(&self, _container: ContainerHandle, _title: &str) -> DocResult<()> {
        Ok(())
    }
}
