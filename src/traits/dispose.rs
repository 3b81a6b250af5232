//! Disposal traits for resource cleanup.

use crate::error::DocResult;

/// Trait for synchronous resource disposal.
///
/// Implement this trait for handles that need structured teardown (flushing,
/// closing). Register them with [`Lifetime::add_disposable`](crate::Lifetime::add_disposable)
/// to have them released in LIFO order.
///
/// # Examples
///
/// ```
/// use ferrous_docs::{Dispose, DocResult, Lifetime};
/// use std::sync::Arc;
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> DocResult<()> {
///         println!("Flushing cache: {}", self.name);
///         Ok(())
///     }
/// }
///
/// let lifetime = Lifetime::new();
/// lifetime.add_disposable(Arc::new(Cache { name: "thumbnails".to_string() })).unwrap();
/// lifetime.dispose().unwrap();
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self) -> DocResult<()>;
}

/// Trait for asynchronous resource disposal.
///
/// Implement this trait for objects that require async teardown, such as
/// content that must flush to storage before it goes away.
///
/// # Examples
///
/// ```
/// use ferrous_docs::{AsyncDispose, AsyncLifetime, DocResult};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Connection {
///     id: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for Connection {
///     async fn dispose(&self) -> DocResult<()> {
///         println!("Closing connection: {}", self.id);
///         Ok(())
///     }
/// }
///
/// # async fn example() {
/// let lifetime = AsyncLifetime::new();
/// lifetime.add_async_disposable(Arc::new(Connection { id: "conn_123".to_string() })).unwrap();
/// lifetime.dispose().await.unwrap();
/// # }
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self) -> DocResult<()>;
}
