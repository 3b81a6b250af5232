use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{DocumentManager, ManagerInner};
use crate::cancellation::CancellationToken;
use crate::document::{Document, DocumentParts, DocumentRequest};
use crate::error::{DocError, DocResult};
use crate::lifetime::AsyncLifetime;
use crate::resolution::ViewType;

impl ManagerInner {
    /// Resolved view, fallback constructor, placeholder, or failure.
    fn resolve_view(&self, name: &str) -> DocResult<ViewType> {
        let resolution = self.resolver.resolve(name);
        if !resolution.is_fallback() {
            return Ok(resolution.view);
        }
        if let Some(fallback) = &self.fallback_view {
            let view = fallback(name);
            self.observers.resolution_fallback(name, &view);
            return Ok(view);
        }
        if self.options.error_placeholder {
            self.observers.resolution_fallback(name, &resolution.view);
            return Ok(resolution.view);
        }
        let message = resolution
            .view
            .diagnostic()
            .map(str::to_string)
            .unwrap_or_else(|| format!("No presentation type found for '{name}'"));
        Err(DocError::Resolution(message))
    }
}

impl DocumentManager {
    /// Creates, registers and (by default) shows a document.
    ///
    /// The view is resolved synchronously, then the host materializes a
    /// container, the content is bound and given its context, and the
    /// content's initialization runs. Every host allocation is recorded in a
    /// pending ledger; on failure or cancellation that ledger is unwound, no
    /// document is registered, and the error is returned. Content supplied by
    /// the caller is never disposed by a failed creation.
    pub async fn create_document(&self, request: DocumentRequest, cancel: &CancellationToken) -> DocResult<Document> {
        self.verify_access()?;
        let inner = &self.inner;
        let result = self.create_registered(request, cancel).await;
        match &result {
            Ok(document) => {
                inner.counters.created.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(document = %document, "document created");
            }
            Err(error) if error.is_cancelled() => {
                inner.counters.cancelled_creations.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("document creation cancelled");
            }
            Err(error) => {
                inner.counters.failed_creations.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%error, "document creation failed");
            }
        }
        let document = result?;

        inner.observers.document_created(&document);
        if inner.options.show_on_create {
            if let Err(error) = document.show() {
                // Do not hand out a registered document the host could not show.
                if let Err(teardown) = document.close(true).await {
                    tracing::warn!(%teardown, "failed to unwind unshowable document");
                }
                return Err(error);
            }
        }
        Ok(document)
    }

    async fn create_registered(&self, request: DocumentRequest, cancel: &CancellationToken) -> DocResult<Document> {
        let inner = &self.inner;
        cancel.throw_if_cancelled()?;

        let DocumentRequest {
            view_name,
            content,
            parent_context,
            parameter,
            title,
            id,
            dispose_content_on_close,
            hide_instead_of_close,
        } = request;

        let view = inner.resolve_view(&view_name)?;
        let title = title.or_else(|| content.title());
        let serial = inner.next_serial.fetch_add(1, Ordering::Relaxed);
        let dispose_flag = Arc::new(AtomicBool::new(dispose_content_on_close));
        let armed = Arc::new(AtomicBool::new(false));
        let host = inner.host.clone();
        let pending = AsyncLifetime::new();

        let materialize = async {
            let destroy_host = host.clone();
            let container = pending
                .add_async_bracket(cancel.run(host.create_container(&view)), move |container| async move {
                    destroy_host.destroy(container)
                })
                .await?;

            if let Some(disposer) = content.clone().async_disposer() {
                let armed = armed.clone();
                let enabled = dispose_flag.clone();
                pending.add_async(move || async move {
                    if armed.load(Ordering::Acquire) && enabled.load(Ordering::Acquire) {
                        disposer.dispose().await
                    } else {
                        Ok(())
                    }
                })?;
            }

            let unbind_host = host.clone();
            pending
                .add_async_bracket(cancel.run(host.bind_content(container, content.clone())), move |()| async move {
                    unbind_host.detach_content(container)
                })
                .await?;

            if let Some(context) = parent_context {
                content.set_parent_context(context);
            }
            if let Some(parameter) = parameter {
                content.set_parameter(parameter);
            }
            cancel.run(content.initialize(cancel)).await?;

            let detach_host = host.clone();
            pending.add_bracket(|| host.attach(container), move |()| detach_host.detach(container))?;
            if let Some(title) = &title {
                host.set_title(container, title)?;
            }

            cancel.throw_if_cancelled()?;
            Ok(container)
        };

        let container = match materialize.await {
            Ok(container) => container,
            Err(error) => {
                if let Err(teardown) = pending.dispose().await {
                    inner.observers.teardown_failed(None, &teardown);
                }
                return Err(error);
            }
        };

        let document = Document::new(DocumentParts {
            serial,
            affinity: inner.dispatcher.affinity(),
            manager: Arc::downgrade(inner),
            host,
            container,
            view,
            content,
            title,
            id,
            dispose_content_on_close: dispose_flag,
            hide_instead_of_close,
        });

        let lifetime = document.entity().lifetime();
        lifetime.add_async_child(pending).await?;
        let roster = Arc::downgrade(inner);
        lifetime.add_bracket(
            || {
                inner.register(&document);
                Ok(())
            },
            move |()| {
                if let Some(manager) = roster.upgrade() {
                    manager.unregister(serial);
                }
                Ok(())
            },
        )?;
        armed.store(true, Ordering::Release);
        Ok(document)
    }
}
