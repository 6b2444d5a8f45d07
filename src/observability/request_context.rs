//! Correlation context for multi-step operations.
//!
//! A consolidation or bulk run enters one context; every event emitted while
//! it is active carries the same correlation id and actor.

use std::cell::RefCell;
use std::future::Future;
use uuid::Uuid;

/// Correlation id and acting user for the operation in progress.
#[derive(Clone, Debug)]
pub struct OperationContext {
    correlation_id: String,
    actor: Option<String>,
}

impl OperationContext {
    /// Creates a context with a generated correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            actor: None,
        }
    }

    /// Creates a context with an existing correlation id.
    #[must_use]
    pub fn from_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            actor: None,
        }
    }

    /// Attaches an actor label.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Returns the correlation id.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Returns the actor label, if set.
    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

tokio::task_local! {
    static TASK_CONTEXT: OperationContext;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<OperationContext>> = const { RefCell::new(None) };
}

/// Restores the previous thread-local context on drop.
pub struct OperationContextGuard {
    previous: Option<OperationContext>,
}

impl Drop for OperationContextGuard {
    fn drop(&mut self) {
        THREAD_CONTEXT.with(|slot| {
            *slot.borrow_mut() = self.previous.take();
        });
    }
}

/// Enters an operation context for synchronous flows.
#[must_use]
pub fn enter_operation_context(context: OperationContext) -> OperationContextGuard {
    let previous = THREAD_CONTEXT.with(|slot| slot.borrow_mut().replace(context));
    OperationContextGuard { previous }
}

/// Scopes an operation context across an async future.
pub async fn scope_operation_context<F, T>(context: OperationContext, fut: F) -> T
where
    F: Future<Output = T>,
{
    TASK_CONTEXT
        .scope(context.clone(), async move {
            let _guard = enter_operation_context(context);
            fut.await
        })
        .await
}

/// Returns the active context, task-local first.
#[must_use]
pub fn current_context() -> Option<OperationContext> {
    if let Ok(ctx) = TASK_CONTEXT.try_with(Clone::clone) {
        return Some(ctx);
    }
    THREAD_CONTEXT.with(|slot| slot.borrow().clone())
}

/// Returns the active correlation id, if any.
#[must_use]
pub fn current_correlation_id() -> Option<String> {
    current_context().map(|ctx| ctx.correlation_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_previous_context() {
        let outer = enter_operation_context(OperationContext::from_id("outer"));
        {
            let _inner = enter_operation_context(OperationContext::from_id("inner").with_actor("u1"));
            let ctx = current_context();
            assert_eq!(ctx.as_ref().map(OperationContext::correlation_id), Some("inner"));
            assert_eq!(ctx.as_ref().and_then(OperationContext::actor), Some("u1"));
        }
        assert_eq!(current_correlation_id().as_deref(), Some("outer"));
        drop(outer);
        assert!(current_correlation_id().is_none());
    }

    #[tokio::test]
    async fn test_scope_propagates_across_await() {
        let observed = scope_operation_context(OperationContext::from_id("merge-1"), async {
            tokio::task::yield_now().await;
            current_correlation_id()
        })
        .await;
        assert_eq!(observed.as_deref(), Some("merge-1"));
    }
}
