//! Request/notification handler traits and the filter pipeline (spec §4.9).

use std::sync::Arc;

use async_trait::async_trait;
use mcprt_protocol::ProtocolError;
use serde_json::Value;

use crate::context::RequestContext;

/// What a registered request handler returns.
pub type HandlerResult = Result<Value, ProtocolError>;

/// Handles one inbound request method.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Run the handler against the request's params and its execution context.
    async fn handle(&self, params: Option<Value>, ctx: RequestContext) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> RequestHandler for F
where
    F: Fn(Option<Value>, RequestContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, params: Option<Value>, ctx: RequestContext) -> HandlerResult {
        self(params, ctx).await
    }
}

/// Handles one inbound notification method. Errors are logged by the
/// multiplexer and never stop the read loop.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Run the handler against the notification's params.
    async fn handle(&self, params: Option<Value>) -> Result<(), ProtocolError>;
}

#[async_trait]
impl<F, Fut> NotificationHandler for F
where
    F: Fn(Option<Value>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), ProtocolError>> + Send,
{
    async fn handle(&self, params: Option<Value>) -> Result<(), ProtocolError> {
        self(params).await
    }
}

/// Wraps one request handler into another of the same shape. A filter may
/// short-circuit by returning a result without invoking `inner`, and may
/// run code before and/or after `inner` runs.
pub trait Filter: Send + Sync {
    /// Produce the wrapped handler.
    fn wrap(&self, inner: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler>;
}

/// An ordered set of filters applied around a request handler. Filters
/// compose right-to-left: the last one registered ends up outermost, so it
/// sees the request first and the response last.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; it becomes the new outermost layer.
    pub fn register(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Build the composed handler around `inner`.
    #[must_use]
    pub fn apply(&self, inner: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler> {
        let mut handler = inner;
        for filter in &self.filters {
            handler = filter.wrap(handler);
        }
        handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PeerHandle;
    use std::sync::Arc as StdArc;

    struct RecordingFilter {
        order: StdArc<std::sync::Mutex<Vec<&'static str>>>,
        name: &'static str,
    }

    impl Filter for RecordingFilter {
        fn wrap(&self, inner: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler> {
            let order = self.order.clone();
            let name = self.name;
            Arc::new(move |params: Option<Value>, ctx: RequestContext| {
                let order = order.clone();
                let inner = inner.clone();
                async move {
                    order.lock().unwrap().push(name);
                    inner.handle(params, ctx).await
                }
            })
        }
    }

    fn noop_ctx() -> RequestContext {
        RequestContext::for_test(PeerHandle::disconnected())
    }

    #[tokio::test]
    async fn filters_run_outermost_last_registered_first() {
        let order = StdArc::new(std::sync::Mutex::new(Vec::new()));
        let mut chain = FilterChain::new();
        chain.register(Arc::new(RecordingFilter { order: order.clone(), name: "a" }));
        chain.register(Arc::new(RecordingFilter { order: order.clone(), name: "b" }));

        let base: Arc<dyn RequestHandler> =
            Arc::new(|_: Option<Value>, _: RequestContext| async { Ok(Value::Null) });
        let handler = chain.apply(base);
        handler.handle(None, noop_ctx()).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn filter_can_short_circuit() {
        struct Blocking;
        impl Filter for Blocking {
            fn wrap(&self, _inner: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler> {
                Arc::new(|_: Option<Value>, _: RequestContext| async {
                    Err(ProtocolError::from_code(mcprt_protocol::ErrorCode::InvalidRequest))
                })
            }
        }

        let mut chain = FilterChain::new();
        chain.register(Arc::new(Blocking));
        let base: Arc<dyn RequestHandler> =
            Arc::new(|_: Option<Value>, _: RequestContext| async { Ok(Value::Bool(true)) });
        let handler = chain.apply(base);
        let result = handler.handle(None, noop_ctx()).await;
        assert!(result.is_err());
    }
}
