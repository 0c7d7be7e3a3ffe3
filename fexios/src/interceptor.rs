//! Interceptors for the request pipeline.
//!
//! An interceptor is a pair of optional handlers applied at a fixed point of
//! the chain: `on_fulfilled` transforms a successful value, `on_rejected`
//! sees an error from any earlier stage and may recover it by returning a
//! normal value.
//!
//! Handlers are registered on an [`InterceptorRegistry`], one per direction.
//! The registry hands out stable [`InterceptorId`]s and never reuses them.
//!
//! # Example
//!
//! ```ignore
//! use fexios::{Client, Error, Handler, HeaderInterceptor};
//!
//! let client = Client::builder().base_url("https://api.example.com").build()?;
//!
//! // Ready-made header interceptor
//! client.interceptors().request.use_handler(HeaderInterceptor::new("x-trace", "abc"));
//!
//! // Turn 404s into an empty JSON body
//! client.interceptors().response.use_handler(
//!     Handler::new().on_rejected(|err: Error| async move {
//!         match err.into_response() {
//!             Ok(res) if res.status == 404 => Ok(res.map(|_| Body::Json(Value::Null))),
//!             Ok(res) => Err(Error::Status(Box::new(res))),
//!             Err(err) => Err(err),
//!         }
//!     }),
//! );
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::Error;
use crate::config::RequestConfig;
use crate::response::ResponseEnvelope;

/// Future returned by a handler.
pub type HandlerFuture<V> = BoxFuture<'static, Result<V, Error>>;

type FulfilledFn<V> = Arc<dyn Fn(V) -> HandlerFuture<V> + Send + Sync>;
type RejectedFn<V> = Arc<dyn Fn(Error) -> HandlerFuture<V> + Send + Sync>;

// ============================================================================
// Handler
// ============================================================================

/// A pair of optional transformation handlers for values of type `V`.
///
/// Either side may be absent. A missing `on_fulfilled` passes values through,
/// a missing `on_rejected` passes errors through.
pub struct Handler<V> {
    on_fulfilled: Option<FulfilledFn<V>>,
    on_rejected: Option<RejectedFn<V>>,
}

impl<V: Send + 'static> Handler<V> {
    /// A handler with neither side set. Legal, but a no-op.
    pub fn new() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }

    /// Set the success handler.
    pub fn on_fulfilled<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        self.on_fulfilled = Some(Arc::new(move |value: V| -> HandlerFuture<V> {
            Box::pin(f(value))
        }));
        self
    }

    /// Set the failure handler.
    ///
    /// Returning `Ok` recovers the chain: the next stage sees a normal value.
    pub fn on_rejected<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        self.on_rejected = Some(Arc::new(move |err: Error| -> HandlerFuture<V> {
            Box::pin(f(err))
        }));
        self
    }

    /// Set a synchronous success handler.
    pub fn on_fulfilled_sync<F>(self, f: F) -> Self
    where
        F: Fn(V) -> Result<V, Error> + Send + Sync + 'static,
    {
        self.on_fulfilled(move |value| futures::future::ready(f(value)))
    }

    /// Set a synchronous failure handler.
    pub fn on_rejected_sync<F>(self, f: F) -> Self
    where
        F: Fn(Error) -> Result<V, Error> + Send + Sync + 'static,
    {
        self.on_rejected(move |err| futures::future::ready(f(err)))
    }

    /// True when neither side is set.
    pub fn is_noop(&self) -> bool {
        self.on_fulfilled.is_none() && self.on_rejected.is_none()
    }

    /// Apply this stage to the outcome of the previous one.
    ///
    /// Mirrors two-argument `then`: an error raised by `on_fulfilled` is not
    /// seen by this stage's `on_rejected`, only by later stages. A panic in
    /// either handler becomes [`Error::Interceptor`].
    pub(crate) async fn apply(&self, outcome: Result<V, Error>) -> Result<V, Error> {
        let on_fulfilled = self.on_fulfilled.clone();
        let on_rejected = self.on_rejected.clone();

        let stage = async move {
            match outcome {
                Ok(value) => match on_fulfilled {
                    Some(f) => f(value).await,
                    None => Ok(value),
                },
                Err(err) => match on_rejected {
                    Some(f) => f(err).await,
                    None => Err(err),
                },
            }
        };

        AssertUnwindSafe(stage)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::interceptor(panic_message(panic.as_ref()))))
    }
}

impl<V: Send + 'static> Default for Handler<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for Handler<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", msg)
    } else {
        "handler panicked".to_string()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Stable identifier of a registered handler.
///
/// Ids are never reused, not even after [`InterceptorRegistry::clear`], so a
/// stale id can only ever refer to "nothing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(usize);

impl InterceptorId {
    /// The raw slot index.
    pub fn index(&self) -> usize {
        self.0
    }
}

struct Slots<V> {
    /// Id of `handlers[0]`. Advanced past the high-water mark by `clear`.
    base: usize,
    /// `None` marks an ejected (tombstoned) slot.
    handlers: Vec<Option<Arc<Handler<V>>>>,
}

/// Ordered, mutable collection of handlers for one direction.
///
/// Mutation takes `&self`, so a registry can be changed while requests are
/// in flight. A pipeline works on the [`Snapshot`] it took when it was built
/// and never observes later changes.
pub struct InterceptorRegistry<V> {
    slots: RwLock<Slots<V>>,
}

impl<V: Send + 'static> InterceptorRegistry<V> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Slots {
                base: 0,
                handlers: Vec::new(),
            }),
        }
    }

    /// Append a handler and return its id (the `use` operation).
    pub fn use_handler<H: Into<Handler<V>>>(&self, handler: H) -> InterceptorId {
        let mut slots = self.write();
        slots.handlers.push(Some(Arc::new(handler.into())));
        InterceptorId(slots.base + slots.handlers.len() - 1)
    }

    /// Tombstone the slot at `id`.
    ///
    /// Ejecting an unknown or already ejected id does nothing.
    pub fn eject(&self, id: InterceptorId) {
        let mut slots = self.write();
        let Some(index) = id.0.checked_sub(slots.base) else {
            return;
        };
        if let Some(slot) = slots.handlers.get_mut(index) {
            if slot.take().is_some() {
                #[cfg(feature = "tracing")]
                tracing::trace!(id = id.0, "interceptor ejected");
            }
        }
    }

    /// Tombstone every slot. New ids continue after the previous high-water mark.
    pub fn clear(&self) {
        let mut slots = self.write();
        slots.base += slots.handlers.len();
        slots.handlers.clear();
        #[cfg(feature = "tracing")]
        tracing::trace!(next_id = slots.base, "interceptors cleared");
    }

    /// The live handlers, in registration order.
    pub fn snapshot(&self) -> Snapshot<V> {
        let slots = self.read();
        Snapshot {
            handlers: slots.handlers.iter().flatten().cloned().collect(),
        }
    }

    /// Number of live handlers.
    pub fn len(&self) -> usize {
        self.read().handlers.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots<V>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots<V>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Send + 'static> Default for InterceptorRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send + 'static> std::fmt::Debug for InterceptorRegistry<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.read();
        f.debug_struct("InterceptorRegistry")
            .field("live", &slots.handlers.iter().flatten().count())
            .field("next_id", &(slots.base + slots.handlers.len()))
            .finish()
    }
}

/// Immutable, ordered copy of a registry's live handlers.
pub struct Snapshot<V> {
    handlers: Vec<Arc<Handler<V>>>,
}

impl<V: Send + 'static> Snapshot<V> {
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handler<V>> {
        self.handlers.iter().map(|handler| handler.as_ref())
    }

    /// Run every stage in order, each on the outcome of the previous one.
    pub(crate) async fn run(&self, mut outcome: Result<V, Error>) -> Result<V, Error> {
        for handler in &self.handlers {
            outcome = handler.apply(outcome).await;
        }
        outcome
    }
}

impl<V> Clone for Snapshot<V> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<V> std::fmt::Debug for Snapshot<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.iter()).finish()
    }
}

/// The request-direction and response-direction registries of one client.
#[derive(Debug, Default)]
pub struct Interceptors {
    /// Runs before dispatch, on the outgoing config.
    pub request: InterceptorRegistry<RequestConfig>,
    /// Runs after dispatch, on the envelope or on the dispatch failure.
    pub response: InterceptorRegistry<ResponseEnvelope>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Header Interceptor
// ============================================================================

/// A request interceptor that sets one header on every outgoing config.
///
/// # Example
///
/// ```ignore
/// use fexios::HeaderInterceptor;
///
/// client.interceptors().request.use_handler(HeaderInterceptor::new("x-trace", "abc"));
/// ```
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: http::HeaderName,
    value: http::HeaderValue,
}

impl HeaderInterceptor {
    /// Create a new header interceptor.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.parse().expect("invalid header name"),
            value: value.parse().expect("invalid header value"),
        }
    }

    /// Try to create a new header interceptor, returning an error if invalid.
    pub fn try_new(name: &str, value: &str) -> Result<Self, Error> {
        let (name, value) = crate::headers::parse_pair(name, value)?;
        Ok(Self { name, value })
    }

    /// Create a new header interceptor from pre-parsed values.
    pub fn from_parts(name: http::HeaderName, value: http::HeaderValue) -> Self {
        Self { name, value }
    }
}

impl From<HeaderInterceptor> for Handler<RequestConfig> {
    fn from(interceptor: HeaderInterceptor) -> Self {
        Handler::new().on_fulfilled_sync(move |mut config: RequestConfig| {
            config
                .headers
                .insert(interceptor.name.clone(), interceptor.value.clone());
            Ok(config)
        })
    }
}
