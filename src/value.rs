//! Value representation for contexts and resolution results.
//!
//! Every supplied or resolved value flows through [`ServiceValue`]: either a
//! settled type-erased value, a pending shared future, or the "supplied but
//! empty" placeholder a value-less setter writes.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::error::{LoomError, LoomResult};

/// Type-erased shared value.
///
/// All context entries and provider arguments are stored behind this alias so
/// that one context can hold services of arbitrary types.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// A boxed resolution future.
pub type LoomFuture = BoxFuture<'static, LoomResult<AnyArc>>;

/// A coalesced asynchronous value.
///
/// Cloning the shared handle is the coalescing mechanism: every service that
/// depends on a pending value awaits the same underlying future, and the
/// settled result (or failure) is handed to each of them.
pub type SharedResolution = Shared<LoomFuture>;

/// A supplied or resolved service value.
///
/// # Examples
///
/// ```rust
/// use service_loom::ServiceValue;
///
/// let ready = ServiceValue::ready("bacon".to_string());
/// assert!(ready.is_ready());
/// assert_eq!(&*ready.downcast::<String>().unwrap(), "bacon");
/// ```
#[derive(Clone)]
pub enum ServiceValue {
    /// A settled value
    Ready(AnyArc),
    /// A pending asynchronous value; settles to a value or a failure
    Pending(SharedResolution),
    /// Supplied without a value
    ///
    /// Counts as supplied for the builder's remaining-setter arithmetic, but
    /// a registered provider may still overwrite it during resolution. If
    /// nothing overwrites it, providers receive a unit placeholder.
    Empty,
}

impl ServiceValue {
    /// Wraps a plain value.
    pub fn ready<T: Send + Sync + 'static>(value: T) -> Self {
        ServiceValue::Ready(Arc::new(value))
    }

    /// Wraps an already type-erased value.
    pub fn from_arc(value: AnyArc) -> Self {
        ServiceValue::Ready(value)
    }

    /// Wraps a future of a type-erased value into a coalesced pending value.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = LoomResult<AnyArc>> + Send + 'static,
    {
        ServiceValue::Pending(future.boxed().shared())
    }

    /// Wraps a future of a typed value into a coalesced pending value.
    pub fn pending_of<T, F>(future: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Future<Output = LoomResult<T>> + Send + 'static,
    {
        Self::pending(future.map(|res| res.map(|v| Arc::new(v) as AnyArc)))
    }

    /// The supplied-without-a-value placeholder.
    pub fn empty() -> Self {
        ServiceValue::Empty
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceValue::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ServiceValue::Pending(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ServiceValue::Empty)
    }

    /// The settled value, if already available.
    ///
    /// `Empty` settles to a unit placeholder.
    pub fn try_ready(&self) -> Option<AnyArc> {
        match self {
            ServiceValue::Ready(value) => Some(value.clone()),
            ServiceValue::Empty => Some(unit_placeholder()),
            ServiceValue::Pending(_) => None,
        }
    }

    /// Downcasts a settled value to `T`.
    ///
    /// Fails with [`LoomError::NotSettled`] on a pending value and with
    /// [`LoomError::TypeMismatch`] when the settled value is not a `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> LoomResult<Arc<T>> {
        match self.try_ready() {
            Some(value) => downcast_arc(value),
            None => Err(LoomError::NotSettled(String::new())),
        }
    }

    /// Resolves to the settled value, awaiting a pending one.
    pub async fn settle(self) -> LoomResult<AnyArc> {
        match self {
            ServiceValue::Ready(value) => Ok(value),
            ServiceValue::Empty => Ok(unit_placeholder()),
            ServiceValue::Pending(shared) => shared.await,
        }
    }

    /// Resolves to the settled value downcast to `T`.
    pub async fn settle_as<T: Send + Sync + 'static>(self) -> LoomResult<Arc<T>> {
        downcast_arc(self.settle().await?)
    }

    /// A future of the settled value, regardless of variant.
    pub(crate) fn into_future(self) -> LoomFuture {
        match self {
            ServiceValue::Ready(value) => futures::future::ready(Ok(value)).boxed(),
            ServiceValue::Empty => futures::future::ready(Ok(unit_placeholder())).boxed(),
            ServiceValue::Pending(shared) => shared.boxed(),
        }
    }
}

impl std::fmt::Debug for ServiceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceValue::Ready(_) => f.write_str("ServiceValue::Ready"),
            ServiceValue::Pending(_) => f.write_str("ServiceValue::Pending"),
            ServiceValue::Empty => f.write_str("ServiceValue::Empty"),
        }
    }
}

/// Downcasts a type-erased value, reporting the expected type on failure.
pub(crate) fn downcast_arc<T: Send + Sync + 'static>(value: AnyArc) -> LoomResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| LoomError::TypeMismatch(std::any::type_name::<T>()))
}

/// The placeholder handed to providers for an empty supply.
pub(crate) fn unit_placeholder() -> AnyArc {
    Arc::new(())
}
