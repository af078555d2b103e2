//! Service entry normalization and provider adapters.
//!
//! A [`ServiceEntry`] is the one shape the registry consumes: an ordered list
//! of dependency names plus a provider callable. The constructors here
//! normalize the accepted definition forms into that shape: constants become
//! zero-argument providers, typed closures are wrapped into type-erased ones,
//! and async factories become deferred providers. How a dependency-name list
//! was obtained (explicit list, attached metadata, tooling introspection) is
//! outside this crate; entries always carry it explicitly.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::error::{LoomError, LoomResult};
use crate::value::{downcast_arc, AnyArc, LoomFuture};

/// The outcome of one provider invocation.
pub enum ProviderOutput {
    /// A plain value, available synchronously
    Ready(AnyArc),
    /// An asynchronous value; the engine coalesces it for all consumers
    Deferred(LoomFuture),
}

/// Type-erased provider callable.
///
/// Receives one positional value per declared dependency, in declaration
/// order.
pub type ProviderFn = Arc<dyn Fn(Args) -> LoomResult<ProviderOutput> + Send + Sync>;

/// Positional argument pack handed to providers.
///
/// Arguments arrive settled and in dependency-declaration order. [`Args::get`]
/// downcasts one argument to its expected type.
///
/// # Examples
///
/// ```rust
/// use service_loom::{Args, LoomResult, ServiceEntry};
///
/// let entry = ServiceEntry::factory(["meat", "egg"], |args: Args| -> LoomResult<String> {
///     let meat = args.get::<String>(0)?;
///     let egg = args.get::<String>(1)?;
///     Ok(format!("{} {}", meat, egg))
/// });
/// assert_eq!(entry.dependencies(), ["meat", "egg"]);
/// ```
#[derive(Clone)]
pub struct Args {
    values: Vec<AnyArc>,
}

impl Args {
    pub(crate) fn new(values: Vec<AnyArc>) -> Self {
        Self { values }
    }

    /// Number of positional arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The argument at `index`, downcast to `T`.
    ///
    /// Fails with [`LoomError::TypeMismatch`] when the value is not a `T`;
    /// indexing past the declared dependency list is a provider bug and
    /// reported the same way.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> LoomResult<Arc<T>> {
        match self.values.get(index) {
            Some(value) => downcast_arc(value.clone()),
            None => Err(LoomError::TypeMismatch(std::any::type_name::<T>())),
        }
    }

    /// The argument at `index`, type-erased.
    pub fn raw(&self, index: usize) -> Option<&AnyArc> {
        self.values.get(index)
    }
}

/// Factory trait for services requiring asynchronous construction.
///
/// Closures returning futures implement this automatically; implement it by
/// hand when the factory carries state of its own.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use service_loom::{AnyArc, Args, AsyncProvider, LoomResult};
///
/// struct PoolFactory {
///     url: String,
/// }
///
/// #[async_trait]
/// impl AsyncProvider for PoolFactory {
///     async fn provide(&self, _args: Args) -> LoomResult<AnyArc> {
///         Ok(Arc::new(format!("pool@{}", self.url)))
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncProvider: Send + Sync {
    /// Creates the service value from its settled dependency arguments.
    async fn provide(&self, args: Args) -> LoomResult<AnyArc>;
}

#[async_trait]
impl<F, Fut> AsyncProvider for F
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = LoomResult<AnyArc>> + Send,
{
    async fn provide(&self, args: Args) -> LoomResult<AnyArc> {
        self(args).await
    }
}

/// A normalized service definition: ordered dependency names plus a provider.
///
/// Dependency order defines positional argument order. Entries are consumed
/// by [`Loom::define`](crate::Loom::define) and by the ad-hoc resolver.
#[derive(Clone)]
pub struct ServiceEntry {
    dependencies: Vec<String>,
    provider: ProviderFn,
}

impl ServiceEntry {
    /// A non-callable constant, normalized to a zero-dependency provider
    /// returning it.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        let value: AnyArc = Arc::new(value);
        Self {
            dependencies: Vec::new(),
            provider: Arc::new(move |_| Ok(ProviderOutput::Ready(value.clone()))),
        }
    }

    /// A zero-dependency callable.
    pub fn supplier<T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            dependencies: Vec::new(),
            provider: Arc::new(move |_| Ok(ProviderOutput::Ready(Arc::new(f())))),
        }
    }

    /// A typed synchronous factory over the named dependencies.
    pub fn factory<T, F, I, S>(dependencies: I, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Args) -> LoomResult<T> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            provider: Arc::new(move |args| {
                f(args).map(|value| ProviderOutput::Ready(Arc::new(value) as AnyArc))
            }),
        }
    }

    /// A typed asynchronous factory; its result is coalesced for every
    /// consumer.
    pub fn async_factory<T, F, Fut, I, S>(dependencies: I, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoomResult<T>> + Send + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            provider: Arc::new(move |args| {
                let fut = f(args).map(|res| res.map(|value| Arc::new(value) as AnyArc));
                Ok(ProviderOutput::Deferred(fut.boxed()))
            }),
        }
    }

    /// An [`AsyncProvider`] implementation over the named dependencies.
    pub fn from_async_provider<P, I, S>(dependencies: I, provider: P) -> Self
    where
        P: AsyncProvider + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Arc::new(provider);
        Self {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            provider: Arc::new(move |args| {
                let provider = provider.clone();
                Ok(ProviderOutput::Deferred(
                    async move { provider.provide(args).await }.boxed(),
                ))
            }),
        }
    }

    /// A raw type-erased provider. The other constructors are sugar over
    /// this.
    pub fn provider<F, I, S>(dependencies: I, f: F) -> Self
    where
        F: Fn(Args) -> LoomResult<ProviderOutput> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            provider: Arc::new(f),
        }
    }

    /// The ordered dependency names.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, ProviderFn) {
        (self.dependencies, self.provider)
    }
}
