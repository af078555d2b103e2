//! The incremental builder and the ad-hoc resolver.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::entry::ServiceEntry;
use crate::error::{LoomError, LoomResult};
use crate::naming;
use crate::registry::{ServiceDefinition, ServiceRegistry, RESERVED_NAME};
use crate::resolver::{resolve_service, Context};
use crate::value::ServiceValue;

/// One memoized accessor cell per registered service.
///
/// The cell fills on the first successful access; errors do not memoize, so
/// a failed resolution can be retried once its cause is supplied.
struct Accessor {
    definition: Arc<ServiceDefinition>,
    memo: OnceCell<ServiceValue>,
}

/// An incremental builder over one shared construction context.
///
/// A builder exposes a setter for every dependency name in the registry's
/// closure that the context does not yet hold, and a memoized accessor for
/// every registered service. Setters return a *new* builder over the same
/// context; the exposed method set is never mutated in place, but supplied
/// values are visible to every builder derived from the same `construct`
/// call.
///
/// # Examples
///
/// ```rust
/// use service_loom::{Args, Loom, LoomResult, ServiceEntry};
///
/// let loom = Loom::new();
/// loom.define(vec![(
///     "greeting",
///     ServiceEntry::factory(["name"], |args: Args| -> LoomResult<String> {
///         Ok(format!("hello {}", args.get::<String>(0)?))
///     }),
/// )])
/// .unwrap();
///
/// let builder = loom.construct().expect_builder();
/// assert_eq!(builder.setters(), vec!["name".to_string()]);
///
/// let builder = builder.with_value("name", "loom".to_string()).unwrap();
/// assert!(builder.setters().is_empty());
/// assert_eq!(&*builder.get_as::<String>("greeting").unwrap(), "hello loom");
/// ```
pub struct Builder {
    registry: Arc<ServiceRegistry>,
    context: Arc<Context>,
    /// Dependency closure minus supplied keys, snapshotted at construction.
    remaining: BTreeSet<String>,
    /// One accessor per registered service, in registration order.
    accessors: Vec<(String, Accessor)>,
}

impl Builder {
    /// Builds the setter/accessor surface for the current (registry,
    /// context) pair. Root and middle-of-chain builders are constructed
    /// identically.
    pub(crate) fn over(registry: Arc<ServiceRegistry>, context: Arc<Context>) -> Self {
        let supplied: HashSet<String> = context.keys().into_iter().collect();
        let remaining = registry
            .dependency_closure()
            .into_iter()
            .filter(|name| name != RESERVED_NAME && !supplied.contains(name))
            .collect();
        let accessors = registry
            .service_names()
            .into_iter()
            .filter_map(|name| {
                registry.get(&name).map(|definition| {
                    (
                        name,
                        Accessor {
                            definition,
                            memo: OnceCell::new(),
                        },
                    )
                })
            })
            .collect();
        Self {
            registry,
            context,
            remaining,
            accessors,
        }
    }

    /// The still-unsupplied dependency names, in deterministic order.
    pub fn setters(&self) -> Vec<String> {
        self.remaining.iter().cloned().collect()
    }

    /// The remaining setters rendered in `withX` form.
    pub fn setter_methods(&self) -> Vec<String> {
        self.remaining
            .iter()
            .map(|name| naming::setter_method(name))
            .collect()
    }

    /// Registered service names, in registration order.
    pub fn service_names(&self) -> Vec<String> {
        self.accessors.iter().map(|(name, _)| name.clone()).collect()
    }

    /// The accessors rendered in `getX` form.
    pub fn accessor_methods(&self) -> Vec<String> {
        self.accessors
            .iter()
            .map(|(name, _)| naming::accessor_method(name))
            .collect()
    }

    /// Supplies a value for a remaining dependency and returns the next
    /// builder.
    ///
    /// Fails with [`LoomError::UnknownSetter`] when `name` was not in this
    /// builder's remaining set. The write lands in the shared context: every
    /// builder derived from the same root observes it, and the most recent
    /// supply wins.
    pub fn with(&self, name: &str, value: ServiceValue) -> LoomResult<Builder> {
        if !self.remaining.contains(name) {
            return Err(LoomError::UnknownSetter(name.to_string()));
        }
        self.context.insert(name.to_string(), value);
        Ok(Builder::over(self.registry.clone(), self.context.clone()))
    }

    /// Supplies a plain value.
    pub fn with_value<T: Send + Sync + 'static>(&self, name: &str, value: T) -> LoomResult<Builder> {
        self.with(name, ServiceValue::ready(value))
    }

    /// Supplies a pending asynchronous value.
    pub fn with_future<T, F>(&self, name: &str, future: F) -> LoomResult<Builder>
    where
        T: Send + Sync + 'static,
        F: Future<Output = LoomResult<T>> + Send + 'static,
    {
        self.with(name, ServiceValue::pending_of(future))
    }

    /// Supplies the name without a value.
    ///
    /// The name still counts as supplied (its setter disappears from the
    /// next builder), but resolution only produces a usable argument if a
    /// registered provider overwrites it or the consuming provider tolerates
    /// the placeholder.
    pub fn with_empty(&self, name: &str) -> LoomResult<Builder> {
        self.with(name, ServiceValue::empty())
    }

    /// Resolves a registered service against the shared context.
    ///
    /// The result is memoized per builder: repeated calls return the same
    /// value (or the same coalesced pending future) without re-running the
    /// provider. Transitive dependencies land in the shared context, so they
    /// resolve at most once per construction chain no matter how many
    /// services or builders consume them.
    pub fn get(&self, name: &str) -> LoomResult<ServiceValue> {
        let accessor = self
            .accessors
            .iter()
            .find(|(accessor_name, _)| accessor_name == name)
            .map(|(_, accessor)| accessor)
            .ok_or_else(|| LoomError::UnknownService(name.to_string()))?;
        accessor
            .memo
            .get_or_try_init(|| {
                resolve_service(
                    &self.registry,
                    &self.context,
                    &accessor.definition,
                    vec![name.to_string()],
                )
            })
            .map(Clone::clone)
    }

    /// Resolves a service and downcasts its settled value.
    ///
    /// Fails with [`LoomError::NotSettled`] when the value is still pending;
    /// use [`Builder::get`] and [`ServiceValue::settle_as`] for asynchronous
    /// services.
    pub fn get_as<T: Send + Sync + 'static>(&self, name: &str) -> LoomResult<Arc<T>> {
        let value = self.get(name)?;
        if value.is_pending() {
            return Err(LoomError::NotSettled(name.to_string()));
        }
        value.downcast::<T>()
    }

    /// Resolves an unregistered entry against the current context, as the
    /// `$` operation does.
    pub fn resolve(&self, entry: ServiceEntry) -> LoomResult<ServiceValue> {
        self.ad_hoc().resolve(entry)
    }

    /// The ad-hoc resolver bound to this builder's context.
    pub fn ad_hoc(&self) -> AdHoc {
        AdHoc::new(self.registry.clone(), self.context.clone())
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("services", &self.registry.service_names())
            .field("supplied", &self.context.keys())
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// The ad-hoc (`$`) resolver: applies an unregistered entry to the current
/// context without registering or memoizing it.
///
/// Services may declare `"$"` as a dependency to receive this handle as an
/// argument, and the no-DSL construction mode returns it in place of a
/// builder.
#[derive(Clone)]
pub struct AdHoc {
    registry: Arc<ServiceRegistry>,
    context: Arc<Context>,
}

impl AdHoc {
    pub(crate) fn new(registry: Arc<ServiceRegistry>, context: Arc<Context>) -> Self {
        Self { registry, context }
    }

    /// Resolves `entry` as a throwaway anonymous definition; the loading
    /// chain starts at `"$"`.
    pub fn resolve(&self, entry: ServiceEntry) -> LoomResult<ServiceValue> {
        let definition = Arc::new(ServiceDefinition::anonymous(entry));
        resolve_service(
            &self.registry,
            &self.context,
            &definition,
            vec![RESERVED_NAME.to_string()],
        )
    }
}

/// The output of a construction call: a full builder in DSL mode, or the
/// bare ad-hoc resolver when the DSL is disabled.
pub enum Constructed {
    /// The incremental builder (default)
    Builder(Builder),
    /// The bare ad-hoc resolver (`LoomOptions { dsl: false }`)
    Resolver(AdHoc),
}

impl Constructed {
    /// The builder, panicking if construction produced the bare resolver.
    pub fn expect_builder(self) -> Builder {
        match self {
            Constructed::Builder(builder) => builder,
            Constructed::Resolver(_) => {
                panic!("construction produced the ad-hoc resolver; builder DSL is disabled")
            }
        }
    }

    /// The bare resolver, panicking if construction produced a builder.
    pub fn expect_resolver(self) -> AdHoc {
        match self {
            Constructed::Resolver(resolver) => resolver,
            Constructed::Builder(_) => {
                panic!("construction produced a builder; builder DSL is enabled")
            }
        }
    }

    pub fn as_builder(&self) -> Option<&Builder> {
        match self {
            Constructed::Builder(builder) => Some(builder),
            Constructed::Resolver(_) => None,
        }
    }

    /// Ad-hoc resolution, available in both modes.
    pub fn resolve(&self, entry: ServiceEntry) -> LoomResult<ServiceValue> {
        match self {
            Constructed::Builder(builder) => builder.resolve(entry),
            Constructed::Resolver(resolver) => resolver.resolve(entry),
        }
    }
}
