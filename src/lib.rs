//! # service-loom
//!
//! Lazy, dependency-graph-driven service composition for Rust.
//!
//! Named service definitions (an ordered dependency-name list plus a
//! provider) are resolved on demand against a per-construction context.
//! Resolution recurses depth-first through unresolved dependencies,
//! memoizes what it computes, detects cycles with a full loading chain, and
//! unifies synchronous and asynchronous values: if every argument is plain
//! the result is plain, if any argument is pending the result is a coalesced
//! shared future.
//!
//! ## Features
//!
//! - **Incremental builder**: a `with…` setter for every still-unsupplied
//!   dependency, a memoized `get…` accessor for every registered service
//! - **Shared context**: all builders of one construction chain supply into
//!   the same context; the first consumer of a transitive dependency
//!   resolves it for everyone
//! - **Cycle detection**: re-entrant resolution fails with the complete
//!   loading chain
//! - **Async coalescing**: pending dependency values join all-or-first-failure
//!   and settle every consumer from one shared future
//! - **Ad-hoc resolution**: apply an unregistered provider to the current
//!   context through the reserved `$` resolver
//!
//! ## Quick Start
//!
//! ```rust
//! use service_loom::{Args, Loom, LoomResult, ServiceEntry};
//!
//! let loom = Loom::new();
//! loom.define(vec![(
//!     "breakfast",
//!     ServiceEntry::factory(["meat", "egg", "juice"], |args: Args| -> LoomResult<String> {
//!         Ok(format!(
//!             "{} {} eggs {} juice",
//!             args.get::<String>(0)?,
//!             args.get::<String>(1)?,
//!             args.get::<String>(2)?
//!         ))
//!     }),
//! )])
//! .unwrap();
//!
//! let builder = loom
//!     .construct()
//!     .expect_builder()
//!     .with_value("meat", "bacon".to_string())
//!     .unwrap()
//!     .with_value("egg", "scrambled".to_string())
//!     .unwrap()
//!     .with_value("juice", "orange".to_string())
//!     .unwrap();
//!
//! assert_eq!(
//!     &*builder.get_as::<String>("breakfast").unwrap(),
//!     "bacon scrambled eggs orange juice"
//! );
//! ```
//!
//! ## Asynchronous values
//!
//! Providers may defer, and supplied context values may be futures. A
//! service whose arguments include a pending value resolves to a pending
//! value itself; settle it with [`ServiceValue::settle_as`].
//!
//! ```rust
//! use service_loom::{Args, Loom, LoomResult, ServiceEntry};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let loom = Loom::new();
//! loom.define(vec![(
//!     "meal",
//!     ServiceEntry::async_factory(["meat"], |args: Args| async move {
//!         Ok(format!("{} and beans", args.get::<String>(0)?))
//!     }),
//! )])
//! .unwrap();
//!
//! let builder = loom
//!     .construct()
//!     .expect_builder()
//!     .with_value("meat", "steak".to_string())
//!     .unwrap();
//!
//! let meal = builder.get("meal").unwrap().settle_as::<String>().await.unwrap();
//! assert_eq!(&*meal, "steak and beans");
//! # });
//! ```

// Module declarations
pub mod builder;
pub mod entry;
pub mod error;
pub mod naming;
pub mod value;

// Internal modules
mod registry;
mod resolver;

use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::ServiceRegistry;
use crate::resolver::Context;

// Re-export core types
pub use builder::{AdHoc, Builder, Constructed};
pub use entry::{Args, AsyncProvider, ProviderFn, ProviderOutput, ServiceEntry};
pub use error::{LoomError, LoomResult};
pub use registry::RESERVED_NAME;
pub use value::{AnyArc, LoomFuture, ServiceValue, SharedResolution};

/// Construction options, owned by one [`Loom`].
///
/// `dsl` controls what [`Loom::construct`] produces: the incremental builder
/// (default) or the bare ad-hoc resolver for single-call composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoomOptions {
    /// Expose the incremental builder from `construct`
    pub dsl: bool,
}

impl Default for LoomOptions {
    fn default() -> Self {
        Self { dsl: true }
    }
}

/// The composition root: owns the service registry and produces builders.
///
/// A `Loom` is created empty (or from an initial batch of entries), extended
/// with [`define`](Loom::define), and turned into builders with
/// [`construct`](Loom::construct). Defining more services after construction
/// is allowed; the next builder derived from any existing context sees the
/// extended dependency closure, and ad-hoc resolution sees new services
/// immediately.
pub struct Loom {
    registry: Arc<ServiceRegistry>,
    options: LoomOptions,
}

impl std::fmt::Debug for Loom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loom")
            .field("services", &self.registry.service_names())
            .field("options", &self.options)
            .finish()
    }
}

impl Loom {
    /// An empty loom with default options.
    pub fn new() -> Self {
        Self::with_options(LoomOptions::default())
    }

    /// An empty loom with explicit options.
    pub fn with_options(options: LoomOptions) -> Self {
        Self {
            registry: Arc::new(ServiceRegistry::new()),
            options,
        }
    }

    /// A loom pre-populated with one batch of entries.
    pub fn from_entries<I, S>(entries: I) -> LoomResult<Self>
    where
        I: IntoIterator<Item = (S, ServiceEntry)>,
        S: Into<String>,
    {
        let loom = Self::new();
        loom.define(entries)?;
        Ok(loom)
    }

    /// Registers a batch of service entries.
    ///
    /// Fails with [`LoomError::ReservedName`] if any entry uses `"$"` (checked
    /// across the whole batch before anything registers) and with
    /// [`LoomError::DuplicateService`] when a name is reused, including across
    /// separate `define` calls. There is no replacement.
    ///
    /// Returns `&self` for chaining.
    pub fn define<I, S>(&self, entries: I) -> LoomResult<&Self>
    where
        I: IntoIterator<Item = (S, ServiceEntry)>,
        S: Into<String>,
    {
        self.registry
            .define(entries.into_iter().map(|(name, entry)| (name.into(), entry)))?;
        Ok(self)
    }

    /// Constructs over an empty context.
    pub fn construct(&self) -> Constructed {
        self.construct_context(HashMap::new())
    }

    /// Constructs over a pre-filled context.
    ///
    /// Initial entries are not restricted to the dependency closure; any
    /// name may be supplied, including pending future values.
    pub fn construct_with<I, S>(&self, initial: I) -> Constructed
    where
        I: IntoIterator<Item = (S, ServiceValue)>,
        S: Into<String>,
    {
        self.construct_context(
            initial
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Deprecated alias for [`construct`](Loom::construct).
    #[deprecated(since = "0.2.0", note = "use `construct` instead")]
    pub fn dsl(&self) -> Constructed {
        tracing::warn!("Loom::dsl is deprecated; use Loom::construct instead");
        self.construct()
    }

    fn construct_context(&self, initial: HashMap<String, ServiceValue>) -> Constructed {
        let context = Arc::new(Context::new(initial));
        if self.options.dsl {
            Constructed::Builder(Builder::over(self.registry.clone(), context))
        } else {
            Constructed::Resolver(AdHoc::new(self.registry.clone(), context))
        }
    }
}

impl Default for Loom {
    fn default() -> Self {
        Self::new()
    }
}
