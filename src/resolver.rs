//! The lazy resolution engine.
//!
//! Resolution is depth-first and left-to-right through each definition's
//! dependency list. Dependencies resolved along the way are written into the
//! shared construction context, so the first consumer to need a transitive
//! dependency populates it for everyone else. Cycle detection rides on each
//! definition's `loading` flag; the loading chain is grown by prepending the
//! just-entered name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::try_join_all;
use futures::FutureExt;

use crate::builder::AdHoc;
use crate::entry::{Args, ProviderOutput};
use crate::error::{LoomError, LoomResult};
use crate::registry::{ServiceDefinition, ServiceRegistry, RESERVED_NAME};
use crate::value::{AnyArc, LoomFuture, ServiceValue};

/// One construction context: the mapping from dependency name to supplied or
/// resolved value.
///
/// Every builder derived from one `construct` call shares the same context
/// and mutates it in place; a key, once present, is treated as supplied and
/// never recomputed.
#[derive(Default)]
pub(crate) struct Context {
    values: Mutex<HashMap<String, ServiceValue>>,
}

impl Context {
    pub(crate) fn new(initial: HashMap<String, ServiceValue>) -> Self {
        Self {
            values: Mutex::new(initial),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<ServiceValue> {
        self.values.lock().unwrap().get(name).cloned()
    }

    pub(crate) fn insert(&self, name: String, value: ServiceValue) {
        self.values.lock().unwrap().insert(name, value);
    }

    /// All supplied keys, sorted for deterministic listings and messages.
    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Resolves one definition against a context.
///
/// `chain` is the loading chain, front = the definition being entered. The
/// caller memoizes the returned value (builder accessor cell or context
/// write-through); this function itself never caches.
pub(crate) fn resolve_service(
    registry: &Arc<ServiceRegistry>,
    context: &Arc<Context>,
    definition: &Arc<ServiceDefinition>,
    chain: Vec<String>,
) -> LoomResult<ServiceValue> {
    if definition.is_loading() {
        return Err(LoomError::Circular {
            service: definition.name().to_string(),
            chain,
        });
    }
    definition.set_loading(true);
    tracing::trace!(service = %definition.name(), chain = ?chain, "resolving");

    let args = match collect_arguments(registry, context, definition, &chain) {
        Ok(args) => args,
        Err(err) => {
            definition.set_loading(false);
            return Err(err);
        }
    };

    if args.iter().any(ServiceValue::is_pending) {
        Ok(join_deferred(definition, args))
    } else {
        definition.set_loading(false);
        let values: Vec<AnyArc> = args
            .iter()
            .map(|arg| {
                arg.try_ready()
                    .expect("non-pending argument settles synchronously")
            })
            .collect();
        let output = (definition.provider())(Args::new(values))?;
        Ok(match output {
            ProviderOutput::Ready(value) => ServiceValue::Ready(value),
            ProviderOutput::Deferred(future) => ServiceValue::Pending(future.shared()),
        })
    }
}

/// Gathers one positional value per dependency, recursing into the registry
/// for names the context does not yet hold.
fn collect_arguments(
    registry: &Arc<ServiceRegistry>,
    context: &Arc<Context>,
    definition: &Arc<ServiceDefinition>,
    chain: &[String],
) -> LoomResult<Vec<ServiceValue>> {
    let mut args = Vec::with_capacity(definition.dependencies().len());
    for dependency in definition.dependencies() {
        let unsupplied = matches!(context.get(dependency), None | Some(ServiceValue::Empty));
        if unsupplied {
            if let Some(dep_definition) = registry.get(dependency) {
                let mut dep_chain = Vec::with_capacity(chain.len() + 1);
                dep_chain.push(dependency.clone());
                dep_chain.extend(chain.iter().cloned());
                let value = resolve_service(registry, context, &dep_definition, dep_chain)?;
                context.insert(dependency.clone(), value);
            }
        }
        let arg = match context.get(dependency) {
            // The ad-hoc resolver is injectable under its reserved name; an
            // explicitly supplied context entry still takes precedence.
            Some(ServiceValue::Empty) | None if dependency == RESERVED_NAME => {
                ServiceValue::ready(AdHoc::new(registry.clone(), context.clone()))
            }
            Some(value) => value,
            None => {
                return Err(LoomError::Unresolved {
                    dependency: dependency.clone(),
                    known: context.keys(),
                    chain: chain.to_vec(),
                })
            }
        };
        args.push(arg);
    }
    Ok(args)
}

/// Builds the coalesced future for a resolution with pending arguments.
///
/// The future joins every argument (all-or-first-failure), resets the
/// loading flag before the provider runs, and flattens a deferred provider
/// result. The loading flag is also reset when the join fails, so the
/// context stays retryable.
fn join_deferred(definition: &Arc<ServiceDefinition>, args: Vec<ServiceValue>) -> ServiceValue {
    let futures: Vec<LoomFuture> = args.into_iter().map(ServiceValue::into_future).collect();
    let definition = definition.clone();
    ServiceValue::pending(async move {
        let joined = try_join_all(futures).await;
        definition.set_loading(false);
        let values = joined?;
        match (definition.provider())(Args::new(values))? {
            ProviderOutput::Ready(value) => Ok(value),
            ProviderOutput::Deferred(future) => future.await,
        }
    })
}
