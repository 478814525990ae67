//! Transform registry - named async value transforms
//!
//! Template expressions call transforms by name. The registry owns the
//! name-to-transform table, the default transform substituted for unknown
//! names, and the fallback value used when an expression path resolves to
//! nothing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::PropsError;
use crate::event::{Event, EventOp, EventSink, Module, TracingSink};
use crate::guard;

/// A named value transform, potentially asynchronous
///
/// Receives the current pipeline value plus any extra arguments from the
/// expression (`{{path | name:arg1,arg2}}` passes two arguments).
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, value: Value, args: Vec<Value>) -> anyhow::Result<Value>;
}

/// Pass-through transform; the registry's initial default
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

#[async_trait]
impl Transform for Identity {
    async fn apply(&self, value: Value, _args: Vec<Value>) -> anyhow::Result<Value> {
        Ok(value)
    }
}

type BoxedTransformFn =
    Box<dyn Fn(Value, Vec<Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Adapter turning an async closure into a [`Transform`]
pub struct FnTransform {
    f: BoxedTransformFn,
}

impl FnTransform {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            f: Box::new(move |value, args| Box::pin(f(value, args))),
        }
    }
}

#[async_trait]
impl Transform for FnTransform {
    async fn apply(&self, value: Value, args: Vec<Value>) -> anyhow::Result<Value> {
        (self.f)(value, args).await
    }
}

/// Configuration for [`TransformRegistry::configure`]
///
/// The transform table replaces the registry's table wholesale; the default
/// transform and fallback only replace the current ones when provided.
#[derive(Clone, Default)]
pub struct RegistryConfig {
    transforms: HashMap<String, Arc<dyn Transform>>,
    default_transform: Option<Arc<dyn Transform>>,
    fallback: Option<Value>,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named transform to the table
    pub fn with_transform(
        mut self,
        name: impl Into<String>,
        transform: impl Transform + 'static,
    ) -> Self {
        self.transforms.insert(name.into(), Arc::new(transform));
        self
    }

    /// Add a named transform from an async closure
    pub fn with_transform_fn<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.with_transform(name, FnTransform::new(f))
    }

    /// Transform substituted for unknown names (initially [`Identity`])
    pub fn with_default_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.default_transform = Some(Arc::new(transform));
        self
    }

    /// Fallback value for expression paths that resolve to nothing
    pub fn with_fallback(mut self, fallback: impl Into<Value>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RegistryConfig")
            .field("transforms", &names)
            .field("has_default", &self.default_transform.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}

struct RegistryInner {
    transforms: HashMap<String, Arc<dyn Transform>>,
    default_transform: Arc<dyn Transform>,
    fallback: Value,
}

/// Thread-safe transform registry
///
/// Unknown names never fail a render: lookup substitutes the default
/// transform and emits a warning event instead.
pub struct TransformRegistry {
    inner: RwLock<RegistryInner>,
    sink: Arc<dyn EventSink>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Build a registry that reports events to the given sink
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                transforms: HashMap::new(),
                default_transform: Arc::new(Identity),
                fallback: Value::String(String::new()),
            }),
            sink,
        }
    }

    /// Apply a configuration: the transform table is replaced wholesale,
    /// default transform and fallback only when the config carries them.
    ///
    /// Fails without applying anything if a transform name is reserved.
    pub fn configure(&self, config: RegistryConfig) -> Result<(), PropsError> {
        for name in config.transforms.keys() {
            guard::ensure_safe_name(name)?;
        }

        let mut inner = self.inner.write();
        inner.transforms = config.transforms;
        if let Some(default_transform) = config.default_transform {
            inner.default_transform = default_transform;
        }
        if let Some(fallback) = config.fallback {
            inner.fallback = fallback;
        }
        Ok(())
    }

    /// Register a single transform without touching the rest of the table
    pub fn register(
        &self,
        name: impl Into<String>,
        transform: impl Transform + 'static,
    ) -> Result<(), PropsError> {
        let name = name.into();
        guard::ensure_safe_name(&name)?;
        self.inner.write().transforms.insert(name, Arc::new(transform));
        Ok(())
    }

    /// Register an async closure as a transform
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, f: F) -> Result<(), PropsError>
    where
        F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(name, FnTransform::new(f))
    }

    /// Look up a transform by name; unknown names get the default transform
    /// plus a warning event
    pub fn lookup(&self, name: &str) -> Arc<dyn Transform> {
        let inner = self.inner.read();
        match inner.transforms.get(name) {
            Some(transform) => Arc::clone(transform),
            None => {
                let default = Arc::clone(&inner.default_transform);
                drop(inner);
                self.sink.emit(
                    Event::new(EventOp::Warn, Module::Template, name)
                        .with_error(format!("Unknown transform '{name}', using default")),
                );
                default
            }
        }
    }

    /// Run one named transform over a value.
    ///
    /// `path` is the expression path being rendered, carried for events and
    /// error context. Failures are logged, then propagated with the
    /// transform name attached.
    pub async fn apply(
        &self,
        value: Value,
        name: &str,
        args: Vec<Value>,
        path: &str,
    ) -> Result<Value, PropsError> {
        let transform = self.lookup(name);
        match transform.apply(value, args).await {
            Ok(result) => {
                self.sink.emit(
                    Event::new(EventOp::Transform, Module::Template, path)
                        .with_value(result.clone()),
                );
                Ok(result)
            }
            Err(source) => {
                let err = PropsError::TransformFailure {
                    name: name.to_string(),
                    path: path.to_string(),
                    source,
                };
                self.sink.emit(
                    Event::new(EventOp::Error, Module::Template, path)
                        .with_error(err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Whether a transform is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().transforms.contains_key(name)
    }

    /// Registered transform names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().transforms.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Currently configured fallback value
    pub fn fallback(&self) -> Value {
        self.inner.read().fallback.clone()
    }

    pub(crate) fn sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.sink)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.names())
            .field("fallback", &self.fallback())
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════════
// Default instance
// ════════════════════════════════════════════════════════════════════

static DEFAULT_REGISTRY: Lazy<Arc<TransformRegistry>> =
    Lazy::new(|| Arc::new(TransformRegistry::new()));

/// Shared registry used by default templates and `template::configure`
pub fn default_registry() -> Arc<TransformRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}
