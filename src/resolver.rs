//! Path resolver - get/set/has/remove over nested JSON values
//!
//! Reads are total: a broken traversal resolves to the configured fallback
//! instead of an error. Writes create missing intermediates. Every operation
//! checks the reserved-segment guard and emits a structured event.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::PropsError;
use crate::event::{Event, EventOp, EventSink, Module, TracingSink};
use crate::guard;
use crate::path::{self, Segment};

/// Sync hook applied to values flowing through an operation
pub type ValueHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Clone, Copy)]
enum HookKind {
    Get,
    Set,
    Has,
    Remove,
}

/// Per-operation suffix hooks, kept in registration order
#[derive(Clone, Default)]
struct OpHooks {
    get: Vec<(String, ValueHook)>,
    set: Vec<(String, ValueHook)>,
    has: Vec<(String, ValueHook)>,
    remove: Vec<(String, ValueHook)>,
}

/// Configuration for a [`PathResolver`]
///
/// The fallback substitutes for missing reads. Hooks fire for any operation
/// whose path ends with the registered suffix: get/has hooks see the outgoing
/// result, set hooks see the incoming value before it is written, remove
/// hooks see the removed value.
#[derive(Clone)]
pub struct PropsConfig {
    fallback: Value,
    hooks: OpHooks,
}

impl Default for PropsConfig {
    fn default() -> Self {
        Self {
            fallback: Value::String(String::new()),
            hooks: OpHooks::default(),
        }
    }
}

impl PropsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value substituted when a read resolves to nothing defined
    pub fn with_fallback(mut self, fallback: impl Into<Value>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Hook applied to `get` results for paths ending with `suffix`
    pub fn with_get_hook<F>(mut self, suffix: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.hooks.get.push((suffix.into(), Arc::new(hook)));
        self
    }

    /// Hook applied to incoming `set` values for paths ending with `suffix`
    pub fn with_set_hook<F>(mut self, suffix: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.hooks.set.push((suffix.into(), Arc::new(hook)));
        self
    }

    /// Hook applied to `has` results; only a boolean return overrides
    pub fn with_has_hook<F>(mut self, suffix: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.hooks.has.push((suffix.into(), Arc::new(hook)));
        self
    }

    /// Hook applied to values removed from paths ending with `suffix`
    pub fn with_remove_hook<F>(mut self, suffix: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.hooks.remove.push((suffix.into(), Arc::new(hook)));
        self
    }
}

impl std::fmt::Debug for PropsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropsConfig")
            .field("fallback", &self.fallback)
            .field("get_hooks", &self.hooks.get.len())
            .field("set_hooks", &self.hooks.set.len())
            .field("has_hooks", &self.hooks.has.len())
            .field("remove_hooks", &self.hooks.remove.len())
            .finish()
    }
}

/// Thread-safe path resolver
///
/// Cheap to share behind an [`Arc`]; [`configure`](PathResolver::configure)
/// swaps the configuration without touching in-flight readers.
pub struct PathResolver {
    config: RwLock<PropsConfig>,
    sink: Arc<dyn EventSink>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Build a resolver that reports events to the given sink
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self {
            config: RwLock::new(PropsConfig::default()),
            sink,
        }
    }

    /// Replace the configuration wholesale (fallback and all hooks)
    pub fn configure(&self, config: PropsConfig) {
        *self.config.write() = config;
    }

    /// Currently configured fallback value
    pub fn fallback(&self) -> Value {
        self.config.read().fallback.clone()
    }

    pub(crate) fn sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.sink)
    }

    /// Read the value at `path`, substituting the configured fallback when
    /// the traversal breaks or resolves to null
    pub fn get(&self, root: &Value, path: &str) -> Result<Value, PropsError> {
        self.get_impl(root, path, None)
    }

    /// Read with a call-site fallback that overrides the configured one
    pub fn get_or(
        &self,
        root: &Value,
        path: &str,
        fallback: impl Into<Value>,
    ) -> Result<Value, PropsError> {
        self.get_impl(root, path, Some(fallback.into()))
    }

    fn get_impl(
        &self,
        root: &Value,
        path: &str,
        call_fallback: Option<Value>,
    ) -> Result<Value, PropsError> {
        let segments = self.validate(root, path, "get")?;

        let (mut value, missing) = match path::resolve(root, &segments) {
            Some(v) if !v.is_null() => (v.clone(), false),
            _ => (call_fallback.unwrap_or_else(|| self.fallback()), true),
        };

        for hook in self.hooks_for(HookKind::Get, path) {
            value = hook(value);
        }

        if missing {
            self.emit(
                Event::new(EventOp::Fallback, Module::Props, path).with_value(value.clone()),
            );
        }
        self.emit(Event::new(EventOp::Get, Module::Props, path).with_value(value.clone()));
        Ok(value)
    }

    /// Write `value` at `path`, creating missing intermediates.
    ///
    /// Numeric segments index into sequences (padding with null past the
    /// end); a string segment on a sequence replaces it with a mapping.
    /// Non-container intermediates are replaced with fresh mappings.
    pub fn set(
        &self,
        root: &mut Value,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<(), PropsError> {
        let segments = self.validate(root, path, "set")?;

        let mut value = value.into();
        for hook in self.hooks_for(HookKind::Set, path) {
            value = hook(value);
        }

        let Some((last, intermediates)) = segments.split_last() else {
            return Ok(()); // parse never yields zero segments
        };

        let mut current: &mut Value = root;
        for segment in intermediates {
            current = descend_or_create(current, segment);
        }
        write_value(current, last, value.clone());

        self.emit(Event::new(EventOp::Set, Module::Props, path).with_value(value));
        Ok(())
    }

    /// Strict existence check: present-but-null is `true`, a broken
    /// traversal is `false`. No fallback is consulted.
    pub fn has(&self, root: &Value, path: &str) -> Result<bool, PropsError> {
        let segments = self.validate(root, path, "has")?;

        let mut present = path::resolve(root, &segments).is_some();
        for hook in self.hooks_for(HookKind::Has, path) {
            // only a boolean return overrides the computed answer
            if let Value::Bool(overridden) = hook(Value::Bool(present)) {
                present = overridden;
            }
        }

        self.emit(Event::new(EventOp::Has, Module::Props, path).with_value(Value::Bool(present)));
        Ok(present)
    }

    /// Delete the value at `path`, returning it if something was removed.
    ///
    /// Sequence positions are spliced out (later elements shift down).
    /// A null root is a silent no-op, but invalid and reserved paths still
    /// fail.
    pub fn remove(&self, root: &mut Value, path: &str) -> Result<Option<Value>, PropsError> {
        let segments = self.validate_path(path)?;

        if root.is_null() {
            self.emit(Event::new(EventOp::Remove, Module::Props, path));
            return Ok(None);
        }

        let removed = match remove_at(root, &segments) {
            Some(mut value) => {
                for hook in self.hooks_for(HookKind::Remove, path) {
                    value = hook(value);
                }
                Some(value)
            }
            None => None,
        };

        let mut event = Event::new(EventOp::Remove, Module::Props, path);
        if let Some(value) = &removed {
            event = event.with_value(value.clone());
        }
        self.emit(event);
        Ok(removed)
    }

    fn validate(
        &self,
        root: &Value,
        path: &str,
        op: &'static str,
    ) -> Result<Vec<Segment>, PropsError> {
        if root.is_null() {
            return Err(self.log_err(
                path,
                PropsError::NullContainer {
                    op,
                    path: path.to_string(),
                },
            ));
        }
        self.validate_path(path)
    }

    fn validate_path(&self, path: &str) -> Result<Vec<Segment>, PropsError> {
        if path.trim().is_empty() {
            return Err(self.log_err(
                path,
                PropsError::InvalidPath {
                    path: path.to_string(),
                },
            ));
        }
        if let Err(err) = guard::ensure_safe_path(path) {
            return Err(self.log_err(path, err));
        }
        path::parse(path).map_err(|err| self.log_err(path, err))
    }

    /// Log then hand the error back for propagation
    fn log_err(&self, path: &str, err: PropsError) -> PropsError {
        self.emit(Event::new(EventOp::Error, Module::Props, path).with_error(err.to_string()));
        err
    }

    fn hooks_for(&self, kind: HookKind, path: &str) -> Vec<ValueHook> {
        let config = self.config.read();
        let hooks = match kind {
            HookKind::Get => &config.hooks.get,
            HookKind::Set => &config.hooks.set,
            HookKind::Has => &config.hooks.has,
            HookKind::Remove => &config.hooks.remove,
        };
        hooks
            .iter()
            .filter(|(suffix, _)| path.ends_with(suffix.as_str()))
            .map(|(_, hook)| Arc::clone(hook))
            .collect()
    }

    fn emit(&self, event: Event) {
        self.sink.emit(event);
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("config", &*self.config.read())
            .finish()
    }
}

/// Step one segment down, creating or normalizing the slot so the walk can
/// continue. Sequences survive only index segments; anything else at the
/// position is replaced with a mapping.
fn descend_or_create<'v>(node: &'v mut Value, segment: &Segment) -> &'v mut Value {
    // check first, bind second: the returned slot keeps `node` borrowed for 'v
    if node.is_array() && segment.index().is_some() {
        let (Value::Array(items), Some(idx)) = (node, segment.index()) else {
            unreachable!("sequence and index checked above")
        };
        if idx >= items.len() {
            items.resize(idx + 1, Value::Null);
        }
        let slot = &mut items[idx];
        if !matches!(slot, Value::Object(_) | Value::Array(_)) {
            *slot = Value::Object(Map::new());
        }
        return slot;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let map = match node {
        Value::Object(map) => map,
        _ => unreachable!("node normalized to an object above"),
    };
    let slot = map.entry(segment.key().to_string()).or_insert(Value::Null);
    if !matches!(slot, Value::Object(_) | Value::Array(_)) {
        *slot = Value::Object(Map::new());
    }
    slot
}

/// Write the final segment into its parent container
fn write_value(parent: &mut Value, segment: &Segment, value: Value) {
    if let (Value::Array(items), Some(idx)) = (&mut *parent, segment.index()) {
        if idx >= items.len() {
            items.resize(idx + 1, Value::Null);
        }
        items[idx] = value;
        return;
    }

    if !parent.is_object() {
        *parent = Value::Object(Map::new());
    }
    if let Value::Object(map) = parent {
        map.insert(segment.key().to_string(), value);
    }
}

/// Remove the final segment from its parent, if the chain reaches it
fn remove_at(root: &mut Value, segments: &[Segment]) -> Option<Value> {
    let (last, intermediates) = segments.split_last()?;

    let mut current: &mut Value = root;
    for segment in intermediates {
        current = match current {
            Value::Object(map) => map.get_mut(segment.key())?,
            Value::Array(items) => items.get_mut(segment.index()?)?,
            _ => return None,
        };
    }

    match current {
        Value::Object(map) => map.remove(last.key()),
        Value::Array(items) => {
            let idx = last.index()?;
            if idx < items.len() {
                Some(items.remove(idx))
            } else {
                None
            }
        }
        _ => None,
    }
}

// ════════════════════════════════════════════════════════════════════
// Default instance + module-level API
// ════════════════════════════════════════════════════════════════════

static DEFAULT_RESOLVER: Lazy<Arc<PathResolver>> = Lazy::new(|| Arc::new(PathResolver::new()));

/// Shared resolver behind the module-level functions and default templates
pub fn default_resolver() -> Arc<PathResolver> {
    Arc::clone(&DEFAULT_RESOLVER)
}

/// Configure the shared resolver (process-wide)
pub fn configure(config: PropsConfig) {
    DEFAULT_RESOLVER.configure(config);
}

/// Read through the shared resolver
pub fn get(root: &Value, path: &str) -> Result<Value, PropsError> {
    DEFAULT_RESOLVER.get(root, path)
}

/// Read through the shared resolver with a call-site fallback
pub fn get_or(root: &Value, path: &str, fallback: impl Into<Value>) -> Result<Value, PropsError> {
    DEFAULT_RESOLVER.get_or(root, path, fallback)
}

/// Write through the shared resolver
pub fn set(root: &mut Value, path: &str, value: impl Into<Value>) -> Result<(), PropsError> {
    DEFAULT_RESOLVER.set(root, path, value)
}

/// Existence check through the shared resolver
pub fn has(root: &Value, path: &str) -> Result<bool, PropsError> {
    DEFAULT_RESOLVER.has(root, path)
}

/// Remove through the shared resolver
pub fn remove(root: &mut Value, path: &str) -> Result<Option<Value>, PropsError> {
    DEFAULT_RESOLVER.remove(root, path)
}
