//! Template rendering with cached scanning
//!
//! Two front-ends share the expression evaluator:
//! - Brace style: `"Hello {{user.name | uppercase}}"`, scanned once into
//!   literal/expression chunks and cached process-wide
//! - Parts style: static fragments interleaved with dynamic slots, for
//!   callers assembling templates programmatically
//!
//! Rendering is strictly sequential: each expression's full transform chain
//! completes before the next expression starts.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::PropsError;
use crate::event::{Event, EventOp, Module};
use crate::expr::{self, Expression};
use crate::path;
use crate::registry::{default_registry, RegistryConfig, TransformRegistry};
use crate::resolver::{default_resolver, PathResolver};

/// Shortest-match `{{...}}` scanner; bodies may span lines, braces don't nest
static BRACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap());

/// Process-wide scan cache (template source → chunks)
static SCAN_CACHE: Lazy<DashMap<String, Arc<Vec<Chunk>>>> = Lazy::new(DashMap::new);

/// One scanned piece of a brace template (byte ranges into the source)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Literal text copied through verbatim
    Literal(Range<usize>),
    /// One expression body, delimiters excluded
    Expr(Range<usize>),
}

/// Scan a template into chunks, reusing the cache
pub(crate) fn scan(source: &str) -> Arc<Vec<Chunk>> {
    if let Some(cached) = SCAN_CACHE.get(source) {
        return Arc::clone(&cached);
    }

    let mut chunks = Vec::new();
    let mut last_end = 0;
    for caps in BRACE_RE.captures_iter(source) {
        let full = caps.get(0).unwrap();
        let body = caps.get(1).unwrap();
        if full.start() > last_end {
            chunks.push(Chunk::Literal(last_end..full.start()));
        }
        chunks.push(Chunk::Expr(body.range()));
        last_end = full.end();
    }
    if last_end < source.len() {
        chunks.push(Chunk::Literal(last_end..source.len()));
    }

    let chunks = Arc::new(chunks);
    SCAN_CACHE.insert(source.to_string(), Arc::clone(&chunks));
    chunks
}

/// Async function slot: called with the data context, result used directly
pub type SlotFn =
    Arc<dyn for<'a> Fn(&'a Value) -> BoxFuture<'a, anyhow::Result<Value>> + Send + Sync>;

/// One dynamic position in a parts-style template
#[derive(Clone)]
pub enum Slot {
    /// Expression body evaluated like a brace-template expression
    Expr(String),
    /// Function invoked with the data context, bypassing path resolution
    /// and the transform pipeline
    Func(SlotFn),
}

impl Slot {
    pub fn expr(body: impl Into<String>) -> Self {
        Slot::Expr(body.into())
    }

    pub fn func<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a Value) -> BoxFuture<'a, anyhow::Result<Value>> + Send + Sync + 'static,
    {
        Slot::Func(Arc::new(f))
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Expr(body) => f.debug_tuple("Expr").field(body).finish(),
            Slot::Func(_) => f.write_str("Func(..)"),
        }
    }
}

enum Source {
    Braces {
        source: String,
        chunks: Arc<Vec<Chunk>>,
    },
    Parts {
        fragments: Vec<String>,
        slots: Vec<Slot>,
    },
}

/// A render-ready template bound to a resolver and transform registry
///
/// `Template::new` binds the shared default instances; `with_resolver` and
/// `with_registry` swap in isolated ones (useful in tests, or to scope
/// transforms to one subsystem).
pub struct Template {
    source: Source,
    resolver: Arc<PathResolver>,
    registry: Arc<TransformRegistry>,
}

impl Template {
    /// Compile a brace-style template; the scan is cached process-wide
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let chunks = scan(&source);
        Self {
            source: Source::Braces { source, chunks },
            resolver: default_resolver(),
            registry: default_registry(),
        }
    }

    /// Build a parts-style template from static fragments and dynamic slots.
    ///
    /// Output interleaves them: fragment, slot, fragment, slot... Extra
    /// fragments beyond the slots are appended at the end.
    pub fn from_parts(fragments: Vec<String>, slots: Vec<Slot>) -> Self {
        Self {
            source: Source::Parts { fragments, slots },
            resolver: default_resolver(),
            registry: default_registry(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TransformRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Paths referenced by this template's expressions, in source order,
    /// deduplicated. Function slots contribute nothing.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        let mut push = |path: String| {
            if !paths.contains(&path) {
                paths.push(path);
            }
        };
        match &self.source {
            Source::Braces { source, chunks } => {
                for chunk in chunks.iter() {
                    if let Chunk::Expr(range) = chunk {
                        if let Ok(expr) = Expression::parse(&source[range.clone()]) {
                            push(expr.path);
                        }
                    }
                }
            }
            Source::Parts { slots, .. } => {
                for slot in slots {
                    if let Slot::Expr(body) = slot {
                        if let Ok(expr) = Expression::parse(body) {
                            push(expr.path);
                        }
                    }
                }
            }
        }
        paths
    }

    /// Render against a data context (must be an object or array).
    ///
    /// Any failure aborts the whole render; partial output is discarded.
    pub async fn render(&self, data: &Value) -> Result<String, PropsError> {
        if !matches!(data, Value::Object(_) | Value::Array(_)) {
            return Err(self.log_render_err(
                "",
                PropsError::InvalidTemplateData {
                    kind: path::value_kind(data),
                },
            ));
        }

        match &self.source {
            Source::Braces { source, chunks } => self.render_braces(source, chunks, data).await,
            Source::Parts { fragments, slots } => self.render_parts(fragments, slots, data).await,
        }
    }

    async fn render_braces(
        &self,
        source: &str,
        chunks: &[Chunk],
        data: &Value,
    ) -> Result<String, PropsError> {
        let mut out = String::with_capacity(source.len() + 16);
        // identical expression text renders identically within one pass
        let mut memo: HashMap<&str, String> = HashMap::new();

        for chunk in chunks.iter() {
            match chunk {
                Chunk::Literal(range) => out.push_str(&source[range.clone()]),
                Chunk::Expr(range) => {
                    let body = &source[range.clone()];
                    if let Some(cached) = memo.get(body) {
                        out.push_str(cached);
                        continue;
                    }
                    let rendered = self.eval_body(body, data).await?;
                    out.push_str(&rendered);
                    memo.insert(body, rendered);
                }
            }
        }

        self.log_render(source, &out);
        Ok(out)
    }

    async fn render_parts(
        &self,
        fragments: &[String],
        slots: &[Slot],
        data: &Value,
    ) -> Result<String, PropsError> {
        let mut out = String::new();
        let mut frags = fragments.iter();
        if let Some(first) = frags.next() {
            out.push_str(first);
        }

        for slot in slots {
            match slot {
                Slot::Expr(body) => {
                    let expr = match Expression::parse(body) {
                        Ok(expr) => expr,
                        Err(err) => return Err(self.log_render_err(body, err)),
                    };
                    let value =
                        match expr::evaluate(&expr, data, &self.resolver, &self.registry).await {
                            Ok(value) => value,
                            Err(err) => return Err(self.log_render_err(body, err)),
                        };
                    // expression slots render null as empty
                    out.push_str(&expr::render_value(&value, &Value::Null));
                }
                Slot::Func(f) => {
                    let value = match f(data).await {
                        Ok(value) => value,
                        Err(source) => {
                            let err = PropsError::TransformFailure {
                                name: "slot".to_string(),
                                path: String::new(),
                                source,
                            };
                            return Err(self.log_render_err("<slot>", err));
                        }
                    };
                    // function results use the default conversion
                    out.push_str(&expr::stringify(&value));
                }
            }
            if let Some(fragment) = frags.next() {
                out.push_str(fragment);
            }
        }
        for fragment in frags {
            out.push_str(fragment);
        }

        self.log_render("<parts>", &out);
        Ok(out)
    }

    async fn eval_body(&self, body: &str, data: &Value) -> Result<String, PropsError> {
        let expr = match Expression::parse(body) {
            Ok(expr) => expr,
            Err(err) => return Err(self.log_render_err(body, err)),
        };
        let value = match expr::evaluate(&expr, data, &self.resolver, &self.registry).await {
            Ok(value) => value,
            Err(err) => return Err(self.log_render_err(body, err)),
        };
        Ok(expr::render_value(&value, &self.registry.fallback()))
    }

    fn log_render(&self, source: &str, out: &str) {
        self.registry.sink().emit(
            Event::new(EventOp::Render, Module::Template, source)
                .with_value(Value::String(out.to_string())),
        );
    }

    /// Log then hand the error back for propagation
    fn log_render_err(&self, context: &str, err: PropsError) -> PropsError {
        self.registry.sink().emit(
            Event::new(EventOp::Error, Module::Template, context).with_error(err.to_string()),
        );
        err
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Source::Braces { source, .. } => {
                f.debug_struct("Template").field("source", source).finish()
            }
            Source::Parts { fragments, slots } => f
                .debug_struct("Template")
                .field("fragments", &fragments.len())
                .field("slots", &slots.len())
                .finish(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════
// Module-level API
// ════════════════════════════════════════════════════════════════════

/// Build a brace-style template bound to the shared registry and resolver
pub fn template(source: impl Into<String>) -> Template {
    Template::new(source)
}

/// Configure the shared transform registry (process-wide; takes effect for
/// any lookup that has not happened yet, including renders in flight)
pub fn configure(config: RegistryConfig) -> Result<(), PropsError> {
    default_registry().configure(config)
}
