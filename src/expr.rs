//! Template expression parsing and evaluation
//!
//! One expression body (the text between `{{` and `}}`, or one slot string)
//! is `path | transform:arg1,arg2 | next`. Splitting is naive on `|`, `:`
//! and `,`, so those characters cannot appear inside arguments except via
//! the quoted-literal form for `:`-free text.

use serde_json::{Number, Value};

use crate::error::PropsError;
use crate::guard;
use crate::path;
use crate::registry::TransformRegistry;
use crate::resolver::PathResolver;

/// One transform invocation in an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformCall {
    pub name: String,
    /// Raw argument text, resolved against the data context at render time
    pub raw_args: Vec<String>,
}

/// Parsed expression: a path plus an ordered transform chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub path: String,
    pub calls: Vec<TransformCall>,
}

impl Expression {
    /// Parse one expression body.
    ///
    /// The body splits on `|`: the first piece is the path, the rest are
    /// transform calls. Each call splits on the first `:` into a name and a
    /// comma-separated argument list. The path and every transform name are
    /// checked against the reserved-identifier guard.
    pub fn parse(body: &str) -> Result<Self, PropsError> {
        let mut pieces = body.split('|');

        let path = pieces.next().unwrap_or("").trim();
        if path.is_empty() {
            return Err(PropsError::EmptyPath {
                expr: body.trim().to_string(),
            });
        }
        guard::ensure_safe_path(path)?;

        let mut calls = Vec::new();
        for piece in pieces {
            let piece = piece.trim();
            let (name, raw_args) = match piece.split_once(':') {
                Some((name, rest)) => {
                    let raw_args = rest
                        .split(',')
                        .map(str::trim)
                        .filter(|arg| !arg.is_empty())
                        .map(str::to_string)
                        .collect();
                    (name.trim(), raw_args)
                }
                None => (piece, Vec::new()),
            };
            guard::ensure_safe_name(name)?;
            // an empty name is not reserved; lookup routes it to the
            // default transform with a warning
            calls.push(TransformCall {
                name: name.to_string(),
                raw_args,
            });
        }

        Ok(Self {
            path: path.to_string(),
            calls,
        })
    }
}

/// Resolve one raw argument against the data context.
///
/// Order is fixed: quoted literal, number, `true`/`false`, `null` or
/// `undefined`, context lookup, and finally the raw text itself. Context
/// lookups are strict (no fallback) so an absent path degrades to a literal
/// rather than the configured fallback. Reserved segments still fail.
pub(crate) fn resolve_arg(raw: &str, data: &Value) -> Result<Value, PropsError> {
    let trimmed = raw.trim();

    if let Some(literal) = strip_quotes(trimmed) {
        return Ok(Value::String(literal.to_string()));
    }
    if let Some(number) = parse_number(trimmed) {
        return Ok(Value::Number(number));
    }
    match trimmed {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" | "undefined" => return Ok(Value::Null),
        _ => {}
    }

    guard::ensure_safe_path(trimmed)?;
    match path::parse(trimmed) {
        Ok(segments) => Ok(path::resolve(data, &segments)
            .cloned()
            .unwrap_or_else(|| Value::String(trimmed.to_string()))),
        // not a usable path ("a..b", lone whitespace), keep the text
        Err(_) => Ok(Value::String(trimmed.to_string())),
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(int) = s.parse::<i64>() {
        return Some(Number::from(int));
    }
    if let Ok(float) = s.parse::<f64>() {
        // from_f64 rejects NaN and infinities
        return Number::from_f64(float);
    }
    None
}

/// Evaluate a parsed expression against a data context.
///
/// The path resolves first (the registry's fallback applies when it misses),
/// then each transform runs in order. Each stage is awaited before the next
/// starts, so a slow transform delays everything after it.
pub(crate) async fn evaluate(
    expr: &Expression,
    data: &Value,
    resolver: &PathResolver,
    registry: &TransformRegistry,
) -> Result<Value, PropsError> {
    let mut value = resolver.get_or(data, &expr.path, registry.fallback())?;

    for call in &expr.calls {
        let mut args = Vec::with_capacity(call.raw_args.len());
        for raw in &call.raw_args {
            args.push(resolve_arg(raw, data)?);
        }
        value = registry.apply(value, &call.name, args, &expr.path).await?;
    }

    Ok(value)
}

/// Default string conversion: strings bare, everything else compact JSON
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Brace-style output conversion: a null result renders as the fallback
/// (which itself stringifies; a null fallback gives the empty string)
pub(crate) fn render_value(value: &Value, fallback: &Value) -> String {
    match value {
        Value::Null => match fallback {
            Value::Null => String::new(),
            other => stringify(other),
        },
        other => stringify(other),
    }
}
