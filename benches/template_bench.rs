//! Quick benchmark to verify render and path-access performance

use dotprops::{PathResolver, Template, TransformRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

fn main() {
    // RUST_LOG=dotprops=debug surfaces the per-operation events
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    // Setup a registry with the transforms the templates call
    let registry = Arc::new(TransformRegistry::new());
    registry
        .register_fn("uppercase", |value: Value, _| async move {
            match value {
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                other => Ok(other),
            }
        })
        .unwrap();
    registry
        .register_fn("multiply", |value: Value, args: Vec<Value>| async move {
            let base = value.as_f64().unwrap_or(0.0);
            let factor = args.first().and_then(Value::as_f64).unwrap_or(1.0);
            Ok(json!(base * factor))
        })
        .unwrap();

    let data = json!({
        "user": { "name": "Ada", "email": "ada@example.com" },
        "stats": { "open": 4, "closed": 17 },
        "price": 10,
        "rate": 1.5
    });

    // Templates of varying complexity
    let sources = vec![
        "Simple text with no expressions",
        "Hello {{user.name}}",
        "{{user.name}} has {{stats.open}} open and {{stats.closed}} closed",
        "{{user.name | uppercase}} owes {{price | multiply: rate}}",
        "{{user.name}} {{user.email}} {{stats.open}} {{stats.open}} repeated",
    ];

    println!("Template Render Performance Test");
    println!("================================\n");

    // Warm up the scan cache
    for source in &sources {
        let template = Template::new(*source).with_registry(Arc::clone(&registry));
        let _ = rt.block_on(template.render(&data));
    }

    for source in &sources {
        let template = Template::new(*source).with_registry(Arc::clone(&registry));
        let iterations = 100_000u32;
        let start = Instant::now();

        rt.block_on(async {
            for _ in 0..iterations {
                let _ = template.render(&data).await;
            }
        });

        let elapsed = start.elapsed();
        let per_op = elapsed / iterations;

        println!("Template: {:70}", format!("\"{}\"", source));
        println!("  Time for {} iterations: {:?}", iterations, elapsed);
        println!("  Per operation: {:?}\n", per_op);
    }

    // Path access vs serde_json pointer for the same traversal
    println!("Path Access Performance");
    println!("=======================\n");

    let resolver = PathResolver::new();
    let iterations = 1_000_000u32;

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = resolver.get(&data, "user.name");
    }
    let resolver_elapsed = start.elapsed();

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = data.pointer("/user/name");
    }
    let pointer_elapsed = start.elapsed();

    println!("Reading user.name x {} iterations:", iterations);
    println!("  PathResolver::get: {:?}", resolver_elapsed);
    println!("  Value::pointer:    {:?}", pointer_elapsed);
    println!(
        "  Overhead:          {:.2}x (fallbacks, hooks, events)",
        resolver_elapsed.as_secs_f64() / pointer_elapsed.as_secs_f64()
    );
}
