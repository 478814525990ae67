//! dotprops - dot-path property access and async template rendering for JSON

pub mod error;
pub mod event;
pub mod expr;
pub mod guard;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod template;

pub use error::{FixSuggestion, PropsError};
pub use event::{Event, EventOp, EventSink, MemorySink, Module, TracingSink};
pub use expr::{Expression, TransformCall};
pub use guard::{is_reserved, RESERVED_SEGMENTS};
pub use path::Segment;
pub use registry::{
    default_registry, FnTransform, Identity, RegistryConfig, Transform, TransformRegistry,
};
pub use resolver::{
    default_resolver, get, get_or, has, remove, set, PathResolver, PropsConfig, ValueHook,
};
pub use template::{template, Slot, SlotFn, Template};
