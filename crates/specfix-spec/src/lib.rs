//! specfix Spec Library
//!
//! This crate turns declarative *specs* into concrete, randomized values for
//! tests. A spec describes the shape of the data a test needs; resolving it
//! produces a fresh value of that shape every time.
//!
//! # Overview
//!
//! - **Kinds**: `Kind::Integer`, `Kind::Real`, `Kind::Complex`, `Kind::Boolean`
//!   and `Kind::Text` resolve to random values in fixed default domains
//! - **Literals**: any plain value resolves to itself
//! - **Containers**: lists, tuples, sets and maps of specs resolve element-wise
//! - **Thunks**: deferred specs, invoked on every resolution; the
//!   [`combinators`] are built on them
//!
//! # Example
//!
//! ```
//! use specfix_spec::combinators::{between, choice, choices};
//! use specfix_spec::{Kind, Resolver, Spec};
//!
//! let user = Spec::map([
//!     (Spec::from("id"), between(1, 99)),
//!     ("name".into(), choice(["John", "Jane", "Orange"])),
//!     ("password".into(), choices([Kind::Text], Some(between(8, 15)))),
//! ]);
//!
//! let resolver = Resolver::seeded(42);
//! let value = resolver.resolve(&user).unwrap();
//! let id = value.as_map().unwrap().get(&"id".into()).unwrap().as_int().unwrap();
//! assert!((1..=99).contains(&id));
//! ```
//!
//! # Modules
//!
//! - [`combinators`]: range, choice, sampling and composition constructors
//! - [`config`]: primitive domains and the nesting limit
//! - [`error`]: resolution and configuration errors
//! - [`object`]: opaque object handles and the [`Teardown`] capability
//! - [`resolver`]: the [`Resolver`] and the thread's default instance
//! - [`rng`]: PCG32 generators and seed derivation
//! - [`spec`]: the [`Spec`] type
//! - [`value`]: the [`Value`] type

pub mod combinators;
pub mod config;
pub mod error;
pub mod object;
pub mod resolver;
pub mod rng;
pub mod spec;
pub mod value;

// Re-export commonly used types at the crate root
pub use config::{ResolveConfig, DEFAULT_MAX_DEPTH};
pub use error::{BoxError, ConfigError, ResolveError};
pub use object::{Object, Teardown};
pub use resolver::{default_resolver, resolve, set_default_resolver, Resolver, ASCII_LETTERS};
pub use rng::SEED_ENV;
pub use spec::{Kind, Spec, Thunk};
pub use value::{Complex, Value, ValueMap, ValueSet};
