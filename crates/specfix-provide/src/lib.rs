//! specfix Provider
//!
//! Wraps ordinary functions so their arguments are resolved from specs on
//! every call, and every resource those specs created is torn down afterwards.
//!
//! # Example
//!
//! ```
//! use specfix_provide::{provide, Function, Kwargs, Signature};
//! use specfix_spec::combinators::{choice, join_text, compose};
//! use specfix_spec::{Kind, Spec};
//!
//! let greet = provide()
//!     .with("name", choice(["John", "Jane"]))
//!     .with("tag", compose([Spec::from("#"), Kind::Text.into()], join_text))
//!     .apply(Function::new(Signature::named(["name", "tag"]), |_, kw| {
//!         Ok(format!("{} {}", kw.text("name")?, kw.text("tag")?))
//!     }));
//!
//! let line = greet.run().unwrap();
//! assert!(line.starts_with("John #") || line.starts_with("Jane #"));
//!
//! let line = greet.call(&[], Kwargs::new().with("name", "Orange")).unwrap();
//! assert!(line.starts_with("Orange #"));
//! ```
//!
//! # Modules
//!
//! - [`error`]: call failures and argument access errors
//! - [`kwargs`]: the keyword arguments a wrapped function receives
//! - [`provider`]: [`provide`], fixture layers and the [`Provided`] wrapper
//! - [`teardown`]: the teardown walk over resolved values

pub mod error;
pub mod kwargs;
pub mod provider;
pub mod teardown;

pub use error::{FixtureError, ProvideError};
pub use kwargs::Kwargs;
pub use provider::{provide, Decorate, FixtureSet, Function, Provided, Signature};
pub use teardown::{teardown_all, TeardownFailure, TeardownFailures};
