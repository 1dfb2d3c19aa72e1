//! specfix End-to-End Test Infrastructure
//!
//! This crate holds the integration tests that exercise specs, providers and
//! teardown together:
//!
//! - **Users database**: the password/user/database factories from
//!   [`fakes`], composed from combinators and provided functions
//! - **Layers**: stacked fixture sets, overrides and pass-through keywords
//! - **Teardown**: attempt ordering, failure aggregation and precedence
//! - **Resources**: temporary directories released by teardown
//! - **Properties**: proptest checks for resolver and combinator invariants
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p specfix-tests
//!
//! # Pin the random stream and show provider logs
//! SPECFIX_SEED=1234 RUST_LOG=specfix_provide=debug cargo test -p specfix-tests
//! ```

pub mod fakes;
pub mod harness;

pub use harness::{init_tracing, install_resolver, test_resolver};
