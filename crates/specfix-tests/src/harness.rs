//! Test harness utilities: logging setup and resolver seeding.

use std::sync::Once;

use specfix_spec::rng::seed_from_env;
use specfix_spec::{set_default_resolver, Resolver, Spec, Value};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Output goes through the test writer so it is captured per test. Safe to
/// call from every test; only the first call installs anything.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A resolver seeded from `SPECFIX_SEED` when set, otherwise from `fallback`.
pub fn test_resolver(fallback: u64) -> Resolver {
    Resolver::seeded(seed_from_env().unwrap_or(fallback))
}

/// Makes [`test_resolver`] the thread's default resolver.
///
/// Provided functions called without an explicit resolver use it.
pub fn install_resolver(fallback: u64) -> Resolver {
    let resolver = test_resolver(fallback);
    set_default_resolver(resolver.clone());
    resolver
}

/// Resolves `spec` `n` times.
///
/// # Panics
///
/// Panics if any resolution fails.
pub fn resolve_n(resolver: &Resolver, spec: &Spec, n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            resolver
                .resolve(spec)
                .unwrap_or_else(|e| panic!("resolution {} failed: {}", i, e))
        })
        .collect()
}
