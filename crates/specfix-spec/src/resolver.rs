//! The resolver: turns specs into values.
//!
//! Dispatch is by case on [`Spec`], in this order:
//!
//! 1. [`Spec::Kind`] generates a fresh value in the configured domain.
//! 2. [`Spec::Map`] resolves every key and every value.
//! 3. [`Spec::List`], [`Spec::Tuple`] and [`Spec::Set`] resolve each element
//!    and keep their container kind.
//! 4. [`Spec::Thunk`] is invoked and its result resolved again, following
//!    chains of thunks in a loop.
//! 5. [`Spec::Literal`] is returned unchanged.
//!
//! Each thread has a default resolver backing the free [`resolve`] function.
//! It is seeded from `SPECFIX_SEED` when set, otherwise from OS entropy; the
//! seed in use is logged at debug level so that a failing run can be replayed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rand::Rng;
use rand_pcg::Pcg32;
use tracing::{debug, trace, warn};

use crate::config::ResolveConfig;
use crate::error::{ConfigError, ResolveError};
use crate::rng::{
    create_shared_rng, derive_seed, entropy_seed, seed_from_env, uniform_real, SharedRng,
};
use crate::spec::{Kind, Spec, Thunk};
use crate::value::{Complex, Value, ValueMap, ValueSet};

/// Alphabet for [`Kind::Text`].
pub const ASCII_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

thread_local! {
    static DEFAULT_RESOLVER: RefCell<Option<Resolver>> = const { RefCell::new(None) };
}

/// Resolves a spec with the thread's default resolver.
///
/// Safe to call from inside thunks and from inside provided functions.
pub fn resolve(spec: &Spec) -> Result<Value, ResolveError> {
    default_resolver().resolve(spec)
}

/// Returns a handle to the thread's default resolver, creating it on first use.
pub fn default_resolver() -> Resolver {
    DEFAULT_RESOLVER.with(|slot| {
        slot.borrow_mut()
            .get_or_insert_with(|| {
                let resolver = Resolver::new();
                debug!(seed = resolver.seed(), "initialized default resolver");
                resolver
            })
            .clone()
    })
}

/// Replaces the thread's default resolver, returning the previous one.
pub fn set_default_resolver(resolver: Resolver) -> Option<Resolver> {
    DEFAULT_RESOLVER.with(|slot| slot.borrow_mut().replace(resolver))
}

/// A handle to a random source plus resolution settings.
///
/// Clones share the same generator and nesting counter, so a clone handed to
/// a thunk continues the same random stream.
#[derive(Clone)]
pub struct Resolver {
    rng: SharedRng,
    seed: u64,
    config: Rc<ResolveConfig>,
    depth: Rc<Cell<usize>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("seed", &self.seed)
            .field("depth", &self.depth.get())
            .field("config", &self.config)
            .finish()
    }
}

impl Resolver {
    /// Creates a resolver seeded from `SPECFIX_SEED`, or from OS entropy.
    pub fn new() -> Self {
        Self::seeded(seed_from_env().unwrap_or_else(entropy_seed))
    }

    /// Creates a reproducible resolver.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: create_shared_rng(seed),
            seed,
            config: Rc::new(ResolveConfig::default()),
            depth: Rc::new(Cell::new(0)),
        }
    }

    /// Replaces the configuration after validating it.
    ///
    /// # Arguments
    ///
    /// * `config` - Domains and depth limit to resolve with
    ///
    /// # Returns
    ///
    /// The resolver, or `ConfigError::InvalidRange` naming the first field
    /// that would make generation fail (an inverted range, a non-finite real
    /// bound, empty text or a zero depth limit).
    pub fn with_config(mut self, config: ResolveConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = Rc::new(config);
        Ok(self)
    }

    /// The seed this resolver's stream started from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The validated configuration in use.
    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    /// Derives an independent, reproducible resolver for a labelled purpose.
    ///
    /// The child keeps the configuration but has its own stream and counter.
    pub fn fork(&self, label: &str) -> Resolver {
        Resolver {
            config: self.config.clone(),
            ..Resolver::seeded(derive_seed(self.seed, label))
        }
    }

    /// Runs `f` with exclusive access to the generator.
    ///
    /// `f` must not resolve specs itself: the generator stays borrowed until it
    /// returns. Resolve first, then draw.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut Pcg32) -> T) -> T {
        f(&mut self.rng.borrow_mut())
    }

    /// Resolves a spec into a value. The spec is never modified.
    pub fn resolve(&self, spec: &Spec) -> Result<Value, ResolveError> {
        let _guard = self.enter()?;

        match spec {
            Spec::Kind(kind) => Ok(self.generate(*kind)),
            Spec::Map(entries) => {
                let mut map = ValueMap::new();
                for (key, value) in entries {
                    let key = self.resolve(key)?;
                    let value = self.resolve(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Spec::List(items) => Ok(Value::List(self.resolve_all(items)?)),
            Spec::Tuple(items) => Ok(Value::Tuple(self.resolve_all(items)?)),
            Spec::Set(items) => Ok(Value::Set(
                self.resolve_all(items)?.into_iter().collect::<ValueSet>(),
            )),
            Spec::Thunk(thunk) => self.resolve_thunk(thunk),
            Spec::Literal(value) => Ok(value.clone()),
        }
    }

    fn resolve_all(&self, items: &[Spec]) -> Result<Vec<Value>, ResolveError> {
        items.iter().map(|item| self.resolve(item)).collect()
    }

    fn resolve_thunk(&self, thunk: &Thunk) -> Result<Value, ResolveError> {
        let mut current = thunk.clone();
        let mut guards = Vec::new();

        loop {
            guards.push(self.enter()?);
            trace!(depth = self.depth.get(), ?current, "invoking thunk");

            match current.call(self)? {
                Spec::Thunk(next) => current = next,
                spec => return self.resolve(&spec),
            }
        }
    }

    fn enter(&self) -> Result<DepthGuard<'_>, ResolveError> {
        let next = self.depth.get() + 1;
        if next > self.config.max_depth {
            warn!(
                limit = self.config.max_depth,
                seed = self.seed,
                "spec nesting exceeded the depth limit"
            );
            return Err(ResolveError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        self.depth.set(next);
        Ok(DepthGuard { depth: &self.depth })
    }

    /// Generates a fresh value of a primitive kind.
    ///
    /// Draws from the domains of the attached [`ResolveConfig`], which
    /// [`Resolver::with_config`] has already validated.
    pub fn generate(&self, kind: Kind) -> Value {
        let config = &self.config;
        self.with_rng(|rng| match kind {
            Kind::Integer => {
                let (low, high) = config.int_range;
                Value::Int(rng.gen_range(low..=high))
            }
            Kind::Real => {
                let (low, high) = config.real_range;
                Value::Float(uniform_real(rng, low, high))
            }
            Kind::Complex => {
                let (low, high) = config.complex_range;
                Value::Complex(Complex::new(
                    uniform_real(rng, low, high),
                    uniform_real(rng, low, high),
                ))
            }
            Kind::Boolean => Value::Bool(rng.gen()),
            Kind::Text => {
                let (min, max) = config.text_len;
                let len = rng.gen_range(min..=max);
                let text: String = (0..len)
                    .map(|_| ASCII_LETTERS[rng.gen_range(0..ASCII_LETTERS.len())] as char)
                    .collect();
                Value::Text(text)
            }
        })
    }
}

struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
