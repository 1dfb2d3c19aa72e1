//! Higher-level spec constructors.
//!
//! Every combinator captures its argument specs and returns a [`Spec::Thunk`].
//! Nothing is resolved at construction time, so each resolution re-rolls the
//! arguments as well as the draw itself: `between(Kind::Integer, Kind::Integer)`
//! picks new bounds every time.
//!
//! Variadic combinators share one unpacking rule. Given exactly one element,
//! that element is the population spec (`choice(["abc"])` draws a letter).
//! Given more than one, the tuple of the elements is the population
//! (`choice(["John", "Jane"])` draws a name).

use rand::seq::index;
use rand::Rng;

use crate::error::{BoxError, ResolveError};
use crate::resolver::Resolver;
use crate::rng::uniform_real;
use crate::spec::Spec;
use crate::value::Value;

/// Applies the shared unpacking rule to a list of element specs.
pub fn unpack<I, S>(elems: I) -> Spec
where
    I: IntoIterator<Item = S>,
    S: Into<Spec>,
{
    let specs: Vec<Spec> = elems.into_iter().map(Into::into).collect();
    match <[Spec; 1]>::try_from(specs) {
        Ok([only]) => only,
        Err(specs) => Spec::Tuple(specs),
    }
}

/// A uniform number between two bounds, inclusive.
///
/// Both bounds are resolved and ordered. Two integers give an integer; any
/// real bound promotes the draw to a real number.
pub fn between(low: impl Into<Spec>, high: impl Into<Spec>) -> Spec {
    let (low, high) = (low.into(), high.into());
    Spec::thunk(move |resolver| {
        let m = resolver.resolve(&low)?;
        let n = resolver.resolve(&high)?;

        let value = match (&m, &n) {
            (Value::Int(a), Value::Int(b)) => {
                let (lo, hi) = if a <= b { (*a, *b) } else { (*b, *a) };
                Value::Int(resolver.with_rng(|rng| rng.gen_range(lo..=hi)))
            }
            _ => {
                let a = bound(&m)?;
                let b = bound(&n)?;
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                Value::Float(resolver.with_rng(|rng| uniform_real(rng, lo, hi)))
            }
        };

        Ok(Spec::Literal(value))
    })
}

fn bound(value: &Value) -> Result<f64, ResolveError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(x) if x.is_finite() => Ok(*x),
        other => Err(ResolveError::InvalidBound {
            found: other.kind_name(),
        }),
    }
}

/// One member of the population, drawn uniformly.
pub fn choice<I, S>(elems: I) -> Spec
where
    I: IntoIterator<Item = S>,
    S: Into<Spec>,
{
    let population = unpack(elems);
    Spec::thunk(move |resolver| {
        let (members, _) = population_of(resolver.resolve(&population)?)?;
        if members.is_empty() {
            return Err(ResolveError::EmptyPopulation);
        }
        let picked = resolver.with_rng(|rng| rng.gen_range(0..members.len()));
        Ok(Spec::Literal(members[picked].clone()))
    })
}

/// `k` distinct members of the population, drawn without replacement.
///
/// `k` defaults to the population size, which yields a shuffle. Only `None`
/// means the whole population: an explicit `k` of zero gives an empty result.
/// Text populations give text, tuples give tuples, everything else gives a
/// list.
///
/// # Arguments
///
/// * `elems` - Population, unpacked by [`unpack`]
/// * `k` - Number of members to draw, resolved on each invocation
pub fn sample<I, S>(elems: I, k: Option<Spec>) -> Spec
where
    I: IntoIterator<Item = S>,
    S: Into<Spec>,
{
    draw(unpack(elems), k, Replacement::Without)
}

/// `k` members of the population, drawn with replacement.
///
/// Same defaults and recast rule as [`sample`]; members may repeat. An explicit
/// `k` of zero gives an empty result, even from an empty population.
pub fn choices<I, S>(elems: I, k: Option<Spec>) -> Spec
where
    I: IntoIterator<Item = S>,
    S: Into<Spec>,
{
    draw(unpack(elems), k, Replacement::With)
}

/// The population resolved and handed to `combine`.
///
/// The combined value is returned as-is; it is not resolved again.
pub fn compose<I, S, F>(elems: I, combine: F) -> Spec
where
    I: IntoIterator<Item = S>,
    S: Into<Spec>,
    F: Fn(Value) -> Result<Value, BoxError> + 'static,
{
    let population = unpack(elems);
    Spec::thunk(move |resolver| {
        let resolved = resolver.resolve(&population)?;
        combine(resolved)
            .map(Spec::Literal)
            .map_err(ResolveError::Combine)
    })
}

/// Concatenates the text members of a list, tuple or set.
///
/// Meant as a `combine` function for [`compose`].
pub fn join_text(value: Value) -> Result<Value, BoxError> {
    let items = value
        .as_items()
        .ok_or_else(|| format!("cannot join a {}", value.kind_name()))?;

    let mut joined = String::new();
    for item in items {
        match item {
            Value::Text(s) => joined.push_str(s),
            other => return Err(format!("cannot join a {} into text", other.kind_name()).into()),
        }
    }
    Ok(Value::Text(joined))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replacement {
    With,
    Without,
}

/// How a drawn selection is turned back into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recast {
    Text,
    Tuple,
    List,
}

impl Recast {
    fn apply(self, picked: Vec<Value>) -> Value {
        match self {
            Recast::Text => Value::Text(
                picked
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<String>(),
            ),
            Recast::Tuple => Value::Tuple(picked),
            Recast::List => Value::List(picked),
        }
    }
}

fn population_of(value: Value) -> Result<(Vec<Value>, Recast), ResolveError> {
    match value {
        Value::Text(s) => Ok((s.chars().map(Value::from).collect(), Recast::Text)),
        Value::Tuple(items) => Ok((items, Recast::Tuple)),
        Value::List(items) => Ok((items, Recast::List)),
        Value::Set(set) => Ok((set.iter().cloned().collect(), Recast::List)),
        other => Err(ResolveError::NotAPopulation {
            found: other.kind_name(),
        }),
    }
}

fn count(value: Value) -> Result<usize, ResolveError> {
    match value {
        Value::Int(n) if n >= 0 => Ok(n as usize),
        other => Err(ResolveError::InvalidCount {
            found: other.to_string(),
        }),
    }
}

fn draw(population: Spec, k: Option<Spec>, replacement: Replacement) -> Spec {
    Spec::thunk(move |resolver: &Resolver| {
        let (members, recast) = population_of(resolver.resolve(&population)?)?;
        let k = match &k {
            Some(k) => count(resolver.resolve(k)?)?,
            None => members.len(),
        };

        let picked: Vec<Value> = match replacement {
            Replacement::With => {
                if k > 0 && members.is_empty() {
                    return Err(ResolveError::EmptyPopulation);
                }
                resolver.with_rng(|rng| {
                    (0..k)
                        .map(|_| members[rng.gen_range(0..members.len())].clone())
                        .collect()
                })
            }
            Replacement::Without => {
                if k > members.len() {
                    return Err(ResolveError::SampleTooLarge {
                        k,
                        len: members.len(),
                    });
                }
                resolver.with_rng(|rng| {
                    index::sample(rng, members.len(), k)
                        .into_iter()
                        .map(|i| members[i].clone())
                        .collect()
                })
            }
        };

        Ok(Spec::Literal(recast.apply(picked)))
    })
}
