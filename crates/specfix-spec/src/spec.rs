//! Spec types.
//!
//! A [`Spec`] describes how to produce a [`Value`]. Specs are immutable and
//! cheap to clone, so the same spec can be resolved any number of times.

use std::fmt;
use std::rc::Rc;

use crate::error::ResolveError;
use crate::object::{Object, Teardown};
use crate::resolver::Resolver;
use crate::value::{Complex, Value};

/// Primitive kinds that resolve to a fresh random value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A random integer.
    Integer,
    /// A random real number.
    Real,
    /// A random complex number.
    Complex,
    /// A random boolean.
    Boolean,
    /// A random string of ASCII letters.
    Text,
}

impl Kind {
    /// Returns the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Real => "real",
            Kind::Complex => "complex",
            Kind::Boolean => "boolean",
            Kind::Text => "text",
        }
    }

    /// Returns all kinds.
    pub fn all() -> &'static [Kind] {
        &[
            Kind::Integer,
            Kind::Real,
            Kind::Complex,
            Kind::Boolean,
            Kind::Text,
        ]
    }
}

type ThunkFn = dyn Fn(&Resolver) -> Result<Spec, ResolveError>;

/// A deferred, re-rollable spec.
///
/// Invoking a thunk yields another spec, which the resolver resolves again.
#[derive(Clone)]
pub struct Thunk(Rc<ThunkFn>);

impl Thunk {
    /// Wraps a closure as a thunk.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Resolver) -> Result<Spec, ResolveError> + 'static,
    {
        Self(Rc::new(f))
    }

    /// Invokes the thunk once.
    pub fn call(&self, resolver: &Resolver) -> Result<Spec, ResolveError> {
        (self.0)(resolver)
    }

    /// Returns true if both thunks share the same closure.
    pub fn ptr_eq(&self, other: &Thunk) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thunk({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// A declarative description of a value.
#[derive(Debug, Clone)]
pub enum Spec {
    /// A fresh random value of a primitive kind.
    Kind(Kind),
    /// A value that resolves to itself.
    Literal(Value),
    /// A list whose elements are specs.
    List(Vec<Spec>),
    /// A tuple whose elements are specs.
    Tuple(Vec<Spec>),
    /// A set whose members are specs.
    Set(Vec<Spec>),
    /// A mapping whose keys and values are specs.
    Map(Vec<(Spec, Spec)>),
    /// A deferred spec; its result is resolved again.
    Thunk(Thunk),
}

impl Spec {
    /// Builds a thunk spec from a closure.
    pub fn thunk<F>(f: F) -> Self
    where
        F: Fn(&Resolver) -> Result<Spec, ResolveError> + 'static,
    {
        Spec::Thunk(Thunk::new(f))
    }

    /// Builds a thunk spec from a fallible closure that ignores the resolver.
    ///
    /// Handy for constructors such as `Spec::lazy(|| Ok(Database::connect()?))`.
    pub fn lazy<F, S, E>(f: F) -> Self
    where
        F: Fn() -> Result<S, E> + 'static,
        S: Into<Spec>,
        E: Into<crate::error::BoxError>,
    {
        Spec::thunk(move |_| f().map(Into::into).map_err(ResolveError::thunk))
    }

    /// Builds a tuple spec.
    pub fn tuple<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Spec>,
    {
        Spec::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Builds a list spec.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Spec>,
    {
        Spec::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a set spec.
    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Spec>,
    {
        Spec::Set(items.into_iter().map(Into::into).collect())
    }

    /// Builds a mapping spec.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Spec>,
        V: Into<Spec>,
    {
        Spec::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// A list of `n` copies of `spec`, each resolved independently.
    pub fn repeat(spec: impl Into<Spec>, n: usize) -> Self {
        Spec::List(vec![spec.into(); n])
    }

    /// A literal holding a plain object.
    pub fn object<T: 'static>(value: T) -> Self {
        Spec::Literal(Value::Object(Object::new(value)))
    }

    /// A literal holding a tearable object.
    pub fn tearable<T: Teardown + 'static>(value: T) -> Self {
        Spec::Literal(Value::Object(Object::tearable(value)))
    }

    /// The null literal.
    pub fn null() -> Self {
        Spec::Literal(Value::Null)
    }

    /// Returns true if resolving this spec is guaranteed to return it unchanged.
    pub fn is_literal(&self) -> bool {
        matches!(self, Spec::Literal(_))
    }
}

impl From<Kind> for Spec {
    fn from(kind: Kind) -> Self {
        Spec::Kind(kind)
    }
}

impl From<Value> for Spec {
    fn from(value: Value) -> Self {
        Spec::Literal(value)
    }
}

impl From<Thunk> for Spec {
    fn from(thunk: Thunk) -> Self {
        Spec::Thunk(thunk)
    }
}

impl From<Object> for Spec {
    fn from(obj: Object) -> Self {
        Spec::Literal(Value::Object(obj))
    }
}

impl<S: Into<Spec>> From<Vec<S>> for Spec {
    fn from(items: Vec<S>) -> Self {
        Spec::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! impl_literal_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Spec {
                fn from(x: $t) -> Self {
                    Spec::Literal(Value::from(x))
                }
            }
        )*
    };
}

impl_literal_from!(
    (),
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    isize,
    f32,
    f64,
    char,
    Complex,
    &str,
    String
);
