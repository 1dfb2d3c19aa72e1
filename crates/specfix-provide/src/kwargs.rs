//! Keyword arguments delivered to provided functions.

use std::any::type_name;
use std::cell::{Ref, RefMut};

use specfix_spec::{Object, Value};

use crate::error::FixtureError;

/// An ordered mapping from argument name to value.
///
/// Inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs {
    entries: Vec<(String, Value)>,
}

impl Kwargs {
    /// Creates an empty set of arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces an argument, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// The argument's value, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns true when an argument of that name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no arguments are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Argument names in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Name and value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// The argument, or [`FixtureError::Missing`].
    pub fn value(&self, name: &str) -> Result<&Value, FixtureError> {
        self.get(name).ok_or_else(|| FixtureError::Missing {
            name: name.to_string(),
        })
    }

    /// An integer argument, or [`FixtureError::Mismatch`].
    pub fn int(&self, name: &str) -> Result<i64, FixtureError> {
        let value = self.value(name)?;
        value.as_int().ok_or_else(|| mismatch(name, "int", value))
    }

    /// A real argument; integers are widened.
    pub fn float(&self, name: &str) -> Result<f64, FixtureError> {
        let value = self.value(name)?;
        value.as_float().ok_or_else(|| mismatch(name, "float", value))
    }

    /// A boolean argument.
    pub fn bool(&self, name: &str) -> Result<bool, FixtureError> {
        let value = self.value(name)?;
        value.as_bool().ok_or_else(|| mismatch(name, "bool", value))
    }

    /// A text argument.
    pub fn text(&self, name: &str) -> Result<&str, FixtureError> {
        let value = self.value(name)?;
        value.as_str().ok_or_else(|| mismatch(name, "text", value))
    }

    /// Members of a list, tuple or set argument.
    pub fn items(&self, name: &str) -> Result<&[Value], FixtureError> {
        let value = self.value(name)?;
        value.as_items().ok_or_else(|| mismatch(name, "list", value))
    }

    /// The object handle of an argument.
    pub fn handle(&self, name: &str) -> Result<&Object, FixtureError> {
        let value = self.value(name)?;
        value.as_object().ok_or_else(|| mismatch(name, "object", value))
    }

    /// Borrows an object argument as a `T`.
    pub fn object<T: 'static>(&self, name: &str) -> Result<Ref<'_, T>, FixtureError> {
        let obj = self.typed_handle::<T>(name)?;
        obj.borrow::<T>().ok_or_else(|| FixtureError::Borrowed {
            name: name.to_string(),
        })
    }

    /// Mutably borrows an object argument as a `T`.
    pub fn object_mut<T: 'static>(&self, name: &str) -> Result<RefMut<'_, T>, FixtureError> {
        let obj = self.typed_handle::<T>(name)?;
        obj.borrow_mut::<T>().ok_or_else(|| FixtureError::Borrowed {
            name: name.to_string(),
        })
    }

    fn typed_handle<T: 'static>(&self, name: &str) -> Result<&Object, FixtureError> {
        let obj = self.handle(name)?;
        if !obj.is::<T>() {
            return Err(FixtureError::Mismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
                found: obj.type_name(),
            });
        }
        Ok(obj)
    }
}

fn mismatch(name: &str, expected: &'static str, found: &Value) -> FixtureError {
    FixtureError::Mismatch {
        name: name.to_string(),
        expected,
        found: found.kind_name(),
    }
}

impl<N, V> FromIterator<(N, V)> for Kwargs
where
    N: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut kwargs = Kwargs::new();
        for (name, value) in iter {
            kwargs.insert(name, value);
        }
        kwargs
    }
}
