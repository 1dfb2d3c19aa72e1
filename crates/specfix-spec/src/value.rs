//! Resolved values.

use std::fmt;

use crate::object::Object;

/// A complex number with `f64` parts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

impl Complex {
    /// Creates a complex number from its parts.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0.0 {
            write!(f, "({}-{}j)", self.re, -self.im)
        } else {
            write!(f, "({}+{}j)", self.re, self.im)
        }
    }
}

/// An insertion-ordered set of values.
///
/// Values are not hashable in general (reals, objects), so membership is
/// checked with `PartialEq`. Inserting an equal member is a no-op.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSet {
    items: Vec<Value>,
}

impl ValueSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value; returns false if an equal value was already present.
    pub fn insert(&mut self, value: Value) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.items.push(value);
        true
    }

    /// Returns true if an equal value is present.
    pub fn contains(&self, value: &Value) -> bool {
        self.items.iter().any(|v| v == value)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates members in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Members as a slice, in insertion order.
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ValueSet {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// An insertion-ordered key/value mapping.
///
/// Inserting an existing key replaces its value but keeps the key's original
/// position, so duplicate keys collapse the way ordinary maps do.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
}

impl ValueMap {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry, returning the previous value.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Looks up a value by key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterates values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// A concrete value produced by resolving a spec.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A real number.
    Float(f64),
    /// A complex number.
    Complex(Complex),
    /// A string.
    Text(String),
    /// An ordered, growable sequence.
    List(Vec<Value>),
    /// An ordered, fixed-arity sequence.
    Tuple(Vec<Value>),
    /// An insertion-ordered set.
    Set(ValueSet),
    /// An insertion-ordered mapping.
    Map(ValueMap),
    /// An opaque Rust value, possibly tearable.
    Object(Object),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the flag of a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer of a [`Value::Int`]; reals are not truncated.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a real number; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Returns the number of a [`Value::Complex`].
    pub fn as_complex(&self) -> Option<Complex> {
        match self {
            Value::Complex(c) => Some(*c),
            _ => None,
        }
    }

    /// Borrows the text of a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Members of a list, tuple or set.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            Value::Set(set) => Some(set.as_slice()),
            _ => None,
        }
    }

    /// Borrows the entries of a [`Value::Map`].
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrows the handle of a [`Value::Object`].
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Length of a container or text (in characters); `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.chars().count()),
            Value::List(items) | Value::Tuple(items) => Some(items.len()),
            Value::Set(set) => Some(set.len()),
            Value::Map(map) => Some(map.len()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq(f: &mut fmt::Formatter<'_>, items: &[Value], open: &str, close: &str) -> fmt::Result {
            write!(f, "{}", open)?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, "{}", close)
        }

        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Complex(c) => write!(f, "{}", c),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::List(items) => seq(f, items, "[", "]"),
            Value::Tuple(items) => seq(f, items, "(", ")"),
            Value::Set(set) => seq(f, set.as_slice(), "{", "}"),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(obj) => write!(f, "<{}>", obj.type_name()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Int(n as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, isize);

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x as f64)
    }
}

impl From<Complex> for Value {
    fn from(c: Complex) -> Self {
        Value::Complex(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Text(c.to_string())
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_collapses_duplicates() {
        let set: ValueSet = vec![Value::Int(1), Value::Int(2), Value::Int(1)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_map_replaces_keeping_position() {
        let mut map = ValueMap::new();
        map.insert("a".into(), 1.into());
        map.insert("b".into(), 2.into());
        assert_eq!(map.insert("a".into(), 3.into()), Some(Value::Int(1)));

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![Value::from("a"), Value::from("b")]);
        assert_eq!(map.get(&"a".into()), Some(&Value::Int(3)));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Float(3.5).as_int(), None);
        assert_eq!(Value::from("héllo").len(), Some(5));
        assert_eq!(Value::Int(3).len(), None);
        assert_eq!(
            Value::Tuple(vec![1.into(), 2.into()]).as_items(),
            Some(&[Value::Int(1), Value::Int(2)][..])
        );
        assert!(Value::from(None::<i64>).is_null());
    }

    #[test]
    fn test_display() {
        let value = Value::Map(
            vec![(
                Value::from("k"),
                Value::Tuple(vec![1.into(), 2.5.into(), Complex::new(1.0, -2.0).into()]),
            )]
            .into_iter()
            .collect(),
        );
        assert_eq!(value.to_string(), r#"{"k": (1, 2.5, (1-2j))}"#);
    }
}
