//! Teardown of resolved values.
//!
//! After a layer runs, every resolved value is walked: lists, tuples and sets
//! recurse into their members, maps into their values, and every tearable
//! [`Object`] is torn down. Each distinct object gets exactly one attempt per
//! walk, even if several fixtures share the handle. Failures never stop the
//! walk; they are collected and reported together.

use std::fmt;

use specfix_spec::{BoxError, Object, Value};
use tracing::{debug, warn};

/// One failed teardown.
#[derive(Debug)]
pub struct TeardownFailure {
    /// Where the object was found, e.g. `users[1]` or `config{"db"}`.
    pub path: String,
    /// Type of the object that failed.
    pub type_name: &'static str,
    /// The error its hook returned.
    pub source: BoxError,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.source)
    }
}

/// Every teardown failure of one layer, in walk order.
#[derive(Debug, Default)]
pub struct TeardownFailures {
    failures: Vec<TeardownFailure>,
}

impl TeardownFailures {
    /// Returns true when every teardown succeeded.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failed teardowns.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Failures in attempt order.
    pub fn iter(&self) -> std::slice::Iter<'_, TeardownFailure> {
        self.failures.iter()
    }

    /// Paths of the failed objects, in walk order.
    pub fn paths(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.path.as_str()).collect()
    }

    /// Merges another walk's failures after this one's.
    pub fn extend(&mut self, other: TeardownFailures) {
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for TeardownFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} teardown(s) failed", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            write!(f, "{}{}", if i == 0 { ": " } else { "; " }, failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownFailures {}

impl<'a> IntoIterator for &'a TeardownFailures {
    type Item = &'a TeardownFailure;
    type IntoIter = std::slice::Iter<'a, TeardownFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}

/// Tears down every named value, returning the failures.
pub fn teardown_all<'a, I>(values: I) -> TeardownFailures
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut walk = Walk::default();
    for (name, value) in values {
        walk.value(name.to_string(), value);
    }
    TeardownFailures {
        failures: walk.failures,
    }
}

#[derive(Default)]
struct Walk {
    seen: Vec<*const ()>,
    failures: Vec<TeardownFailure>,
}

impl Walk {
    fn value(&mut self, path: String, value: &Value) {
        match value {
            Value::List(items) | Value::Tuple(items) => self.items(&path, items),
            Value::Set(set) => self.items(&path, set.as_slice()),
            Value::Map(map) => {
                for (key, value) in map.iter() {
                    self.value(format!("{}{{{}}}", path, key), value);
                }
            }
            Value::Object(obj) if obj.is_tearable() => self.object(path, obj),
            _ => {}
        }
    }

    fn items(&mut self, path: &str, items: &[Value]) {
        for (i, item) in items.iter().enumerate() {
            self.value(format!("{}[{}]", path, i), item);
        }
    }

    fn object(&mut self, path: String, obj: &Object) {
        if self.seen.contains(&obj.addr()) {
            return;
        }
        self.seen.push(obj.addr());

        debug!(%path, type_name = obj.type_name(), "tearing down");
        if let Err(source) = obj.teardown() {
            warn!(%path, type_name = obj.type_name(), error = %source, "teardown failed");
            self.failures.push(TeardownFailure {
                path,
                type_name: obj.type_name(),
                source,
            });
        }
    }
}
