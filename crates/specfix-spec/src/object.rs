//! Opaque object handles and the teardown capability.
//!
//! Fixtures are not limited to plain data. A thunk may build a database
//! handle, a temporary directory or any other Rust value and hand it back
//! wrapped in an [`Object`]. Objects that hold resources opt in to cleanup by
//! implementing [`Teardown`] and being wrapped with [`Object::tearable`].

use std::any::{type_name, Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::BoxError;

/// Cleanup capability for resolved values that hold resources.
///
/// The provider calls `teardown` exactly once per layer for every tearable
/// object it resolved, after the wrapped function has returned or failed.
pub trait Teardown {
    /// Releases whatever the value holds.
    fn teardown(&mut self) -> Result<(), BoxError>;
}

type TeardownFn = fn(&mut dyn Any) -> Result<(), BoxError>;

fn teardown_as<T: Teardown + 'static>(value: &mut dyn Any) -> Result<(), BoxError> {
    match value.downcast_mut::<T>() {
        Some(value) => value.teardown(),
        None => Ok(()),
    }
}

/// A shared handle to an arbitrary `'static` value.
///
/// Cloning an `Object` clones the handle, not the value; equality is identity.
#[derive(Clone)]
pub struct Object {
    inner: Rc<RefCell<dyn Any>>,
    teardown: Option<TeardownFn>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Object {
    /// Wraps a value without teardown.
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
            teardown: None,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Wraps a value that must be torn down after use.
    pub fn tearable<T: Teardown + 'static>(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
            teardown: Some(teardown_as::<T>),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the wrapped Rust type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if the wrapped value is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns true if the object carries the teardown capability.
    pub fn is_tearable(&self) -> bool {
        self.teardown.is_some()
    }

    /// Borrows the wrapped value as a `T`.
    ///
    /// Returns `None` if the value is not a `T` or is currently mutably borrowed.
    pub fn borrow<T: 'static>(&self) -> Option<Ref<'_, T>> {
        let cell = self.inner.try_borrow().ok()?;
        Ref::filter_map(cell, |any| any.downcast_ref::<T>()).ok()
    }

    /// Mutably borrows the wrapped value as a `T`.
    pub fn borrow_mut<T: 'static>(&self) -> Option<RefMut<'_, T>> {
        let cell = self.inner.try_borrow_mut().ok()?;
        RefMut::filter_map(cell, |any| any.downcast_mut::<T>()).ok()
    }

    /// Runs the teardown hook, if any.
    ///
    /// Objects without teardown succeed trivially.
    pub fn teardown(&self) -> Result<(), BoxError> {
        let Some(hook) = self.teardown else {
            return Ok(());
        };
        let mut value = self
            .inner
            .try_borrow_mut()
            .map_err(|_| format!("{} is still borrowed during teardown", self.type_name))?;
        hook(&mut *value)
    }

    /// Address of the shared allocation, used to deduplicate handles.
    pub fn addr(&self) -> *const () {
        Rc::as_ptr(&self.inner) as *const ()
    }

    /// Returns true if both handles point to the same value.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object<{}>", self.type_name)
    }
}
