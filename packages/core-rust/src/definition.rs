//! Operation and service descriptors.
//!
//! Generated bindings expose one `OperationDefinition<I, O>` constant per
//! operation and a `ServiceDefinition` per service. Handlers built from these
//! carry their input/output types along, so a compiled handler can check
//! that a service implements exactly the interface it declares.

use std::any::{type_name, TypeId};
use std::fmt;
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// TypeDescriptor
// ---------------------------------------------------------------------------

/// Runtime identity of a Rust type.
#[derive(Clone, Copy, Eq)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// OperationDefinition / OperationDescriptor
// ---------------------------------------------------------------------------

/// Typed name constant for an operation with input `I` and output `O`.
pub struct OperationDefinition<I, O> {
    name: &'static str,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O> OperationDefinition<I, O> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _types: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<I: 'static, O: 'static> OperationDefinition<I, O> {
    /// Erases the type parameters into a runtime descriptor.
    #[must_use]
    pub fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor::new::<I, O>(self.name)
    }
}

// Manual impls: derives would needlessly require `I: Clone` etc.
impl<I, O> Clone for OperationDefinition<I, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, O> Copy for OperationDefinition<I, O> {}

impl<I, O> fmt::Debug for OperationDefinition<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDefinition")
            .field("name", &self.name)
            .field("input", &type_name::<I>())
            .field("output", &type_name::<O>())
            .finish()
    }
}

/// Name plus input/output types of an operation, with the types erased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: String,
    pub input: TypeDescriptor,
    pub output: TypeDescriptor,
}

impl OperationDescriptor {
    #[must_use]
    pub fn new<I: 'static, O: 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: TypeDescriptor::of::<I>(),
            output: TypeDescriptor::of::<O>(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceDefinition
// ---------------------------------------------------------------------------

/// Declared interface of a service: its name and the operations it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    name: String,
    operations: Vec<OperationDescriptor>,
}

impl ServiceDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: Vec::new(),
        }
    }

    /// Adds an operation to the declared interface.
    #[must_use]
    pub fn operation<I: 'static, O: 'static>(mut self, def: &OperationDefinition<I, O>) -> Self {
        self.operations.push(def.descriptor());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }
}
