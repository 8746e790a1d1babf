//! Static type description and dynamic field access for data models
//!
//! [`Reflect`] is what lets the framework walk a model without runtime
//! reflection: `#[derive(Model)]` generates it for records, and the impls
//! below cover the leaf types a record is built from.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Dynamic access to a data-model value.
///
/// Records report a [`Record`] descriptor and expose their fields by
/// position. Everything else is a leaf: it has a zero value and can be reset
/// to it, but is never walked into.
pub trait Reflect: Send + Sync {
    /// Type description, `None` for leaves
    fn descriptor() -> Option<Record>
    where
        Self: Sized,
    {
        None
    }

    /// Field at `index` of a record
    fn field(&self, _index: usize) -> Option<&dyn Reflect> {
        None
    }

    /// Mutable field at `index` of a record
    fn field_mut(&mut self, _index: usize) -> Option<&mut dyn Reflect> {
        None
    }

    /// Whether this value equals its type's zero/empty value
    fn is_zero(&self) -> bool;

    /// Reset this value to its type's zero/empty value
    fn reset(&mut self);
}

/// A type usable as a call's input or output body
pub trait Model: Reflect + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Model for T where T: Reflect + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Description of a structured record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl Record {
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self { name, fields }
    }
}

/// Description of one field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Raw comma-separated annotation tokens, e.g. `"required,writeonly"`
    pub annotations: &'static str,
    /// Present when the field's own type is a record
    pub nested: Option<Record>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, annotations: &'static str, nested: Option<Record>) -> Self {
        Self {
            name,
            annotations,
            nested,
        }
    }
}

macro_rules! impl_reflect_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty>::default()
                }

                fn reset(&mut self) {
                    *self = <$ty>::default();
                }
            }
        )*
    };
}

impl_reflect_scalar!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl Reflect for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn reset(&mut self) {
        self.clear();
    }
}

// Sequences are zero when empty, not only when absent.
impl<T: Send + Sync> Reflect for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: Send + Sync> Reflect for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn reset(&mut self) {
        *self = None;
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

impl<K: Send + Sync, V: Send + Sync, S: Send + Sync> Reflect for HashMap<K, V, S> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<K: Send + Sync, V: Send + Sync> Reflect for BTreeMap<K, V> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl Reflect for serde_json::Value {
    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn reset(&mut self) {
        *self = serde_json::Value::Null;
    }
}
