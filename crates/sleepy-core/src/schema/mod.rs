//! Declarative schema engine
//!
//! Models describe themselves through [`Reflect`] (usually generated by
//! `#[derive(Model)]`). At registration time a [`FieldSchema`] is extracted
//! per call and per direction; at request time it validates decoded input
//! and sanitizes handler output.
//!
//! # Example
//!
//! ```rust,ignore
//! use sleepy::prelude::*;
//!
//! #[derive(Default, Serialize, Deserialize, Model)]
//! #[serde(default)]
//! struct User {
//!     #[sleepy(readonly)]
//!     id: String,
//!     #[sleepy(required)]
//!     name: String,
//!     #[sleepy(required, writeonly)]
//!     password: String,
//! }
//! ```

mod annotations;
mod field_schema;
mod reflect;

pub use annotations::{Annotations, UnknownToken, HIDDEN, READ_ONLY, REQUIRED, WRITE_ONLY};
pub use field_schema::{Direction, FieldPath, FieldSchema};
pub use reflect::{FieldDescriptor, Model, Record, Reflect};

#[cfg(test)]
pub(crate) use field_schema::fixtures;
