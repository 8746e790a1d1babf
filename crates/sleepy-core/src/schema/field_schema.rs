//! FieldSchema: the obligations of one model in one direction
//!
//! A schema is built once, at registration time, by walking the model's
//! [`Record`] descriptor. At request time it is only read: `validate` checks
//! a decoded input and `sanitize` scrubs a handler result before encoding.

use super::annotations::{Annotations, UnknownToken};
use super::reflect::{Record, Reflect};
use crate::error::{ApiError, RegistrationError};
use smallvec::SmallVec;
use std::any::TypeId;
use std::fmt;

/// Which side of a call a schema describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Request body: collects `required` and `readonly`
    In,
    /// Response body: collects `writeonly` and `hidden`
    Out,
}

/// Location of a (possibly nested) field inside a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    indices: SmallVec<[usize; 4]>,
    name: String,
}

impl FieldPath {
    fn root() -> Self {
        Self {
            indices: SmallVec::new(),
            name: String::new(),
        }
    }

    fn child(&self, index: usize, name: &str) -> Self {
        let mut indices = self.indices.clone();
        indices.push(index);
        let name = if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.name, name)
        };
        Self { indices, name }
    }

    /// Field positions from the outermost record inwards
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Dotted field name, e.g. `address.city`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depth(&self) -> usize {
        self.indices.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The field paths under each obligation for one model and one direction
#[derive(Debug, Clone)]
pub struct FieldSchema {
    record: Record,
    type_id: TypeId,
    direction: Direction,
    required: Vec<FieldPath>,
    read_only: Vec<FieldPath>,
    write_only: Vec<FieldPath>,
    hidden: Vec<FieldPath>,
}

impl FieldSchema {
    /// Walk `T`'s descriptor and collect the obligations for `direction`.
    ///
    /// Fails when `T` is not a structured record or when a field carries a
    /// token outside the annotation vocabulary.
    pub fn introspect<T: Reflect + 'static>(direction: Direction) -> Result<Self, RegistrationError> {
        let record = T::descriptor().ok_or(RegistrationError::NotARecord {
            type_name: std::any::type_name::<T>(),
        })?;
        Self::from_record(record, TypeId::of::<T>(), direction)
    }

    /// Build a schema from an explicit descriptor
    pub fn from_record(
        record: Record,
        type_id: TypeId,
        direction: Direction,
    ) -> Result<Self, RegistrationError> {
        let mut schema = Self {
            record: Record::new(record.name, Vec::new()),
            type_id,
            direction,
            required: Vec::new(),
            read_only: Vec::new(),
            write_only: Vec::new(),
            hidden: Vec::new(),
        };
        schema.collect(&record, &FieldPath::root())?;
        schema.record = record;
        Ok(schema)
    }

    fn collect(&mut self, record: &Record, parent: &FieldPath) -> Result<(), RegistrationError> {
        for (index, field) in record.fields.iter().enumerate() {
            let annotations: Annotations = field.annotations.parse().map_err(
                |UnknownToken(token)| RegistrationError::UnknownAnnotation {
                    model: record.name,
                    field: field.name,
                    token,
                },
            )?;
            let path = parent.child(index, field.name);

            match self.direction {
                Direction::In => {
                    if annotations.required {
                        self.required.push(path.clone());
                    }
                    if annotations.read_only {
                        self.read_only.push(path.clone());
                    }
                }
                Direction::Out => {
                    if annotations.write_only {
                        self.write_only.push(path.clone());
                    }
                    if annotations.hidden {
                        self.hidden.push(path.clone());
                    }
                }
            }

            if let Some(nested) = &field.nested {
                self.collect(nested, &path)?;
            }
        }
        Ok(())
    }

    pub fn model_name(&self) -> &'static str {
        self.record.name
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn required(&self) -> &[FieldPath] {
        &self.required
    }

    pub fn read_only(&self) -> &[FieldPath] {
        &self.read_only
    }

    pub fn write_only(&self) -> &[FieldPath] {
        &self.write_only
    }

    pub fn hidden(&self) -> &[FieldPath] {
        &self.hidden
    }

    /// Whether the dotted field name is hidden from documentation
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.iter().any(|p| p.name() == name)
    }

    /// Check a decoded payload against the input obligations.
    ///
    /// Required paths are checked before read-only paths; only the first
    /// violation is reported.
    pub fn validate(&self, payload: &dyn Reflect) -> Result<(), ApiError> {
        for path in &self.required {
            if resolve(payload, path).ok_or_else(|| self.unresolved(path))?.is_zero() {
                return Err(ApiError::field_missing(format!(
                    "Required field: {} is missing.",
                    path
                ))
                .with_internal(format!("validating `{}` body", self.model_name())));
            }
        }

        for path in &self.read_only {
            if !resolve(payload, path).ok_or_else(|| self.unresolved(path))?.is_zero() {
                return Err(ApiError::read_only_violation(format!(
                    "Attempting to set read-only field: {}.",
                    path
                ))
                .with_internal(format!("validating `{}` body", self.model_name())));
            }
        }

        Ok(())
    }

    /// Reset every write-only field of a handler result to its zero value
    pub fn sanitize(&self, result: &mut dyn Reflect) -> Result<(), ApiError> {
        for path in &self.write_only {
            resolve_mut(result, path)
                .ok_or_else(|| self.unresolved(path))?
                .reset();
        }
        Ok(())
    }

    fn unresolved(&self, path: &FieldPath) -> ApiError {
        ApiError::internal(format!(
            "field path `{}` does not resolve on a `{}` value",
            path,
            self.model_name()
        ))
    }
}

fn resolve<'a>(value: &'a dyn Reflect, path: &FieldPath) -> Option<&'a dyn Reflect> {
    path.indices()
        .iter()
        .try_fold(value, |current, &index| current.field(index))
}

fn resolve_mut<'a>(value: &'a mut dyn Reflect, path: &FieldPath) -> Option<&'a mut dyn Reflect> {
    let mut current = value;
    for &index in path.indices() {
        current = current.field_mut(index)?;
    }
    Some(current)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-written models, the same shape `#[derive(Model)]` produces.

    use crate::schema::{FieldDescriptor, Record, Reflect};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Address {
        pub street: String,
        pub city: String,
    }

    impl Reflect for Address {
        fn descriptor() -> Option<Record> {
            Some(Record::new(
                "Address",
                vec![
                    FieldDescriptor::new("street", "", <String as Reflect>::descriptor()),
                    FieldDescriptor::new("city", "required", <String as Reflect>::descriptor()),
                ],
            ))
        }

        fn field(&self, index: usize) -> Option<&dyn Reflect> {
            match index {
                0 => Some(&self.street),
                1 => Some(&self.city),
                _ => None,
            }
        }

        fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
            match index {
                0 => Some(&mut self.street),
                1 => Some(&mut self.city),
                _ => None,
            }
        }

        fn is_zero(&self) -> bool {
            self.street.is_zero() && self.city.is_zero()
        }

        fn reset(&mut self) {
            self.street.reset();
            self.city.reset();
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct User {
        pub id: String,
        pub name: String,
        pub password: String,
        pub tags: Vec<String>,
        pub address: Address,
    }

    impl Reflect for User {
        fn descriptor() -> Option<Record> {
            Some(Record::new(
                "User",
                vec![
                    FieldDescriptor::new("id", "readonly", <String as Reflect>::descriptor()),
                    FieldDescriptor::new("name", "required", <String as Reflect>::descriptor()),
                    FieldDescriptor::new(
                        "password",
                        "writeonly,hidden",
                        <String as Reflect>::descriptor(),
                    ),
                    FieldDescriptor::new("tags", "", <Vec<String> as Reflect>::descriptor()),
                    FieldDescriptor::new("address", "", <Address as Reflect>::descriptor()),
                ],
            ))
        }

        fn field(&self, index: usize) -> Option<&dyn Reflect> {
            match index {
                0 => Some(&self.id),
                1 => Some(&self.name),
                2 => Some(&self.password),
                3 => Some(&self.tags),
                4 => Some(&self.address),
                _ => None,
            }
        }

        fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
            match index {
                0 => Some(&mut self.id),
                1 => Some(&mut self.name),
                2 => Some(&mut self.password),
                3 => Some(&mut self.tags),
                4 => Some(&mut self.address),
                _ => None,
            }
        }

        fn is_zero(&self) -> bool {
            self.id.is_zero()
                && self.name.is_zero()
                && self.password.is_zero()
                && self.tags.is_zero()
                && self.address.is_zero()
        }

        fn reset(&mut self) {
            self.id.reset();
            self.name.reset();
            self.password.reset();
            self.tags.reset();
            self.address.reset();
        }
    }

    pub fn valid_user() -> User {
        User {
            name: "Ada".into(),
            address: Address {
                street: String::new(),
                city: "London".into(),
            },
            ..User::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{valid_user, Address, User};
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::FieldDescriptor;
    use proptest::prelude::*;

    #[test]
    fn input_schema_collects_nested_obligations() {
        let schema = FieldSchema::introspect::<User>(Direction::In).unwrap();

        let required: Vec<_> = schema.required().iter().map(|p| p.name()).collect();
        assert_eq!(required, vec!["name", "address.city"]);
        assert_eq!(schema.required()[1].indices(), &[4, 1]);
        assert_eq!(schema.read_only()[0].name(), "id");
        assert!(schema.write_only().is_empty());
        assert!(schema.hidden().is_empty());
    }

    #[test]
    fn output_schema_ignores_input_obligations() {
        let schema = FieldSchema::introspect::<User>(Direction::Out).unwrap();

        assert!(schema.required().is_empty());
        assert!(schema.read_only().is_empty());
        assert_eq!(schema.write_only()[0].name(), "password");
        assert!(schema.is_hidden("password"));
        assert!(!schema.is_hidden("name"));
    }

    #[test]
    fn leaves_are_not_records() {
        let err = FieldSchema::introspect::<String>(Direction::In).unwrap_err();
        assert!(matches!(err, RegistrationError::NotARecord { .. }));
    }

    #[test]
    fn unknown_annotation_is_a_registration_error() {
        let record = Record::new(
            "Broken",
            vec![FieldDescriptor::new("x", "required,secret", None)],
        );
        let err = FieldSchema::from_record(record, TypeId::of::<()>(), Direction::Out).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::UnknownAnnotation {
                model: "Broken",
                field: "x",
                token: "secret".into(),
            }
        );
    }

    #[test]
    fn missing_required_field_is_reported() {
        let schema = FieldSchema::introspect::<User>(Direction::In).unwrap();
        let mut user = valid_user();
        user.name.clear();

        let err = schema.validate(&user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldMissing);
        assert_eq!(err.message(), "Required field: name is missing.");
    }

    #[test]
    fn nested_required_field_is_reported() {
        let schema = FieldSchema::introspect::<User>(Direction::In).unwrap();
        let mut user = valid_user();
        user.address = Address::default();

        let err = schema.validate(&user).unwrap_err();
        assert_eq!(err.message(), "Required field: address.city is missing.");
    }

    #[test]
    fn read_only_field_must_stay_zero() {
        let schema = FieldSchema::introspect::<User>(Direction::In).unwrap();
        let mut user = valid_user();
        user.id = "123".into();

        let err = schema.validate(&user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);
        assert_eq!(err.message(), "Attempting to set read-only field: id.");
    }

    #[test]
    fn missing_field_wins_over_read_only_violation() {
        let schema = FieldSchema::introspect::<User>(Direction::In).unwrap();
        let user = User {
            id: "123".into(),
            ..User::default()
        };

        let err = schema.validate(&user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldMissing);
    }

    #[test]
    fn valid_payload_passes() {
        let schema = FieldSchema::introspect::<User>(Direction::In).unwrap();
        assert!(schema.validate(&valid_user()).is_ok());
    }

    #[test]
    fn sanitize_clears_write_only_fields() {
        let schema = FieldSchema::introspect::<User>(Direction::Out).unwrap();
        let mut user = valid_user();
        user.password = "secret".into();

        schema.sanitize(&mut user).unwrap();
        assert!(user.password.is_empty());
        assert_eq!(user.name, "Ada");
        assert_eq!(user.address.city, "London");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(name in ".*", password in ".*", city in ".*") {
            let schema = FieldSchema::introspect::<User>(Direction::Out).unwrap();
            let mut once = User {
                name,
                password,
                address: Address { street: String::new(), city },
                ..User::default()
            };
            schema.sanitize(&mut once).unwrap();
            let mut twice = once.clone();
            schema.sanitize(&mut twice).unwrap();

            prop_assert_eq!(&once, &twice);
            prop_assert!(once.password.is_empty());
        }

        #[test]
        fn required_detection_matches_emptiness(name in ".{0,8}") {
            let schema = FieldSchema::introspect::<User>(Direction::In).unwrap();
            let mut user = valid_user();
            user.name = name.clone();

            prop_assert_eq!(schema.validate(&user).is_ok(), !name.is_empty());
        }
    }
}
