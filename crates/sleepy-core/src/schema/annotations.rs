//! Field annotation vocabulary: `required`, `readonly`, `writeonly`, `hidden`

use std::str::FromStr;
use thiserror::Error;

pub const REQUIRED: &str = "required";
pub const READ_ONLY: &str = "readonly";
pub const WRITE_ONLY: &str = "writeonly";
pub const HIDDEN: &str = "hidden";

/// The validation obligations declared on a single field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    pub required: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub hidden: bool,
}

/// An annotation token outside the vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown annotation `{0}`")]
pub struct UnknownToken(pub String);

impl Annotations {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl FromStr for Annotations {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut annotations = Annotations::default();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token {
                REQUIRED => annotations.required = true,
                READ_ONLY => annotations.read_only = true,
                WRITE_ONLY => annotations.write_only = true,
                HIDDEN => annotations.hidden = true,
                other => return Err(UnknownToken(other.to_string())),
            }
        }
        Ok(annotations)
    }
}
