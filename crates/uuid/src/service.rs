//! Internal implementation of summarizer ids and id generators.

use crate::{IdError, IdResult};
use ::uuid::Uuid;
use std::{fmt, str::FromStr};

/// Opaque, non-empty identifier of a summarizer record.
///
/// Surrounding whitespace is stripped on construction so that ids typed on a command line and
/// ids read from a file compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SummarizerId(String);

impl SummarizerId {
    /// Validates and wraps an externally supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is empty or whitespace only.
    pub fn parse(input: &str) -> IdResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IdError::InvalidInput(
                "summarizer id cannot be empty".into(),
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SummarizerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SummarizerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SummarizerId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SummarizerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SummarizerId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Source of fresh summarizer ids.
///
/// Generators only need to make collisions negligible; the store still checks every
/// generated id against the ids it holds and asks again on a clash.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> SummarizerId;
}

/// Generates random version 4 UUIDs in canonical form.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGenerator;

impl UuidIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for UuidIdGenerator {
    fn next_id(&mut self) -> SummarizerId {
        SummarizerId(Uuid::new_v4().simple().to_string())
    }
}

/// Generates `<prefix>-<n>` ids from a counter starting at 1.
///
/// The counter never repeats within one generator, so ids are unique as long as nothing else
/// writes ids with the same prefix into the store.
#[derive(Clone, Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("sum")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> SummarizerId {
        let id = SummarizerId(format!("{}-{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}
