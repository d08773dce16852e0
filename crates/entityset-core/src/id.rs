use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// EntityId
///
/// Opaque entity key: entity type plus a per-type local sequence number.
/// Ordered by `(type_id, local_id)`; every sorted-merge combinator relies on
/// this being a strict total order.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntityId {
    type_id: u32,
    local_id: u64,
}

impl EntityId {
    #[must_use]
    pub const fn new(type_id: u32, local_id: u64) -> Self {
        Self { type_id, local_id }
    }

    #[must_use]
    pub const fn type_id(&self) -> u32 {
        self.type_id
    }

    #[must_use]
    pub const fn local_id(&self) -> u64 {
        self.local_id
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.type_id, self.local_id)
    }
}

// Ids travel over the wire in their textual `#type:local` form.
impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

///
/// EntityIdParseError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("invalid entity id '{0}': expected '#<type>:<local>'")]
pub struct EntityIdParseError(String);

impl FromStr for EntityId {
    type Err = EntityIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EntityIdParseError(s.to_string());
        let body = s.strip_prefix('#').ok_or_else(invalid)?;
        let (type_part, local_part) = body.split_once(':').ok_or_else(invalid)?;
        let type_id = type_part.parse().map_err(|_| invalid())?;
        let local_id = local_part.parse().map_err(|_| invalid())?;

        Ok(Self::new(type_id, local_id))
    }
}
