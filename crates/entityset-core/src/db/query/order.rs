use crate::db::direction::Direction;
use serde::Serialize;

///
/// OrderField
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OrderField {
    pub field: String,
    pub direction: Direction,
}

///
/// Order
///
/// Ordered list of sort keys. At most one entry per field.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Order {
    fields: Vec<OrderField>,
}

impl Order {
    #[must_use]
    pub fn by(field: impl Into<String>, direction: Direction) -> Self {
        Self::default().then(field, direction)
    }

    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self::by(field, Direction::Asc)
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self::by(field, Direction::Desc)
    }

    /// Append a lower-priority key. A repeated field replaces its earlier entry.
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: Direction) -> Self {
        let field = field.into();
        self.fields.retain(|existing| existing.field != field);
        self.fields.push(OrderField { field, direction });
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[OrderField] {
        &self.fields
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge a newer order over this one.
    ///
    /// Fields of `newer` come first and win on conflict; fields only present
    /// here keep their relative order after them.
    #[must_use]
    pub fn merge(&self, newer: &Self) -> Self {
        let mut fields = newer.fields.clone();
        fields.extend(
            self.fields
                .iter()
                .filter(|old| !newer.fields.iter().any(|new| new.field == old.field))
                .cloned(),
        );

        Self { fields }
    }

    /// Flip every field's direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|entry| OrderField {
                    field: entry.field.clone(),
                    direction: entry.direction.reversed(),
                })
                .collect(),
        }
    }
}
