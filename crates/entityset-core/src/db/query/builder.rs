use crate::{error::InternalError, value::Value};
use serde::Serialize;
use std::collections::BTreeMap;

///
/// CompiledQuery
///
/// Query text plus its bound parameters: the wire contract handed to a
/// remote backend.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: BTreeMap<String, Value>,
}

///
/// SqlBuilder
///
/// Append-only text buffer for one compile call. A single counter allocates
/// both `LET` suffixes and parameter suffixes, so no two generated names in
/// one query can collide.
///

#[derive(Debug, Default)]
pub(crate) struct SqlBuilder {
    buf: String,
    next_var: usize,
    params: BTreeMap<String, Value>,
    compositions: u64,
}

impl SqlBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(text);
        self
    }

    /// Allocate the next suffix from the shared counter.
    pub(crate) const fn next_index(&mut self) -> usize {
        let index = self.next_var;
        self.next_var += 1;
        index
    }

    /// Allocate the suffix for one binary composition.
    pub(crate) const fn next_composition(&mut self) -> usize {
        self.compositions = self.compositions.saturating_add(1);
        self.next_index()
    }

    /// Bind `value` under a fresh `<label><index>` name and append its placeholder.
    pub(crate) fn bind(&mut self, label: &str, value: Value) -> &mut Self {
        let name = format!("{label}{}", self.next_index());
        self.buf.push(':');
        self.buf.push_str(&name);
        self.params.insert(name, value);
        self
    }

    /// Append a class, field or link name after checking it cannot alter the query shape.
    pub(crate) fn identifier(
        &mut self,
        kind: &'static str,
        name: &str,
    ) -> Result<&mut Self, InternalError> {
        if !is_valid_identifier(name) {
            return Err(InternalError::invalid_identifier(kind, name));
        }

        Ok(self.push(name))
    }

    pub(crate) const fn compositions(&self) -> u64 {
        self.compositions
    }

    pub(crate) fn finish(self) -> CompiledQuery {
        CompiledQuery {
            sql: self.buf,
            params: self.params,
        }
    }
}

/// Parameter label derived from a field name: `@rid` binds as `rid<n>`.
pub(crate) fn param_label(field: &str) -> &str {
    field.trim_start_matches('@')
}

fn is_valid_identifier(name: &str) -> bool {
    if name == "@rid" {
        return true;
    }

    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
