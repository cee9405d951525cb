//! The decoded result shapes `execute` returns: field descriptors, rows,
//! result sets, and the top-level response.

use crate::protocol::backend::query::FieldDescription;
use crate::protocol::types::{FormatCode, Oid};
use crate::value::Value;

/// Metadata for one column of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub table_oid: Oid,
    pub column_id: i16,
    pub type_oid: Oid,
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: FormatCode,
}

impl FieldDescriptor {
    pub(crate) fn from_wire(field: &FieldDescription<'_>) -> Self {
        Self {
            name: field.name.to_string(),
            table_oid: field.table_oid(),
            column_id: field.column_id(),
            type_oid: field.type_oid(),
            type_size: field.type_size(),
            type_modifier: field.type_modifier(),
            format: field.format(),
        }
    }
}

/// One decoded row: one value per field descriptor, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The result of one statement within a `Response`: either row data (with
/// descriptors) or a bare command status, never both absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub descriptors: Option<Vec<FieldDescriptor>>,
    pub rows: Option<Vec<Row>>,
    pub command_status: Option<String>,
}

impl ResultSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

/// The full result of one `execute` call: one `ResultSet` per statement in
/// the query (more than one only for a semicolon-separated simple query).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response(pub Vec<ResultSet>);

impl Response {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultSet> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Response {
    type Item = ResultSet;
    type IntoIter = std::vec::IntoIter<ResultSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
