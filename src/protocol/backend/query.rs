//! `RowDescription`, `DataRow`, `CommandComplete`, and `EmptyQueryResponse`.

use std::mem::size_of;

use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U16 as U16BE, U32 as U32BE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::{Error, Result};
use crate::protocol::codec::read_cstr;
use crate::protocol::types::{FormatCode, Oid};

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct RowDescriptionHead {
    num_fields: U16BE,
}

/// The 18-byte fixed part of a field description, after its name.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct FieldDescriptionTail {
    table_oid: U32BE,
    column_id: I16BE,
    type_oid: U32BE,
    type_size: I16BE,
    type_modifier: I32BE,
    format: U16BE,
}

/// One column's metadata within a `RowDescription`.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescription<'a> {
    pub name: &'a str,
    tail: FieldDescriptionTail,
}

impl FieldDescription<'_> {
    pub fn table_oid(&self) -> Oid {
        self.tail.table_oid.get()
    }

    pub fn column_id(&self) -> i16 {
        self.tail.column_id.get()
    }

    pub fn type_oid(&self) -> Oid {
        self.tail.type_oid.get()
    }

    pub fn type_size(&self) -> i16 {
        self.tail.type_size.get()
    }

    pub fn type_modifier(&self) -> i32 {
        self.tail.type_modifier.get()
    }

    pub fn format(&self) -> FormatCode {
        FormatCode::from_u16(self.tail.format.get())
    }
}

/// Column metadata for a result set, parsed once on `T`.
#[derive(Debug)]
pub struct RowDescription<'a> {
    fields: Vec<FieldDescription<'a>>,
}

impl<'a> RowDescription<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let head = RowDescriptionHead::ref_from_bytes(&payload[..2])
            .map_err(|e| Error::Protocol(format!("RowDescription header: {e:?}")))?;
        let num_fields = head.num_fields.get() as usize;

        const TAIL_SIZE: usize = size_of::<FieldDescriptionTail>();
        let mut fields = Vec::with_capacity(num_fields);
        let mut rest = &payload[2..];
        for _ in 0..num_fields {
            let (name, after_name) = read_cstr(rest)?;
            if after_name.len() < TAIL_SIZE {
                return Err(Error::Protocol("RowDescription: truncated field tail".into()));
            }
            let tail = *FieldDescriptionTail::ref_from_bytes(&after_name[..TAIL_SIZE])
                .map_err(|e| Error::Protocol(format!("FieldDescription tail: {e:?}")))?;
            fields.push(FieldDescription { name, tail });
            rest = &after_name[TAIL_SIZE..];
        }

        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldDescription<'a>] {
        &self.fields
    }
}

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct DataRowHead {
    num_columns: U16BE,
}

/// One row of column values, each either absent (NULL) or raw wire bytes
/// waiting to be decoded against the matching `FieldDescription`.
#[derive(Debug, Clone, Copy)]
pub struct DataRow<'a> {
    num_columns: u16,
    columns: &'a [u8],
}

impl<'a> DataRow<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let head = DataRowHead::ref_from_bytes(&payload[..2])
            .map_err(|e| Error::Protocol(format!("DataRow header: {e:?}")))?;
        Ok(Self { num_columns: head.num_columns.get(), columns: &payload[2..] })
    }

    pub fn len(&self) -> usize {
        self.num_columns as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num_columns == 0
    }

    pub fn iter(&self) -> DataRowIter<'a> {
        DataRowIter { remaining: self.columns }
    }
}

/// Iterates the length-prefixed column values of a `DataRow`.
#[derive(Debug, Clone)]
pub struct DataRowIter<'a> {
    remaining: &'a [u8],
}

impl<'a> Iterator for DataRowIter<'a> {
    type Item = Result<Option<&'a [u8]>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        let (len_bytes, rest) = self.remaining.split_at_checked(4)?;
        let len = i32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);

        if len == -1 {
            self.remaining = rest;
            return Some(Ok(None));
        }
        let Ok(len) = usize::try_from(len) else {
            return Some(Err(Error::Protocol(format!("DataRow: negative column length {len}"))));
        };
        let Some((value, rest)) = rest.split_at_checked(len) else {
            return Some(Err(Error::Protocol("DataRow: column length exceeds payload".into())));
        };
        self.remaining = rest;
        Some(Ok(Some(value)))
    }
}

/// Marks the end of one statement's result, carrying its command tag
/// (`"SELECT 3"`, `"SET"`, `"INSERT 0 1"`, ...).
#[derive(Debug, Clone, Copy)]
pub struct CommandComplete<'a> {
    pub tag: &'a str,
}

impl<'a> CommandComplete<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (tag, _) = read_cstr(payload)?;
        Ok(Self { tag })
    }
}

/// Response to an empty (whitespace-only) query string.
#[derive(Debug, Clone, Copy)]
pub struct EmptyQueryResponse;

impl EmptyQueryResponse {
    pub fn parse(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}
