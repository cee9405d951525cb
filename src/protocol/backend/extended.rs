//! Zero-payload acknowledgements from the extended query path.

use crate::error::Result;

/// Acknowledges a `Parse` message.
#[derive(Debug, Clone, Copy)]
pub struct ParseComplete;

impl ParseComplete {
    pub fn parse(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// Acknowledges a `Bind` message.
#[derive(Debug, Clone, Copy)]
pub struct BindComplete;

impl BindComplete {
    pub fn parse(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// Sent instead of a `RowDescription`/`DataRow*` sequence when the described
/// portal produces no rows.
#[derive(Debug, Clone, Copy)]
pub struct NoData;

impl NoData {
    pub fn parse(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}
