use sluice_core::RowIdBackend;
use std::any::Any;

/// The `rowid` of a sqlite table row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SqliteRowId {
    pub value: i64,
}

impl RowIdBackend for SqliteRowId {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
