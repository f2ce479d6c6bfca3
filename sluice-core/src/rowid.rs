use crate::{BackendHandle, Error, Result, RowIdBackend};
use std::fmt::{self, Debug};

/// Opaque identifier of a table row, created by `Session::make_rowid` and filled by an into
/// binding.
pub struct RowId {
    backend: Box<dyn RowIdBackend>,
    // Keeps the backend module loaded, must be dropped last
    handle: Option<BackendHandle>,
}

impl RowId {
    pub fn new(backend: Box<dyn RowIdBackend>) -> Self {
        Self::with_handle(backend, None)
    }

    pub fn with_handle(backend: Box<dyn RowIdBackend>, handle: Option<BackendHandle>) -> Self {
        Self { backend, handle }
    }

    pub fn backend_module(&self) -> Option<&str> {
        self.handle.as_ref().map(BackendHandle::name)
    }

    pub fn backend<T: RowIdBackend>(&self) -> Result<&T> {
        self.backend
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| Error::msg("Row id was created by a different backend"))
    }

    pub fn backend_mut<T: RowIdBackend>(&mut self) -> Result<&mut T> {
        self.backend
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| Error::msg("Row id was created by a different backend"))
    }
}

impl Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RowId")
    }
}
