use crate::{
    ColumnProperties, ConnectionParameters, Error, ExchangeType, ExecFetchResult, Indicator,
    Result, ScalarMut, ScalarRef, StatementType, UseSlot, VectorMut, VectorRef,
};
use std::any::Any;

/// Entry point of a backend, a process wide singleton that opens sessions.
///
/// Backend modules export it through a `factory_<name>` symbol, statically linked backends hand it
/// to `BackendRegistry::register_backend_factory` or to `Session::with_factory`.
pub trait BackendFactory: Send + Sync {
    fn make_session(&self, parameters: &ConnectionParameters) -> Result<Box<dyn SessionBackend>>;
}

/// Signature of the `factory_<name>` symbol exported by backend modules.
pub type FactoryFn = fn() -> &'static dyn BackendFactory;

/// One open connection of a backend.
pub trait SessionBackend: Send {
    fn backend_name(&self) -> &str;

    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    /// Last value generated for the table identity column, if the backend can tell.
    fn last_insert_id(&mut self, _table: &str) -> Result<Option<i64>> {
        Ok(None)
    }

    fn make_statement_backend(&mut self) -> Result<Box<dyn StatementBackend>>;

    fn make_rowid_backend(&mut self) -> Result<Box<dyn RowIdBackend>> {
        Err(Error::msg(format!(
            "Row ids are not supported by the {} backend",
            self.backend_name()
        )))
    }

    fn make_blob_backend(&mut self) -> Result<Box<dyn BlobBackend>>;
}

/// Native prepared statement of a backend, driven by the statement engine.
///
/// Binders receive the statement backend as a parameter on every call and downcast it with
/// [`downcast_statement`] to reach the native handle and the buffers.
pub trait StatementBackend: Any + Send {
    /// Acquires the native statement handle.
    fn alloc(&mut self) -> Result<()>;

    /// Releases the native handle and every buffer, the statement can be allocated again.
    fn clean_up(&mut self);

    /// Rewrites the portable `:name` placeholders and compiles the query.
    fn prepare(&mut self, query: &str, kind: StatementType) -> Result<()>;

    /// Runs the statement. `number == 0` only executes, otherwise the first `number` rows are
    /// fetched as well and looping over bulk use rows happens here.
    fn execute(&mut self, number: usize) -> Result<ExecFetchResult>;

    /// Moves the cursor to the next `number` rows. Returns `NoData` when fewer rows than requested
    /// remain even if some were buffered.
    fn fetch(&mut self, number: usize) -> Result<ExecFetchResult>;

    /// Rows available in the current window.
    fn number_of_rows(&self) -> usize;

    /// Drops the pending rowset after a failed execute or fetch. The statement stays prepared and
    /// the next execute starts from a clean cursor.
    fn close_cursor(&mut self) {}

    fn affected_rows(&self) -> Result<u64>;

    /// Name of the parameter at the zero based index, as it appeared in the query.
    fn parameter_name(&self, index: usize) -> Option<&str>;

    fn rewrite_for_procedure_call(&self, query: &str) -> String;

    /// Executes enough of the statement to learn the shape of the result, returns the number of
    /// columns.
    fn prepare_for_describe(&mut self) -> Result<usize>;

    /// Describes the column at the zero based index.
    fn describe_column(&mut self, index: usize) -> Result<ColumnProperties>;

    fn make_into_type_backend(&self) -> Box<dyn StandardIntoTypeBackend>;
    fn make_use_type_backend(&self) -> Box<dyn StandardUseTypeBackend>;
    fn make_vector_into_type_backend(&self) -> Box<dyn VectorIntoTypeBackend>;
    fn make_vector_use_type_backend(&self) -> Box<dyn VectorUseTypeBackend>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Gives a binder access to the concrete statement backend it was created by.
pub fn downcast_statement<T: StatementBackend>(statement: &mut dyn StatementBackend) -> Result<&mut T> {
    statement.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
        Error::msg(format!(
            "Binder used with a statement that is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Backend side of a scalar into binding.
pub trait StandardIntoTypeBackend {
    /// Records the column this binding receives and advances `position`.
    fn define_by_pos(
        &mut self,
        statement: &mut dyn StatementBackend,
        position: &mut usize,
        exchange_type: ExchangeType,
    ) -> Result<()>;

    fn pre_fetch(&mut self, _statement: &mut dyn StatementBackend) -> Result<()> {
        Ok(())
    }

    /// Converts the fetched column into the caller storage. `called_from_fetch && !got_data` is
    /// the normal end of rowset and must not touch anything.
    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        called_from_fetch: bool,
        data: ScalarMut<'_>,
        indicator: Option<&mut Indicator>,
    ) -> Result<()>;

    fn clean_up(&mut self, _statement: &mut dyn StatementBackend) {}
}

/// Backend side of a vector into binding.
pub trait VectorIntoTypeBackend {
    /// `begin..end` is the window of the caller vector this binding fills, an open end follows
    /// the vector size.
    fn define_by_pos(
        &mut self,
        statement: &mut dyn StatementBackend,
        position: &mut usize,
        exchange_type: ExchangeType,
        begin: usize,
        end: Option<usize>,
    ) -> Result<()>;

    fn pre_fetch(&mut self, _statement: &mut dyn StatementBackend) -> Result<()> {
        Ok(())
    }

    /// Converts the rows of the current window into `data[begin..]`, the engine already resized
    /// the vector to the number of fetched rows.
    fn post_fetch(
        &mut self,
        statement: &mut dyn StatementBackend,
        got_data: bool,
        data: VectorMut<'_>,
        indicators: Option<&mut Vec<Indicator>>,
    ) -> Result<()>;

    fn resize(&mut self, data: VectorMut<'_>, size: usize) -> Result<()>;

    fn size(&self, data: VectorRef<'_>) -> usize;

    fn clean_up(&mut self, _statement: &mut dyn StatementBackend) {}
}

/// Backend side of a scalar use binding.
pub trait StandardUseTypeBackend {
    fn bind_by_pos(
        &mut self,
        statement: &mut dyn StatementBackend,
        position: &mut usize,
        exchange_type: ExchangeType,
        read_only: bool,
    ) -> Result<()>;

    fn bind_by_name(
        &mut self,
        statement: &mut dyn StatementBackend,
        name: &str,
        exchange_type: ExchangeType,
        read_only: bool,
    ) -> Result<()>;

    /// Serializes the current caller value for the next execution.
    fn pre_use(
        &mut self,
        statement: &mut dyn StatementBackend,
        data: ScalarRef<'_>,
        indicator: Option<Indicator>,
    ) -> Result<()>;

    /// Pulls back values modified by the backend (in/out parameters).
    fn post_use(
        &mut self,
        _statement: &mut dyn StatementBackend,
        _got_data: bool,
        _data: UseSlot<'_>,
        _indicator: Option<&mut Indicator>,
    ) -> Result<()> {
        Ok(())
    }

    fn clean_up(&mut self, _statement: &mut dyn StatementBackend) {}
}

/// Backend side of a vector use binding.
pub trait VectorUseTypeBackend {
    fn bind_by_pos(
        &mut self,
        statement: &mut dyn StatementBackend,
        position: &mut usize,
        exchange_type: ExchangeType,
        begin: usize,
        end: Option<usize>,
    ) -> Result<()>;

    fn bind_by_name(
        &mut self,
        statement: &mut dyn StatementBackend,
        name: &str,
        exchange_type: ExchangeType,
        begin: usize,
        end: Option<usize>,
    ) -> Result<()>;

    fn pre_use(
        &mut self,
        statement: &mut dyn StatementBackend,
        data: VectorRef<'_>,
        indicators: Option<&[Indicator]>,
    ) -> Result<()>;

    fn size(&self, data: VectorRef<'_>) -> usize;

    fn clean_up(&mut self, _statement: &mut dyn StatementBackend) {}
}

/// Backend specific row identifier.
pub trait RowIdBackend: Any + Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Backend specific large object.
pub trait BlobBackend: Any + Send {
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads from `offset` into `buffer`, returns the number of bytes read.
    fn read(&self, offset: usize, buffer: &mut [u8]) -> Result<usize>;

    /// Writes `data` at `offset`, returns the number of bytes written.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<usize>;

    fn append(&mut self, data: &[u8]) -> Result<usize>;

    fn trim(&mut self, len: usize) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Window `begin..end` of a vector binding, shared by the vector binder implementations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VectorRange {
    pub begin: usize,
    pub end: Option<usize>,
}

impl VectorRange {
    pub fn new(begin: usize, end: Option<usize>) -> Self {
        Self { begin, end }
    }

    /// End of the window for a vector of length `len`.
    pub fn end(&self, len: usize) -> usize {
        self.end.map_or(len, |end| end.min(len))
    }

    pub fn size(&self, len: usize) -> usize {
        self.end(len).saturating_sub(self.begin)
    }

    /// Resizes the vector so that the window holds exactly `size` rows.
    pub fn resize(&mut self, mut data: VectorMut<'_>, size: usize) {
        data.resize(self.begin + size);
        if self.end.is_some() {
            self.end = Some(self.begin + size);
        }
    }
}
