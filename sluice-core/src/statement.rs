use crate::{
    BackendHandle, ColumnProperties, Error, Exchange, ExecFetchResult, IntoType, Result,
    StatementBackend, StatementType, UseType, truncate_long,
};
use std::fmt::{self, Debug};

/// Lifecycle of a [`Statement`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// No native handle allocated.
    #[default]
    Clean,
    /// Bindings are being attached, nothing prepared yet.
    Defining,
    Prepared,
    /// Bindings were handed to the backend, they can't change anymore.
    Bound,
    Executing,
    /// The last execute or fetch reached the end of the rowset.
    Exhausted,
}

/// Statement with its bindings.
///
/// Bindings borrow caller storage for `'a`. Bind through a `RefCell` when the values must be read
/// or updated while the statement is alive.
pub struct Statement<'a> {
    backend: Box<dyn StatementBackend>,
    intos: Vec<Box<dyn IntoType + 'a>>,
    uses: Vec<Box<dyn UseType + 'a>>,
    query: String,
    kind: StatementType,
    state: StatementState,
    uppercase_column_names: bool,
    fetch_size: usize,
    initial_fetch_size: usize,
    got_data: bool,
    described: bool,
    // Keeps the backend module loaded, must be dropped last
    handle: Option<BackendHandle>,
}

impl<'a> Statement<'a> {
    pub fn new(
        backend: Box<dyn StatementBackend>,
        handle: Option<BackendHandle>,
        uppercase_column_names: bool,
    ) -> Self {
        Self {
            backend,
            intos: Vec::new(),
            uses: Vec::new(),
            query: String::new(),
            kind: StatementType::default(),
            state: StatementState::Clean,
            uppercase_column_names,
            fetch_size: 0,
            initial_fetch_size: 0,
            got_data: false,
            described: false,
            handle,
        }
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn kind(&self) -> StatementType {
        self.kind
    }

    pub fn got_data(&self) -> bool {
        self.got_data
    }

    pub fn backend(&self) -> &dyn StatementBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn StatementBackend {
        self.backend.as_mut()
    }

    /// Name of the backend module kept alive by this statement, if it was loaded dynamically.
    pub fn backend_module(&self) -> Option<&str> {
        self.handle.as_ref().map(BackendHandle::name)
    }

    /// Adds an into or use binding.
    pub fn exchange(&mut self, exchange: impl Into<Exchange<'a>>) -> Result<&mut Self> {
        match self.state {
            StatementState::Clean | StatementState::Defining => {
                self.state = StatementState::Defining
            }
            StatementState::Prepared => {}
            _ => {
                let error = Error::msg(
                    "Cannot add bindings to a statement whose bindings are already fixed.",
                );
                log::error!("{:#}", error);
                return Err(error);
            }
        }
        match exchange.into() {
            Exchange::Into(into) => self.intos.push(into),
            Exchange::Use(use_) => self.uses.push(use_),
        }
        Ok(self)
    }

    /// Compiles the query, any previous preparation is discarded. Bindings are kept and bound
    /// again at the next execution.
    pub fn prepare(&mut self, query: &str, kind: StatementType) -> Result<()> {
        self.release_bindings();
        if self.state != StatementState::Clean {
            self.backend.clean_up();
        }
        self.query = query.to_string();
        self.kind = kind;
        self.described = false;
        self.fetch_size = 0;
        self.initial_fetch_size = 0;
        self.got_data = false;
        log::debug!("Preparing {}", truncate_long!(query));
        let result = self
            .backend
            .alloc()
            .and_then(|_| self.backend.prepare(query, kind));
        match result {
            Ok(()) => {
                self.state = StatementState::Prepared;
                Ok(())
            }
            Err(error) => {
                self.backend.clean_up();
                self.state = StatementState::Clean;
                let error = error.context(format!("while preparing \"{}\"", truncate_long!(query)));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    /// Prepares the backend specific invocation of a stored procedure.
    pub fn prepare_procedure(&mut self, query: &str) -> Result<()> {
        let query = self.backend.rewrite_for_procedure_call(query);
        self.prepare(&query, StatementType::RepeatableQuery)
    }

    /// Hands the bindings to the backend. Runs at the first execution if not called explicitly.
    pub fn define_and_bind(&mut self) -> Result<()> {
        match self.state {
            StatementState::Prepared => {}
            StatementState::Bound | StatementState::Executing | StatementState::Exhausted => {
                return Ok(());
            }
            _ => {
                let error = Error::msg("Statement must be prepared before binding.");
                log::error!("{:#}", error);
                return Err(error);
            }
        }
        let result = self.bind_all();
        if let Err(error) = result {
            self.release_bindings();
            let error = error.context(format!("while binding \"{}\"", truncate_long!(self.query)));
            log::error!("{:#}", error);
            return Err(error);
        }
        self.state = StatementState::Bound;
        Ok(())
    }

    fn bind_all(&mut self) -> Result<()> {
        let named = self.uses.iter().filter(|v| v.name().is_some()).count();
        if named != 0 && named != self.uses.len() {
            return Err(Error::msg(
                "Binding for use elements must be either by position or by name.",
            ));
        }
        if self.intos.len() > 1 && self.intos.iter().any(|v| v.is_dynamic()) {
            return Err(Error::msg(
                "A dynamic row must be the only into element of the statement",
            ));
        }
        let mut position = 1;
        for (i, into) in self.intos.iter_mut().enumerate() {
            into.define(self.backend.as_mut(), &mut position)
                .map_err(|e| e.context(format!("for the column number {}", i + 1)))?;
        }
        let mut position = 1;
        for (i, use_) in self.uses.iter_mut().enumerate() {
            use_.bind(self.backend.as_mut(), &mut position)
                .map_err(|e| e.context(format!("for the parameter number {}", i + 1)))?;
        }
        Ok(())
    }

    /// Runs the statement, `with_data_exchange` also fetches the first batch of rows into the into
    /// bindings. Returns whether data was fetched.
    pub fn execute(&mut self, with_data_exchange: bool) -> Result<bool> {
        self.define_and_bind()?;
        match self.execute_inner(with_data_exchange) {
            Ok(got_data) => {
                self.got_data = got_data;
                Ok(got_data)
            }
            Err(error) => {
                self.got_data = false;
                self.backend.close_cursor();
                self.state = StatementState::Bound;
                let error = error.context(format!(
                    "while executing \"{}\"{}",
                    truncate_long!(self.query),
                    self.dump_uses()
                ));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    fn execute_inner(&mut self, with_data_exchange: bool) -> Result<bool> {
        self.initial_fetch_size = self.intos_size()?;
        if !self.intos.is_empty() && self.initial_fetch_size == 0 {
            return Err(Error::msg("Vectors of size 0 are not allowed."));
        }
        self.fetch_size = self.initial_fetch_size;
        // Sizes are read after pre_use, conversions may resize the use elements
        self.pre_use()?;
        let bind_size = self.uses_size()?;
        if bind_size > 1 && self.fetch_size > 1 {
            return Err(Error::msg(
                "Bulk insert/update and bulk select not allowed in same query",
            ));
        }
        if !self.described && self.intos.iter().any(|v| v.is_dynamic()) {
            self.describe_row()?;
            self.initial_fetch_size = 1;
            self.fetch_size = 1;
        }
        let number = if with_data_exchange {
            self.pre_fetch()?;
            1.max(self.fetch_size).max(bind_size)
        } else {
            0
        };
        if number > 1 && self.intos.iter().any(|v| !v.is_vector()) {
            return Err(Error::msg(
                "Bulk use with single into elements is not supported.",
            ));
        }
        let result = self.backend.execute(number)?;
        self.state = StatementState::Executing;
        let got_data = match result {
            ExecFetchResult::Success => {
                if number > 0 {
                    self.resize_intos(number)?;
                }
                number > 0
            }
            ExecFetchResult::NoData => {
                if number > 0 {
                    self.state = StatementState::Exhausted;
                }
                if self.fetch_size > 1 {
                    self.resize_intos(0)?
                } else {
                    false
                }
            }
        };
        if number > 0 {
            self.post_fetch(got_data, false)?;
        }
        self.post_use(got_data)?;
        Ok(got_data)
    }

    /// Fetches the next batch of rows. A partially filled last batch still returns `true` with the
    /// vectors shrunk to the remaining rows, the call after it returns `false`.
    pub fn fetch(&mut self) -> Result<bool> {
        match self.state {
            StatementState::Executing => {}
            StatementState::Exhausted => {
                self.truncate_intos()?;
                self.got_data = false;
                return Ok(false);
            }
            _ => {
                let error = Error::msg("Statement must be executed before fetching.");
                log::error!("{:#}", error);
                return Err(error);
            }
        }
        match self.fetch_inner() {
            Ok(got_data) => {
                self.got_data = got_data;
                Ok(got_data)
            }
            Err(error) => {
                self.got_data = false;
                self.backend.close_cursor();
                self.state = StatementState::Bound;
                let error = error.context(format!(
                    "while fetching data from \"{}\"",
                    truncate_long!(self.query)
                ));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    fn fetch_inner(&mut self) -> Result<bool> {
        if self.fetch_size == 0 {
            self.truncate_intos()?;
            self.state = StatementState::Exhausted;
            return Ok(false);
        }
        // Vectors might have been resized by the caller between fetches
        let fetch_size = self.intos_size()?;
        if fetch_size > self.initial_fetch_size {
            return Err(Error::msg(
                "Increasing the size of the output vector is not supported.",
            ));
        }
        if fetch_size == 0 {
            return Ok(false);
        }
        self.fetch_size = fetch_size;
        let got_data = match self.backend.fetch(self.fetch_size)? {
            ExecFetchResult::Success => {
                self.resize_intos(self.fetch_size)?;
                true
            }
            ExecFetchResult::NoData => {
                self.state = StatementState::Exhausted;
                if self.fetch_size > 1 {
                    let got_data = self.resize_intos(0)?;
                    self.fetch_size = 0;
                    got_data
                } else {
                    self.truncate_intos()?;
                    false
                }
            }
        };
        self.post_fetch(got_data, true)?;
        Ok(got_data)
    }

    /// Rows affected by the last execution.
    pub fn affected_rows(&self) -> Result<u64> {
        self.backend.affected_rows()
    }

    /// Columns of the result, the use elements are sent to the backend first.
    pub fn describe(&mut self) -> Result<Vec<ColumnProperties>> {
        self.define_and_bind()?;
        let result = self.pre_use().and_then(|_| self.describe_columns());
        result.map_err(|error| {
            let error = error.context(format!(
                "while describing \"{}\"",
                truncate_long!(self.query)
            ));
            log::error!("{:#}", error);
            error
        })
    }

    fn describe_columns(&mut self) -> Result<Vec<ColumnProperties>> {
        let count = self.backend.prepare_for_describe()?;
        (0..count)
            .map(|i| {
                self.backend
                    .describe_column(i)
                    .map_err(|e| e.context(format!("for the column number {}", i + 1)))
            })
            .collect()
    }

    fn describe_row(&mut self) -> Result<()> {
        let columns = self.describe_columns()?;
        let mut position = 1;
        for into in self.intos.iter_mut().filter(|v| v.is_dynamic()) {
            into.define_columns(
                self.backend.as_mut(),
                columns.clone(),
                self.uppercase_column_names,
                &mut position,
            )?;
        }
        self.described = true;
        Ok(())
    }

    /// Releases the native handle and the bindings, the statement goes back to a clean state.
    pub fn clean_up(&mut self) {
        self.release_bindings();
        self.intos.clear();
        self.uses.clear();
        if self.state != StatementState::Clean {
            self.backend.clean_up();
        }
        self.state = StatementState::Clean;
        self.described = false;
        self.got_data = false;
    }

    fn release_bindings(&mut self) {
        for into in &mut self.intos {
            into.clean_up(self.backend.as_mut());
        }
        for use_ in &mut self.uses {
            use_.clean_up(self.backend.as_mut());
        }
        if matches!(
            self.state,
            StatementState::Bound | StatementState::Executing | StatementState::Exhausted
        ) {
            self.state = StatementState::Prepared;
        }
    }

    fn intos_size(&self) -> Result<usize> {
        let mut result = 0;
        for (i, into) in self.intos.iter().enumerate() {
            let size = into.size()?;
            if i == 0 {
                result = size;
            } else if size != result {
                return Err(Error::msg(format!(
                    "Bind variable size mismatch (into[{}] has size {}, into[0] has size {})",
                    i, size, result
                )));
            }
        }
        Ok(result)
    }

    fn uses_size(&self) -> Result<usize> {
        let mut result = 0;
        for (i, use_) in self.uses.iter().enumerate() {
            let size = use_.size()?;
            if i == 0 {
                if size == 0 {
                    return Err(Error::msg("Vectors of size 0 are not allowed."));
                }
                result = size;
            } else if size != result {
                return Err(Error::msg(format!(
                    "Bind variable size mismatch (use[{}] has size {}, use[0] has size {})",
                    i, size, result
                )));
            }
        }
        Ok(result)
    }

    /// Resizes the into vectors to the fetched rows, capped by `upper_bound` unless it is 0.
    fn resize_intos(&mut self, upper_bound: usize) -> Result<bool> {
        let mut rows = self.backend.number_of_rows();
        if upper_bound != 0 && upper_bound < rows {
            rows = upper_bound;
        }
        for into in &mut self.intos {
            into.resize(rows)?;
        }
        Ok(rows > 0)
    }

    fn truncate_intos(&mut self) -> Result<()> {
        for into in &mut self.intos {
            into.resize(0)?;
        }
        Ok(())
    }

    fn pre_fetch(&mut self) -> Result<()> {
        for into in &mut self.intos {
            into.pre_fetch(self.backend.as_mut())?;
        }
        Ok(())
    }

    fn post_fetch(&mut self, got_data: bool, called_from_fetch: bool) -> Result<()> {
        for (i, into) in self.intos.iter_mut().enumerate() {
            into.post_fetch(self.backend.as_mut(), got_data, called_from_fetch)
                .map_err(|e| e.context(format!("for the column number {}", i + 1)))?;
        }
        Ok(())
    }

    fn pre_use(&mut self) -> Result<()> {
        for (i, use_) in self.uses.iter_mut().enumerate() {
            use_.pre_use(self.backend.as_mut())
                .map_err(|e| e.context(format!("for the parameter number {}", i + 1)))?;
        }
        Ok(())
    }

    fn post_use(&mut self, got_data: bool) -> Result<()> {
        for (i, use_) in self.uses.iter_mut().enumerate().rev() {
            use_.post_use(self.backend.as_mut(), got_data)
                .map_err(|e| e.context(format!("for the parameter number {}", i + 1)))?;
        }
        Ok(())
    }

    fn dump_uses(&self) -> String {
        if self.uses.is_empty() {
            return String::new();
        }
        let values = self
            .uses
            .iter()
            .enumerate()
            .map(|(i, use_)| match use_.name() {
                Some(name) => format!(":{}={}", name, use_.dump_value()),
                None => format!(":{}={}", i + 1, use_.dump_value()),
            })
            .collect::<Vec<_>>();
        format!(" with {}", values.join(", "))
    }
}

impl Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("query", &self.query)
            .field("state", &self.state)
            .field("intos", &self.intos.len())
            .field("uses", &self.uses.len())
            .finish()
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        self.clean_up();
    }
}
