use crate::{
    BackendFactory, BackendHandle, BackendRegistry, Blob, ConnectionParameters, Error, Exchange,
    Result, RowId, SessionBackend, Statement, StatementType, Transaction, truncate_long,
};
use std::fmt::{self, Debug};

enum FactorySource {
    Loaded(BackendHandle),
    Static(&'static dyn BackendFactory),
}

impl FactorySource {
    fn factory(&self) -> &dyn BackendFactory {
        match self {
            FactorySource::Loaded(handle) => handle.factory(),
            FactorySource::Static(factory) => *factory,
        }
    }

    fn handle(&self) -> Option<BackendHandle> {
        match self {
            FactorySource::Loaded(handle) => Some(handle.clone()),
            FactorySource::Static(..) => None,
        }
    }
}

/// Connection to a database through one backend.
///
/// ```ignore
/// let mut session = Session::connect("sqlite://db=:memory:")?;
/// session.once("create table t (id integer, name text)").run()?;
/// let mut count = 0i64;
/// session.once("select count(*) from t").exchange(into(&mut count)).run()?;
/// ```
pub struct Session {
    backend: Option<Box<dyn SessionBackend>>,
    parameters: Option<ConnectionParameters>,
    last_query: String,
    uppercase_column_names: bool,
    // Keeps the backend module loaded, must be dropped last
    source: Option<FactorySource>,
}

fn not_connected() -> Error {
    let error = Error::msg("Session is not connected.");
    log::error!("{:#}", error);
    error
}

impl Session {
    /// Session not connected yet, see [`open`](Self::open).
    pub fn new() -> Self {
        Self {
            backend: None,
            parameters: None,
            last_query: String::new(),
            uppercase_column_names: false,
            source: None,
        }
    }

    /// Connects with a `backend://parameters` string, the backend is looked up in the global
    /// registry.
    pub fn connect(connection: &str) -> Result<Self> {
        Self::connect_with(BackendRegistry::global(), connection)
    }

    pub fn connect_with(registry: &BackendRegistry, connection: &str) -> Result<Self> {
        let mut session = Self::new();
        session.open_with(registry, ConnectionParameters::parse(connection)?)?;
        Ok(session)
    }

    /// Connects through a statically linked backend, the registry is not involved.
    pub fn with_factory(
        factory: &'static dyn BackendFactory,
        parameters: ConnectionParameters,
    ) -> Result<Self> {
        let mut session = Self::new();
        session.open_with_factory(factory, parameters)?;
        Ok(session)
    }

    pub fn open(&mut self, connection: &str) -> Result<()> {
        self.open_with(BackendRegistry::global(), ConnectionParameters::parse(connection)?)
    }

    pub fn open_with(
        &mut self,
        registry: &BackendRegistry,
        parameters: ConnectionParameters,
    ) -> Result<()> {
        self.ensure_not_connected()?;
        let handle = registry.get(parameters.backend_name())?;
        self.open_source(FactorySource::Loaded(handle), parameters)
    }

    pub fn open_with_factory(
        &mut self,
        factory: &'static dyn BackendFactory,
        parameters: ConnectionParameters,
    ) -> Result<()> {
        self.ensure_not_connected()?;
        self.open_source(FactorySource::Static(factory), parameters)
    }

    fn ensure_not_connected(&self) -> Result<()> {
        if self.backend.is_some() {
            let error = Error::msg("Cannot open already connected session.");
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }

    fn open_source(&mut self, source: FactorySource, parameters: ConnectionParameters) -> Result<()> {
        let result = source.factory().make_session(&parameters);
        let backend_name = parameters.backend_name().to_string();
        // Kept even on failure so that the connection can be retried with reconnect
        self.parameters = Some(parameters);
        self.source = Some(source);
        match result {
            Ok(backend) => {
                self.backend = Some(backend);
                Ok(())
            }
            Err(error) => {
                let error = error.context(format!(
                    "while connecting to the {} backend",
                    backend_name
                ));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    /// Closes the backend session, it can be opened again with [`reconnect`](Self::reconnect).
    pub fn close(&mut self) {
        self.backend = None;
    }

    pub fn reconnect(&mut self) -> Result<()> {
        if self.source.is_none() || self.parameters.is_none() {
            let error = Error::msg("Cannot reconnect without previous connection.");
            log::error!("{:#}", error);
            return Err(error);
        }
        self.close();
        let (Some(source), Some(parameters)) = (self.source.take(), self.parameters.take()) else {
            return Err(Error::msg("Cannot reconnect without previous connection."));
        };
        self.open_source(source, parameters)
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    pub fn parameters(&self) -> Option<&ConnectionParameters> {
        self.parameters.as_ref()
    }

    fn backend_mut(&mut self) -> Result<&mut dyn SessionBackend> {
        match &mut self.backend {
            Some(backend) => Ok(backend.as_mut()),
            None => Err(not_connected()),
        }
    }

    pub fn backend_name(&self) -> Result<&str> {
        match &self.backend {
            Some(backend) => Ok(backend.backend_name()),
            None => Err(not_connected()),
        }
    }

    pub fn begin(&mut self) -> Result<()> {
        self.backend_mut()?.begin()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.backend_mut()?.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.backend_mut()?.rollback()
    }

    /// Begins a transaction that is rolled back unless committed.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Transaction::new(self)
    }

    /// Fresh statement without query nor bindings.
    pub fn statement<'a>(&mut self) -> Result<Statement<'a>> {
        let uppercase_column_names = self.uppercase_column_names;
        let backend = self.backend_mut()?.make_statement_backend()?;
        let handle = self.source.as_ref().and_then(FactorySource::handle);
        Ok(Statement::new(backend, handle, uppercase_column_names))
    }

    /// Statement prepared for repeated execution, bindings are added with `exchange`.
    pub fn prepare<'a>(&mut self, query: &str) -> Result<Statement<'a>> {
        self.log_query(query);
        let mut statement = self.statement()?;
        statement.prepare(query, StatementType::RepeatableQuery)?;
        Ok(statement)
    }

    /// Stored procedure call.
    pub fn procedure<'a>(&mut self, query: &str) -> Result<Statement<'a>> {
        self.log_query(query);
        let mut statement = self.statement()?;
        statement.prepare_procedure(query)?;
        Ok(statement)
    }

    /// Query executed once with its bindings when [`Once::run`] is called.
    pub fn once<'a>(&mut self, query: impl Into<String>) -> Once<'_, 'a> {
        Once {
            session: self,
            query: query.into(),
            exchanges: Vec::new(),
        }
    }

    pub fn make_blob(&mut self) -> Result<Blob> {
        let backend = self.backend_mut()?.make_blob_backend()?;
        let handle = self.source.as_ref().and_then(FactorySource::handle);
        Ok(Blob::with_handle(backend, handle))
    }

    pub fn make_rowid(&mut self) -> Result<RowId> {
        let backend = self.backend_mut()?.make_rowid_backend()?;
        let handle = self.source.as_ref().and_then(FactorySource::handle);
        Ok(RowId::with_handle(backend, handle))
    }

    /// Last value generated for the identity column of `table`.
    pub fn last_insert_id(&mut self, table: &str) -> Result<Option<i64>> {
        self.backend_mut()?.last_insert_id(table)
    }

    pub fn last_query(&self) -> &str {
        &self.last_query
    }

    fn log_query(&mut self, query: &str) {
        log::debug!("Query: {}", truncate_long!(query));
        self.last_query = query.to_string();
    }

    /// Makes dynamic rows report column names in upper case.
    pub fn set_uppercase_column_names(&mut self, value: bool) {
        self.uppercase_column_names = value;
    }

    pub fn uppercase_column_names(&self) -> bool {
        self.uppercase_column_names
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("parameters", &self.parameters)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// One time query builder returned by [`Session::once`].
pub struct Once<'s, 'a> {
    session: &'s mut Session,
    query: String,
    exchanges: Vec<Exchange<'a>>,
}

impl<'s, 'a> Once<'s, 'a> {
    pub fn exchange(mut self, exchange: impl Into<Exchange<'a>>) -> Self {
        self.exchanges.push(exchange.into());
        self
    }

    /// Prepares and executes the query, returns whether a row was fetched.
    pub fn run(self) -> Result<bool> {
        self.session.log_query(&self.query);
        let mut statement = self.session.statement()?;
        for exchange in self.exchanges {
            statement.exchange(exchange)?;
        }
        statement.prepare(&self.query, StatementType::OneTimeQuery)?;
        statement.execute(true)
    }
}
