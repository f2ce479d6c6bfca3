use crate::{BACKEND_NAME, EmptyStatement, Script};
use sluice_core::{BlobBackend, Result, SessionBackend, StatementBackend, TrivialBlobBackend};
use std::sync::{Arc, Mutex, PoisonError};

pub struct EmptySession {
    script: Arc<Mutex<Script>>,
    in_transaction: bool,
}

impl EmptySession {
    pub(crate) fn new(script: Arc<Mutex<Script>>) -> Self {
        Self {
            script,
            in_transaction: false,
        }
    }

    fn record(&self, query: &str) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(query, Vec::new());
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

impl SessionBackend for EmptySession {
    fn backend_name(&self) -> &str {
        BACKEND_NAME
    }

    fn begin(&mut self) -> Result<()> {
        self.record("begin");
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.record("commit");
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.record("rollback");
        self.in_transaction = false;
        Ok(())
    }

    fn make_statement_backend(&mut self) -> Result<Box<dyn StatementBackend>> {
        Ok(Box::new(EmptyStatement::new(self.script.clone())))
    }

    fn make_blob_backend(&mut self) -> Result<Box<dyn BlobBackend>> {
        Ok(Box::new(TrivialBlobBackend::default()))
    }
}
