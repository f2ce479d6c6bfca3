use crate::{
    BACKEND_NAME, CBox, SqliteRowId, SqliteStatement, connection_error, error_message_from_ptr,
};
use libsqlite3_sys::*;
use sluice_core::{
    BlobBackend, ConnectionParameters, Context, Error, NativeError, Result, RowIdBackend,
    SessionBackend, StatementBackend, TrivialBlobBackend, parse_bool_option,
};
use std::{
    ffi::{CString, c_char, c_void},
    ptr,
    sync::Arc,
};

const OPTION_KEYS: [&str; 9] = [
    "db",
    "dbname",
    "timeout",
    "synchronous",
    "readonly",
    "nocreate",
    "shared_cache",
    "vfs",
    "foreign_keys",
];

/// Native connection, shared by the session and its statements so that it is closed only after
/// the last statement is finalized.
pub(crate) struct SqliteConnection {
    pub(crate) handle: CBox<*mut sqlite3>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SqliteOptions {
    db: String,
    timeout: Option<i32>,
    synchronous: Option<String>,
    readonly: bool,
    nocreate: bool,
    shared_cache: bool,
    vfs: Option<String>,
    foreign_keys: Option<String>,
}

impl SqliteOptions {
    fn from_parameters(parameters: &ConnectionParameters) -> Result<Self> {
        let mut result = Self::default();
        let connect_string = parameters.connect_string().trim();
        let options: Vec<(String, String)> =
            if connect_string.is_empty() || connect_string.contains('=') {
                parameters.options()?.into_iter().collect()
            } else {
                result.db = connect_string.to_string();
                OPTION_KEYS
                    .iter()
                    .filter_map(|k| parameters.option(k).map(|v| (k.to_string(), v.to_string())))
                    .collect()
            };
        for (key, value) in options {
            result.set(&key, &value)?;
        }
        if result.db.is_empty() {
            return Err(Error::msg(format!(
                "Database file name not found in \"{}\"",
                connect_string
            )));
        }
        Ok(result)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "db" | "dbname" => self.db = value.to_string(),
            "timeout" => {
                self.timeout = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid timeout value: {}", value))?,
                )
            }
            "synchronous" => self.synchronous = Some(pragma_value(key, value)?),
            "readonly" => self.readonly = parse_bool_option(key, value)?,
            "nocreate" => self.nocreate = parse_bool_option(key, value)?,
            "shared_cache" => self.shared_cache = parse_bool_option(key, value)?,
            "vfs" => self.vfs = Some(value.to_string()),
            "foreign_keys" => self.foreign_keys = Some(pragma_value(key, value)?),
            _ => log::warn!("Unknown sqlite option {}, it will be ignored", key),
        }
        Ok(())
    }

    fn flags(&self) -> i32 {
        let mut flags = if self.readonly {
            SQLITE_OPEN_READONLY
        } else if self.nocreate {
            SQLITE_OPEN_READWRITE
        } else {
            SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE
        };
        if self.shared_cache {
            flags |= SQLITE_OPEN_SHAREDCACHE;
        }
        flags | SQLITE_OPEN_URI
    }
}

fn pragma_value(key: &str, value: &str) -> Result<String> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::msg(format!(
            "Invalid value for the option {}: {}",
            key, value
        )));
    }
    Ok(value.to_string())
}

pub struct SqliteSession {
    connection: Arc<SqliteConnection>,
}

impl SqliteSession {
    /// Opens the database described by the connect string, see the crate documentation for the
    /// accepted options.
    pub fn open(parameters: &ConnectionParameters) -> Result<Self> {
        let options = SqliteOptions::from_parameters(parameters)?;
        let context = || format!("Cannot establish connection to {}", options.db);
        let db = CString::new(options.db.as_bytes()).with_context(context)?;
        let vfs = options
            .vfs
            .as_deref()
            .map(CString::new)
            .transpose()
            .with_context(context)?;
        let mut handle = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        unsafe {
            let rc = sqlite3_open_v2(
                db.as_ptr(),
                &mut *handle,
                options.flags(),
                vfs.as_ref().map_or(ptr::null(), |v| v.as_ptr()),
            );
            if rc != SQLITE_OK {
                let error = if handle.is_null() {
                    Error::msg("Could not allocate the sqlite connection")
                } else {
                    connection_error(*handle)
                };
                return Err(error.context(context()));
            }
            if let Some(timeout) = options.timeout {
                sqlite3_busy_timeout(*handle, timeout.saturating_mul(1000));
            }
        }
        let session = Self {
            connection: Arc::new(SqliteConnection { handle }),
        };
        if let Some(value) = &options.synchronous {
            session.execute(&format!("pragma synchronous = {}", value))?;
        }
        if let Some(value) = &options.foreign_keys {
            session.execute(&format!("pragma foreign_keys = {}", value))?;
        }
        log::debug!("Opened the sqlite database {}", options.db);
        Ok(session)
    }

    /// Runs statements that return no rows.
    pub fn execute(&self, query: &str) -> Result<()> {
        let sql = CString::new(query)
            .with_context(|| format!("Could not create a CString from \"{}\"", query))?;
        unsafe {
            let mut message: *mut c_char = ptr::null_mut();
            let rc = sqlite3_exec(
                *self.connection.handle,
                sql.as_ptr(),
                None,
                ptr::null_mut(),
                &mut message,
            );
            if rc != SQLITE_OK {
                let text = error_message_from_ptr(&(message as *const c_char)).to_string();
                sqlite3_free(message as *mut c_void);
                return Err(Error::new(NativeError::new(BACKEND_NAME, Some(rc.into()), text))
                    .context(format!("while executing \"{}\"", query)));
            }
        }
        Ok(())
    }
}

impl SessionBackend for SqliteSession {
    fn backend_name(&self) -> &str {
        BACKEND_NAME
    }

    fn begin(&mut self) -> Result<()> {
        self.execute("begin")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute("commit")
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute("rollback")
    }

    fn last_insert_id(&mut self, _table: &str) -> Result<Option<i64>> {
        Ok(Some(unsafe {
            sqlite3_last_insert_rowid(*self.connection.handle)
        }))
    }

    fn make_statement_backend(&mut self) -> Result<Box<dyn StatementBackend>> {
        Ok(Box::new(SqliteStatement::new(self.connection.clone())))
    }

    fn make_rowid_backend(&mut self) -> Result<Box<dyn RowIdBackend>> {
        Ok(Box::new(SqliteRowId::default()))
    }

    fn make_blob_backend(&mut self) -> Result<Box<dyn BlobBackend>> {
        Ok(Box::new(TrivialBlobBackend::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_file_name() {
        let parameters = ConnectionParameters::new("sqlite", "test.db");
        let options = SqliteOptions::from_parameters(&parameters).expect("file name only");
        assert_eq!(options.db, "test.db");
        assert!(!options.readonly);
    }

    #[test]
    fn all_options() {
        let mut parameters = ConnectionParameters::new(
            "sqlite",
            "db=':memory:' timeout=3 synchronous=off readonly=1 shared_cache=yes vfs=unix",
        );
        parameters.set_option("foreign_keys", "on");
        let options = SqliteOptions::from_parameters(&parameters).expect("valid options");
        assert_eq!(
            options,
            SqliteOptions {
                db: ":memory:".into(),
                timeout: Some(3),
                synchronous: Some("off".into()),
                readonly: true,
                nocreate: false,
                shared_cache: true,
                vfs: Some("unix".into()),
                foreign_keys: Some("on".into()),
            }
        );
        assert_eq!(
            options.flags() & SQLITE_OPEN_READONLY,
            SQLITE_OPEN_READONLY
        );
    }

    #[test]
    fn invalid_options() {
        let parameters = ConnectionParameters::new("sqlite", "db=x timeout=soon");
        assert!(SqliteOptions::from_parameters(&parameters).is_err());
        let parameters = ConnectionParameters::new("sqlite", "db=x synchronous='off; drop'");
        assert!(SqliteOptions::from_parameters(&parameters).is_err());
        let parameters = ConnectionParameters::new("sqlite", "timeout=1");
        assert!(SqliteOptions::from_parameters(&parameters).is_err());
    }
}
