use crate::{connection_error, error_message_from_ptr};
use libsqlite3_sys::*;
use sluice_core::{
    Error, LongString, Result, Value, XmlType, format_date_time, truncate_long,
};
use std::{
    ffi::{CStr, c_int},
    os::raw::{c_char, c_void},
    slice,
};

pub(crate) fn extract_value(statement: *mut sqlite3_stmt, index: c_int) -> Result<Option<Value>> {
    unsafe {
        let column_type = sqlite3_column_type(statement, index);
        Ok(Some(match column_type {
            SQLITE_NULL => return Ok(None),
            SQLITE_INTEGER => Value::Int64(sqlite3_column_int64(statement, index)),
            SQLITE_FLOAT => Value::Double(sqlite3_column_double(statement, index)),
            SQLITE_BLOB => {
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                let len = sqlite3_column_bytes(statement, index) as usize;
                if ptr.is_null() || len == 0 {
                    Value::Blob(Vec::new())
                } else {
                    Value::Blob(slice::from_raw_parts(ptr, len).to_vec())
                }
            }
            SQLITE_TEXT => {
                let ptr = sqlite3_column_text(statement, index);
                let len = sqlite3_column_bytes(statement, index) as usize;
                let bytes = if ptr.is_null() || len == 0 {
                    Vec::new()
                } else {
                    slice::from_raw_parts(ptr, len).to_vec()
                };
                Value::String(String::from_utf8(bytes).map_err(|e| {
                    Error::new(e).context(format!("Column {} is not valid UTF-8 text", index + 1))
                })?)
            }
            _ => {
                return Err(Error::msg(format!(
                    "Unexpected column type {}",
                    column_type
                )));
            }
        }))
    }
}

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> Result<String> {
    unsafe {
        let name = sqlite3_column_name(statement, index);
        if name.is_null() {
            return Err(Error::msg(format!(
                "Could not read the name of column {}",
                index + 1
            )));
        }
        Ok(CStr::from_ptr(name).to_str()?.into())
    }
}

/// Declared type of the column, `None` for expressions.
pub(crate) fn extract_decltype(statement: *mut sqlite3_stmt, index: c_int) -> Option<String> {
    unsafe {
        let decltype = sqlite3_column_decltype(statement, index);
        if decltype.is_null() {
            return None;
        }
        Some(CStr::from_ptr(decltype).to_string_lossy().into_owned())
    }
}

unsafe fn bind_text(statement: *mut sqlite3_stmt, index: c_int, text: &str) -> c_int {
    unsafe {
        sqlite3_bind_text(
            statement,
            index,
            text.as_ptr() as *const c_char,
            text.len() as c_int,
            SQLITE_TRANSIENT(),
        )
    }
}

/// Binds the value at the 1 based parameter index, `None` binds NULL.
pub(crate) fn bind_value(
    statement: *mut sqlite3_stmt,
    index: c_int,
    value: Option<&Value>,
) -> Result<()> {
    unsafe {
        let rc = match value {
            None => sqlite3_bind_null(statement, index),
            Some(Value::Char(v)) => bind_text(statement, index, v.encode_utf8(&mut [0; 4])),
            Some(Value::String(v))
            | Some(Value::LongString(LongString(v)))
            | Some(Value::XmlType(XmlType(v))) => bind_text(statement, index, v),
            Some(Value::WString(v)) => bind_text(statement, index, &v.decode()?),
            Some(Value::DateTime(v)) => bind_text(statement, index, &format_date_time(v)?),
            Some(Value::Int8(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Some(Value::UInt8(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Some(Value::Int16(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Some(Value::UInt16(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Some(Value::Int32(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Some(Value::UInt32(v)) => sqlite3_bind_int64(statement, index, *v as sqlite3_int64),
            Some(Value::Int64(v)) => sqlite3_bind_int64(statement, index, *v),
            // Stored with the same bits, read back by `reinterpret_unsigned`
            Some(Value::UInt64(v)) => sqlite3_bind_int64(statement, index, *v as sqlite3_int64),
            Some(Value::Double(v)) => sqlite3_bind_double(statement, index, *v),
            Some(Value::Blob(v)) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
        };
        if rc != SQLITE_OK {
            let query = sqlite3_sql(statement);
            let query = error_message_from_ptr(&query);
            return Err(connection_error(sqlite3_db_handle(statement)).context(format!(
                "Cannot bind parameter {} to query:\n{}",
                index,
                truncate_long!(query)
            )));
        }
        Ok(())
    }
}
