mod binders;
mod cbox;
mod extract;
mod factory;
mod rowid;
mod session;
mod statement;

use libsqlite3_sys::{sqlite3, sqlite3_errcode, sqlite3_errmsg};
use sluice_core::{Error, NativeError};
use std::{
    ffi::{CStr, c_char},
    ptr,
};

pub use binders::*;
pub(crate) use cbox::*;
pub use factory::*;
pub use rowid::*;
pub use session::*;
pub use statement::*;

pub(crate) fn error_message_from_ptr(ptr: &'_ *const c_char) -> &'_ str {
    unsafe {
        if *ptr != ptr::null() {
            CStr::from_ptr(*ptr)
                .to_str()
                .unwrap_or("Unknown error (the error message was not a valid C string)")
        } else {
            "Unknown error (could not extract the error message)"
        }
    }
}

/// Last error of the connection, as a [`NativeError`].
pub(crate) fn connection_error(connection: *mut sqlite3) -> Error {
    unsafe {
        let code = sqlite3_errcode(connection);
        let message = error_message_from_ptr(&sqlite3_errmsg(connection)).to_string();
        Error::new(NativeError::new(BACKEND_NAME, Some(code.into()), message))
    }
}
