mod bulk;
mod named;
mod nullability;
mod prepared;
mod simple;
mod user_type;

#[cfg(not(feature = "disable-blob"))]
mod blob;
#[cfg(not(feature = "disable-describe"))]
mod dynamic_row;
#[cfg(not(feature = "disable-rowid"))]
mod rowid;
#[cfg(not(feature = "disable-transactions"))]
mod transaction;

use crate::{
    bulk::{bulk_errors, bulk_fetch, bulk_insert},
    named::named,
    nullability::nullability,
    prepared::prepared,
    simple::simple,
    user_type::user_type,
};
use log::LevelFilter;
use sluice::Session;
use std::env;

#[cfg(not(feature = "disable-blob"))]
use blob::blob;
#[cfg(not(feature = "disable-describe"))]
use dynamic_row::dynamic_row;
#[cfg(not(feature = "disable-rowid"))]
use rowid::rowid;
#[cfg(not(feature = "disable-transactions"))]
use transaction::transaction;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs the whole suite on a connected session. Every test creates and drops its own tables,
/// prefixed with `sluice_`.
pub fn execute_tests(session: &mut Session) {
    simple(session);
    nullability(session);
    bulk_insert(session);
    bulk_fetch(session);
    bulk_errors(session);
    named(session);
    prepared(session);
    user_type(session);
    #[cfg(not(feature = "disable-transactions"))]
    transaction(session);
    #[cfg(not(feature = "disable-describe"))]
    dynamic_row(session);
    #[cfg(not(feature = "disable-blob"))]
    blob(session);
    #[cfg(not(feature = "disable-rowid"))]
    rowid(session);
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
