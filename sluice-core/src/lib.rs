mod backend;
mod backend_loader;
mod binding;
mod blob;
mod connection_parameters;
mod conversion;
mod error;
mod exchange;
mod exchange_traits;
mod into_type;
mod place;
mod rewrite;
mod row;
mod rowid;
mod session;
mod statement;
mod transaction;
mod use_type;
mod util;
mod value;

pub use ::anyhow::Context;
pub use backend::*;
pub use backend_loader::*;
pub use binding::*;
pub use blob::*;
pub use connection_parameters::*;
pub use conversion::*;
pub use error::*;
pub use exchange::*;
pub use exchange_traits::*;
pub use into_type::*;
pub use place::*;
pub use rewrite::*;
pub use row::*;
pub use rowid::*;
pub use session::*;
pub use statement::*;
pub use transaction::*;
pub use use_type::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
