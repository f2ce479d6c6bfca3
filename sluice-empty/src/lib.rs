mod binders;
mod factory;
mod script;
mod session;
mod statement;

pub use binders::*;
pub use factory::*;
pub use script::*;
pub use session::*;
pub use statement::*;
