pub mod lexical;
pub mod policy;
pub mod query_guards;
pub mod relations;

pub use policy::*;
pub use query_guards::*;
