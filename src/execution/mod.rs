pub mod gateway;
pub mod placeholders;
pub mod postgres;

pub use gateway::*;
pub use postgres::PostgresGateway;
