//! PostgreSQL connectivity shared by every question.

pub mod connection;

pub use connection::init_pool;
