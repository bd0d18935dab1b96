// Library for tests to access modules

pub mod config;
pub mod error;
pub mod logs;
pub mod models;
pub mod mux;
pub mod routes;
pub mod runtime;
pub mod server;
pub mod stats;
pub mod version;
