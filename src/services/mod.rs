pub mod circuit_breaker;
pub mod cinema_api;
pub mod cleanup;
pub mod registry;
