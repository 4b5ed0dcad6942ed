pub mod config;
pub mod email;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod rate_limit;
pub mod routes;
pub mod slots;
pub mod state;
pub mod validation;
pub mod wal;
pub mod zoom;
