pub mod app;
pub mod auth;
pub mod routes;
pub mod static_files;
pub mod stream;

pub use app::*;
