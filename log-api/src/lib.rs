pub mod api;
pub mod config;
pub mod handlers;
pub mod prometheus;
pub mod record;
pub mod router;
pub mod server;
pub mod store;
pub mod system;
pub mod time;
