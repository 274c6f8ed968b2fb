pub mod api_error;
pub mod api_types;
pub mod cache;
pub mod config;
pub mod exchange;
pub mod handlers;
pub mod init;
pub mod key;
pub mod server;
pub mod service;
