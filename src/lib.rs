pub mod access;
pub mod config;
pub mod drive;
pub mod error;
pub mod handler;
pub mod resolver;
pub mod server;
