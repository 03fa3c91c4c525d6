pub mod app;
pub mod config;
pub mod history;
pub mod message;
pub mod providers;
pub mod session;
pub mod store;
