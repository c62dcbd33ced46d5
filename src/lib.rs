pub mod catalog;
pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod notification;
pub mod store;
pub mod utils;
