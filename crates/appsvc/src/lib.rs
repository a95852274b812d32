//! App service HTTP surface and process configuration

pub mod api;
pub mod config;
