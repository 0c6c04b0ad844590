//! Stratus: multi-step resource creation wizards for a cloud console.

pub mod api;
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod schemas;
pub mod services;
pub mod utils;
pub mod wizard;
