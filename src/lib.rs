pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod response;
pub mod services;
pub mod state;
