pub mod health;
pub mod host;
pub mod install;
pub mod user;
