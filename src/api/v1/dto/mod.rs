pub mod install;
pub mod user;
