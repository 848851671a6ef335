pub mod alarm;
pub mod auth;
pub mod executor;
pub mod install;
pub mod policy;
pub mod registry;
pub mod scheduler;
pub mod supervisor;
pub mod version;
