pub mod client;
pub mod server;

pub use client::{RegistryClient, RegistryError, RegistryRequest, spawn_registration};
pub use server::HostRegistry;
