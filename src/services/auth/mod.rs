pub mod access_jwt;
pub mod authorizer;
pub mod jwt;
pub mod password;

pub use access_jwt::TokenVerifier;
pub use authorizer::{Authorizer, Decision, DenyReason};
pub use jwt::JwtIssuer;
