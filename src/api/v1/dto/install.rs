/*
 * Responsibility
 * - install request/response DTOs
 * - validate() checks shape only; the install state is checked before it runs
 */
use serde::{Deserialize, Serialize};

pub const NAME_MAX_CHARS: usize = 64;
pub const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct CreateAdminUser {
    pub name: String,
    pub password: String,
}

impl CreateAdminUser {
    pub fn validate(&self) -> Result<(), &'static str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("name is required");
        }
        if name.chars().count() > NAME_MAX_CHARS {
            return Err("name must be <= 64 chars");
        }
        if self.password.chars().count() < PASSWORD_MIN_CHARS {
            return Err("password must be >= 8 chars");
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct InstallStatusResponse {
    pub installed: bool,
}

#[derive(Debug, Serialize)]
pub struct InstallResponse {
    pub uid: String,
    pub name: String,
}
