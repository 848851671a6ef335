/*
 * Responsibility
 * - type of the "authenticated context" visible to handlers
 * - the gate inserts it into request extensions; handlers only receive this type
 *
 * Notes
 * - token verification and policy evaluation live in services/middleware
 * - `role` is the role resolved for this request, not a token claim
 */
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthCtx {
    pub uid: String,
    pub username: String,
    pub role: String,
}

impl AuthCtx {
    pub fn new(uid: String, username: String, role: String) -> Self {
        Self {
            uid,
            username,
            role,
        }
    }
}
