//! Request identity. Tokens are issued elsewhere; this side only verifies
//! them and trusts the owner id and role they carry.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Error;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Supervisor,
    Admin,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub owner_id: String,
    pub role: Role,
}

impl Requester {
    /// Owners see their own submissions; admins and supervisors see all.
    pub fn can_view(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id || matches!(self.role, Role::Admin | Role::Supervisor)
    }
}

pub fn verify_token(token: &str, secret: &str) -> Result<Requester, Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| Error::Unauthorized(format!("token failed: {}", e)))?;

    Ok(Requester {
        owner_id: data.claims.sub,
        role: data.claims.role,
    })
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Requester {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Unauthorized("no token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Unauthorized("expected a Bearer token".to_string()))?;

        verify_token(token.trim(), &state.config.jwt_secret)
    }
}

#[cfg(test)]
pub(crate) fn issue_token(owner_id: &str, role: Role, secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: owner_id.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_owner_and_role() {
        let token = issue_token("u42", Role::Supervisor, "s3cret");
        let requester = verify_token(&token, "s3cret").unwrap();
        assert_eq!(requester.owner_id, "u42");
        assert_eq!(requester.role, Role::Supervisor);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = issue_token("u42", Role::Student, "s3cret");
        assert!(matches!(
            verify_token(&token, "other"),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn cross_owner_reads_need_elevated_role() {
        let student = Requester {
            owner_id: "u1".into(),
            role: Role::Student,
        };
        assert!(student.can_view("u1"));
        assert!(!student.can_view("u2"));

        for role in [Role::Admin, Role::Supervisor] {
            let staff = Requester {
                owner_id: "staff".into(),
                role,
            };
            assert!(staff.can_view("u2"));
        }
    }
}
