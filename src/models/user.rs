//! Actor claims carried by the bearer token

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Actor roles, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT claims. Tokens are issued by the external identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Privileged actors bypass the duplicate-type policy
    pub fn is_privileged(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_write(&self) -> Result<(), AppError> {
        if self.role >= Role::Editor {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to modify equipment".to_string()))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator rights required".to_string()))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn claims(role: Role) -> UserClaims {
        let now = chrono::Utc::now().timestamp();
        UserClaims {
            sub: format!("{}@airport", role),
            user_id: 42,
            username: format!("{}-user", role),
            role,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let token = claims(Role::Editor).create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 42);
        assert_eq!(parsed.role, Role::Editor);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_role_checks() {
        assert!(claims(Role::Viewer).require_write().is_err());
        assert!(claims(Role::Editor).require_write().is_ok());
        assert!(claims(Role::Editor).require_admin().is_err());
        assert!(claims(Role::Admin).require_admin().is_ok());
        assert!(claims(Role::Admin).is_privileged());
        assert!(!claims(Role::Editor).is_privileged());
    }
}
