use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::services::error::ServiceError;
use crate::types::{Role, TenantId};

/// Token claims. `sub` is the tenant id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn tenant(&self) -> Result<TenantId, ServiceError> {
        TenantId::new(self.sub).map_err(|_| ServiceError::unauthorized("token subject is not a valid tenant"))
    }

    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Password hashing and bearer-token issuing, behind one seam so the
/// account service never touches key material directly
pub trait CredentialService: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String, ServiceError>;

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable
    fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, ServiceError>;

    fn issue_token(&self, tenant: TenantId, email: &str, role: Role) -> Result<IssuedToken, ServiceError>;

    fn verify_token(&self, token: &str) -> Result<Claims, ServiceError>;
}

/// argon2 password hashes and HS256 JWTs
pub struct JwtCredentials {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: i64,
}

impl JwtCredentials {
    pub fn new(security: &SecurityConfig) -> Result<Self, ServiceError> {
        if security.jwt_secret.is_empty() {
            return Err(ServiceError::Credential("JWT secret not configured".to_string()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(security.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(security.jwt_secret.as_bytes()),
            expiry_hours: security.jwt_expiry_hours as i64,
        })
    }
}

impl CredentialService for JwtCredentials {
    fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|e| ServiceError::Credential(e.to_string()))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Credential(e.to_string()))
    }

    fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| ServiceError::Credential(e.to_string()))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    }

    fn issue_token(&self, tenant: TenantId, email: &str, role: Role) -> Result<IssuedToken, ServiceError> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiry_hours)).timestamp();
        let claims = Claims {
            sub: tenant.get(),
            email: email.to_string(),
            role: role.as_str().to_string(),
            exp,
            iat: now.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ServiceError::Credential(format!("JWT generation error: {}", e)))?;
        Ok(IssuedToken { token, expires_at: exp })
    }

    fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| ServiceError::unauthorized(format!("Invalid JWT token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(secret: &str) -> JwtCredentials {
        JwtCredentials::new(&SecurityConfig {
            jwt_secret: secret.to_string(),
            jwt_expiry_hours: 1,
            admin_emails: Vec::new(),
            account_check_secs: 0,
            enable_cors: false,
            cors_origins: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let creds = credentials("k");
        let hash = creds.hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(creds.verify_password("hunter22", &hash).unwrap());
        assert!(!creds.verify_password("hunter23", &hash).unwrap());
        assert!(creds.verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn token_round_trips_claims() {
        let creds = credentials("k");
        let issued = creds.issue_token(TenantId::new(12).unwrap(), "a@shop.com", Role::Admin).unwrap();
        let claims = creds.verify_token(&issued.token).unwrap();
        assert_eq!(claims.tenant().unwrap().get(), 12);
        assert_eq!(claims.email, "a@shop.com");
        assert_eq!(claims.role(), Role::Admin);
        assert_eq!(claims.exp, issued.expires_at);
    }

    #[test]
    fn token_signed_with_other_secret_is_unauthorized() {
        let issued = credentials("one")
            .issue_token(TenantId::new(1).unwrap(), "a@shop.com", Role::User)
            .unwrap();
        assert!(matches!(
            credentials("two").verify_token(&issued.token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(JwtCredentials::new(&SecurityConfig {
            jwt_secret: String::new(),
            jwt_expiry_hours: 1,
            admin_emails: Vec::new(),
            account_check_secs: 0,
            enable_cors: false,
            cors_origins: Vec::new(),
        })
        .is_err());
    }
}
