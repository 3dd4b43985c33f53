use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    pub leeway_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "crmserver".into(),
            audience: "crmserver-api".into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
            leeway_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        issuer: &str,
        audience: &str,
        token_type: TokenType,
        expiry: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            exp: expiry.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: token_type.as_str().to_string(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow!("Invalid user ID in claims: {e}"))
    }

    pub fn is_access_token(&self) -> bool {
        self.token_type == TokenType::Access.as_str()
    }

    pub fn is_refresh_token(&self) -> bool {
        self.token_type == TokenType::Refresh.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// HS256 token issuer/validator. Access and refresh tokens share the key
/// and are told apart by the `type` claim.
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig, secret: &str) -> Result<Self> {
        if secret.len() < 32 {
            return Err(anyhow!("JWT secret must be at least 32 characters"));
        }
        Ok(Self {
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn from_secret(secret: &str) -> Result<Self> {
        Self::new(JwtConfig::default(), secret)
    }

    pub fn generate_token_pair(&self, user_id: Uuid, email: Option<String>) -> Result<TokenPair> {
        let now = Utc::now();
        let access_expiry = now + Duration::minutes(self.config.access_token_expiry_minutes);
        let refresh_expiry = now + Duration::days(self.config.refresh_token_expiry_days);

        let mut access_claims = Claims::new(
            user_id,
            &self.config.issuer,
            &self.config.audience,
            TokenType::Access,
            access_expiry,
        );
        if let Some(email) = email {
            access_claims = access_claims.with_email(email);
        }

        let refresh_claims = Claims::new(
            user_id,
            &self.config.issuer,
            &self.config.audience,
            TokenType::Refresh,
            refresh_expiry,
        );

        let header = Header::new(Algorithm::HS256);
        let access_token = encode(&header, &access_claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to encode access token: {e}"))?;
        let refresh_token = encode(&header, &refresh_claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to encode refresh token: {e}"))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".into(),
            expires_in: self.config.access_token_expiry_minutes * 60,
            refresh_expires_in: self.config.refresh_token_expiry_days * 24 * 60 * 60,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.leeway = self.config.leeway_seconds;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let claims = self.validate_token(token)?;
        if !claims.is_access_token() {
            return Err(anyhow!("Token is not an access token"));
        }
        Ok(claims)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims> {
        let claims = self.validate_token(token)?;
        if !claims.is_refresh_token() {
            return Err(anyhow!("Token is not a refresh token"));
        }
        Ok(claims)
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_manager() -> JwtManager {
        JwtManager::from_secret("this-is-a-very-long-secret-key-for-testing-purposes-only")
            .expect("Failed to create manager")
    }

    #[test]
    fn test_generate_token_pair() {
        let manager = create_test_manager();
        let user_id = Uuid::new_v4();

        let pair = manager
            .generate_token_pair(user_id, None)
            .expect("Failed to generate");

        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_eq!(pair.token_type, "Bearer");
    }

    #[test]
    fn test_validate_access_token() {
        let manager = create_test_manager();
        let user_id = Uuid::new_v4();

        let pair = manager
            .generate_token_pair(user_id, Some("test@example.com".into()))
            .expect("Failed to generate");
        let claims = manager
            .validate_access_token(&pair.access_token)
            .expect("Validation failed");

        assert_eq!(claims.user_id().expect("Invalid user ID"), user_id);
        assert!(claims.is_access_token());
        assert_eq!(claims.email, Some("test@example.com".into()));
    }

    #[test]
    fn test_wrong_token_type() {
        let manager = create_test_manager();
        let user_id = Uuid::new_v4();

        let pair = manager
            .generate_token_pair(user_id, None)
            .expect("Failed to generate");

        assert!(manager.validate_refresh_token(&pair.access_token).is_err());
        assert!(manager.validate_access_token(&pair.refresh_token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let manager = create_test_manager();
        assert!(manager.validate_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtManager::from_secret("too-short").is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
    }
}
