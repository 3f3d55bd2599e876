use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static JWT_CONFIG: OnceLock<crate::config::jwt::JwtConfig> = OnceLock::new();

/// Initialize JWT config from environment. Must be called once at startup.
pub fn init_jwt_config(config: crate::config::jwt::JwtConfig) -> Result<()> {
    JWT_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("JWT config already initialized"))?;
    Ok(())
}

fn get_config() -> Result<&'static crate::config::jwt::JwtConfig> {
    JWT_CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("JWT config not initialized"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
    pub token_type: TokenKind,
}

impl Claims {
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

fn encode_token(user_id: i32, kind: TokenKind) -> Result<String> {
    let config = get_config()?;
    let now = chrono::Utc::now().timestamp() as usize;
    let ttl = match kind {
        TokenKind::Access => config.access_token_expiry,
        TokenKind::Refresh => config.refresh_token_expiry,
    };
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + ttl as usize,
        iat: now,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type: kind,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode {:?} token: {}", kind, e))
}

pub fn encode_access_token(user_id: i32) -> Result<String> {
    encode_token(user_id, TokenKind::Access)
}

pub fn encode_refresh_token(user_id: i32) -> Result<String> {
    encode_token(user_id, TokenKind::Refresh)
}

pub fn decode_jwt(token: &str) -> Result<Claims> {
    let config = get_config()?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| anyhow::anyhow!("Failed to decode JWT: {}", e))
}

/// Decode and require a specific token kind.
pub fn decode_token_of_kind(token: &str, kind: TokenKind) -> Result<Claims> {
    let claims = decode_jwt(token)?;
    if claims.token_type != kind {
        return Err(anyhow::anyhow!("Expected {:?} token", kind));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_config() {
        INIT.call_once(|| {
            std::env::set_var("JWT_SECRET", "a_very_long_secret_key_that_is_at_least_32_chars");
            let config = crate::config::jwt::JwtConfig::from_env().unwrap();
            let _ = init_jwt_config(config);
        });
    }

    #[test]
    fn access_token_round_trip() {
        ensure_config();
        let token = encode_access_token(42).unwrap();
        let claims = decode_jwt(&token).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.token_type, TokenKind::Access);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        ensure_config();
        let token = encode_refresh_token(7).unwrap();
        assert!(decode_token_of_kind(&token, TokenKind::Refresh).is_ok());
        assert!(decode_token_of_kind(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn tokens_issued_together_differ() {
        ensure_config();
        let a = encode_access_token(1).unwrap();
        let b = encode_access_token(1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_token_fails() {
        ensure_config();
        let token = encode_access_token(42).unwrap();
        let mut chars: Vec<char> = token.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(decode_jwt(&tampered).is_err());
    }

    #[test]
    fn expired_token_fails() {
        ensure_config();
        let config = get_config().unwrap();
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "42".to_string(),
            exp: now - 3600,
            iat: now - 7200,
            jti: "expired".to_string(),
            token_type: TokenKind::Access,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_jwt(&token).is_err());
    }

    #[test]
    fn mock_style_token_is_rejected() {
        ensure_config();
        assert!(decode_jwt("mock_jwt_token_1").is_err());
        assert!(decode_jwt("").is_err());
    }
}
