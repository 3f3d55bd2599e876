use anyhow::Result;
use std::env;

const DEFAULT_ACCESS_TTL_SECS: u64 = 60 * 60 * 2;
const DEFAULT_REFRESH_TTL_SECS: u64 = 60 * 60 * 24 * 14;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: u64,
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;

        if secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters"
            ));
        }

        let access_token_expiry = parse_secs("JWT_ACCESS_EXPIRATION", DEFAULT_ACCESS_TTL_SECS);
        let refresh_token_expiry =
            parse_secs("JWT_REFRESH_EXPIRATION", DEFAULT_REFRESH_TTL_SECS);

        if refresh_token_expiry <= access_token_expiry {
            return Err(anyhow::anyhow!(
                "JWT_REFRESH_EXPIRATION must be longer than JWT_ACCESS_EXPIRATION"
            ));
        }

        Ok(Self {
            secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

fn parse_secs(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
