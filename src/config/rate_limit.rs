use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Route groups that carry their own limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGroup {
    Auth,
    PublicRead,
    Protected,
    Admin,
}

impl RouteGroup {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auth" => Some(RouteGroup::Auth),
            "public" | "public_read" | "public-read" => Some(RouteGroup::PublicRead),
            "protected" => Some(RouteGroup::Protected),
            "admin" => Some(RouteGroup::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth: RateLimitRule,
    pub public_read: RateLimitRule,
    pub protected: RateLimitRule,
    pub admin: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth: RateLimitRule::new(5, 10),
            public_read: RateLimitRule::new(30, 60),
            protected: RateLimitRule::new(10, 20),
            admin: RateLimitRule::new(20, 40),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = parse_bool_env("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_overrides(&raw) {
                Ok(overrides) => {
                    for (group, rule) in overrides {
                        cfg.apply(group, rule);
                    }
                }
                Err(err) => {
                    tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
                }
            }
        }

        cfg
    }

    pub fn rule(&self, group: RouteGroup) -> RateLimitRule {
        match group {
            RouteGroup::Auth => self.auth,
            RouteGroup::PublicRead => self.public_read,
            RouteGroup::Protected => self.protected,
            RouteGroup::Admin => self.admin,
        }
    }

    fn apply(&mut self, group: Option<RouteGroup>, rule: RateLimitRule) {
        match group {
            None => {
                self.auth = rule;
                self.public_read = rule;
                self.protected = rule;
                self.admin = rule;
            }
            Some(RouteGroup::Auth) => self.auth = rule,
            Some(RouteGroup::PublicRead) => self.public_read = rule,
            Some(RouteGroup::Protected) => self.protected = rule,
            Some(RouteGroup::Admin) => self.admin = rule,
        }
    }
}

pub(crate) fn parse_bool_env(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Some(true),
            "0" | "false" | "no" | "n" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// `"10:20"` applies to every group (returned as `None`);
/// `"auth=5:10,admin=20:40"` targets named groups. Later entries win.
fn parse_overrides(raw: &str) -> Result<Vec<(Option<RouteGroup>, RateLimitRule)>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    if !trimmed.contains('=') {
        return Ok(vec![(None, parse_rule(trimmed)?)]);
    }

    let mut overrides = Vec::new();
    for item in trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, raw_rule) = item
            .split_once('=')
            .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
        let group = RouteGroup::parse(name).ok_or_else(|| {
            format!(
                "unknown group '{}', expected auth/public/protected/admin",
                name.trim()
            )
        })?;
        overrides.push((Some(group), parse_rule(raw_rule.trim())?));
    }

    Ok(overrides)
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second_raw, burst_raw) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

    let per_second: u64 = per_second_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second_raw.trim()))?;
    let burst_size: u32 = burst_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst_raw.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule::new(per_second, burst_size))
}
