use anyhow::Context;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Read `key` from the environment, falling back to `default` when unset.
///
/// A value that is present but does not parse is an error: silently
/// replacing a mistyped shared-memory offset with a default would map the
/// wrong window.
pub fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(env_opt(key)?.unwrap_or(default))
}

/// Read and parse `key`, returning `None` when it is unset or empty.
pub fn env_opt<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => parse_number(raw.trim())
            .with_context(|| format!("Invalid value for {key}: {raw:?}"))
            .map(Some),
        Err(_) => Ok(None),
    }
}

/// Parses decimal or `0x`-prefixed hexadecimal input. Offsets in board
/// memory maps are usually written in hex.
fn parse_number<T>(raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        let value = u64::from_str_radix(hex, 16)?;
        return Ok(value.to_string().parse()?);
    }
    Ok(raw.parse()?)
}
