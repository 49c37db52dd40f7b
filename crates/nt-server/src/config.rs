use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub admin_user: String,
    pub admin_password: String,
    pub gemini_api_key: Option<String>,
    pub genai_model: String,
    pub genai_base_url: String,
    pub genai_timeout: Duration,
    pub paystack_public_key: String,
    pub static_dir: Option<PathBuf>,
    pub demo_codes: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("NT_PORT", "3000")
            .parse()
            .context("NT_PORT must be a port number")?;
        let timeout_secs: u64 = var("NT_GENAI_TIMEOUT_SECS", "20")
            .parse()
            .context("NT_GENAI_TIMEOUT_SECS must be a whole number of seconds")?;
        let demo_codes = match var("NT_DEMO_CODES", "true").to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => anyhow::bail!("NT_DEMO_CODES must be true or false, got {other}"),
        };

        Ok(Self {
            host: var("NT_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var("NT_DB_PATH", "numbertag.db")),
            jwt_secret: var("NT_JWT_SECRET", "dev-secret-change-me"),
            admin_user: var("NT_ADMIN_USER", "number1"),
            admin_password: var("NT_ADMIN_PASSWORD", "Admin"),
            gemini_api_key: optional("GEMINI_API_KEY"),
            genai_model: var("NT_GENAI_MODEL", nt_genai::gemini::DEFAULT_MODEL),
            genai_base_url: var("NT_GENAI_BASE_URL", nt_genai::gemini::DEFAULT_BASE_URL),
            genai_timeout: Duration::from_secs(timeout_secs),
            paystack_public_key: var("NT_PAYSTACK_PUBLIC_KEY", "pk_test_numbertag"),
            static_dir: optional("NT_STATIC_DIR").map(PathBuf::from),
            demo_codes,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr().unwrap().to_string(), "0.0.0.0:3000");
        assert_eq!(config.admin_user, "number1");
        assert_eq!(config.genai_model, "gemini-3-flash-preview");
        assert_eq!(config.genai_timeout, Duration::from_secs(20));
        assert!(config.gemini_api_key.is_none());
        assert!(config.static_dir.is_none());
        assert!(config.demo_codes);
    }

    #[test]
    fn overrides_and_bad_values() {
        let parsed = config(&[
            ("NT_PORT", "8080"),
            ("GEMINI_API_KEY", "key"),
            ("NT_DEMO_CODES", "off"),
            ("NT_STATIC_DIR", "dist"),
        ])
        .unwrap();
        assert_eq!(parsed.port, 8080);
        assert_eq!(parsed.gemini_api_key.as_deref(), Some("key"));
        assert!(!parsed.demo_codes);
        assert_eq!(parsed.static_dir, Some(PathBuf::from("dist")));

        assert!(config(&[("NT_PORT", "eighty")]).is_err());
        assert!(config(&[("NT_DEMO_CODES", "maybe")]).is_err());
    }
}
