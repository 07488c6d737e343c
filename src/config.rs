use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};

/// Front page of the community board the digest watches.
pub const COMMUNITY_URL: &str = "https://coos.kr/community";

/// The env config vars needed for one digest run, resolved once at startup.
/// A run's behaviour is fully determined by this snapshot; the environment
/// is never re-read mid-run.
#[derive(Debug, Deserialize)]
pub struct DigestConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    mail_from: Option<String>,
    pub mail_to: String,
    use_playwright: Option<String>,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl DigestConfig {
    pub fn mail_from(&self) -> &str {
        self.mail_from.as_deref().unwrap_or(&self.smtp_user)
    }

    /// USE_PLAYWRIGHT=true selects the headless-browser fetcher.
    pub fn rendered_fetch(&self) -> bool {
        self.use_playwright
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mail_from: Option<&str>, use_playwright: Option<&str>) -> DigestConfig {
        DigestConfig {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_user: "digest@example.com".to_string(),
            smtp_pass: "hunter2".to_string(),
            mail_from: mail_from.map(String::from),
            mail_to: "me@example.com".to_string(),
            use_playwright: use_playwright.map(String::from),
        }
    }

    #[test]
    fn mail_from_falls_back_to_smtp_user() {
        assert_eq!(config(None, None).mail_from(), "digest@example.com");
        assert_eq!(
            config(Some("sender@example.com"), None).mail_from(),
            "sender@example.com"
        );
    }

    #[test]
    fn use_playwright_is_case_insensitive_true() {
        assert!(!config(None, None).rendered_fetch());
        assert!(!config(None, Some("false")).rendered_fetch());
        assert!(!config(None, Some("1")).rendered_fetch());
        assert!(config(None, Some("true")).rendered_fetch());
        assert!(config(None, Some("TRUE")).rendered_fetch());
    }
}
