//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Team scraped when none is given on the command line
    #[serde(default = "defaults::team")]
    pub default_team: String,

    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Target page and its WebForms control names
    #[serde(default)]
    pub site: SiteConfig,

    /// Result table interpretation
    #[serde(default)]
    pub parse: ParseConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.as_ref().display());
                config
            }
            Err(e) => {
                log::warn!(
                    "Config load failed from {:?}: {}. Using defaults.",
                    path.as_ref(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.default_team.trim().is_empty() {
            return Err(AppError::validation("default_team is empty"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        let url = Url::parse(&self.site.schedule_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "site.schedule_url must be http(s), got {}",
                url.scheme()
            )));
        }
        let controls = [
            ("site.script_manager_field", &self.site.script_manager_field),
            ("site.update_panel", &self.site.update_panel),
            ("site.go_button", &self.site.go_button),
            ("site.season_select", &self.site.season_select),
            ("site.team_select", &self.site.team_select),
            ("site.division_select", &self.site.division_select),
        ];
        for (key, value) in controls {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{key} is empty")));
            }
        }
        self.parse.offset()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_team: defaults::team(),
            http: HttpConfig::default(),
            site: SiteConfig::default(),
            parse: ParseConfig::default(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a transport failure
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each further attempt
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
        }
    }
}

/// Schedule page location and the control names its form uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "defaults::schedule_url")]
    pub schedule_url: String,

    #[serde(default = "defaults::script_manager_field")]
    pub script_manager_field: String,

    #[serde(default = "defaults::update_panel")]
    pub update_panel: String,

    #[serde(default = "defaults::go_button")]
    pub go_button: String,

    #[serde(default = "defaults::season_select")]
    pub season_select: String,

    #[serde(default = "defaults::team_select")]
    pub team_select: String,

    #[serde(default = "defaults::division_select")]
    pub division_select: String,
}

impl SiteConfig {
    /// Scheme, host and port of the schedule page, e.g. `https://example.com`.
    pub fn origin(&self) -> Result<String> {
        let url = Url::parse(&self.schedule_url)?;
        Ok(url.origin().ascii_serialization())
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            schedule_url: defaults::schedule_url(),
            script_manager_field: defaults::script_manager_field(),
            update_panel: defaults::update_panel(),
            go_button: defaults::go_button(),
            season_select: defaults::season_select(),
            team_select: defaults::team_select(),
            division_select: defaults::division_select(),
        }
    }
}

/// Result table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Attribute that marks a schedule block cell; empty means any attribute
    #[serde(default = "defaults::marker_attribute")]
    pub marker_attribute: String,

    /// UTC offset of the times printed on the page, in minutes
    #[serde(default = "defaults::utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Fail the run on an unparsable date instead of skipping the block
    #[serde(default = "defaults::strict_dates")]
    pub strict_dates: bool,
}

impl ParseConfig {
    pub fn marker_attribute(&self) -> Option<&str> {
        let attr = self.marker_attribute.trim();
        (!attr.is_empty()).then_some(attr)
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "parse.utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            marker_attribute: defaults::marker_attribute(),
            utc_offset_minutes: defaults::utc_offset_minutes(),
            strict_dates: defaults::strict_dates(),
        }
    }
}

mod defaults {
    pub fn team() -> String {
        "Megpies FC".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3770.142 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_backoff() -> u64 {
        500
    }

    // Site defaults
    pub fn schedule_url() -> String {
        "https://canlanaisl.icesports.com/BURNABY8RINKS/soccer-schedule.aspx".into()
    }
    pub fn script_manager_field() -> String {
        "ctl00$ScriptManager1".into()
    }
    pub fn update_panel() -> String {
        "ctl00$mainContent$ctl01$UpdatePanel4".into()
    }
    pub fn go_button() -> String {
        "ctl00$mainContent$ctl01$btnGoF".into()
    }
    pub fn season_select() -> String {
        "ctl00$mainContent$ctl01$ddlSeason".into()
    }
    pub fn team_select() -> String {
        "ctl00$mainContent$ctl01$ddlTeams".into()
    }
    pub fn division_select() -> String {
        "ctl00$mainContent$ctl01$ddlDivisions".into()
    }

    // Parse defaults
    pub fn marker_attribute() -> String {
        "colspan".into()
    }
    pub fn utc_offset_minutes() -> i32 {
        -8 * 60
    }
    pub fn strict_dates() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_team() {
        let mut config = Config::default();
        config.default_team = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = Config::default();
        config.site.schedule_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.site.schedule_url = "ftp://example.com/schedule.aspx".to_string();
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_offset() {
        let mut config = Config::default();
        config.parse.utc_offset_minutes = 60 * 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_team = "Lions"

[http]
timeout_secs = 5

[parse]
marker_attribute = ""
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.default_team, "Lions");
        assert_eq!(config.http.timeout_secs, 5);
        assert_eq!(config.http.max_retries, 2);
        assert_eq!(config.site.team_select, "ctl00$mainContent$ctl01$ddlTeams");
        assert_eq!(config.parse.marker_attribute(), None);
        assert!(config.parse.strict_dates);
    }

    #[test]
    fn load_or_default_reads_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "default_team = \"Lions\"\n").unwrap();
        assert_eq!(Config::load_or_default(&path).default_team, "Lions");
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(tmp.path().join("missing.toml"));
        assert_eq!(config.default_team, "Megpies FC");
    }

    #[test]
    fn site_origin_strips_path() {
        let site = SiteConfig::default();
        assert_eq!(site.origin().unwrap(), "https://canlanaisl.icesports.com");
    }

    #[test]
    fn default_offset_is_pacific_standard() {
        let offset = ParseConfig::default().offset().unwrap();
        assert_eq!(offset.local_minus_utc(), -8 * 3600);
    }
}
