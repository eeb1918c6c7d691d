use crate::core::dedup::PersistencePolicy;
use crate::domain::model::WatchList;
use crate::utils::error::{Result, WatchError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "job-alert.toml";

pub const DEFAULT_SOURCE_URL: &str = "https://www.upwork.com/nx/jobs/search/?q=web%20developer";
pub const DEFAULT_ORIGIN: &str = "https://www.upwork.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_CONTAINER_SELECTOR: &str = ".up-card-section";
pub const DEFAULT_TITLE_SELECTOR: &str = r#"h3[data-test="job-title"]"#;
pub const DEFAULT_LINK_SELECTOR: &str = r#"h3[data-test="job-title"] a"#;
pub const DEFAULT_SKILL_SELECTOR: &str = r#"span[data-test="attr-item"]"#;

const MAX_TIMEOUT_SECONDS: u64 = 3_600;
const MAX_RATE_LIMIT_PERIOD_SECONDS: u64 = 7 * 24 * 3_600;
const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
const MAX_SHUTDOWN_GRACE_SECONDS: u64 = 3_600;

pub const DEFAULT_WATCHED_SKILLS: [&str; 4] = [
    "Fullstack developer",
    "Nextjs developer",
    "React developer",
    "MERN developer",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub extract: ExtractConfig,
    pub watch: WatchConfig,
    pub store: StoreConfig,
    pub mail: MailConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub origin: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub rate_limit_period_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub container: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub skill: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: Option<String>,
    pub on_persistence_error: Option<PersistencePolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub recipient: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_minutes: Option<u64>,
    pub shutdown_grace_seconds: Option<u64>,
    pub zero_result_alert_after: Option<u32>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::info!(
                "No config file at {}, using built-in defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| WatchError::ConfigValidation {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` references (e.g. `${EMAIL_PASS}`); unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| WatchError::ConfigValidation {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Environment variables win over the file: DATABASE_URL, EMAIL_USER, EMAIL_PASS, YOUR_EMAIL.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.store.database_url = Some(url);
        }
        if let Some(user) = non_empty("EMAIL_USER") {
            self.mail.username = Some(user);
        }
        if let Some(pass) = non_empty("EMAIL_PASS") {
            self.mail.password = Some(pass);
        }
        if let Some(recipient) = non_empty("YOUR_EMAIL") {
            self.mail.recipient = Some(recipient);
        }
    }

    pub fn source_url(&self) -> &str {
        self.source.url.as_deref().unwrap_or(DEFAULT_SOURCE_URL)
    }

    pub fn origin(&self) -> &str {
        self.source.origin.as_deref().unwrap_or(DEFAULT_ORIGIN)
    }

    pub fn user_agent(&self) -> &str {
        self.source.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(30))
    }

    pub fn rate_limit_period(&self) -> Duration {
        Duration::from_secs(self.source.rate_limit_period_seconds.unwrap_or(60))
    }

    pub fn container_selector(&self) -> &str {
        self.extract
            .container
            .as_deref()
            .unwrap_or(DEFAULT_CONTAINER_SELECTOR)
    }

    pub fn title_selector(&self) -> &str {
        self.extract.title.as_deref().unwrap_or(DEFAULT_TITLE_SELECTOR)
    }

    pub fn link_selector(&self) -> &str {
        self.extract.link.as_deref().unwrap_or(DEFAULT_LINK_SELECTOR)
    }

    pub fn skill_selector(&self) -> &str {
        self.extract.skill.as_deref().unwrap_or(DEFAULT_SKILL_SELECTOR)
    }

    pub fn watch_list(&self) -> WatchList {
        match &self.watch.skills {
            Some(skills) => WatchList::new(skills.iter().cloned()),
            None => WatchList::new(DEFAULT_WATCHED_SKILLS),
        }
    }

    pub fn database_url(&self) -> Option<&str> {
        self.store.database_url.as_deref()
    }

    pub fn persistence_policy(&self) -> PersistencePolicy {
        self.store.on_persistence_error.unwrap_or_default()
    }

    pub fn smtp_host(&self) -> &str {
        self.mail.smtp_host.as_deref().unwrap_or("smtp.gmail.com")
    }

    pub fn smtp_port(&self) -> u16 {
        self.mail.smtp_port.unwrap_or(587)
    }

    /// Sender address; the SMTP account itself unless overridden.
    pub fn mail_from(&self) -> Option<&str> {
        self.mail.from.as_deref().or(self.mail.username.as_deref())
    }

    pub fn mail_subject(&self) -> &str {
        self.mail.subject.as_deref().unwrap_or("New Upwork Jobs Alert")
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_minutes.unwrap_or(30).saturating_mul(60))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.schedule.shutdown_grace_seconds.unwrap_or(30))
    }

    pub fn zero_result_alert_after(&self) -> u32 {
        self.schedule.zero_result_alert_after.unwrap_or(3)
    }

    fn validate_source(&self) -> Result<()> {
        validation::validate_url("source.url", self.source_url())?;
        validation::validate_url("source.origin", self.origin())?;
        validation::validate_non_empty_string("source.user_agent", self.user_agent())?;
        validation::validate_range(
            "source.timeout_seconds",
            self.request_timeout().as_secs(),
            1,
            MAX_TIMEOUT_SECONDS,
        )?;
        validation::validate_range(
            "source.rate_limit_period_seconds",
            self.rate_limit_period().as_secs(),
            1,
            MAX_RATE_LIMIT_PERIOD_SECONDS,
        )?;
        Ok(())
    }

    fn validate_extract(&self) -> Result<()> {
        validation::validate_selector("extract.container", self.container_selector())?;
        validation::validate_selector("extract.title", self.title_selector())?;
        validation::validate_selector("extract.link", self.link_selector())?;
        validation::validate_selector("extract.skill", self.skill_selector())?;
        Ok(())
    }

    fn validate_store(&self) -> Result<()> {
        let url = validation::validate_required_field("store.database_url", &self.store.database_url)?;
        validate_resolved("store.database_url", url)
    }

    fn validate_mail(&self) -> Result<()> {
        validation::validate_non_empty_string("mail.smtp_host", self.smtp_host())?;
        validation::validate_range("mail.smtp_port", self.smtp_port(), 1, u16::MAX)?;

        let username = validation::validate_required_field("mail.username", &self.mail.username)?;
        validate_resolved("mail.username", username)?;
        let password = validation::validate_required_field("mail.password", &self.mail.password)?;
        validate_resolved("mail.password", password)?;

        let recipient = validation::validate_required_field("mail.recipient", &self.mail.recipient)?;
        validation::validate_email("mail.recipient", recipient)?;
        if let Some(from) = self.mail_from() {
            validation::validate_email("mail.from", from)?;
        }
        Ok(())
    }

    fn validate_schedule(&self) -> Result<()> {
        validation::validate_range(
            "schedule.interval_minutes",
            self.schedule.interval_minutes.unwrap_or(30),
            1,
            MAX_INTERVAL_MINUTES,
        )?;
        validation::validate_range(
            "schedule.shutdown_grace_seconds",
            self.shutdown_grace().as_secs(),
            0,
            MAX_SHUTDOWN_GRACE_SECONDS,
        )?;
        validation::validate_positive_number(
            "schedule.zero_result_alert_after",
            u64::from(self.zero_result_alert_after()),
            1,
        )?;
        Ok(())
    }
}

fn validate_resolved(field: &str, value: &str) -> Result<()> {
    validation::validate_non_empty_string(field, value)?;
    if value.contains("${") {
        return Err(WatchError::InvalidConfigValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Environment variable was not set".to_string(),
        });
    }
    Ok(())
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_source()?;
        self.validate_extract()?;
        self.validate_store()?;
        self.validate_mail()?;
        self.validate_schedule()?;
        Ok(())
    }
}
