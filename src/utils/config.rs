use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use easy_config_store::ConfigStore;
use eyre::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::models::job::JobSource;

pub type Config = Arc<ConfigInner>;

pub fn config(path: PathBuf) -> Result<Config> {
    let config_store = ConfigStore::<ConfigInner>::read(path, "config".to_string())?;
    let mut inner = (*config_store).clone();

    inner.apply_env_overrides();

    info!("config parsing successful");
    debug!("loaded configuration:\n{}", toml::to_string_pretty(&inner)?);

    Ok(Arc::new(inner))
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigInner {
    pub search: SearchConfig,
    pub application: ApplicationConfig,
    #[serde(default)]
    pub boards: BoardsConfig,
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SearchConfig {
    pub role: String,
    pub location: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub job_types: Vec<String>,
    #[serde(default)]
    pub experience_levels: Vec<String>,
    pub min_salary: Option<u64>,
    pub max_salary: Option<u64>,
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,
    #[serde(default = "default_max_jobs_per_source")]
    pub max_jobs_per_source: usize,
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
}

impl SearchConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ApplicationConfig {
    #[serde(default)]
    pub auto_apply: bool,
    #[serde(default = "default_max_daily_applications")]
    pub max_daily_applications: usize,
    #[serde(default = "default_application_delay")]
    pub application_delay_secs: u64,
    #[serde(default = "default_skill_match_threshold")]
    pub skill_match_threshold: f64,
    pub contact: ContactConfig,
}

impl ApplicationConfig {
    pub fn application_delay(&self) -> Duration {
        Duration::from_secs(self.application_delay_secs)
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ContactConfig {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
pub struct BoardsConfig {
    pub linkedin: Option<BoardCredentials>,
    pub glassdoor: Option<BoardCredentials>,
    pub indeed: Option<BoardCredentials>,
}

impl BoardsConfig {
    pub fn credentials_for(&self, source: JobSource) -> Option<&BoardCredentials> {
        match source {
            JobSource::LinkedIn => self.linkedin.as_ref(),
            JobSource::Glassdoor => self.glassdoor.as_ref(),
            JobSource::Indeed => self.indeed.as_ref(),
            JobSource::General => None,
        }
    }

    pub fn any_configured(&self) -> bool {
        self.linkedin.is_some() || self.glassdoor.is_some() || self.indeed.is_some()
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct BoardCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,
}

impl ConfigInner {
    /// Secrets may live in the environment instead of the config file.
    fn apply_env_overrides(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("LLM_API_KEY"))
                .ok();
        }

        for (board, slot) in [
            ("LINKEDIN", &mut self.boards.linkedin),
            ("GLASSDOOR", &mut self.boards.glassdoor),
            ("INDEED", &mut self.boards.indeed),
        ] {
            if slot.is_none()
                && let (Ok(email), Ok(password)) = (
                    std::env::var(format!("{board}_EMAIL")),
                    std::env::var(format!("{board}_PASSWORD")),
                )
            {
                *slot = Some(BoardCredentials { email, password });
            }
        }
    }

    /// Logs configuration gaps. Missing secrets degrade features at runtime
    /// instead of failing the run, so this never errors.
    pub fn validate(&self) -> bool {
        let mut complete = true;

        if self.llm.api_key.is_none() {
            warn!("LLM API key not configured - postings will be analyzed with regex extraction only");
            complete = false;
        }

        if !self.boards.any_configured() {
            warn!("no job board credentials configured - credential-gated sources will be skipped");
            complete = false;
        }

        if self.application.skill_match_threshold <= 0.0
            || self.application.skill_match_threshold > 1.0
        {
            warn!(
                "skill_match_threshold {} is outside (0.0, 1.0]",
                self.application.skill_match_threshold
            );
            complete = false;
        }

        complete
    }

    /// Overwrites search settings from a named preset.
    pub fn apply_preset(&mut self, name: &str) -> Result<()> {
        let preset = preset(name)
            .ok_or_else(|| eyre::eyre!("unknown preset '{}', available: {}", name, PRESET_NAMES.join(", ")))?;

        self.search.role = preset.role.to_string();
        self.search.keywords = preset.keywords.iter().map(|s| s.to_string()).collect();
        self.search.exclude_keywords = preset
            .exclude_keywords
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.search.experience_levels = preset
            .experience_levels
            .iter()
            .map(|s| s.to_string())
            .collect();

        info!("applied '{}' preset", name);
        Ok(())
    }
}

pub struct SearchPreset {
    pub role: &'static str,
    pub keywords: &'static [&'static str],
    pub exclude_keywords: &'static [&'static str],
    pub experience_levels: &'static [&'static str],
}

const EXCLUDE_SENIOR: &[&str] = &["senior", "lead", "manager", "director"];
const ENTRY_MID: &[&str] = &["entry", "mid-level"];

pub const PRESET_NAMES: [&str; 4] = [
    "software_engineer",
    "data_scientist",
    "frontend_developer",
    "machine_learning_engineer",
];

pub fn preset(name: &str) -> Option<SearchPreset> {
    match name.to_lowercase().as_str() {
        "software_engineer" => Some(SearchPreset {
            role: "Software Engineer",
            keywords: &["python", "javascript", "react", "node.js", "full-stack"],
            exclude_keywords: EXCLUDE_SENIOR,
            experience_levels: ENTRY_MID,
        }),
        "data_scientist" => Some(SearchPreset {
            role: "Data Scientist",
            keywords: &["machine learning", "python", "sql", "statistics", "ai"],
            exclude_keywords: EXCLUDE_SENIOR,
            experience_levels: ENTRY_MID,
        }),
        "frontend_developer" => Some(SearchPreset {
            role: "Frontend Developer",
            keywords: &["react", "javascript", "typescript", "css", "html"],
            exclude_keywords: EXCLUDE_SENIOR,
            experience_levels: ENTRY_MID,
        }),
        "machine_learning_engineer" => Some(SearchPreset {
            role: "Machine Learning Engineer",
            keywords: &["machine learning", "deep learning", "tensorflow", "pytorch", "python"],
            exclude_keywords: EXCLUDE_SENIOR,
            experience_levels: ENTRY_MID,
        }),
        _ => None,
    }
}

fn default_llm_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_llm_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_jobs() -> usize {
    10
}

fn default_max_jobs_per_source() -> usize {
    50
}

fn default_search_timeout() -> u64 {
    30
}

fn default_max_daily_applications() -> usize {
    20
}

fn default_application_delay() -> u64 {
    5
}

fn default_skill_match_threshold() -> f64 {
    0.7
}

fn default_database_path() -> PathBuf {
    PathBuf::from("job_applications.db")
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("sessions")
}

impl Default for ConfigInner {
    fn default() -> Self {
        let cfg = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.default.toml",));

        toml::from_str(cfg).unwrap() // should be okay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let cfg = ConfigInner::default();
        assert_eq!(cfg.search.max_jobs, 10);
        assert_eq!(cfg.application.max_daily_applications, 20);
        assert!(!cfg.application.auto_apply);
        assert!((cfg.application.skill_match_threshold - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn preset_overrides_search_settings() {
        let mut cfg = ConfigInner::default();
        cfg.apply_preset("data_scientist").unwrap();
        assert_eq!(cfg.search.role, "Data Scientist");
        assert!(cfg.search.keywords.contains(&"statistics".to_string()));
        assert!(cfg.search.exclude_keywords.contains(&"senior".to_string()));
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let mut cfg = ConfigInner::default();
        assert!(cfg.apply_preset("quant_wizard").is_err());
    }

    #[test]
    fn no_credentials_means_none_configured() {
        let boards = BoardsConfig::default();
        assert!(!boards.any_configured());
        assert!(boards.credentials_for(JobSource::LinkedIn).is_none());
        assert!(boards.credentials_for(JobSource::General).is_none());
    }
}
