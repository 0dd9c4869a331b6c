//! Configuration management for desk.toml
//!
//! Secrets are normally supplied through the environment; see [`Config::apply_env`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "desk.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub search: SearchConfig,
    pub servicenow: ServiceNowConfig,
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub search_depth: String,
    pub max_results: u32,
    /// Model that turns search results into step-by-step instructions
    pub summary_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceNowConfig {
    pub base_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Skip TLS verification on incident creation
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
    pub incident: IncidentDefaults,
    pub knowledge: KnowledgeDefaults,
}

/// Fixed organization identifiers sent with every incident
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IncidentDefaults {
    pub assignment_group: String,
    pub u_creator_group: String,
    pub contact_type: String,
    pub u_contact: String,
    pub caller_id: String,
    pub u_symptom: String,
    pub u_infrastructure_ci: String,
    pub state: String,
    pub impact: u8,
    pub urgency: u8,
    pub work_notes: String,
    pub comments: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeDefaults {
    pub knowledge_base: String,
    pub workflow_state: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Conversation thread used when none is given on the command line
    pub thread_id: String,
    pub max_iterations: usize,
    /// Replaces the built-in service-desk instruction
    pub system_prompt: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            api_key: None,
            search_depth: "advanced".to_string(),
            max_results: 5,
            summary_model: "gpt-4o".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for ServiceNowConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user: None,
            password: None,
            accept_invalid_certs: true,
            timeout_secs: 30,
            incident: IncidentDefaults::default(),
            knowledge: KnowledgeDefaults::default(),
        }
    }
}

impl Default for IncidentDefaults {
    fn default() -> Self {
        Self {
            assignment_group: "fe2b38b4837a02107ede20d0deaad342".to_string(),
            u_creator_group: "fe2b38b4837a02107ede20d0deaad342".to_string(),
            contact_type: "Event1".to_string(),
            u_contact: "0b2c7cf4837a02107ede20d0deaad38e".to_string(),
            caller_id: "31826bf03710200044e0bfc8bcbe5d36".to_string(),
            u_symptom: "b3a47ffcb07932002f10272c5c585dfc".to_string(),
            u_infrastructure_ci: "91ceb0f8837a02107ede20d0deaad397".to_string(),
            state: "1".to_string(),
            impact: 1,
            urgency: 1,
            work_notes: String::new(),
            comments: "comments test".to_string(),
        }
    }
}

impl Default for KnowledgeDefaults {
    fn default() -> Self {
        Self {
            knowledge_base: "a7e8a78bff0221009b20ffffffffff17".to_string(),
            workflow_state: "draft".to_string(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            thread_id: "1".to_string(),
            max_iterations: 25,
            system_prompt: None,
        }
    }
}

impl Config {
    /// Load desk.toml (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_path() {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path, without environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find desk.toml by searching current directory and parents
    pub fn find_config_path() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        for _ in 0..10 {
            let candidate = current.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Override secrets and endpoints from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    /// Override secrets and endpoints using `lookup` as the environment
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = first_set(&lookup, &["OPENAI_API_KEY"]) {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = first_set(&lookup, &["OPENAI_BASE_URL"]) {
            self.openai.base_url = v;
        }
        if let Some(v) = first_set(&lookup, &["TAVILY_API_KEY"]) {
            self.search.api_key = Some(v);
        }
        if let Some(v) = first_set(&lookup, &["servicenow_base_url", "SERVICENOW_BASE_URL"]) {
            self.servicenow.base_url = Some(v);
        }
        if let Some(v) = first_set(&lookup, &["servicenow_user", "SERVICENOW_USER"]) {
            self.servicenow.user = Some(v);
        }
        if let Some(v) = first_set(&lookup, &["servicenow_password", "SERVICENOW_PASSWORD"]) {
            self.servicenow.password = Some(v);
        }
    }
}

fn first_set(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| lookup(k))
}

/// Return a configured value or fail naming the missing setting
pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} is not set", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[openai]
model = "gpt-4o-mini"

[search]
max_results = 3

[servicenow]
base_url = "https://dev.service-now.com"
accept_invalid_certs = false

[servicenow.incident]
contact_type = "Chat"

[servicenow.knowledge]
workflow_state = "published"

[agent]
thread_id = "helpdesk"
max_iterations = 8
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.search.max_results, 3);
        assert_eq!(config.search.search_depth, "advanced");
        assert_eq!(config.servicenow.base_url.as_deref(), Some("https://dev.service-now.com"));
        assert!(!config.servicenow.accept_invalid_certs);
        assert_eq!(config.servicenow.incident.contact_type, "Chat");
        assert_eq!(config.servicenow.incident.state, "1");
        assert_eq!(config.servicenow.knowledge.workflow_state, "published");
        assert_eq!(config.agent.thread_id, "helpdesk");
        assert_eq!(config.agent.max_iterations, 8);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.agent.thread_id, "1");
        assert_eq!(config.servicenow.knowledge.knowledge_base, "a7e8a78bff0221009b20ffffffffff17");
        assert_eq!(config.servicenow.knowledge.workflow_state, "draft");
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
            ("servicenow_base_url", "https://lower.example"),
            ("SERVICENOW_BASE_URL", "https://upper.example"),
            ("SERVICENOW_USER", "admin"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.search.api_key.as_deref(), Some("tvly-test"));
        // lowercase names win, as used by existing deployments
        assert_eq!(config.servicenow.base_url.as_deref(), Some("https://lower.example"));
        assert_eq!(config.servicenow.user.as_deref(), Some("admin"));
        assert!(config.servicenow.password.is_none());
    }

    #[test]
    fn test_require_reports_missing_value() {
        let err = require(&None, "servicenow_user").unwrap_err();
        assert_eq!(err.to_string(), "servicenow_user is not set");

        let empty = Some(String::new());
        assert!(require(&empty, "servicenow_user").is_err());

        let set = Some("admin".to_string());
        assert_eq!(require(&set, "servicenow_user").unwrap(), "admin");
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let err = Config::load_from("/nonexistent/desk.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
