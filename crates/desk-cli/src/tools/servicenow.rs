//! ServiceNow table API client for incidents and knowledge articles

use anyhow::{Context, Result};
use desk_core::config::{require, IncidentDefaults, KnowledgeDefaults, ServiceNowConfig};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const INCIDENT_PATH: &str = "/api/now/v1/table/incident";
const KNOWLEDGE_PATH: &str = "/api/now/table/kb_knowledge";

/// Outcome of an incident creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidentOutcome {
    /// `201 Created`, with the incident number assigned by ServiceNow
    Created { number: String },
    /// Any other status; `body` is the raw response text
    Rejected { status: StatusCode, body: String },
}

impl IncidentOutcome {
    /// Incident number twice: once for the ticket, once as the user's reference
    pub fn ticket_pair(&self) -> Option<(String, String)> {
        match self {
            IncidentOutcome::Created { number } => Some((number.clone(), number.clone())),
            IncidentOutcome::Rejected { .. } => None,
        }
    }
}

/// Outcome of a knowledge article creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOutcome {
    Created,
    Rejected { status: StatusCode },
}

#[derive(Debug, Serialize)]
struct IncidentRequest<'a> {
    short_description: &'a str,
    description: &'a str,
    u_creator_group: &'a str,
    contact_type: &'a str,
    u_contact: &'a str,
    u_infrastructure_ci: &'a str,
    u_symptom: &'a str,
    caller_id: &'a str,
    work_notes: &'a str,
    comments: &'a str,
    assignment_group: &'a str,
    state: &'a str,
    impact: u8,
    urgency: u8,
}

impl<'a> IncidentRequest<'a> {
    fn new(defaults: &'a IncidentDefaults, short_description: &'a str, description: &'a str) -> Self {
        Self {
            short_description,
            description,
            u_creator_group: &defaults.u_creator_group,
            contact_type: &defaults.contact_type,
            u_contact: &defaults.u_contact,
            u_infrastructure_ci: &defaults.u_infrastructure_ci,
            u_symptom: &defaults.u_symptom,
            caller_id: &defaults.caller_id,
            work_notes: &defaults.work_notes,
            comments: &defaults.comments,
            assignment_group: &defaults.assignment_group,
            state: &defaults.state,
            impact: defaults.impact,
            urgency: defaults.urgency,
        }
    }
}

#[derive(Debug, Serialize)]
struct ArticleRequest<'a> {
    short_description: &'a str,
    text: &'a str,
    kb_knowledge_base: &'a str,
    workflow_state: &'a str,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    result: CreatedRecord,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    number: String,
}

/// Credentials resolved at call time
struct Endpoint<'a> {
    base_url: &'a str,
    user: &'a str,
    password: &'a str,
}

/// ServiceNow client shared by the incident and knowledge tools
#[derive(Debug, Clone)]
pub struct ServiceNowClient {
    config: ServiceNowConfig,
    client: reqwest::Client,
    /// Used for incidents when certificate checks are disabled
    incident_client: reqwest::Client,
}

impl ServiceNowClient {
    pub fn new(config: ServiceNowConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let incident_client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            client,
            incident_client,
        })
    }

    fn endpoint(&self) -> Result<Endpoint<'_>> {
        Ok(Endpoint {
            base_url: require(&self.config.base_url, "servicenow_base_url")?.trim_end_matches('/'),
            user: require(&self.config.user, "servicenow_user")?,
            password: require(&self.config.password, "servicenow_password")?,
        })
    }

    /// Create an incident; non-201 responses are returned, not raised
    #[instrument(skip(self, description), fields(short_description = %short_description))]
    pub async fn create_incident(&self, short_description: &str, description: &str) -> Result<IncidentOutcome> {
        let endpoint = self.endpoint()?;
        let url = format!("{}{}", endpoint.base_url, INCIDENT_PATH);
        let body = IncidentRequest::new(&self.config.incident, short_description, description);

        debug!(url = %url, "Creating incident");
        let resp = self
            .incident_client
            .post(&url)
            .basic_auth(endpoint.user, Some(endpoint.password))
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .context("Incident request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read incident response")?;

        if status != StatusCode::CREATED {
            warn!(status = %status, "Incident was not created");
            return Ok(IncidentOutcome::Rejected { status, body: text });
        }

        let record: RecordResponse =
            serde_json::from_str(&text).context("Failed to parse incident response")?;
        debug!(number = %record.result.number, "Incident created");

        Ok(IncidentOutcome::Created {
            number: record.result.number,
        })
    }

    /// Create a knowledge article in the configured knowledge base
    #[instrument(skip(self, text), fields(title = %title))]
    pub async fn create_knowledge_article(&self, title: &str, text: &str) -> Result<ArticleOutcome> {
        let endpoint = self.endpoint()?;
        let url = format!("{}{}", endpoint.base_url, KNOWLEDGE_PATH);
        let knowledge: &KnowledgeDefaults = &self.config.knowledge;

        let body = ArticleRequest {
            short_description: title,
            text,
            kb_knowledge_base: &knowledge.knowledge_base,
            workflow_state: &knowledge.workflow_state,
        };

        debug!(url = %url, "Creating knowledge article");
        let resp = self
            .client
            .post(&url)
            .basic_auth(endpoint.user, Some(endpoint.password))
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .context("Knowledge article request failed")?;

        let status = resp.status();
        if status == StatusCode::CREATED {
            Ok(ArticleOutcome::Created)
        } else {
            warn!(status = %status, "Knowledge article was not created");
            Ok(ArticleOutcome::Rejected { status })
        }
    }
}
