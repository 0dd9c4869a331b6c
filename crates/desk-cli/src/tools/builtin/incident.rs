//! Incident creation tool

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::tools::servicenow::{IncidentOutcome, ServiceNowClient};
use crate::tools::{str_arg, ParameterProperty, ParameterSchema, Tool, ToolContext, ToolKind, ToolResult};

/// Tool for raising a ServiceNow incident from the conversation
pub struct CreateIncidentTool {
    client: ServiceNowClient,
}

impl CreateIncidentTool {
    pub fn new(client: ServiceNowClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateIncidentTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CreateIncident
    }

    fn description(&self) -> &str {
        "Creates an incident in ServiceNow based on the provided description. \
         Returns the incident number when successful, otherwise the error message."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .with_required(
                "short_description",
                ParameterProperty::string("Short description of the incident to create in 8 words or less"),
            )
            .with_required(
                "description",
                ParameterProperty::string(
                    "A very detailed step by step description of the conversation that needs to be \
                     converted into an incident. Should be 500 words or less",
                ),
            )
    }

    #[instrument(skip(self, args, _ctx))]
    async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<ToolResult> {
        let short_description = str_arg(args, "short_description")?;
        let description = str_arg(args, "description")?;

        let outcome = match self.client.create_incident(short_description, description).await {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "Incident request failed");
                return Ok(ToolResult::error(format!("{:#}", e)));
            }
        };

        Ok(match outcome {
            IncidentOutcome::Rejected { body, .. } => ToolResult::error(body),
            created => ToolResult::success(format!("{:?}", created.ticket_pair().unwrap_or_default())),
        })
    }
}
