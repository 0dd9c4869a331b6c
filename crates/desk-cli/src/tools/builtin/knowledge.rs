//! Knowledge article drafting tool

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::tools::servicenow::{ArticleOutcome, ServiceNowClient};
use crate::tools::{str_arg, ParameterProperty, ParameterSchema, Tool, ToolContext, ToolKind, ToolResult};

const CREATED: &str = "Knowledge article created";
const FAILED: &str = "Error creating KA";

/// Tool for drafting a ServiceNow knowledge article from a resolved query
pub struct CreateKnowledgeArticleTool {
    client: ServiceNowClient,
}

impl CreateKnowledgeArticleTool {
    pub fn new(client: ServiceNowClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateKnowledgeArticleTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CreateKnowledgeArticle
    }

    fn description(&self) -> &str {
        "Creates a draft knowledge article in ServiceNow based on the provided title and text."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .with_required("title", ParameterProperty::string("10 word title for the article"))
            .with_required("text", ParameterProperty::string("A very detailed knowledge article text"))
    }

    #[instrument(skip(self, args, _ctx))]
    async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<ToolResult> {
        let title = str_arg(args, "title")?;
        let text = str_arg(args, "text")?;

        match self.client.create_knowledge_article(title, text).await {
            Ok(ArticleOutcome::Created) => Ok(ToolResult::success(CREATED)),
            Ok(ArticleOutcome::Rejected { .. }) => Ok(ToolResult::error(FAILED)),
            Err(e) => {
                warn!(error = %e, "Knowledge article request failed");
                Ok(ToolResult::error(format!("{:#}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::ThreadId;
    use crate::test_support::{CannedResponse, CannedServer};
    use desk_core::config::ServiceNowConfig;
    use serde_json::json;

    fn tool(base_url: &str) -> CreateKnowledgeArticleTool {
        let config = ServiceNowConfig {
            base_url: Some(base_url.to_string()),
            user: Some("admin".to_string()),
            password: Some("secret".to_string()),
            ..ServiceNowConfig::default()
        };
        CreateKnowledgeArticleTool::new(ServiceNowClient::new(config).unwrap())
    }

    fn args() -> Value {
        json!({"title": "Reconnecting the corporate VPN", "text": "1. Quit the client\n2. Sign in again"})
    }

    #[tokio::test]
    async fn test_created_article() {
        let server = CannedServer::start(CannedResponse::new(201, r#"{"result":{"number":"KB0010001"}}"#)).await;

        let result = tool(&server.url())
            .execute(&args(), &ToolContext::new(ThreadId::default()))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.content(), "Knowledge article created");
    }

    #[tokio::test]
    async fn test_any_other_status_is_generic_error() {
        for status in [200, 400, 500] {
            let server = CannedServer::start(CannedResponse::new(status, "nope")).await;

            let result = tool(&server.url())
                .execute(&args(), &ToolContext::new(ThreadId::default()))
                .await
                .unwrap();
            assert!(!result.success);
            assert_eq!(result.content(), "Error creating KA");
        }
    }

    #[tokio::test]
    async fn test_missing_password_is_reported() {
        let config = ServiceNowConfig {
            base_url: Some("http://127.0.0.1:9".to_string()),
            user: Some("admin".to_string()),
            ..ServiceNowConfig::default()
        };
        let tool = CreateKnowledgeArticleTool::new(ServiceNowClient::new(config).unwrap());

        let result = tool
            .execute(&args(), &ToolContext::new(ThreadId::default()))
            .await
            .unwrap();
        assert_eq!(result.content(), "servicenow_password is not set");
    }
}
