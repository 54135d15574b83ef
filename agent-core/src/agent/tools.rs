//! Gateway tool agent: plan with the model, run tools, summarize.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::Agent;
use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::gateway::{ToolDefinition, ToolGateway};
use crate::model::{ModelClient, ModelRequest};
use crate::observability::MetricsCollector;

/// One step of the plan the model returns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PlannedAction {
    Tool {
        name: String,
        #[serde(default = "empty_arguments")]
        arguments: Value,
    },
    Answer,
}

fn empty_arguments() -> Value {
    json!({})
}

/// Recognizes tools that deliver a message to an outside channel. Such calls are
/// held back until every data tool has run, then get their text argument filled.
///
/// A tool matches when its name contains `service` and one of `name_terms`, or its
/// description contains `service` and one of `description_terms`. Matching is
/// case-insensitive; an empty `service` disables delivery handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryMatcher {
    pub service: String,
    pub name_terms: Vec<String>,
    pub description_terms: Vec<String>,
    /// Argument that carries the message body.
    pub text_argument: String,
}

impl Default for DeliveryMatcher {
    fn default() -> Self {
        Self {
            service: "slack".to_string(),
            name_terms: vec!["post".to_string(), "message".to_string()],
            description_terms: vec!["message".to_string()],
            text_argument: "text".to_string(),
        }
    }
}

impl DeliveryMatcher {
    pub fn disabled() -> Self {
        Self {
            service: String::new(),
            ..Self::default()
        }
    }

    pub fn matches(&self, name: &str, description: Option<&str>) -> bool {
        let service = self.service.to_lowercase();
        if service.is_empty() {
            return false;
        }

        let mentions = |haystack: &str, terms: &[String]| {
            let haystack = haystack.to_lowercase();
            haystack.contains(&service) && terms.iter().any(|t| haystack.contains(&t.to_lowercase()))
        };

        mentions(name, &self.name_terms)
            || description.map_or(false, |desc| mentions(desc, &self.description_terms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub name: String,
    pub result: Value,
}

pub struct ToolAgent {
    gateway: Arc<dyn ToolGateway>,
    model: Arc<dyn ModelClient>,
    model_config: ModelConfig,
    delivery: DeliveryMatcher,
    metrics: Option<MetricsCollector>,
}

impl ToolAgent {
    pub fn new(gateway: Arc<dyn ToolGateway>, model: Arc<dyn ModelClient>, model_config: &ModelConfig) -> Self {
        Self {
            gateway,
            model,
            model_config: model_config.clone(),
            delivery: DeliveryMatcher::default(),
            metrics: None,
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryMatcher) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        if let Some(metrics) = &self.metrics {
            metrics.record_model_call();
        }
        let request = ModelRequest::prompt(prompt).with_sampling(&self.model_config);
        self.model.invoke(&request).await
    }

    async fn run_tool(&self, tools: &[ToolDefinition], name: &str, arguments: &Value) -> Value {
        let outcome = if tools.iter().any(|t| t.name == name) {
            self.gateway.call_tool(name, arguments).await
        } else {
            Err(AgentError::ToolUnavailable(name.to_string()))
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_tool_call(outcome.is_ok());
        }

        match outcome {
            Ok(result) => result,
            Err(err) => {
                crate::log_tool!(warn, name, error = %err, "Tool call failed");
                json!({"error": err.to_string()})
            }
        }
    }

    fn is_delivery(&self, tools: &[ToolDefinition], name: &str) -> bool {
        let description = tools
            .iter()
            .find(|t| t.name == name)
            .and_then(|t| t.description.as_deref());
        self.delivery.matches(name, description)
    }

    /// Run the held-back delivery calls. With no data results the user's own text
    /// is delivered unless the plan supplied one; otherwise the model writes the
    /// message from the results and it replaces any planned text.
    async fn deliver(
        &self,
        tools: &[ToolDefinition],
        prompt: &str,
        deliveries: Vec<(String, Value)>,
        outputs: &mut Vec<ToolOutput>,
    ) -> Result<()> {
        let key = self.delivery.text_argument.as_str();

        let generated = if outputs.is_empty() {
            None
        } else {
            let message = self.complete(delivery_prompt(prompt, outputs)?).await?;
            Some(message.trim().to_string())
        };

        for (name, mut arguments) in deliveries {
            if !arguments.is_object() {
                arguments = empty_arguments();
            }
            let planned = arguments
                .get(key)
                .and_then(Value::as_str)
                .map_or(false, |text| !text.is_empty());

            match &generated {
                Some(message) => arguments[key] = Value::String(message.clone()),
                None if !planned => arguments[key] = Value::String(prompt.to_string()),
                None => {}
            }

            crate::log_tool!(info, name.as_str(), "Delivering message");
            let result = self.run_tool(tools, &name, &arguments).await;
            outputs.push(ToolOutput { name, result });
        }

        Ok(())
    }
}

#[async_trait]
impl Agent for ToolAgent {
    fn name(&self) -> &'static str {
        "tools"
    }

    async fn respond(&self, _session_id: &str, prompt: &str) -> Result<String> {
        let tools = self.gateway.list_tools().await?;
        let raw_plan = self.complete(decision_prompt(&tools, prompt)?).await?;
        let actions = extract_json(&raw_plan).map(parse_plan).unwrap_or_default();

        tracing::debug!(target: "agent", tools = tools.len(), actions = actions.len(), "Planned actions");

        let mut outputs = Vec::new();
        let mut deliveries = Vec::new();
        let mut planned_tool = false;
        for action in actions {
            match action {
                PlannedAction::Tool { name, arguments } => {
                    planned_tool = true;
                    if self.is_delivery(&tools, &name) {
                        deliveries.push((name, arguments));
                        continue;
                    }
                    let result = self.run_tool(&tools, &name, &arguments).await;
                    outputs.push(ToolOutput { name, result });
                }
                // the model chose to answer before touching any tool
                PlannedAction::Answer if !planned_tool => break,
                PlannedAction::Answer => {}
            }
        }

        if !deliveries.is_empty() {
            self.deliver(&tools, prompt, deliveries, &mut outputs).await?;
        }

        if outputs.is_empty() {
            return self.complete(prompt.to_string()).await;
        }

        self.complete(summary_prompt(prompt, &outputs)?).await
    }
}

/// Pull a JSON document out of model output that may wrap it in prose: the whole
/// text first, then the outermost `[...]`, then the outermost `{...}`.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if end > start {
                if let Ok(value) = serde_json::from_str(&text[start..=end]) {
                    return Some(value);
                }
            }
        }
    }

    None
}

/// Accepts a list of actions or a single action; malformed entries are dropped.
pub fn parse_plan(value: Value) -> Vec<PlannedAction> {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(action) => Some(action),
            Err(err) => {
                tracing::warn!(target: "agent", error = %err, "Ignoring malformed plan entry");
                None
            }
        })
        .collect()
}

fn decision_prompt(tools: &[ToolDefinition], user_text: &str) -> Result<String> {
    Ok(format!(
        r#"You are an AI agent that can call tools.

AVAILABLE TOOLS:
{}

Reply with a JSON list and nothing else. Each entry is one of:
  {{"action": "tool", "name": "<exact tool name>", "arguments": {{...}}}}
  {{"action": "answer"}}

Use "answer" alone when no tool is needed.

USER INPUT:
{}"#,
        serde_json::to_string_pretty(tools)?,
        user_text
    ))
}

fn delivery_prompt(user_text: &str, outputs: &[ToolOutput]) -> Result<String> {
    Ok(format!(
        r#"Write the message that will be delivered to the user's channel.

- Use only facts from the tool results.
- Do not invent anything or leave placeholders.
- Do not include raw JSON.
- Return plain text only.

User request:
{}

Tool results:
{}"#,
        user_text,
        serde_json::to_string_pretty(outputs)?
    ))
}

fn summary_prompt(user_text: &str, outputs: &[ToolOutput]) -> Result<String> {
    Ok(format!(
        r#"Answer the user's request clearly using the tool results below.

- Do not mention tool names.
- Do not include raw JSON.
- If a tool reported an error, say what could not be done and why.
- If a message was delivered, say that it has been sent; if delivery failed, say why.
- Use past tense.

User request:
{}

Tool results:
{}"#,
        user_text,
        serde_json::to_string_pretty(outputs)?
    ))
}
