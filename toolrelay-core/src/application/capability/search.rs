use super::{parse_input, truncate_chars};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RELATED: usize = 5;
const MAX_TOPIC_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
}

/// Instant-answer payload; only the fields we render.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "Abstract", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "Answer", default)]
    answer: Value,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<Value>,
}

#[derive(Clone)]
pub struct WebSearchTool {
    endpoint: String,
    http: Client,
}

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }

    pub fn description(&self) -> &'static str {
        "Search the web for current information. Returns a summary of search results. \
         Use this when the user asks about current events, weather, news, or anything \
         that requires up-to-date information."
    }

    pub fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query",
                },
            },
            "required": ["query"],
        })
    }

    pub async fn execute(&self, input: Value) -> String {
        let input: SearchInput = match parse_input(Self::NAME, input) {
            Ok(input) => input,
            Err(err) => return err.as_tool_result(),
        };
        debug!(query = %input.query, "web search");

        let response = match self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", input.query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return "Search timed out.".to_string(),
            Err(err) => {
                warn!(error = %err, "web search request failed");
                return format!("Search error: {err}");
            }
        };

        if !response.status().is_success() {
            return format!("Search failed: HTTP {}", response.status());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return format!("Search error: {err}"),
        };
        match serde_json::from_str::<InstantAnswer>(&body) {
            Ok(answer) => format_results(&input.query, &answer),
            Err(_) => "Search returned invalid data.".to_string(),
        }
    }
}

pub(crate) fn format_results(query: &str, data: &InstantAnswer) -> String {
    let mut parts = Vec::new();

    if !data.abstract_text.is_empty() {
        let heading = if data.heading.is_empty() {
            "Result"
        } else {
            data.heading.as_str()
        };
        parts.push(format!("**{heading}**\n{}", data.abstract_text));
        if !data.abstract_url.is_empty() {
            parts.push(format!("Source: {}", data.abstract_url));
        }
    }

    match &data.answer {
        Value::String(answer) if !answer.is_empty() => parts.push(format!("Answer: {answer}")),
        Value::Null | Value::String(_) => {}
        other => parts.push(format!("Answer: {other}")),
    }

    if parts.is_empty() {
        for topic in data
            .related_topics
            .iter()
            .filter_map(|topic| topic.get("Text").and_then(Value::as_str))
            .filter(|text| !text.is_empty())
            .take(MAX_RELATED)
        {
            let (text, _) = truncate_chars(topic, MAX_TOPIC_CHARS);
            parts.push(format!("- {text}"));
        }
    }

    if parts.is_empty() {
        return format!(
            "No instant answer found for '{query}'. Try rephrasing or ask me to run a more specific search."
        );
    }
    parts.join("\n\n")
}
