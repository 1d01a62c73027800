use super::parse_input;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const MARKER_KEY: &str = "__media_send__";

/// Tool result asking the orchestrator to deliver media through the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMarker {
    pub media_url: String,
    #[serde(default)]
    pub caption: String,
}

impl MediaMarker {
    pub fn to_result(&self) -> String {
        json!({
            MARKER_KEY: true,
            "media_url": self.media_url,
            "caption": self.caption,
        })
        .to_string()
    }

    /// Recognise a marker produced by [`MediaMarker::to_result`].
    pub fn parse(result: &str) -> Option<Self> {
        let trimmed = result.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        let value: Value = serde_json::from_str(trimmed).ok()?;
        if value.get(MARKER_KEY).and_then(Value::as_bool) != Some(true) {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

#[derive(Debug, Deserialize)]
struct MediaInput {
    media_url: String,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SendMediaTool;

impl SendMediaTool {
    pub const NAME: &'static str = "send_media";

    pub fn description(&self) -> &'static str {
        "Send a media file (image, audio, video, document) to the user.\n\n\
         The media_url must be a publicly accessible HTTPS URL. An optional caption is \
         shown with the media. The media is sent to the current user automatically."
    }

    pub fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "media_url": {
                    "type": "string",
                    "description": "Public HTTPS URL of the media file",
                },
                "caption": {
                    "type": "string",
                    "description": "Optional caption text to display with the media",
                },
            },
            "required": ["media_url"],
        })
    }

    pub async fn execute(&self, input: Value) -> String {
        match parse_input::<MediaInput>(Self::NAME, input) {
            Ok(input) => MediaMarker {
                media_url: input.media_url,
                caption: input.caption.unwrap_or_default(),
            }
            .to_result(),
            Err(err) => err.as_tool_result(),
        }
    }
}
