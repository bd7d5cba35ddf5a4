use crate::config::VisionConfig;
use crate::http::build_client;
use crate::llm::draft::{self, DraftOutcome};
use crate::metrics::UpstreamTimer;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are an AI assistant that generates eBay-style listings based on \
images and product details. Respond with structured JSON only.";

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Missing OpenAI API key")]
    MissingKey,
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// OpenAI chat-completions client used to draft listings from photos.
pub struct VisionClient {
    http: Client,
    config: VisionConfig,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Self {
        Self {
            http: build_client(),
            config,
        }
    }

    pub fn mock_mode(&self) -> bool {
        self.config.mock_mode
    }

    /// One completion request carrying every image URL. A reply that is not a
    /// JSON object still succeeds, as [`DraftOutcome::Fallback`].
    pub async fn generate_listing(
        &self,
        sku: &str,
        images: &[String],
    ) -> Result<DraftOutcome, VisionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(VisionError::MissingKey)?;

        let body = build_request(&self.config.model, sku, images);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let timer = UpstreamTimer::start("openai");
        let response = match self.http.post(url).bearer_auth(api_key).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                timer.finish(false);
                return Err(VisionError::Http(err.to_string()));
            }
        };

        let status = response.status();
        timer.finish(status.is_success());
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Http(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let payload: ChatCompletion = response
            .json()
            .await
            .map_err(|err| VisionError::InvalidResponse(err.to_string()))?;
        let text = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(target = "crosslist.vision", sku, chars = text.len(), "completion_received");

        Ok(draft::classify(&text))
    }
}

fn build_request(model: &str, sku: &str, images: &[String]) -> ChatRequest {
    let instruction = format!(
        "Generate a listing for product {sku}. Include title, description, category, condition, \
price, and average resale value. Reply with a JSON object with the keys title (at most 80 \
characters), description, category, condition, price and average; prices are USD amounts."
    );
    let mut parts = vec![ContentPart::Text { text: instruction }];
    parts.extend(images.iter().map(|url| ContentPart::ImageUrl {
        image_url: ImageUrl { url: url.clone() },
    }));

    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            },
        ],
        response_format: ResponseFormat {
            r#type: "json_object",
        },
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
