//! Live adapter for the `OpenAI` Images and Chat Completions APIs.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};

use crate::codec::EncodedImage;
use crate::config::PipelineSettings;
use crate::error::PipelineError;
use crate::ports::image_provider::{ImageProvider, ProviderFuture, ProviderReply, ProviderRequest};

const DESCRIBE_INSTRUCTION: &str = "Describe this image as concise, comma-separated tags for \
     anime-style generation. No sentences. 30~60 tokens.";

/// Live `OpenAI` provider.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    describe_model: String,
}

impl OpenAiProvider {
    /// Create a new provider with the given API key and pinned settings.
    #[must_use]
    pub fn new(api_key: String, settings: &PipelineSettings) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            describe_model: settings.describe_model.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base)
    }

    /// Synthesis goes out as a JSON body.
    fn synthesis(&self, prompt: &str, size: &str, quality: &str, count: u32) -> RequestBuilder {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "size": size,
            "quality": quality,
            "n": count,
        });
        self.client.post(self.endpoint("images/generations")).json(&body)
    }

    /// Edit goes out as multipart; reqwest writes the boundary header itself.
    fn edit(
        &self,
        prompt: &str,
        size: &str,
        quality: &str,
        count: u32,
        image: &EncodedImage,
    ) -> Result<RequestBuilder, PipelineError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name())
            .mime_str(&image.media_type)
            .map_err(|e| PipelineError::MalformedImageReference(e.to_string()))?;
        let form = Form::new()
            .text("model", self.model.clone())
            .text("prompt", prompt.to_string())
            .text("size", size.to_string())
            .text("quality", quality.to_string())
            .text("n", count.to_string())
            .part("image", part);
        Ok(self.client.post(self.endpoint("images/edits")).multipart(form))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<ProviderReply, PipelineError> {
        let response = builder.bearer_auth(&self.api_key).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ProviderReply { status, body })
    }
}

impl ImageProvider for OpenAiProvider {
    fn send(&self, request: &ProviderRequest) -> ProviderFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let builder = match request {
                ProviderRequest::Synthesis { ref prompt, ref size, ref quality, count } => {
                    self.synthesis(prompt, size, quality, count)
                }
                ProviderRequest::Edit { ref prompt, ref size, ref quality, count, ref image } => {
                    self.edit(prompt, size, quality, count, image)?
                }
            };
            self.execute(builder).await
        })
    }

    fn describe(&self, image: &EncodedImage) -> ProviderFuture<'_> {
        let data_url = image.to_data_url();
        Box::pin(async move {
            let body = serde_json::json!({
                "model": self.describe_model,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": DESCRIBE_INSTRUCTION },
                        { "type": "image_url", "image_url": { "url": data_url } },
                    ],
                }],
                "temperature": 0.2,
            });
            let builder = self.client.post(self.endpoint("chat/completions")).json(&body);
            self.execute(builder).await
        })
    }
}
