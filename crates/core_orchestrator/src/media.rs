use chrono::Local;
use core_types::{
    AudioClip, GeneratedImage, ImageRequest, ImageSize, RequestError, TranscriptionRequest,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::context::AssistantContext;

pub const MAX_IMAGES: u8 = 10;
const SLUG_LEN: usize = 40;

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum FormError {
    #[error("prompt cannot be empty")]
    EmptyPrompt,
    #[error("{0}")]
    Size(String),
    #[error("image count must be between 1 and 10, got `{0}`")]
    Count(String),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("no generated image at position {0}")]
    NoImage(usize),
    #[error("failed to store image: {0:#}")]
    Storage(anyhow::Error),
}

/// Raw values from the image prompt dialog.
#[derive(Debug, Clone, Default)]
pub struct ImageForm {
    pub prompt: String,
    pub size: String,
    pub count: String,
}

impl ImageForm {
    pub fn parse(&self) -> Result<ImageRequest, FormError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(FormError::EmptyPrompt);
        }
        let size = if self.size.trim().is_empty() {
            ImageSize::default()
        } else {
            self.size.parse::<ImageSize>().map_err(FormError::Size)?
        };
        let count = match self.count.trim().parse::<u8>() {
            Ok(count) if (1..=MAX_IMAGES).contains(&count) => count,
            _ => return Err(FormError::Count(self.count.clone())),
        };
        Ok(ImageRequest {
            prompt: prompt.to_string(),
            size,
            count,
        })
    }
}

pub struct ImageGenerator {
    ctx: AssistantContext,
    request: Option<ImageRequest>,
    images: Vec<GeneratedImage>,
}

impl ImageGenerator {
    pub fn new(ctx: AssistantContext) -> Self {
        Self {
            ctx,
            request: None,
            images: Vec::new(),
        }
    }

    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    pub async fn generate(&mut self, form: &ImageForm) -> Result<&[GeneratedImage], MediaError> {
        let request = match form.parse() {
            Ok(request) => request,
            Err(err) => {
                self.ctx.host.notice(&err.to_string(), None);
                return Err(err.into());
            }
        };
        let config = self.ctx.settings.read(|settings| settings.api_config());
        match self.ctx.api.generate_images(&config, &request).await {
            Ok(images) => {
                info!(count = images.len(), size = %request.size, "images generated");
                self.images = images;
                self.request = Some(request);
                Ok(&self.images)
            }
            Err(err) => {
                warn!(error = %err, "image generation failed");
                self.ctx
                    .host
                    .notice(&format!("Image generation failed: {err}"), None);
                Err(err.into())
            }
        }
    }

    /// Downloads one generated image into the configured folder and embeds it
    /// in the active note. Returns the vault path.
    pub async fn save(&self, index: usize) -> Result<String, MediaError> {
        let (Some(request), Some(image)) = (&self.request, self.images.get(index)) else {
            return Err(MediaError::NoImage(index));
        };
        let bytes = match self.ctx.api.fetch_image(image).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.ctx
                    .host
                    .notice(&format!("Image download failed: {err}"), None);
                return Err(err.into());
            }
        };

        let folder = self.ctx.settings.read(|settings| settings.img_folder.clone());
        let path = image_path(&folder, &request.prompt, index);
        if let Err(err) = self.ctx.host.write_binary(&path, &bytes) {
            self.ctx
                .host
                .notice(&format!("Could not save image: {err}"), None);
            return Err(MediaError::Storage(err));
        }
        if let Some(editor) = self.ctx.host.active_editor() {
            editor.replace_selection(&format!("![[{path}]]\n"));
        }
        info!(path = %path, bytes = bytes.len(), "image saved");
        Ok(path)
    }
}

fn image_path(folder: &str, prompt: &str, index: usize) -> String {
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    format!(
        "{}/{}-{stamp}-{}.png",
        folder.trim_end_matches('/'),
        slug(prompt),
        index + 1
    )
}

fn slug(prompt: &str) -> String {
    let mut out = String::new();
    for ch in prompt.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
        if out.chars().count() >= SLUG_LEN {
            break;
        }
    }
    let out = out.trim_end_matches('-');
    if out.is_empty() {
        "image".to_string()
    } else {
        out.to_string()
    }
}

/// Speech-to-text into the active note.
pub struct SpeechToText {
    ctx: AssistantContext,
}

impl SpeechToText {
    pub fn new(ctx: AssistantContext) -> Self {
        Self { ctx }
    }

    pub async fn transcribe(&self, clip: AudioClip) -> Result<String, RequestError> {
        let (config, language) = self
            .ctx
            .settings
            .read(|settings| (settings.api_config(), settings.language.clone()));
        let request = TranscriptionRequest::new(clip, &language);
        match self.ctx.api.transcribe(&config, &request).await {
            Ok(text) => {
                if let Some(editor) = self.ctx.host.active_editor() {
                    editor.replace_selection(&text);
                }
                info!(chars = text.len(), "transcription inserted");
                Ok(text)
            }
            Err(err) => {
                warn!(error = %err, "transcription failed");
                self.ctx
                    .host
                    .notice(&format!("Transcription failed: {err}"), None);
                Err(err)
            }
        }
    }
}
