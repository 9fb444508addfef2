use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ny_core::{Error, ImageFormat, LanguageModel, PublishedImage, Result, Transcoder};
use ny_storage::Publisher;
use tracing::{debug, info};
use url::Url;

use crate::guard::CallGuard;
use crate::transcode::DEFAULT_QUALITY;

/// Image generation, conversion and upload for one article.
pub struct ImagePipeline {
    model: Arc<dyn LanguageModel>,
    transcoder: Arc<dyn Transcoder>,
    publisher: Publisher,
    format: ImageFormat,
    quality: u8,
}

impl ImagePipeline {
    pub fn new(model: Arc<dyn LanguageModel>, transcoder: Arc<dyn Transcoder>, publisher: Publisher) -> Self {
        Self {
            model,
            transcoder,
            publisher,
            format: ImageFormat::WebP,
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn with_format(mut self, format: ImageFormat, quality: u8) -> Self {
        self.format = format;
        self.quality = quality;
        self
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub async fn generate_and_publish(&self, prompt: &str, destination_key: &str, guard: &CallGuard) -> Result<Url> {
        info!("🎨 Generating image");
        let payload = guard.run(self.model.generate_image(prompt)).await?;
        if payload.trim().is_empty() {
            return Err(Error::ImageGenerationFailed("Empty image payload".to_string()));
        }

        let raw = BASE64
            .decode(payload.trim())
            .map_err(|e| Error::TranscodeFailed(format!("image payload is not valid base64: {}", e)))?;
        debug!(size = raw.len(), format = %self.format, "Transcoding image");

        let transcoder = self.transcoder.clone();
        let (format, quality) = (self.format, self.quality);
        let bytes = tokio::task::spawn_blocking(move || transcoder.transcode(&raw, format, quality))
            .await
            .map_err(|e| Error::TranscodeFailed(format!("transcoder task failed: {}", e)))??;

        let image = PublishedImage {
            bytes,
            content_type: format.content_type().to_string(),
            destination_key: destination_key.to_string(),
        };
        guard.run(self.publisher.publish(image)).await
    }
}

/// `<slug-of-headline>-<8 hex chars>.<ext>`
pub fn destination_key(headline: &str, format: ImageFormat) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}.{}", slugify(headline), &id[..8], format.extension())
}

fn slugify(text: &str) -> String {
    const MAX_LEN: usize = 60;
    let mut slug = String::new();

    for c in text.to_lowercase().chars() {
        let mapped = match c {
            'å' | 'ä' | 'á' | 'à' | 'â' => Some('a'),
            'ö' | 'ø' | 'ó' | 'ò' | 'ô' => Some('o'),
            'é' | 'è' | 'ê' | 'ë' => Some('e'),
            'ü' | 'ú' | 'ù' => Some('u'),
            c if c.is_ascii_alphanumeric() => Some(c),
            _ => None,
        };
        match mapped {
            Some(c) => slug.push(c),
            None if !slug.is_empty() && !slug.ends_with('-') => slug.push('-'),
            None => {}
        }
        if slug.len() >= MAX_LEN {
            break;
        }
    }

    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "article".to_string()
    } else {
        slug.to_string()
    }
}
