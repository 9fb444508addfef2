//! Runs one transcription through the whole newsroom.
//!
//! `Received → RelevanceChecked → Scored → ArticleGenerated → [Translated] →
//! ImagePublished → Done`, ending early in `Rejected` or `Failed`. Translation
//! and the image branch both only need the article, so they run side by side;
//! a failure in either cancels the other.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ny_core::{
    two_letter_code_to_name, Article, ArticleChoice, Error, ErrorKind, ImageFormat, LanguageModel,
    NewsValueScore, ObjectStorage, Transcoder, Translation,
};
use ny_inference::{ArticleGenerator, Editor, NewsValueScorer, RelevanceChecker, Translator};
use ny_storage::Publisher;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::guard::CallGuard;
use crate::image::{destination_key, ImagePipeline};
use crate::transcode::DEFAULT_QUALITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    RelevanceChecked,
    Scored,
    ArticleGenerated,
    Translated,
    ImagePublished,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::RelevanceChecked => "relevance_checked",
            Stage::Scored => "scored",
            Stage::ArticleGenerated => "article_generated",
            Stage::Translated => "translated",
            Stage::ImagePublished => "image_published",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A run that could not reach `stage`.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: Error,
    /// Stages completed before the failure.
    pub reached: Vec<Stage>,
}

impl PipelineFailure {
    fn new(stage: Stage, error: Error, reached: &[Stage]) -> Self {
        warn!("❌ Pipeline failed before {}: {}", stage, error);
        Self {
            stage,
            error,
            reached: reached.to_vec(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn detail(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({}): {}", self.stage, self.kind(), self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RejectionReason {
    NotRelatedToSweden,
    LowNewsValue { score: f64, threshold: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub news_value: Option<NewsValueScore>,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub article: Article,
    pub news_value: NewsValueScore,
    pub translation: Option<Translation>,
    /// Two-letter code the translation is in.
    pub language: Option<String>,
    pub image_url: Url,
    pub stages: Vec<Stage>,
}

impl PipelineOutput {
    /// The article in the translated language when there is one, with image
    /// prompt and social hook carried over from the original.
    pub fn localized_article(&self) -> Article {
        match &self.translation {
            Some(translation) => translation.apply_to(&self.article),
            None => self.article.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Published(PipelineOutput),
    Rejected(Rejection),
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub translate_to: Option<String>,
    /// Overrides the configured minimum news value for this run.
    pub min_news_value: Option<f64>,
    pub cancellation: CancellationToken,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            translate_to: None,
            min_news_value: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl PipelineOptions {
    pub fn translate_to(mut self, language_code: impl Into<String>) -> Self {
        self.translate_to = Some(language_code.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub container: String,
    pub image_format: ImageFormat,
    pub image_quality: u8,
    /// Limit for each individual model or storage call.
    pub call_timeout: Option<Duration>,
    /// Runs scoring below this end as `Rejected`. Scores are informational when unset.
    pub min_news_value: Option<f64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            container: "nyheter".to_string(),
            image_format: ImageFormat::WebP,
            image_quality: DEFAULT_QUALITY,
            call_timeout: Some(Duration::from_secs(120)),
            min_news_value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorPick {
    pub candidates: Vec<(Article, NewsValueScore)>,
    pub choice: ArticleChoice,
}

impl EditorPick {
    pub fn chosen(&self) -> &Article {
        &self.candidates[self.choice.article_id].0
    }
}

pub struct Pipeline {
    relevance: RelevanceChecker,
    scorer: NewsValueScorer,
    generator: ArticleGenerator,
    translator: Translator,
    editor: Editor,
    image: ImagePipeline,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        storage: Arc<dyn ObjectStorage>,
        transcoder: Arc<dyn Transcoder>,
        settings: PipelineSettings,
    ) -> Self {
        let publisher = Publisher::new(storage, settings.container.clone());
        let image = ImagePipeline::new(model.clone(), transcoder, publisher)
            .with_format(settings.image_format, settings.image_quality);

        Self {
            relevance: RelevanceChecker::new(model.clone()),
            scorer: NewsValueScorer::new(model.clone()),
            generator: ArticleGenerator::new(model.clone()),
            translator: Translator::new(model.clone()),
            editor: Editor::new(model),
            image,
            settings,
        }
    }

    pub async fn run_pipeline(
        &self,
        text: &str,
        options: &PipelineOptions,
    ) -> Result<PipelineOutcome, PipelineFailure> {
        let guard = CallGuard::new(options.cancellation.clone(), self.settings.call_timeout);
        let mut stages = vec![Stage::Received];
        info!("📰 Received {} characters of transcribed text", text.len());

        // Fail on a bad language code before spending any model calls.
        if let Some(code) = &options.translate_to {
            two_letter_code_to_name(code).map_err(|e| PipelineFailure::new(Stage::Translated, e, &stages))?;
        }

        let decision = guard
            .run(self.relevance.check(text))
            .await
            .map_err(|e| PipelineFailure::new(Stage::RelevanceChecked, e, &stages))?;
        stages.push(Stage::RelevanceChecked);

        if !decision.is_related_to_sweden {
            info!("🚫 Text is not related to Sweden, skipping");
            return Ok(PipelineOutcome::Rejected(Rejection {
                reason: RejectionReason::NotRelatedToSweden,
                news_value: None,
                stages,
            }));
        }

        let news_value = guard
            .run(self.scorer.score(text))
            .await
            .map_err(|e| PipelineFailure::new(Stage::Scored, e, &stages))?;
        stages.push(Stage::Scored);
        info!("📊 News value {}/10", news_value.value());

        if let Some(threshold) = options.min_news_value.or(self.settings.min_news_value) {
            if news_value.value() < threshold {
                info!("🚫 News value below {}, skipping", threshold);
                return Ok(PipelineOutcome::Rejected(Rejection {
                    reason: RejectionReason::LowNewsValue {
                        score: news_value.value(),
                        threshold,
                    },
                    news_value: Some(news_value),
                    stages,
                }));
            }
        }

        info!("🤖 Generating article");
        let article = guard
            .run(self.generator.generate(text))
            .await
            .map_err(|e| PipelineFailure::new(Stage::ArticleGenerated, e, &stages))?;
        stages.push(Stage::ArticleGenerated);
        info!("✨ Article generated: {}", article.headline);

        let key = destination_key(&article.headline, self.image.format());
        let translation_guard = guard.child();
        let image_guard = guard.child();

        let translation_branch = async {
            let Some(code) = options.translate_to.as_deref() else {
                return Ok(None);
            };
            info!("🌍 Translating article to {}", code);
            let result = translation_guard.run(self.translator.translate(&article, code)).await;
            if result.is_err() {
                image_guard.cancel();
            }
            result.map(Some)
        };

        let image_branch = async {
            let result = self
                .image
                .generate_and_publish(&article.image_prompt, &key, &image_guard)
                .await;
            if result.is_err() {
                translation_guard.cancel();
            }
            result
        };

        let (translation, image_url) = tokio::join!(translation_branch, image_branch);

        // A branch cancelled by its sibling reports the sibling's failure.
        let translation = match (translation, &image_url) {
            (Err(Error::Cancelled), Err(_)) if !guard.is_cancelled() => None,
            (result, _) => Some(result.map_err(|e| PipelineFailure::new(Stage::Translated, e, &stages))?),
        }
        .flatten();
        if translation.is_some() {
            stages.push(Stage::Translated);
        }

        let image_url = image_url.map_err(|e| PipelineFailure::new(Stage::ImagePublished, e, &stages))?;
        stages.push(Stage::ImagePublished);
        stages.push(Stage::Done);
        info!("✅ Pipeline completed: {}", image_url);

        Ok(PipelineOutcome::Published(PipelineOutput {
            article,
            news_value,
            translation,
            language: options.translate_to.clone(),
            image_url,
            stages,
        }))
    }

    /// Write and score an article for each transcription, then let the editor
    /// choose which one to publish. Nothing is uploaded.
    pub async fn pick_best(
        &self,
        texts: &[String],
        cancellation: CancellationToken,
    ) -> Result<EditorPick, PipelineFailure> {
        let guard = CallGuard::new(cancellation, self.settings.call_timeout);
        let mut candidates = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            info!("📝 Drafting candidate {}/{}", i + 1, texts.len());
            let news_value = guard
                .run(self.scorer.score(text))
                .await
                .map_err(|e| PipelineFailure::new(Stage::Scored, e, &[]))?;
            let article = guard
                .run(self.generator.generate(text))
                .await
                .map_err(|e| PipelineFailure::new(Stage::ArticleGenerated, e, &[]))?;
            candidates.push((article, news_value));
        }

        let choice = guard
            .run(self.editor.best_article(&candidates))
            .await
            .map_err(|e| PipelineFailure::new(Stage::Done, e, &[]))?;
        info!("🏆 Editor picked candidate {}", choice.article_id);

        Ok(EditorPick { candidates, choice })
    }
}
