use serde::{Deserialize, Serialize};

use crate::validator::{FromFields, ValidatedFields};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub headline: String,
    pub body: String,
    pub category: String,
    pub image_prompt: String,
    pub social_media_hook: String,
}

impl FromFields for Article {
    fn from_fields(mut fields: ValidatedFields) -> Result<Self> {
        Ok(Self {
            headline: fields.string("headline")?,
            body: fields.string("body")?,
            category: fields.string("category")?,
            image_prompt: fields.string("imagePrompt")?,
            social_media_hook: fields.string("socialMediaHook")?,
        })
    }
}

/// Translated text of an [`Article`]. The image prompt and social hook are
/// never translated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub headline: String,
    pub category: String,
    pub body: String,
}

impl Translation {
    /// Article in the target language, with the untranslated fields carried
    /// over from `original`.
    pub fn apply_to(&self, original: &Article) -> Article {
        Article {
            headline: self.headline.clone(),
            body: self.body.clone(),
            category: self.category.clone(),
            image_prompt: original.image_prompt.clone(),
            social_media_hook: original.social_media_hook.clone(),
        }
    }
}

impl FromFields for Translation {
    fn from_fields(mut fields: ValidatedFields) -> Result<Self> {
        Ok(Self {
            headline: fields.string("headline")?,
            category: fields.string("category")?,
            body: fields.string("body")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceDecision {
    pub is_related_to_sweden: bool,
}

impl FromFields for RelevanceDecision {
    fn from_fields(fields: ValidatedFields) -> Result<Self> {
        Ok(Self {
            is_related_to_sweden: fields.boolean("isRelatedToSweden")?,
        })
    }
}

/// News value on a 0 to 10 scale, 10 being the most newsworthy.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct NewsValueScore(pub f64);

impl NewsValueScore {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 10.0;

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether `value` lies on the scale. NaN never does.
    pub fn in_range(value: f64) -> bool {
        (Self::MIN..=Self::MAX).contains(&value)
    }
}

impl FromFields for NewsValueScore {
    fn from_fields(fields: ValidatedFields) -> Result<Self> {
        Ok(Self(fields.number("newsValue")?))
    }
}

/// The editor's pick among several candidate articles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleChoice {
    pub article_id: usize,
    pub social_media_hook: String,
}

impl FromFields for ArticleChoice {
    fn from_fields(mut fields: ValidatedFields) -> Result<Self> {
        let id = fields.number("articleId")?;
        if id.fract() != 0.0 || id < 0.0 {
            return Err(crate::Error::schema_violation("articleId", "non-negative integer"));
        }
        Ok(Self {
            article_id: id as usize,
            social_media_hook: fields.string("socialMediaHook")?,
        })
    }
}

/// Encoded image on its way to storage. Moved into the publisher on upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub destination_key: String,
}
