//! Task invokers: prompt, model call, parse, validate.
//!
//! Failures propagate untouched. Retrying a call that produced a schema
//! violation is the caller's decision, never the invoker's.

pub mod article;
pub mod editor;
pub mod news_value;
pub mod relevance;
pub mod translation;

pub use article::{remove_last_sentence, ArticleGenerator};
pub use editor::Editor;
pub use news_value::NewsValueScorer;
pub use relevance::RelevanceChecker;
pub use translation::Translator;

use ny_core::{parse, validate_into, CompletionOptions, FromFields, LanguageModel, Result};
use tracing::debug;

pub(crate) async fn invoke_structured<T: FromFields>(
    model: &dyn LanguageModel,
    system_prompt: &str,
    user_prompt: &str,
    options: CompletionOptions,
) -> Result<T> {
    debug!(
        model = model.name(),
        shape = options.expected_shape.name,
        max_tokens = options.max_tokens,
        "Requesting structured output"
    );
    let raw = model.complete_text(system_prompt, user_prompt, &options).await?;
    let fields = parse(&raw)?;
    validate_into(fields, &options.expected_shape)
}
