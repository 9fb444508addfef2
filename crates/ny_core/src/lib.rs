pub mod error;
pub mod language;
pub mod models;
pub mod parser;
pub mod shape;
pub mod storage;
pub mod transcode;
pub mod types;
pub mod validator;

pub use error::{Error, ErrorKind, Result};
pub use language::two_letter_code_to_name;
pub use models::{CompletionOptions, LanguageModel, ModelTier};
pub use parser::{parse, FieldValue, ParsedFields};
pub use shape::{FieldKind, FieldSpec, StructuredShape};
pub use storage::ObjectStorage;
pub use transcode::{ImageFormat, Transcoder};
pub use types::{Article, ArticleChoice, NewsValueScore, PublishedImage, RelevanceDecision, Translation};
pub use validator::{validate, validate_into, FromFields, ValidatedFields};
