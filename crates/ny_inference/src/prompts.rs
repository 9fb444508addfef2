//! System personas, user messages and output shapes for every model task.

use ny_core::{FieldSpec, NewsValueScore, StructuredShape};

pub const PROMPT_JOURNALIST: &str = "You are a journalist who writes independent news articles. The news articles you write follow journalistic standards and are informative and engaging for the reader.";
pub const PROMPT_ASSISTANT: &str = "You are a helpful assistant";
pub const PROMPT_TRANSLATOR: &str = "You are an expert translator";
pub const PROMPT_EDITOR: &str = "You are a news editor who decides which story gets published next.";

pub const TEMPERATURE: f32 = 0.7;
pub const CLASSIFICATION_MAX_TOKENS: u32 = 500;
pub const ARTICLE_MAX_TOKENS: u32 = 1200;
pub const TRANSLATION_MAX_TOKENS: u32 = 1800;

const ARTICLE_BODY_INSTRUCTIONS: &str = "Write a short, informative, and simple news article without a headline and without mentioning your name. Make the article easy to read by adding paragraphs where needed. Also make the article engaging as if it's written by the best journalist in the world. Don't mention Ekot, Sveriges Radio or P4. The information is real and complete. Don't write that the article you're writing is fictional. No more information will be provided. Don't write that no more information will be provided. Write in English.";

pub fn relevance_shape() -> StructuredShape {
    StructuredShape::new(
        "informationIsRelatedToSweden",
        "Check if the information is related to Sweden or not",
    )
    .field(
        FieldSpec::boolean("isRelatedToSweden")
            .describe("Whether the information is related to Sweden or not"),
    )
}

pub fn news_value_shape() -> StructuredShape {
    StructuredShape::new("classifyNewsValue", "Classify the news value of a news article").field(
        FieldSpec::number("newsValue")
            .describe("The news value of the news article")
            .within(NewsValueScore::MIN, NewsValueScore::MAX),
    )
}

pub fn article_shape() -> StructuredShape {
    StructuredShape::new(
        "getNewsArticleInformation",
        "Gets information about the news article",
    )
    .field(
        FieldSpec::string("body")
            .describe(ARTICLE_BODY_INSTRUCTIONS)
            .non_empty(),
    )
    .field(
        FieldSpec::string("headline")
            .describe("Write a very short and engaging headline of a maximum of 8 words to hook the reader.")
            .non_empty(),
    )
    .field(
        FieldSpec::string("category")
            .describe("A single category the article can be associated with")
            .non_empty(),
    )
    .field(
        FieldSpec::string("imagePrompt")
            .describe("Description of an image to be associated with the news article. Make the description detailed. Don't make the image about a specific person. Try to be as objective as possible.")
            .non_empty(),
    )
    .field(
        FieldSpec::string("socialMediaHook")
            .describe("A short engaging facebook post with a hook for the article. The hook should start with an emoji followed by a space. No other emojis should be used.")
            .non_empty(),
    )
}

pub fn translation_shape() -> StructuredShape {
    StructuredShape::new(
        "getTranslation",
        "Translate a news article. Be very accurate in your translation.",
    )
    .field(FieldSpec::string("headline").describe("The translated headline").non_empty())
    .field(FieldSpec::string("category").describe("The translated category").non_empty())
    .field(FieldSpec::string("body").describe("The translated article").non_empty())
}

pub fn best_article_shape() -> StructuredShape {
    StructuredShape::new(
        "bestArticleToPublish",
        "The article to publish that has the highest news value and the best social media hook to engage readers",
    )
    .field(FieldSpec::number("articleId").describe("The id of the article to publish"))
    .field(
        FieldSpec::string("socialMediaHook")
            .describe("The best social media hook to use for the current article")
            .non_empty(),
    )
}

pub fn relevance_message(text: &str) -> String {
    format!(
        "INFORMATION:\n{}\nEND OF INFORMATION.\nHelp me with classifying the information above. Is the information related to Sweden or not?",
        text
    )
}

pub fn news_value_message(text: &str) -> String {
    format!(
        "ARTICLE:\n{}\nEND OF ARTICLE.\nHelp me determine the news value of the article above from a scale of 0 to 10 where 10 means the article has the highest news value possible.",
        text
    )
}

pub fn article_message(text: &str) -> String {
    format!(
        "INFORMATION: {} END OF INFORMATION.\n\nHelp me extract article information based on the information above.",
        text
    )
}

pub fn translation_message(language: &str, headline: &str, category: &str, body: &str) -> String {
    format!(
        "I require you to translate some text for me. Translate the following news article from English to {language}. Be very accurate in your translation.\n\n\
HEADLINE\n{headline}\nEND OF HEADLINE\n\n\
CATEGORY\n{category}\nEND OF CATEGORY\n\n\
ARTICLE:\n{body}\nEND OF ARTICLE"
    )
}

/// One candidate per block, numbered by its position in `candidates`.
pub fn best_article_message(candidates: &[(String, String, f64)]) -> String {
    let mut message = String::from("Here are the articles that can be published next.\n\n");
    for (id, (headline, hook, news_value)) in candidates.iter().enumerate() {
        message.push_str(&format!(
            "ARTICLE {id}\nHEADLINE: {headline}\nNEWS VALUE: {news_value}\nSOCIAL MEDIA HOOK: {hook}\nEND OF ARTICLE {id}\n\n"
        ));
    }
    message.push_str("Help me pick the article with the highest news value and write the best social media hook for it.");
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_delimit_input() {
        let message = relevance_message("Riksdagen röstade idag.");
        assert!(message.starts_with("INFORMATION:\nRiksdagen röstade idag.\nEND OF INFORMATION."));

        let message = article_message("Text");
        assert!(message.contains("INFORMATION: Text END OF INFORMATION."));
    }

    #[test]
    fn test_translation_message_blocks() {
        let message = translation_message("Swedish", "H", "C", "B");
        assert!(message.contains("from English to Swedish"));
        assert!(message.contains("HEADLINE\nH\nEND OF HEADLINE"));
        assert!(message.contains("CATEGORY\nC\nEND OF CATEGORY"));
        assert!(message.ends_with("ARTICLE:\nB\nEND OF ARTICLE"));
    }

    #[test]
    fn test_article_shape_requires_all_fields() {
        let shape = article_shape();
        let required: Vec<&str> = shape.required_fields().map(|f| f.name).collect();
        assert_eq!(
            required,
            vec!["body", "headline", "category", "imagePrompt", "socialMediaHook"]
        );
        assert!(shape.get("body").unwrap().description.contains("Don't mention Ekot"));
    }

    #[test]
    fn test_best_article_message_numbers_candidates() {
        let message = best_article_message(&[
            ("A".to_string(), "🔥 a".to_string(), 3.0),
            ("B".to_string(), "🔥 b".to_string(), 8.0),
        ]);
        assert!(message.contains("ARTICLE 0\nHEADLINE: A"));
        assert!(message.contains("ARTICLE 1\nHEADLINE: B\nNEWS VALUE: 8"));
    }
}
