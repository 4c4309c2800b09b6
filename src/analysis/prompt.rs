//! Prompt construction and response parsing for sentiment analysis.

use crate::error::AnalysisError;
use crate::models::{Batch, CommentSentiment, Platform, PostContext, SentimentCategory};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

static FENCED_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json[ \t]*\r?\n([\s\S]*?)\r?\n[ \t]*```").expect("valid fenced json regex")
});
static JSON_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*\{[\s\S]*\}\s*\]").expect("valid json array regex"));
static CONTROL_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F]").expect("valid control char regex"));

/// System prompt for sentiment classification.
pub const SYSTEM_PROMPT: &str = r#"You are a contextual sentiment analysis agent.
Classify each comment in relation to the post it was written under.

ALLOWED SENTIMENTS (use exactly one of these six labels):
1. Supportive/Empathetic - sympathy, encouragement, compassion
2. Critical/Disapproving - disapproval, dissatisfaction, negative judgment
3. Sarcastic/Ironic - irony, sarcasm, mockery
4. Informative/Neutral - factual statements, neutral observations
5. Appreciative/Praising - admiration, gratitude, approval
6. Angry/Hostile - frustration, outrage, aggressive criticism

OUTPUT FORMAT:
- Respond with a JSON array only
- One object per comment: {"Comment": string, "Sentiment": string, "Justification": string}
- "Sentiment" must be one of the six labels above, spelled exactly
- "Justification" explains the label with reference to the post

WHEN ANALYZING, CONSIDER:
- Emotional tone and its intensity (mild, moderate, strong)
- Whether the comment is subjective or objective
- How the comment relates to the post content
- Sarcasm and irony that invert the literal meaning
- What the commenter intends: to support, criticize, or inform
"#;

/// Build the user prompt for one batch.
pub fn build_batch_prompt(context: &PostContext, batch: &Batch, language: &str) -> String {
    let comments = batch
        .comments
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}\n\nWrite every Justification in {}.\n\nComments to analyze:\n{}\n\n\
         Analyze each comment and return a JSON array of results.",
        context_section(context),
        language,
        comments
    )
}

fn context_section(context: &PostContext) -> String {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    match context.platform {
        Platform::Youtube => format!(
            "Title: {}\nDescription: {}\nCaptions: {}",
            text(&context.title),
            text(&context.description),
            text(&context.captions)
        ),
        Platform::Facebook => {
            let first_media = context.media.as_ref().and_then(|m| m.first());
            let media_field = |field: &str| {
                first_media
                    .and_then(|m| m.get(field))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            format!(
                "Post Text: {}\nPost Image: {}\nOCR: {}",
                text(&context.text),
                media_field("thumbnail"),
                media_field("ocrText")
            )
        }
        Platform::Twitter => {
            let media = context
                .media
                .iter()
                .flatten()
                .map(|m| match m {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("Text: {}\nMedia: {}", text(&context.text), media)
        }
        Platform::Instagram => format!(
            "Images: {}\nAlt: {}\nCaption: {}",
            context.images.as_deref().unwrap_or_default().join(", "),
            text(&context.alt),
            text(&context.caption)
        ),
    }
}

/// One item as the model writes it, before the label is checked.
#[derive(Debug, Deserialize)]
struct RawSentiment {
    #[serde(rename = "Comment")]
    comment: String,
    #[serde(rename = "Sentiment")]
    sentiment: String,
    #[serde(rename = "Justification", default)]
    justification: String,
}

/// Parse a model reply into sentiments.
///
/// A fenced ```json block wins over a bare array. Smart quotes are
/// straightened and control characters dropped before decoding. Both a
/// single object and an array are accepted; any unknown label fails the
/// whole reply.
pub fn parse_response(text: &str) -> Result<Vec<CommentSentiment>, AnalysisError> {
    let json_text = FENCED_JSON_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .or_else(|| JSON_ARRAY_RE.find(text))
        .map(|m| m.as_str())
        .ok_or(AnalysisError::NoJson)?;

    let json_text = json_text.replace(['\u{201C}', '\u{201D}'], "\"");
    let json_text = CONTROL_CHARS_RE.replace_all(&json_text, "");

    let value: Value = serde_json::from_str(&json_text)
        .map_err(|e| AnalysisError::InvalidJson(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => {
            return Err(AnalysisError::InvalidJson(format!(
                "expected an array or object, got {other}"
            )))
        }
    };

    items
        .into_iter()
        .map(|item| {
            let raw: RawSentiment = serde_json::from_value(item)
                .map_err(|e| AnalysisError::InvalidJson(e.to_string()))?;
            let sentiment = SentimentCategory::from_label(&raw.sentiment)
                .ok_or_else(|| AnalysisError::UnknownSentiment(raw.sentiment.clone()))?;
            Ok(CommentSentiment {
                comment: raw.comment,
                sentiment,
                justification: raw.justification,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CleanedComment;
    use serde_json::json;

    fn batch_of(texts: &[&str]) -> Batch {
        Batch {
            index: 0,
            comments: texts
                .iter()
                .enumerate()
                .map(|(i, t)| CleanedComment {
                    text: t.to_string(),
                    platform: Platform::Youtube,
                    original_index: i,
                    timestamp: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_youtube_prompt_includes_context_and_comments() {
        let mut context = PostContext::new(Platform::Youtube);
        context.title = Some("Trip vlog".to_string());
        context.captions = Some("we went to the coast".to_string());

        let prompt = build_batch_prompt(&context, &batch_of(&["love it", "meh"]), "Spanish");

        assert!(prompt.contains("Title: Trip vlog"));
        assert!(prompt.contains("Description: \n"));
        assert!(prompt.contains("Captions: we went to the coast"));
        assert!(prompt.contains("Comments to analyze:\nlove it, meh"));
        assert!(prompt.contains("Justification in Spanish"));
    }

    #[test]
    fn test_facebook_prompt_uses_first_media_item() {
        let mut context = PostContext::new(Platform::Facebook);
        context.text = Some("Grand opening".to_string());
        context.media = Some(vec![
            json!({"thumbnail": "https://cdn/1.jpg", "ocrText": "OPEN"}),
            json!({"thumbnail": "https://cdn/2.jpg"}),
        ]);

        let prompt = build_batch_prompt(&context, &batch_of(&["congrats"]), "English");

        assert!(prompt.contains("Post Text: Grand opening"));
        assert!(prompt.contains("Post Image: https://cdn/1.jpg"));
        assert!(prompt.contains("OCR: OPEN"));
        assert!(!prompt.contains("2.jpg"));
    }

    #[test]
    fn test_instagram_prompt_lists_images() {
        let mut context = PostContext::new(Platform::Instagram);
        context.images = Some(vec!["a.jpg".to_string(), "b.jpg".to_string()]);
        context.caption = Some("sunset".to_string());

        let prompt = build_batch_prompt(&context, &batch_of(&["wow"]), "English");

        assert!(prompt.contains("Images: a.jpg, b.jpg"));
        assert!(prompt.contains("Caption: sunset"));
    }

    #[test]
    fn test_parse_fenced_block() {
        let reply = "Here you go:\n```json\n[\n  {\"Comment\": \"love it\", \"Sentiment\": \"Appreciative/Praising\", \"Justification\": \"praise\"}\n]\n```\nDone.";

        let parsed = parse_response(reply).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].comment, "love it");
        assert_eq!(parsed[0].sentiment, SentimentCategory::AppreciativePraising);
        assert_eq!(parsed[0].justification, "praise");
    }

    #[test]
    fn test_parse_bare_array_with_surrounding_text() {
        let reply = r#"Sure! [{"Comment": "ok", "Sentiment": "Informative/Neutral", "Justification": "plain"}, {"Comment": "ugh", "Sentiment": "Angry/Hostile"}] hope that helps"#;

        let parsed = parse_response(reply).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].sentiment, SentimentCategory::AngryHostile);
        assert_eq!(parsed[1].justification, "");
    }

    #[test]
    fn test_parse_single_object_in_fence() {
        let reply = "```json\n{\"Comment\": \"hi\", \"Sentiment\": \"Supportive/Empathetic\", \"Justification\": \"kind\"}\n```";
        let parsed = parse_response(reply).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].sentiment, SentimentCategory::SupportiveEmpathetic);
    }

    #[test]
    fn test_parse_repairs_smart_quotes() {
        let reply = "[{\u{201C}Comment\u{201D}: \u{201C}nice\u{201D}, \u{201C}Sentiment\u{201D}: \u{201C}Appreciative/Praising\u{201D}, \u{201C}Justification\u{201D}: \u{201C}x\u{201D}}]";
        let parsed = parse_response(reply).unwrap();
        assert_eq!(parsed[0].comment, "nice");
    }

    #[test]
    fn test_parse_without_json_fails() {
        assert!(matches!(
            parse_response("I could not analyze these comments."),
            Err(AnalysisError::NoJson)
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_label() {
        let reply = r#"[{"Comment": "yay", "Sentiment": "Joyful", "Justification": ""}]"#;
        assert!(matches!(
            parse_response(reply),
            Err(AnalysisError::UnknownSentiment(label)) if label == "Joyful"
        ));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let reply = r#"[{"Comment": "no label here"}]"#;
        assert!(matches!(
            parse_response(reply),
            Err(AnalysisError::InvalidJson(_))
        ));
    }
}
