//! Quiz content fetching and validation
//!
//! Requests a full session's worth of questions for a topic in a single
//! generation call, constrained by a strict JSON response schema, then
//! validates and reshapes the flat response into [`QuizContent`].
//!
//! Validation follows the lenient profile: a response with too few
//! questions fails, a response with too many is silently truncated to
//! the required count (logged as a warning).

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::constants::{fetch, quiz};
use crate::content::{Question, QuizContent};
use crate::topic::Topic;

use super::{FetchError, GenerativeClient, ensure_credential};

/// Fetches validated quiz content from the generation service
#[derive(Debug, Clone, Default)]
pub struct ContentFetcher {
    client: GenerativeClient,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

impl ContentFetcher {
    /// Creates a fetcher against the default service URL
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher sharing an existing client
    pub fn with_client(client: GenerativeClient) -> Self {
        Self { client }
    }

    /// Fetches a validated session's worth of questions for a topic
    ///
    /// Issues exactly one request; there is no caching and no retry.
    ///
    /// # Errors
    ///
    /// * [`FetchError::InvalidCredential`]: empty credential or an
    ///   authorization rejection from the service
    /// * [`FetchError::QuotaExceeded`]: usage quota exhausted
    /// * [`FetchError::InvalidResponseFormat`]: malformed or
    ///   schema-violating response
    /// * [`FetchError::InsufficientContent`]: fewer questions generated
    ///   than a session requires
    /// * [`FetchError::Unknown`]: transport failure or any other
    ///   service error
    pub async fn fetch(&self, topic: Topic, credential: &str) -> Result<QuizContent, FetchError> {
        let credential = ensure_credential(credential)?;
        let url = self.client.endpoint(fetch::CONTENT_MODEL, "generateContent");
        let request = build_request(topic);

        tracing::debug!(topic = %topic, "requesting quiz content");

        let response: GenerateContentResponse =
            self.client.post_json(&url, credential, &request).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| FetchError::Unknown("the service returned no content".to_string()))?;

        parse_content(&text)
    }
}

/// Builds the generation request for a topic
fn build_request(topic: Topic) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![RequestContent {
            parts: vec![RequestPart {
                text: build_prompt(topic),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
        },
    }
}

/// Builds the natural-language prompt embedding the topic guidance and
/// the exact structural requirements
fn build_prompt(topic: Topic) -> String {
    format!(
        "Please generate a complete general-knowledge quiz about the topic \
         \"{topic}\".\n\
         Topic context: {guidance}\n\n\
         It is crucial that ALL questions are strictly related to \
         '{topic}' and the provided context. Do not include questions from \
         other topics.\n\n\
         Questions must be general knowledge, things most people could know \
         or deduce, avoiding excessive complexity. Keep questions and \
         explanations concise and engaging, suitable for a short, dynamic \
         video format.\n\n\
         The quiz must strictly follow this structure:\n\
         1. It must contain exactly {total} questions in total.\n\
         2. Each question must have {options} answer options, with only one \
         correct.\n\
         3. For each question, provide a brief, concise explanation (at \
         most 2-3 sentences).\n\
         4. For each question, provide an \"imagePrompt\": a short English \
         description for generating a related image (e.g. \"A colorful \
         poison dart frog in the Amazon rainforest\").\n\n\
         Return the result as a single flat array of JSON objects following \
         the provided schema.",
        topic = topic,
        guidance = topic.details().guidance,
        total = quiz::TOTAL_QUESTIONS_PER_TOPIC,
        options = quiz::OPTION_COUNT,
    )
}

/// The strict output schema attached to every content request
///
/// Every field is required; the service must return a flat array of
/// question objects.
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                },
                "correctAnswer": { "type": "STRING" },
                "explanation": { "type": "STRING" },
                "imagePrompt": { "type": "STRING" }
            },
            "required": [
                "question",
                "options",
                "correctAnswer",
                "explanation",
                "imagePrompt"
            ]
        }
    })
}

/// Parses the response text as a flat question array and assembles it
pub(crate) fn parse_content(text: &str) -> Result<QuizContent, FetchError> {
    let records: Vec<Question> = serde_json::from_str(text.trim())
        .map_err(|error| FetchError::InvalidResponseFormat(error.to_string()))?;
    assemble_content(records)
}

/// Validates a flat question list and reshapes it into session content
///
/// Applies the lenient count policy before anything else: a shortfall
/// fails, a surplus is truncated to the first
/// [`quiz::TOTAL_QUESTIONS_PER_TOPIC`] questions. Per-record validation
/// covers only the kept records, so a defective record in the discarded
/// tail cannot fail the fetch.
pub(crate) fn assemble_content(mut records: Vec<Question>) -> Result<QuizContent, FetchError> {
    if records.len() < quiz::TOTAL_QUESTIONS_PER_TOPIC {
        return Err(FetchError::InsufficientContent {
            received: records.len(),
            required: quiz::TOTAL_QUESTIONS_PER_TOPIC,
        });
    }

    if records.len() > quiz::TOTAL_QUESTIONS_PER_TOPIC {
        tracing::warn!(
            received = records.len(),
            kept = quiz::TOTAL_QUESTIONS_PER_TOPIC,
            "service generated surplus questions; truncating"
        );
        records.truncate(quiz::TOTAL_QUESTIONS_PER_TOPIC);
    }

    for record in &records {
        record
            .validate()
            .map_err(|report| FetchError::InvalidResponseFormat(report.to_string()))?;
        if record.correct_index().is_none() {
            return Err(FetchError::InvalidResponseFormat(format!(
                "the correct answer of \"{}\" is not one of its options",
                record.prompt
            )));
        }
    }

    QuizContent::from_flat(records).map_err(|_| FetchError::InternalShape)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::content::Position;

    fn record(tag: usize) -> serde_json::Value {
        serde_json::json!({
            "question": format!("Question {tag}"),
            "options": [format!("Right {tag}"), "Wrong A", "Wrong B", "Wrong C"],
            "correctAnswer": format!("Right {tag}"),
            "explanation": format!("Explanation {tag}"),
            "imagePrompt": format!("Image prompt {tag}"),
        })
    }

    fn response_text(count: usize) -> String {
        let records: Vec<_> = (0..count).map(record).collect();
        serde_json::to_string(&records).unwrap()
    }

    #[test]
    fn test_parse_exact_count() {
        let content = parse_content(&response_text(quiz::TOTAL_QUESTIONS_PER_TOPIC)).unwrap();
        assert_eq!(content.sets().len(), quiz::SETS_PER_TOPIC);
        assert_eq!(content.total_questions(), quiz::TOTAL_QUESTIONS_PER_TOPIC);
    }

    #[test]
    fn test_parse_surplus_truncates_to_first_ten() {
        let content = parse_content(&response_text(13)).unwrap();
        assert_eq!(content.total_questions(), quiz::TOTAL_QUESTIONS_PER_TOPIC);

        // The first TOTAL questions are kept, in order.
        let first = content.question(Position::START).unwrap();
        assert_eq!(first.prompt, "Question 0");
        let last = content
            .question(Position {
                set: 1,
                question: 4,
            })
            .unwrap();
        assert_eq!(last.prompt, "Question 9");
    }

    #[test]
    fn test_defective_surplus_record_is_truncated_away() {
        // Record 11 falls in the discarded tail; its defect must not
        // fail the fetch.
        let mut records: Vec<_> = (0..12).map(record).collect();
        records[10]["correctAnswer"] = serde_json::json!("Nowhere to be found");
        let text = serde_json::to_string(&records).unwrap();

        let content = parse_content(&text).unwrap();
        assert_eq!(content.total_questions(), quiz::TOTAL_QUESTIONS_PER_TOPIC);
        let last = content
            .question(Position {
                set: 1,
                question: 4,
            })
            .unwrap();
        assert_eq!(last.prompt, "Question 9");
    }

    #[test]
    fn test_parse_shortfall_fails() {
        let error = parse_content(&response_text(7)).unwrap_err();
        assert_eq!(
            error,
            FetchError::InsufficientContent {
                received: 7,
                required: quiz::TOTAL_QUESTIONS_PER_TOPIC,
            }
        );
    }

    #[test]
    fn test_parse_malformed_json() {
        let error = parse_content("not json at all").unwrap_err();
        assert!(matches!(error, FetchError::InvalidResponseFormat(_)));
    }

    #[test]
    fn test_parse_wrong_shape_json() {
        let error = parse_content(r#"{"question": "not an array"}"#).unwrap_err();
        assert!(matches!(error, FetchError::InvalidResponseFormat(_)));
    }

    #[test]
    fn test_correct_answer_outside_options_rejected() {
        let mut records: Vec<_> = (0..quiz::TOTAL_QUESTIONS_PER_TOPIC).map(record).collect();
        records[3]["correctAnswer"] = serde_json::json!("Nowhere to be found");
        let text = serde_json::to_string(&records).unwrap();

        let error = parse_content(&text).unwrap_err();
        assert!(matches!(error, FetchError::InvalidResponseFormat(_)));
    }

    #[test]
    fn test_wrong_option_count_rejected() {
        let mut records: Vec<_> = (0..quiz::TOTAL_QUESTIONS_PER_TOPIC).map(record).collect();
        records[0]["options"] = serde_json::json!(["Only", "Three", "Options"]);
        let text = serde_json::to_string(&records).unwrap();

        let error = parse_content(&text).unwrap_err();
        assert!(matches!(error, FetchError::InvalidResponseFormat(_)));
    }

    #[test]
    fn test_prompt_embeds_guidance_and_counts() {
        let prompt = build_prompt(Topic::Geography);
        assert!(prompt.contains("World Geography"));
        assert!(prompt.contains(Topic::Geography.details().guidance));
        assert!(prompt.contains("exactly 10 questions"));
        assert!(prompt.contains("4 answer options"));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = response_schema();
        let required = schema["items"]["required"].as_array().unwrap();
        for field in [
            "question",
            "options",
            "correctAnswer",
            "explanation",
            "imagePrompt",
        ] {
            assert!(required.iter().any(|value| value == field));
        }
    }

    #[tokio::test]
    async fn test_empty_credential_rejected_without_request() {
        let fetcher = ContentFetcher::new();
        let error = fetcher.fetch(Topic::History, "   ").await.unwrap_err();
        assert_eq!(error, FetchError::InvalidCredential);
    }
}
