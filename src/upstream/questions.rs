use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::{QuestionBank, QuestionRecord, UpstreamError, UpstreamResult};

/// HTTP client for the external question bank.
#[derive(Clone)]
pub struct HttpQuestionBank {
    client: Client,
    base_url: Arc<str>,
}

impl HttpQuestionBank {
    /// Build a question-bank client against the service base URL.
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }
}

/// Wire shape of a question-set response.
#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

/// Wire shape of one question record.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    text: String,
    options: Vec<String>,
    correct_answer: String,
}

impl From<RawQuestion> for QuestionRecord {
    fn from(raw: RawQuestion) -> Self {
        Self {
            text: raw.text,
            options: raw.options,
            correct_answer: raw.correct_answer,
        }
    }
}

impl QuestionBank for HttpQuestionBank {
    fn fetch_questions(
        &self,
        event_id: String,
    ) -> BoxFuture<'static, UpstreamResult<Vec<QuestionRecord>>> {
        let client = self.client.clone();
        let url = format!("{}/api/event/{}/questions", self.base_url, event_id);

        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|source| UpstreamError::request("question bank fetch", source))?;

            let payload: QuestionsResponse = response
                .json()
                .await
                .map_err(|source| UpstreamError::request("question bank payload", source))?;

            // An unsuccessful payload is not an error: the session proceeds
            // with zero questions and the round controller ends it.
            if !payload.success {
                warn!(event = %event_id, "question bank reported failure; substituting empty set");
                return Ok(Vec::new());
            }

            Ok(payload.questions.into_iter().map(Into::into).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsuccessful_payload_deserializes_to_empty_defaults() {
        let payload: QuestionsResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!payload.success);
        assert!(payload.questions.is_empty());
    }

    #[test]
    fn question_records_map_field_for_field() {
        let payload: QuestionsResponse = serde_json::from_str(
            r#"{
                "success": true,
                "questions": [
                    {"text": "Capital of France?", "options": ["Paris", "Lyon"], "correct_answer": "Paris"}
                ]
            }"#,
        )
        .unwrap();

        let record: QuestionRecord = payload.questions.into_iter().next().unwrap().into();
        assert_eq!(record.text, "Capital of France?");
        assert_eq!(record.options.len(), 2);
        assert_eq!(record.correct_answer, "Paris");
    }
}
