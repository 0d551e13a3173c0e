//! Quiz generation on top of [`StrictOutputClient`].
//!
//! Turns a topic, a question kind and an amount into a [`GenerationRequest`] and decodes the
//! validated records into typed questions.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::generation::{GenerationRequest, StrictOutputClient};
use crate::structured::RecordShape;
use crate::{Error, ErrorContext, Result};

pub const QUIZ_ROLE: &str = "You are an expert quiz generator.";
pub const MIN_TOPIC_LEN: usize = 4;
pub const MAX_TOPIC_LEN: usize = 50;
pub const MAX_AMOUNT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Mcq,
    OpenEnded,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Mcq => "mcq",
            QuestionKind::OpenEnded => "open_ended",
        }
    }

    /// Record shape the model must fill for this kind.
    pub fn shape(&self) -> RecordShape {
        match self {
            QuestionKind::OpenEnded => RecordShape::new().text("question").text("answer"),
            QuestionKind::Mcq => RecordShape::new()
                .text("question")
                .text("answer")
                .text("option1")
                .text("option2")
                .text("option3"),
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "mcq" => Ok(QuestionKind::Mcq),
            "open_ended" => Ok(QuestionKind::OpenEnded),
            other => Err(Error::validation_with_context(
                format!("Unknown question kind '{}'", other),
                ErrorContext::new()
                    .with_field_path("quiz.kind")
                    .with_details("expected `mcq` or `open_ended`"),
            )),
        }
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub topic: String,
    pub kind: QuestionKind,
    pub amount: u32,
}

impl QuizRequest {
    pub fn new(topic: impl Into<String>, kind: QuestionKind, amount: u32) -> Self {
        Self {
            topic: topic.into(),
            kind,
            amount,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let len = self.topic.trim().chars().count();
        if !(MIN_TOPIC_LEN..=MAX_TOPIC_LEN).contains(&len) {
            return Err(Error::validation_with_context(
                format!(
                    "Topic must be between {} and {} characters",
                    MIN_TOPIC_LEN, MAX_TOPIC_LEN
                ),
                ErrorContext::new()
                    .with_field_path("quiz.topic")
                    .with_details(format!("got {} characters", len)),
            ));
        }
        if !(1..=MAX_AMOUNT).contains(&self.amount) {
            return Err(Error::validation_with_context(
                format!("Amount must be between 1 and {}", MAX_AMOUNT),
                ErrorContext::new()
                    .with_field_path("quiz.amount")
                    .with_details(format!("got {}", self.amount)),
            ));
        }
        Ok(())
    }

    fn task(&self) -> String {
        let topic = self.topic.trim();
        match self.kind {
            QuestionKind::OpenEnded => format!(
                "Generate EXACTLY {} hard open-ended questions about \"{}\".\n\
                 Each answer must be at most 15 words.",
                self.amount, topic
            ),
            QuestionKind::Mcq => format!(
                "Generate EXACTLY {} hard multiple choice questions about \"{}\".\n\
                 Each question must have 4 options and answers must be at most 15 words.",
                self.amount, topic
            ),
        }
    }

    /// Build the generation request; validates first.
    pub fn to_generation_request(&self) -> Result<GenerationRequest> {
        self.validate()?;
        GenerationRequest::builder(QUIZ_ROLE, self.task(), self.kind.shape())
            .expected_count(self.amount as usize)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenEndedQuestion {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqQuestion {
    pub question: String,
    pub answer: String,
    pub option1: String,
    pub option2: String,
    pub option3: String,
}

impl McqQuestion {
    /// The three distractors plus the answer, in random order.
    pub fn shuffled_options<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let mut options = vec![
            self.option1.clone(),
            self.option2.clone(),
            self.option3.clone(),
            self.answer.clone(),
        ];
        options.shuffle(rng);
        options
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "questions", rename_all = "snake_case")]
pub enum GeneratedQuiz {
    Mcq(Vec<McqQuestion>),
    OpenEnded(Vec<OpenEndedQuestion>),
}

impl GeneratedQuiz {
    pub fn kind(&self) -> QuestionKind {
        match self {
            GeneratedQuiz::Mcq(_) => QuestionKind::Mcq,
            GeneratedQuiz::OpenEnded(_) => QuestionKind::OpenEnded,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GeneratedQuiz::Mcq(q) => q.len(),
            GeneratedQuiz::OpenEnded(q) => q.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into store-ready rows, shuffling multiple-choice options.
    pub fn into_prepared<R: Rng + ?Sized>(self, rng: &mut R) -> Vec<PreparedQuestion> {
        match self {
            GeneratedQuiz::Mcq(questions) => questions
                .into_iter()
                .map(|q| PreparedQuestion {
                    options: Some(q.shuffled_options(rng)),
                    question: q.question,
                    answer: q.answer,
                    kind: QuestionKind::Mcq,
                })
                .collect(),
            GeneratedQuiz::OpenEnded(questions) => questions
                .into_iter()
                .map(|q| PreparedQuestion {
                    question: q.question,
                    answer: q.answer,
                    options: None,
                    kind: QuestionKind::OpenEnded,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedQuestion {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub kind: QuestionKind,
}

/// Generates quizzes through a shared [`StrictOutputClient`].
#[derive(Debug, Clone)]
pub struct QuizGenerator {
    client: StrictOutputClient,
    max_attempts: Option<u32>,
}

impl QuizGenerator {
    pub fn new(client: StrictOutputClient) -> Self {
        Self {
            client,
            max_attempts: None,
        }
    }

    /// Override the client's attempt bound for quiz requests.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn client(&self) -> &StrictOutputClient {
        &self.client
    }

    pub async fn generate(&self, request: &QuizRequest) -> Result<GeneratedQuiz> {
        let generation = self.generation_request(request)?;
        tracing::debug!(
            topic = request.topic.trim(),
            kind = request.kind.as_str(),
            amount = request.amount,
            "generating quiz"
        );
        match request.kind {
            QuestionKind::Mcq => Ok(GeneratedQuiz::Mcq(
                self.client.generate_as(&generation).await?,
            )),
            QuestionKind::OpenEnded => Ok(GeneratedQuiz::OpenEnded(
                self.client.generate_as(&generation).await?,
            )),
        }
    }

    fn generation_request(&self, request: &QuizRequest) -> Result<GenerationRequest> {
        let base = request.to_generation_request()?;
        match self.max_attempts {
            Some(attempts) => GenerationRequest::builder(
                base.role(),
                base.task(),
                base.shape().clone(),
            )
            .expected_count(request.amount as usize)
            .max_attempts(attempts)
            .build(),
            None => Ok(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("mcq".parse::<QuestionKind>().unwrap(), QuestionKind::Mcq);
        assert_eq!(
            "open-ended".parse::<QuestionKind>().unwrap(),
            QuestionKind::OpenEnded
        );
        assert!("essay".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn test_topic_and_amount_bounds() {
        assert!(QuizRequest::new("  abc  ", QuestionKind::Mcq, 3).validate().is_err());
        assert!(QuizRequest::new("rust", QuestionKind::Mcq, 3).validate().is_ok());
        assert!(QuizRequest::new("x".repeat(51), QuestionKind::Mcq, 3).validate().is_err());
        assert!(QuizRequest::new("rust", QuestionKind::Mcq, 0).validate().is_err());
        assert!(QuizRequest::new("rust", QuestionKind::Mcq, 11).validate().is_err());
    }

    #[test]
    fn test_generation_request_for_mcq() {
        let req = QuizRequest::new("volcanoes", QuestionKind::Mcq, 4)
            .to_generation_request()
            .unwrap();
        assert_eq!(req.role(), QUIZ_ROLE);
        assert_eq!(req.expected_count(), Some(4));
        assert!(req.task().contains("EXACTLY 4 hard multiple choice questions about \"volcanoes\""));
        let names: Vec<_> = req.shape().field_names().collect();
        assert_eq!(names, vec!["question", "answer", "option1", "option2", "option3"]);
    }

    #[test]
    fn test_shuffled_options_contain_answer() {
        let q = McqQuestion {
            question: "Largest planet?".into(),
            answer: "Jupiter".into(),
            option1: "Mars".into(),
            option2: "Venus".into(),
            option3: "Saturn".into(),
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut options = q.shuffled_options(&mut rng);
        assert_eq!(options.len(), 4);
        options.sort();
        assert_eq!(options, vec!["Jupiter", "Mars", "Saturn", "Venus"]);
    }

    #[test]
    fn test_prepared_open_ended_has_no_options() {
        let quiz = GeneratedQuiz::OpenEnded(vec![OpenEndedQuestion {
            question: "Q".into(),
            answer: "A".into(),
        }]);
        let prepared = quiz.into_prepared(&mut StdRng::seed_from_u64(1));
        assert_eq!(prepared[0].options, None);
        assert_eq!(prepared[0].kind, QuestionKind::OpenEnded);
    }
}
