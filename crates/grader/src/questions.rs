//! The fixed set of interview questions a recording can answer.

/// Questions used when the configuration does not override them.
pub const DEFAULT_QUESTIONS: &[&str] = &[
    "Tell us about yourself",
    "What's your greatest achievement?",
    "Where do you see yourself in 5 years?",
    "Why do you want to work with us?",
    "How do you handle working under pressure?",
];

/// Text used for indices outside the question set.
pub const UNKNOWN_QUESTION: &str = "Unknown question";

/// Ordered question set, indexed by a job's `question_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<String>,
}

impl QuestionSet {
    pub fn new(questions: Vec<String>) -> Self {
        Self { questions }
    }

    /// Resolves an index to its question text, or [`UNKNOWN_QUESTION`].
    pub fn text(&self, index: usize) -> &str {
        self.questions
            .get(index)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_QUESTION)
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.questions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.questions.iter().map(String::as_str).enumerate()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Default for QuestionSet {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect())
    }
}
