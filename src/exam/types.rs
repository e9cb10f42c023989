//! Question model shared by the parser, shuffler and assembler

/// Letters used to label answers, in order
pub const ANSWER_LETTERS: [char; 9] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I'];

/// Answer-key cell for a question without a detected correct answer
pub const NO_ANSWER: &str = "N/A";

/// Letter for a zero-based answer position, if one exists
pub fn answer_letter(index: usize) -> Option<char> {
    ANSWER_LETTERS.get(index).copied()
}

/// One multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub answers: Vec<String>,
    /// Index into `answers`; `None` when no answer was marked
    pub correct: Option<usize>,
}

impl Question {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            answers: Vec::new(),
            correct: None,
        }
    }

    pub fn correct_answer(&self) -> Option<&str> {
        self.correct
            .and_then(|i| self.answers.get(i))
            .map(String::as_str)
    }

    /// Letter of the correct answer, or `None` when undetermined
    pub fn correct_letter(&self) -> Option<char> {
        self.correct
            .filter(|&i| i < self.answers.len())
            .and_then(answer_letter)
    }
}

/// Questions of one source document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedExam {
    pub questions: Vec<Question>,
}

impl ParsedExam {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// One shuffled rendition of the exam
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamVariant {
    /// 1-based variant number
    pub number: usize,
    pub questions: Vec<Question>,
}

impl ExamVariant {
    /// `De_so_<n>`, used for the answer key and the file name
    pub fn label(&self) -> String {
        format!("De_so_{}", self.number)
    }

    pub fn file_name(&self) -> String {
        format!("{}.docx", self.label())
    }
}

/// One row of the consolidated answer key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKeyRow {
    pub variant_label: String,
    /// Per-question letter in variant order; `None` prints as `N/A`
    pub letters: Vec<Option<char>>,
}

impl AnswerKeyRow {
    pub fn cells(&self) -> impl Iterator<Item = String> + '_ {
        self.letters.iter().map(|letter| match letter {
            Some(c) => c.to_string(),
            None => NO_ANSWER.to_string(),
        })
    }
}

/// Answer key for every variant of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    pub question_count: usize,
    pub rows: Vec<AnswerKeyRow>,
}
