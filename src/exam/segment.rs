//! Question segmentation
//!
//! Paragraphs are classified as a question start, an answer line or a
//! continuation, then fed through a two-state automaton that groups them into
//! [`Question`]s. The automaton is driven by an iterator, so a document is
//! walked once without collecting intermediate state.

use std::ops::Range;

use regex::Regex;
use thiserror::Error;

use super::extract::StyledParagraph;
use super::types::Question;
use crate::config::{MAX_ANSWER_LETTER, MIN_ANSWER_LETTER};

#[derive(Debug, Error)]
pub enum SegmenterError {
    #[error("Question marker must not be empty")]
    EmptyMarker,

    #[error("Answer letters must stop between D and I, got {0}")]
    AnswerLetter(char),

    #[error("Invalid question pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiled line rules, built once at startup
#[derive(Debug, Clone)]
pub struct SegmenterRules {
    question_start: Regex,
    answer_line: Regex,
    max_letter: char,
}

/// How one paragraph takes part in the question structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Opens a new question; carries the prompt without the marker
    QuestionStart(&'a str),
    Answer,
    Continuation,
}

/// One `X. text` piece of an answer line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSegment {
    pub letter: char,
    pub separator: char,
    pub text: String,
}

impl AnswerSegment {
    pub fn marker(&self) -> String {
        format!("{}{}", self.letter, self.separator)
    }
}

/// An answer as seen by a [`CorrectAnswerStrategy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCandidate<'a> {
    pub segment: &'a AnswerSegment,
    /// Char range of the answer text within the raw paragraph, when found
    pub raw_span: Option<Range<usize>>,
}

impl SegmenterRules {
    pub fn new(question_marker: &str, max_letter: char) -> Result<Self, SegmenterError> {
        let marker = question_marker.trim();
        if marker.is_empty() {
            return Err(SegmenterError::EmptyMarker);
        }
        if !(MIN_ANSWER_LETTER..=MAX_ANSWER_LETTER).contains(&max_letter) {
            return Err(SegmenterError::AnswerLetter(max_letter));
        }

        let question_start = Regex::new(&format!(
            r"(?i)^{}\s*[0-9]+[.:)]\s*",
            regex::escape(marker)
        ))?;
        let answer_line = Regex::new(r"^[A-Z][.:)]")?;

        Ok(Self {
            question_start,
            answer_line,
            max_letter,
        })
    }

    pub fn classify<'a>(&self, text: &'a str) -> LineKind<'a> {
        if let Some(m) = self.question_start.find(text) {
            LineKind::QuestionStart(text[m.end()..].trim())
        } else if self.answer_line.is_match(text) {
            LineKind::Answer
        } else {
            LineKind::Continuation
        }
    }

    /// Split an answer line into `X. text` segments
    ///
    /// A segment opens at any `A`..=max marker and runs until the next marker
    /// from `B` on, or the end of the line. Segments with no text are dropped.
    pub fn answer_segments(&self, text: &str) -> Vec<AnswerSegment> {
        let chars: Vec<char> = text.chars().collect();
        let mut segments = Vec::new();
        let mut pos = 0;

        while let Some(start) = self.find_marker(&chars, pos, 'A') {
            let content_start = skip_whitespace(&chars, start + 2);
            let end = self.segment_end(&chars, content_start);

            let content: String = chars[content_start..end].iter().collect();
            let content = content.trim();
            if !content.is_empty() {
                segments.push(AnswerSegment {
                    letter: chars[start],
                    separator: chars[start + 1],
                    text: content.to_string(),
                });
            }

            pos = skip_whitespace(&chars, end);
        }

        segments
    }

    fn is_marker_at(&self, chars: &[char], i: usize, first: char) -> bool {
        match (chars.get(i), chars.get(i + 1)) {
            (Some(&letter), Some(&sep)) => {
                (first..=self.max_letter).contains(&letter) && matches!(sep, '.' | ':' | ')')
            }
            _ => false,
        }
    }

    fn find_marker(&self, chars: &[char], from: usize, first: char) -> Option<usize> {
        (from..chars.len()).find(|&i| self.is_marker_at(chars, i, first))
    }

    /// First position at or after `from` where only whitespace separates the
    /// text from the next `B`.. marker or the end of the line
    fn segment_end(&self, chars: &[char], from: usize) -> usize {
        let mut end = from;
        while end < chars.len() {
            let next = skip_whitespace(chars, end);
            if next == chars.len() || self.is_marker_at(chars, next, 'B') {
                return end;
            }
            end += 1;
        }
        chars.len()
    }
}

fn skip_whitespace(chars: &[char], from: usize) -> usize {
    let mut i = from.min(chars.len());
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

/// Decides whether an answer was marked as the correct one
pub trait CorrectAnswerStrategy {
    fn is_correct(&self, paragraph: &StyledParagraph, answer: &AnswerCandidate<'_>) -> bool;
}

impl<F> CorrectAnswerStrategy for F
where
    F: Fn(&StyledParagraph, &AnswerCandidate<'_>) -> bool,
{
    fn is_correct(&self, paragraph: &StyledParagraph, answer: &AnswerCandidate<'_>) -> bool {
        self(paragraph, answer)
    }
}

/// The answer whose whole text is bold, underlined, highlighted or red
#[derive(Debug, Clone, Copy, Default)]
pub struct EmphasisStrategy;

impl CorrectAnswerStrategy for EmphasisStrategy {
    fn is_correct(&self, paragraph: &StyledParagraph, answer: &AnswerCandidate<'_>) -> bool {
        answer
            .raw_span
            .clone()
            .is_some_and(|span| paragraph.span_is_emphasized(span))
    }
}

/// Locate an answer's own content span in the raw run text
///
/// `cursor` is the raw position after the previous answer's marker, so
/// repeated markers in one paragraph resolve to successive answers. The span
/// never reaches past the next answer marker. When normalization changed the
/// text, the whole raw content up to that marker is used instead.
fn locate_answer(
    rules: &SegmenterRules,
    paragraph: &StyledParagraph,
    segment: &AnswerSegment,
    cursor: &mut usize,
) -> Option<Range<usize>> {
    let raw = paragraph.raw();
    let marker = segment.marker();
    let marker_start = paragraph.find_raw(&marker, *cursor)?;
    let marker_end = marker_start + 2;
    *cursor = marker_end;

    let content_start = paragraph.next_non_whitespace(marker_end)?;
    let bound = rules
        .find_marker(raw, content_start, 'B')
        .unwrap_or(raw.len());

    let len = segment.text.chars().count();
    if let Some(start) = paragraph
        .find_raw(&segment.text, content_start)
        .filter(|&start| start + len <= bound)
    {
        return Some(start..start + len);
    }

    let end = raw[content_start..bound]
        .iter()
        .rposition(|c| !c.is_whitespace())
        .map(|i| content_start + i + 1)?;
    Some(content_start..end)
}

enum State {
    NoQuestion,
    InQuestion(Question),
}

/// Two-state automaton turning paragraphs into questions
///
/// Correct-answer detection keeps the first answer the strategy accepts.
pub struct Segmenter<'r, S> {
    rules: &'r SegmenterRules,
    strategy: S,
    state: State,
}

impl<'r, S: CorrectAnswerStrategy> Segmenter<'r, S> {
    pub fn new(rules: &'r SegmenterRules, strategy: S) -> Self {
        Self {
            rules,
            strategy,
            state: State::NoQuestion,
        }
    }

    /// Feed one paragraph; returns a question when this one closes it
    pub fn feed(&mut self, paragraph: &StyledParagraph) -> Option<Question> {
        if paragraph.is_empty() {
            return None;
        }

        match self.rules.classify(&paragraph.text) {
            LineKind::QuestionStart(prompt) => {
                let previous = std::mem::replace(
                    &mut self.state,
                    State::InQuestion(Question::new(prompt)),
                );
                match previous {
                    State::InQuestion(question) => emit(question),
                    State::NoQuestion => None,
                }
            }
            LineKind::Answer => {
                if let State::InQuestion(question) = &mut self.state {
                    add_answers(self.rules, &self.strategy, question, paragraph);
                }
                None
            }
            LineKind::Continuation => {
                if let State::InQuestion(question) = &mut self.state {
                    if question.answers.is_empty() {
                        if !question.prompt.is_empty() {
                            question.prompt.push(' ');
                        }
                        question.prompt.push_str(&paragraph.text);
                    }
                }
                None
            }
        }
    }

    /// End of input; returns the question still open, if any
    pub fn finish(&mut self) -> Option<Question> {
        match std::mem::replace(&mut self.state, State::NoQuestion) {
            State::InQuestion(question) => emit(question),
            State::NoQuestion => None,
        }
    }
}

fn add_answers<S: CorrectAnswerStrategy>(
    rules: &SegmenterRules,
    strategy: &S,
    question: &mut Question,
    paragraph: &StyledParagraph,
) {
    let mut cursor = 0;
    for segment in rules.answer_segments(&paragraph.text) {
        let candidate = AnswerCandidate {
            raw_span: locate_answer(rules, paragraph, &segment, &mut cursor),
            segment: &segment,
        };
        let is_correct = strategy.is_correct(paragraph, &candidate);

        question.answers.push(segment.text.clone());
        if is_correct {
            match question.correct {
                None => question.correct = Some(question.answers.len() - 1),
                Some(first) => tracing::debug!(
                    first,
                    ignored = question.answers.len() - 1,
                    "Ignoring additional marked answer"
                ),
            }
        }
    }
}

fn emit(question: Question) -> Option<Question> {
    if question.prompt.trim().is_empty() {
        tracing::warn!(
            answers = question.answers.len(),
            "Dropping question without prompt text"
        );
        return None;
    }
    if question.answers.len() < 2 {
        tracing::warn!(
            prompt = %question.prompt,
            answers = question.answers.len(),
            "Question has fewer than two answers"
        );
    }
    Some(question)
}

/// Lazy question iterator over styled paragraphs
pub struct Questions<'r, I, S> {
    segmenter: Segmenter<'r, S>,
    paragraphs: I,
    done: bool,
}

impl<'r, I, S> Iterator for Questions<'r, I, S>
where
    I: Iterator<Item = StyledParagraph>,
    S: CorrectAnswerStrategy,
{
    type Item = Question;

    fn next(&mut self) -> Option<Question> {
        if self.done {
            return None;
        }
        for paragraph in self.paragraphs.by_ref() {
            if let Some(question) = self.segmenter.feed(&paragraph) {
                return Some(question);
            }
        }
        self.done = true;
        self.segmenter.finish()
    }
}

/// Group `paragraphs` into questions
pub fn segment<'r, I, S>(rules: &'r SegmenterRules, paragraphs: I, strategy: S) -> Questions<'r, I::IntoIter, S>
where
    I: IntoIterator<Item = StyledParagraph>,
    S: CorrectAnswerStrategy,
{
    Questions {
        segmenter: Segmenter::new(rules, strategy),
        paragraphs: paragraphs.into_iter(),
        done: false,
    }
}
