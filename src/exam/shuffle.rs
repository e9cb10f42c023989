//! Variant generation

use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{ExamVariant, ParsedExam, Question};

/// Which parts of the exam get permuted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleOptions {
    pub questions: bool,
    pub answers: bool,
}

impl Default for ShuffleOptions {
    fn default() -> Self {
        Self {
            questions: true,
            answers: true,
        }
    }
}

/// Produce `count` variants using the thread-local generator
pub fn generate_variants(exam: &ParsedExam, count: usize, options: ShuffleOptions) -> Vec<ExamVariant> {
    generate_variants_with(exam, count, options, &mut rand::thread_rng())
}

/// Produce `count` variants from the given generator
///
/// Variants are numbered from 1 and drawn independently of each other.
pub fn generate_variants_with<R: Rng + ?Sized>(
    exam: &ParsedExam,
    count: usize,
    options: ShuffleOptions,
    rng: &mut R,
) -> Vec<ExamVariant> {
    (1..=count)
        .map(|number| ExamVariant {
            number,
            questions: shuffle_questions(&exam.questions, options, rng),
        })
        .collect()
}

fn shuffle_questions<R: Rng + ?Sized>(
    questions: &[Question],
    options: ShuffleOptions,
    rng: &mut R,
) -> Vec<Question> {
    let mut shuffled = questions.to_vec();
    if options.questions {
        shuffled.shuffle(rng);
    }
    if options.answers {
        for question in &mut shuffled {
            shuffle_answers(question, rng);
        }
    }
    shuffled
}

/// Permute the answers and follow the correct one by its text
///
/// With duplicate answer texts the first matching position is taken, which
/// still names an answer with the same text.
pub fn shuffle_answers<R: Rng + ?Sized>(question: &mut Question, rng: &mut R) {
    let correct_text = question.correct_answer().map(str::to_owned);
    question.answers.shuffle(rng);
    question.correct = correct_text.and_then(|text| question.answers.iter().position(|a| *a == text));
}
