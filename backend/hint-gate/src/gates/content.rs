use lazy_static::lazy_static;
use regex::Regex;

use super::{Gate, GateContext};
use crate::models::{Rejection, RejectionReason};

/// Filler people type to poke the hint bot without asking anything.
const PLACEHOLDER_WORDS: &[&str] = &[
    "test", "testing", "spam", "asdf", "qwerty", "abc", "xyz", "xxx", "blah", "lol", "hmm",
    "aaa", "zzz",
];

const MIN_REPEATED_RUN: usize = 3;

lazy_static! {
    static ref SINGLE_LETTER: Regex = Regex::new(r"^\p{L}$").unwrap();
    static ref DIGITS_ONLY: Regex = Regex::new(r"^\d+$").unwrap();
    static ref NO_LETTERS_OR_DIGITS: Regex = Regex::new(r"^[^\p{L}\p{N}]+$").unwrap();
}

pub struct ContentValidator {
    min_question_length: usize,
    min_word_length: usize,
    min_word_count: usize,
}

impl ContentValidator {
    pub fn new(min_question_length: usize, min_word_length: usize, min_word_count: usize) -> Self {
        Self {
            min_question_length,
            min_word_length,
            min_word_count,
        }
    }

    /// `text` must already be trimmed.
    pub fn validate(&self, text: &str) -> Result<(), RejectionReason> {
        if text.chars().count() < self.min_question_length {
            return Err(RejectionReason::TooShort);
        }

        if is_spam_pattern(text) {
            return Err(RejectionReason::SpamPattern);
        }

        let meaningful = text
            .split_whitespace()
            .filter(|word| word.chars().count() >= self.min_word_length)
            .count();
        if meaningful < self.min_word_count {
            return Err(RejectionReason::NoMeaningfulWords);
        }

        Ok(())
    }
}

impl Gate for ContentValidator {
    fn name(&self) -> &'static str {
        "content"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        self.validate(ctx.message).map_err(Rejection::from)
    }
}

pub fn is_spam_pattern(text: &str) -> bool {
    SINGLE_LETTER.is_match(text)
        || DIGITS_ONLY.is_match(text)
        || is_single_char_run(text)
        || NO_LETTERS_OR_DIGITS.is_match(text)
        || is_placeholder(text)
}

// The regex crate has no backreferences, so `^(.)\1{2,}$` is done by hand.
fn is_single_char_run(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let mut run = 1;
    for c in chars {
        if c != first {
            return false;
        }
        run += 1;
    }
    run >= MIN_REPEATED_RUN
}

fn is_placeholder(text: &str) -> bool {
    let lowered = text.to_lowercase();
    PLACEHOLDER_WORDS.iter().any(|word| *word == lowered)
}
