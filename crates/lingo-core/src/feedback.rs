//! Guess scoring.
//!
//! Scoring is two-pass so that repeated letters are never over-counted:
//!
//! 1. Exact matches are marked first; every unmatched target letter is
//!    added to a remaining-count table.
//! 2. Each non-exact guess letter is marked present only while the table
//!    still holds an unclaimed copy of that letter, which is then consumed.

use std::collections::HashMap;

/// Classification of one guessed letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LetterMark {
    /// Right letter, right position.
    Exact,
    /// Letter occurs elsewhere in the target (and is not already claimed).
    Present,
    /// Letter does not occur in the unclaimed remainder of the target.
    Absent,
}

impl LetterMark {
    /// Single-character wire code (`G`, `Y`, `X`).
    pub fn code(self) -> char {
        match self {
            Self::Exact => 'G',
            Self::Present => 'Y',
            Self::Absent => 'X',
        }
    }
}

/// Score `guess` against `target`, one mark per target position.
///
/// Both words are compared case-insensitively. Callers guarantee equal
/// length; a longer guess is truncated and a shorter one leaves the
/// trailing positions [`LetterMark::Absent`].
pub fn marks(guess: &str, target: &str) -> Vec<LetterMark> {
    let guess: Vec<char> = guess.chars().map(|c| c.to_ascii_uppercase()).collect();
    let target: Vec<char> = target.chars().map(|c| c.to_ascii_uppercase()).collect();
    debug_assert_eq!(guess.len(), target.len(), "guess and target differ in length");

    let mut result = vec![LetterMark::Absent; target.len()];
    let mut remaining: HashMap<char, usize> = HashMap::new();

    for (i, (g, t)) in guess.iter().zip(&target).enumerate() {
        if g == t {
            result[i] = LetterMark::Exact;
        } else {
            *remaining.entry(*t).or_default() += 1;
        }
    }

    for (i, g) in guess.iter().enumerate().take(target.len()) {
        if result[i] == LetterMark::Exact {
            continue;
        }
        if let Some(count) = remaining.get_mut(g).filter(|count| **count > 0) {
            *count -= 1;
            result[i] = LetterMark::Present;
        }
    }

    result
}

/// Score `guess` against `target` as a code string over `G`/`Y`/`X`.
pub fn compute_feedback(guess: &str, target: &str) -> String {
    marks(guess, target).into_iter().map(LetterMark::code).collect()
}
