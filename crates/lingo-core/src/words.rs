//! Target words and guess validation.

use std::collections::HashSet;
use std::path::Path;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::errors::WordListError;

/// Target used when no word list can be loaded.
pub const FALLBACK_TARGET: &str = "CRANE";

/// Supplies target words and decides which guesses are real words.
///
/// Words handed to and returned from a source are uppercase.
pub trait WordSource: Send + Sync {
    /// Pick a target word for a new game.
    fn random_target(&self) -> String;

    /// Whether `word` may be guessed. Length against a particular target is
    /// checked by the caller.
    fn is_valid_guess(&self, word: &str) -> bool;
}

/// Canonical form of a raw guess: trimmed, ASCII letters uppercased.
///
/// Non-ASCII characters are left as they are so that the alphabetic check
/// rejects them; full Unicode case mapping would turn `ß` into `SS`.
pub fn normalize_guess(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// In-memory word list.
///
/// With a dictionary, a guess is valid only if it is in the dictionary or
/// is one of the targets. Without one, any alphabetic word is accepted.
#[derive(Clone, Debug)]
pub struct WordList {
    targets: Vec<String>,
    dictionary: Option<HashSet<String>>,
}

impl WordList {
    /// Build from raw word lists. Blank entries are skipped and words are
    /// uppercased; an empty target list falls back to [`FALLBACK_TARGET`].
    pub fn new<T, D>(targets: T, dictionary: Option<D>) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let mut targets: Vec<String> = clean(targets);
        if targets.is_empty() {
            targets.push(FALLBACK_TARGET.to_string());
        }
        let dictionary = dictionary.map(|words| {
            let mut set: HashSet<String> = clean(words).into_iter().collect();
            set.extend(targets.iter().cloned());
            set
        });
        Self {
            targets,
            dictionary,
        }
    }

    /// Load targets and (optionally) a dictionary from newline-separated
    /// files.
    ///
    /// A missing or empty target file degrades to `fallback`, and a missing
    /// dictionary file disables dictionary checks; both are logged.
    pub fn load(targets_path: &Path, dictionary_path: Option<&Path>, fallback: &str) -> Self {
        let targets = match read_words(targets_path) {
            Ok(words) if !words.is_empty() => words,
            Ok(_) => {
                warn!(path = %targets_path.display(), fallback, "word list is empty, using fallback target");
                vec![fallback.to_string()]
            }
            Err(e) => {
                warn!(error = %e, fallback, "word list unavailable, using fallback target");
                vec![fallback.to_string()]
            }
        };

        let dictionary = dictionary_path.and_then(|path| match read_words(path) {
            Ok(words) => Some(words),
            Err(e) => {
                warn!(error = %e, "guess dictionary unavailable, accepting any alphabetic word");
                None
            }
        });

        let list = Self::new(targets, dictionary);
        debug!(
            targets = list.targets.len(),
            dictionary = list.dictionary.as_ref().map_or(0, HashSet::len),
            "word list loaded"
        );
        list
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn has_dictionary(&self) -> bool {
        self.dictionary.is_some()
    }
}

impl WordSource for WordList {
    fn random_target(&self) -> String {
        self.targets
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| FALLBACK_TARGET.to_string())
    }

    fn is_valid_guess(&self, word: &str) -> bool {
        if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
            return false;
        }
        self.dictionary
            .as_ref()
            .is_none_or(|dictionary| dictionary.contains(word))
    }
}

/// Read a newline-separated word file, trimming lines and skipping blanks.
pub fn read_words(path: &Path) -> Result<Vec<String>, WordListError> {
    let content = std::fs::read_to_string(path).map_err(|source| WordListError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(clean(content.lines()))
}

fn clean<I>(words: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| normalize_guess(w.as_ref()))
        .filter(|w| !w.is_empty())
        .collect()
}
