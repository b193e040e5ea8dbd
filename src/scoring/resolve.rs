use rand::Rng;
use std::fmt;
use std::str::FromStr;

use super::extract::ParsedAnswer;

/// Ordered answer labels; position `i` labels choice `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionAlphabet {
    labels: Vec<char>,
}

impl Default for OptionAlphabet {
    fn default() -> Self {
        Self {
            labels: vec!['A', 'B', 'C', 'D', 'E'],
        }
    }
}

impl FromStr for OptionAlphabet {
    type Err = String;

    /// Every character of the string is one label, e.g. `"ABCD"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let labels: Vec<char> = s.chars().collect();
        if labels.is_empty() {
            return Err("option alphabet must contain at least one label".to_string());
        }
        if labels.iter().any(|c| c.is_whitespace()) {
            return Err(format!("option alphabet '{}' contains whitespace", s));
        }
        Ok(Self { labels })
    }
}

impl fmt::Display for OptionAlphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.labels {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl OptionAlphabet {
    pub fn labels(&self) -> &[char] {
        &self.labels
    }

    /// Index of `answer` among the first `n_choices` labels, if it is one of them
    pub fn position(&self, answer: ParsedAnswer, n_choices: usize) -> Option<usize> {
        let letter = answer.letter()?;
        self.labels
            .iter()
            .take(n_choices)
            .position(|&label| label == letter)
    }
}

/// How the predicted index was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The parsed letter mapped onto a choice
    Parsed(usize),
    /// Unusable letter; index drawn uniformly from the choices
    Guessed(usize),
}

impl Resolution {
    pub fn index(&self) -> usize {
        match self {
            Resolution::Parsed(i) | Resolution::Guessed(i) => *i,
        }
    }
}

/// Map a parsed answer to a choice index.
///
/// `Failed`, letters outside the alphabet, and letters past the problem's
/// choice count all fall back to a uniform draw over `0..n_choices`.
/// Returns `None` when there are no choices to pick from.
pub fn resolve_index(
    answer: ParsedAnswer,
    n_choices: usize,
    alphabet: &OptionAlphabet,
    rng: &mut impl Rng,
) -> Option<Resolution> {
    if n_choices == 0 {
        return None;
    }
    Some(match alphabet.position(answer, n_choices) {
        Some(i) => Resolution::Parsed(i),
        None => Resolution::Guessed(rng.random_range(0..n_choices)),
    })
}
