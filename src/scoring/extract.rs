use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Sentinel recorded when no single answer letter could be read
pub const FAILED: &str = "FAILED";

// The trailing `.` is a wildcard on purpose: "The answer is B)" also counts.
static ANSWER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"The answer is ([A-Z]).").expect("answer pattern is valid"));

/// Answer letter read from free-form model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedAnswer {
    Letter(char),
    Failed,
}

impl ParsedAnswer {
    pub fn letter(&self) -> Option<char> {
        match self {
            ParsedAnswer::Letter(c) => Some(*c),
            ParsedAnswer::Failed => None,
        }
    }
}

impl fmt::Display for ParsedAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedAnswer::Letter(c) => write!(f, "{}", c),
            ParsedAnswer::Failed => f.write_str(FAILED),
        }
    }
}

/// Extract the answer letter from `text`.
///
/// The answer counts only if the pattern matches exactly once; zero matches or
/// several (possibly conflicting) matches both yield [`ParsedAnswer::Failed`].
pub fn extract_answer(text: &str) -> ParsedAnswer {
    let mut letters = ANSWER_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().chars().next());

    match (letters.next(), letters.next()) {
        (Some(c), None) => ParsedAnswer::Letter(c),
        _ => ParsedAnswer::Failed,
    }
}
