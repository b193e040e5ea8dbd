use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Problem / question identifier.
///
/// Benchmarks write ids either as JSON strings or as bare integers. Both are
/// normalized to the string form, which is also how they appear as object keys
/// in `problems.json` and in the output files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProblemId(String);

impl ProblemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Integer value of the id, if it is one (surrounding whitespace allowed)
    pub fn as_integer(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProblemId {
    fn from(s: &str) -> Self {
        ProblemId(s.to_string())
    }
}

impl From<String> for ProblemId {
    fn from(s: String) -> Self {
        ProblemId(s)
    }
}

impl Serialize for ProblemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProblemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => ProblemId(s),
            RawId::Signed(n) => ProblemId(n.to_string()),
            RawId::Unsigned(n) => ProblemId(n.to_string()),
        })
    }
}

/// One benchmark problem from `problems.json`. Only the choices matter here;
/// every other field (question, original answer, ...) is ignored.
///
/// Rows are read leniently: a row without a `choices` array still loads, and
/// only fails once it is actually scored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Problem {
    pub choices: Option<Vec<serde_json::Value>>,
}

impl Problem {
    /// Number of answer choices, if the row carries a choice list
    pub fn choice_count(&self) -> Option<usize> {
        self.choices.as_ref().map(Vec::len)
    }
}

impl<'de> Deserialize<'de> for Problem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let row = serde_json::Value::deserialize(deserializer)?;
        let choices = match row {
            serde_json::Value::Object(mut fields) => match fields.remove("choices") {
                Some(serde_json::Value::Array(items)) => Some(items),
                _ => None,
            },
            _ => None,
        };
        Ok(Problem { choices })
    }
}

/// One line of the model's result file
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub question_id: ProblemId,
    pub text: String,
    pub prompt: String,
}

impl Prediction {
    /// The prompt carried an image placeholder
    pub fn is_multimodal(&self) -> bool {
        self.prompt.contains(IMAGE_TOKEN)
    }
}

/// Placeholder the prompt builder inserts where the image goes
pub const IMAGE_TOKEN: &str = "<image>";

/// Attacker-supplied override of a problem's correct answer
#[derive(Debug, Clone, Deserialize)]
pub struct AttackRecord {
    pub id: ProblemId,
    /// Index into the problem's choices. Not range checked: an out-of-range
    /// value simply never matches a prediction.
    pub new_gt: i64,
}
