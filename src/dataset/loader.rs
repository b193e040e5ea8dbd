use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{AttackRecord, Prediction, Problem, ProblemId};
use crate::error::{InputFault, ScoreError};

/// File name of the problem table inside the benchmark directory
pub const PROBLEMS_FILE: &str = "problems.json";

/// Where each input was read from, kept so later failures can name the file.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub problems: PathBuf,
    pub results: PathBuf,
    pub attack: PathBuf,
}

impl InputPaths {
    pub fn new(base_dir: &Path, result_file: &Path, attack_file: &Path) -> Self {
        Self {
            problems: base_dir.join(PROBLEMS_FILE),
            results: result_file.to_path_buf(),
            attack: attack_file.to_path_buf(),
        }
    }
}

/// Everything the scorer reads, fully loaded into memory.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub problems: HashMap<ProblemId, Problem>,
    /// Indexed by `question_id`, last line wins
    pub predictions: HashMap<ProblemId, Prediction>,
    /// In file order, duplicates kept
    pub attacks: Vec<AttackRecord>,
    pub paths: InputPaths,
}

impl Inputs {
    /// Load the attack file, the problem table and the prediction lines
    pub fn load(paths: InputPaths) -> Result<Self, ScoreError> {
        let attacks = load_attacks(&paths.attack)?;
        let problems = load_problems(&paths.problems)?;
        let predictions = index_predictions(load_predictions(&paths.results)?);

        debug!(
            attacks = attacks.len(),
            problems = problems.len(),
            predictions = predictions.len(),
            "Loaded inputs"
        );

        Ok(Self {
            problems,
            predictions,
            attacks,
            paths,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ScoreError> {
    let file = File::open(path).map_err(|e| ScoreError::input(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ScoreError::input(path, e))
}

/// Load `problems.json`: an object keyed by problem id
pub fn load_problems(path: &Path) -> Result<HashMap<ProblemId, Problem>, ScoreError> {
    let by_key: HashMap<String, Problem> = read_json(path)?;
    Ok(by_key
        .into_iter()
        .map(|(id, problem)| (ProblemId::from(id), problem))
        .collect())
}

/// Load the attack file: a JSON array of `{id, new_gt}` records
pub fn load_attacks(path: &Path) -> Result<Vec<AttackRecord>, ScoreError> {
    read_json(path)
}

/// Load the result file, one JSON object per line, in file order.
///
/// Blank lines are skipped. Any other line that fails to parse is fatal and
/// reported with its 1-based line number.
pub fn load_predictions(path: &Path) -> Result<Vec<Prediction>, ScoreError> {
    let file = File::open(path).map_err(|e| ScoreError::input(path, e))?;
    let mut predictions = Vec::new();

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| ScoreError::input(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let prediction = serde_json::from_str(&line).map_err(|source| {
            ScoreError::input(path, InputFault::Line { line: i + 1, source })
        })?;
        predictions.push(prediction);
    }

    Ok(predictions)
}

/// Index predictions by question id. On duplicate ids the later line wins.
pub fn index_predictions(predictions: Vec<Prediction>) -> HashMap<ProblemId, Prediction> {
    let mut by_id = HashMap::with_capacity(predictions.len());
    for prediction in predictions {
        let id = prediction.question_id.clone();
        if by_id.insert(id.clone(), prediction).is_some() {
            warn!(question_id = %id, "Duplicate prediction, keeping the later line");
        }
    }
    by_id
}
