use std::collections::HashMap;

use indexmap::map::Entry;
use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use super::extract::extract_answer;
use super::resolve::{resolve_index, OptionAlphabet, Resolution};
use crate::dataset::{AttackRecord, Inputs, Problem, ProblemId};
use crate::error::{InputFault, ScoreError};

/// One problem of the split together with its flipped ground truth
#[derive(Debug, Clone, Copy)]
pub struct SplitEntry<'a> {
    pub problem: &'a Problem,
    pub new_gt: i64,
}

/// Per-question record written to the analysis dump
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub question_id: ProblemId,
    pub parsed_ans: String,
    pub ground_truth: i64,
    pub question: String,
    pub pred: String,
    pub is_multimodal: bool,
}

/// Analysis dump, split by outcome
#[derive(Debug, Clone, Default, Serialize)]
pub struct Analysis {
    pub correct: Vec<AnalysisRecord>,
    pub incorrect: Vec<AnalysisRecord>,
}

impl Analysis {
    pub fn total(&self) -> usize {
        self.correct.len() + self.incorrect.len()
    }
}

/// Aggregate result dump. Field order is the on-disk order.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub acc: f64,
    pub correct: usize,
    pub count: usize,
    pub results: IndexMap<ProblemId, usize>,
    pub outputs: IndexMap<ProblemId, String>,
}

#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub analysis: Analysis,
    pub result: AggregateResult,
    /// Scored problems whose index came from the random fallback
    pub guessed: usize,
    /// Split problems without a prediction
    pub skipped: usize,
}

/// Resolve every attack id against the problem table.
///
/// The split keeps the position of an id's first appearance; on duplicate ids
/// the last `new_gt` wins. An id missing from `problems` is a [`ScoreError::Join`].
pub fn join_split<'a>(
    attacks: &[AttackRecord],
    problems: &'a HashMap<ProblemId, Problem>,
) -> Result<IndexMap<ProblemId, SplitEntry<'a>>, ScoreError> {
    let mut split: IndexMap<ProblemId, SplitEntry<'a>> = IndexMap::with_capacity(attacks.len());

    for attack in attacks {
        let problem = problems
            .get(&attack.id)
            .ok_or_else(|| ScoreError::Join {
                id: attack.id.clone(),
            })?;

        match split.entry(attack.id.clone()) {
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.new_gt != attack.new_gt {
                    warn!(
                        id = %attack.id,
                        previous = entry.new_gt,
                        new_gt = attack.new_gt,
                        "Conflicting duplicate attack record, keeping the later one"
                    );
                }
                entry.new_gt = attack.new_gt;
            }
            Entry::Vacant(slot) => {
                slot.insert(SplitEntry {
                    problem,
                    new_gt: attack.new_gt,
                });
            }
        }
    }

    Ok(split)
}

/// Score every split problem that has a prediction against its flipped
/// ground truth.
///
/// Each problem's predicted index is resolved once and that single value
/// drives both the correct/incorrect decision and `results`.
pub fn score_split(
    inputs: &Inputs,
    alphabet: &OptionAlphabet,
    rng: &mut impl Rng,
) -> Result<ScoreReport, ScoreError> {
    let split = join_split(&inputs.attacks, &inputs.problems)?;

    let mut analysis = Analysis::default();
    let mut results = IndexMap::new();
    let mut outputs = IndexMap::new();
    let mut guessed = 0;
    let mut skipped = 0;

    for (prob_id, entry) in &split {
        let Some(pred) = inputs.predictions.get(prob_id) else {
            skipped += 1;
            continue;
        };

        let n_choices = entry.problem.choice_count().unwrap_or(0);
        let answer = extract_answer(&pred.text);
        let Some(resolution) = resolve_index(answer, n_choices, alphabet, rng) else {
            return Err(ScoreError::input(
                &inputs.paths.problems,
                InputFault::NoChoices(prob_id.clone()),
            ));
        };
        if let Resolution::Guessed(_) = resolution {
            guessed += 1;
        }
        let pred_idx = resolution.index();

        let record = AnalysisRecord {
            question_id: prob_id.clone(),
            parsed_ans: answer.to_string(),
            ground_truth: entry.new_gt,
            question: pred.prompt.clone(),
            pred: pred.text.clone(),
            is_multimodal: pred.is_multimodal(),
        };

        results.insert(prob_id.clone(), pred_idx);
        outputs.insert(prob_id.clone(), pred.text.clone());

        if i64::try_from(pred_idx).is_ok_and(|idx| idx == entry.new_gt) {
            analysis.correct.push(record);
        } else {
            analysis.incorrect.push(record);
        }
    }

    let correct = analysis.correct.len();
    let count = analysis.total();
    if count == 0 {
        return Err(ScoreError::EmptyResult);
    }

    debug!(
        split = split.len(),
        scored = count,
        skipped,
        guessed,
        "Scored split"
    );

    Ok(ScoreReport {
        result: AggregateResult {
            acc: correct as f64 / count as f64 * 100.0,
            correct,
            count,
            results,
            outputs,
        },
        analysis,
        guessed,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{index_predictions, InputPaths, Prediction};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::path::Path;

    fn problem(n: usize) -> Problem {
        Problem {
            choices: Some((0..n).map(|i| format!("choice {}", i).into()).collect()),
        }
    }

    fn attack(id: &str, new_gt: i64) -> AttackRecord {
        AttackRecord {
            id: ProblemId::from(id),
            new_gt,
        }
    }

    fn prediction(id: &str, text: &str) -> Prediction {
        Prediction {
            question_id: ProblemId::from(id),
            text: text.to_string(),
            prompt: "q".to_string(),
        }
    }

    fn fixture(
        problems: Vec<(&str, Problem)>,
        attacks: Vec<AttackRecord>,
        predictions: Vec<Prediction>,
    ) -> Inputs {
        Inputs {
            problems: problems
                .into_iter()
                .map(|(id, p)| (ProblemId::from(id), p))
                .collect(),
            predictions: index_predictions(predictions),
            attacks,
            paths: InputPaths::new(Path::new("data"), Path::new("r.jsonl"), Path::new("a.json")),
        }
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_correct_answer_scores_full_accuracy() {
        let inputs = fixture(
            vec![("1", problem(2))],
            vec![attack("1", 0)],
            vec![prediction("1", "The answer is A.")],
        );
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();

        assert_eq!(report.result.correct, 1);
        assert_eq!(report.result.count, 1);
        assert_eq!(report.result.acc, 100.0);
        assert_eq!(report.guessed, 0);

        let record = &report.analysis.correct[0];
        assert_eq!(record.parsed_ans, "A");
        assert_eq!(record.ground_truth, 0);
        assert_eq!(report.result.results[&ProblemId::from("1")], 0);
        assert_eq!(
            report.result.outputs[&ProblemId::from("1")],
            "The answer is A."
        );
    }

    #[test]
    fn test_ground_truth_comes_from_attack() {
        // Model picks A, attacker moved the answer to B
        let inputs = fixture(
            vec![("1", problem(3))],
            vec![attack("1", 1)],
            vec![prediction("1", "The answer is A.")],
        );
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        assert_eq!(report.result.correct, 0);
        assert_eq!(report.analysis.incorrect[0].ground_truth, 1);
        assert_eq!(report.result.acc, 0.0);
    }

    #[test]
    fn test_unparsed_answer_guesses_about_half_right() {
        let mut hits = 0;
        let trials = 400;
        for seed in 0..trials {
            let inputs = fixture(
                vec![("1", problem(2))],
                vec![attack("1", 0)],
                vec![prediction("1", "I think B")],
            );
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng).unwrap();
            assert_eq!(report.guessed, 1);

            let record = report
                .analysis
                .correct
                .first()
                .or(report.analysis.incorrect.first())
                .unwrap();
            assert_eq!(record.parsed_ans, "FAILED");
            assert!(report.result.results[&ProblemId::from("1")] < 2);
            hits += report.result.correct;
        }
        assert!(hits > 140 && hits < 260, "hits = {}", hits);
    }

    #[test]
    fn test_recorded_result_matches_scoring_decision() {
        for seed in 0..100 {
            let inputs = fixture(
                vec![("1", problem(4))],
                vec![attack("1", 2)],
                vec![prediction("1", "no idea")],
            );
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng).unwrap();
            let recorded = report.result.results[&ProblemId::from("1")];
            assert_eq!(report.result.correct == 1, recorded == 2);
        }
    }

    #[test]
    fn test_missing_problem_is_join_error() {
        let inputs = fixture(
            vec![("1", problem(2))],
            vec![attack("1", 0), attack("9", 1)],
            vec![prediction("1", "The answer is A.")],
        );
        let err = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap_err();
        match err {
            ScoreError::Join { id } => assert_eq!(id.as_str(), "9"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_overlap_is_empty_result() {
        let inputs = fixture(
            vec![("1", problem(2)), ("2", problem(2))],
            vec![attack("1", 0), attack("2", 1)],
            vec![prediction("3", "The answer is A.")],
        );
        let err = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap_err();
        assert!(matches!(err, ScoreError::EmptyResult));
    }

    #[test]
    fn test_missing_predictions_are_not_counted() {
        let inputs = fixture(
            vec![("1", problem(2)), ("2", problem(2)), ("3", problem(2))],
            vec![attack("1", 0), attack("2", 1), attack("3", 1)],
            vec![
                prediction("1", "The answer is A."),
                prediction("3", "The answer is A."),
            ],
        );
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        assert_eq!(report.result.count, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.result.count, report.analysis.total());
        assert!((report.result.acc - 50.0).abs() < 1e-9);
        assert!(!report.result.results.contains_key(&ProblemId::from("2")));
    }

    #[test]
    fn test_results_follow_split_order() {
        let inputs = fixture(
            vec![("1", problem(2)), ("2", problem(2)), ("3", problem(2))],
            vec![attack("3", 0), attack("1", 0), attack("2", 0)],
            vec![
                prediction("1", "The answer is A."),
                prediction("2", "The answer is A."),
                prediction("3", "The answer is A."),
            ],
        );
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        let order: Vec<&str> = report.result.results.keys().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_duplicate_attack_ids_scored_once_last_gt_wins() {
        let inputs = fixture(
            vec![("1", problem(2)), ("2", problem(2))],
            vec![attack("1", 0), attack("2", 0), attack("1", 1)],
            vec![
                prediction("1", "The answer is B."),
                prediction("2", "The answer is A."),
            ],
        );
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        assert_eq!(report.result.count, 2);
        assert_eq!(report.result.correct, 2);
        let order: Vec<&str> = report.result.results.keys().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["1", "2"]);
    }

    #[test]
    fn test_out_of_range_ground_truth_never_matches() {
        let inputs = fixture(
            vec![("1", problem(2)), ("2", problem(2))],
            vec![attack("1", 5), attack("2", -1)],
            vec![prediction("1", "nothing"), prediction("2", "nothing")],
        );
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        assert_eq!(report.result.correct, 0);
        assert_eq!(report.result.count, 2);
    }

    #[test]
    fn test_empty_choices_is_input_error() {
        let inputs = fixture(
            vec![("1", problem(0))],
            vec![attack("1", 0)],
            vec![prediction("1", "The answer is A.")],
        );
        let err = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::Input {
                source: InputFault::NoChoices(_),
                ..
            }
        ));
    }

    #[test]
    fn test_scored_problem_without_choice_list_is_input_error() {
        let inputs = fixture(
            vec![("1", Problem::default())],
            vec![attack("1", 0)],
            vec![prediction("1", "The answer is A.")],
        );
        let err = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap_err();
        match err {
            ScoreError::Input {
                path,
                source: InputFault::NoChoices(id),
            } => {
                assert!(path.ends_with("problems.json"));
                assert_eq!(id.as_str(), "1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_odd_rows_outside_split_are_ignored() {
        let odd: Problem = serde_json::from_str(r#"{"question": "no choices"}"#).unwrap();
        let numeric: Problem = serde_json::from_str(r#"{"choices": [1, 2]}"#).unwrap();
        let inputs = fixture(
            vec![("3", problem(2)), ("4", numeric), ("5", odd)],
            vec![attack("3", 0)],
            vec![prediction("3", "The answer is A.")],
        );
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        assert_eq!(report.result.count, 1);
        assert_eq!(report.result.correct, 1);
    }

    #[test]
    fn test_integer_ids_join_string_keys() {
        let attacks: Vec<AttackRecord> =
            serde_json::from_str(r#"[{"id": 3, "new_gt": 0}]"#).unwrap();
        let prediction: Prediction = serde_json::from_str(
            r#"{"question_id": 3, "text": "The answer is A.", "prompt": "q"}"#,
        )
        .unwrap();
        let inputs = fixture(vec![("3", problem(2))], attacks, vec![prediction]);

        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        assert_eq!(report.result.correct, 1);
        assert_eq!(report.result.results[&ProblemId::from("3")], 0);
        let json = serde_json::to_string(&report.result.results).unwrap();
        assert_eq!(json, r#"{"3":0}"#);
    }

    #[test]
    fn test_multimodal_flag_from_prompt() {
        let mut pred = prediction("1", "The answer is A.");
        pred.prompt = "<image>\nWhich animal?".to_string();
        let inputs = fixture(vec![("1", problem(2))], vec![attack("1", 0)], vec![pred]);
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        assert!(report.analysis.correct[0].is_multimodal);
        assert_eq!(report.analysis.correct[0].question, "<image>\nWhich animal?");
    }

    #[test]
    fn test_result_serializes_in_field_order() {
        let inputs = fixture(
            vec![("1", problem(2))],
            vec![attack("1", 0)],
            vec![prediction("1", "The answer is A.")],
        );
        let report = score_split(&inputs, &OptionAlphabet::default(), &mut rng()).unwrap();
        let json = serde_json::to_string(&report.result).unwrap();
        assert_eq!(
            json,
            r#"{"acc":100.0,"correct":1,"count":1,"results":{"1":0},"outputs":{"1":"The answer is A."}}"#
        );
    }
}
