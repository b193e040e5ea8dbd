use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Run configuration.
///
/// Every key mirrors a command-line flag; flags given on the command line win.
///
/// Example YAML:
/// ```yaml
/// base_dir: data/scienceqa
/// result_file: answers/test_answers.jsonl
/// attack_file: attacks/flip_gt.json
/// output_file: out/analysis.json
/// output_result: out/result.json
/// options: ABCDE
/// seed: 1234
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding problems.json
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Line-delimited model predictions
    #[serde(default)]
    pub result_file: Option<PathBuf>,

    /// JSON array of ground-truth overrides
    #[serde(default)]
    pub attack_file: Option<PathBuf>,

    /// Destination of the correct/incorrect analysis dump
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    /// Destination of the aggregate result
    #[serde(default)]
    pub output_result: Option<PathBuf>,

    /// Answer label alphabet, one label per character (default: ABCDE)
    #[serde(default)]
    pub options: Option<String>,

    /// Seed for the random fallback. Unset means a fresh seed per run.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Layer `overrides` on top of `self`; any key set in `overrides` wins.
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            base_dir: overrides.base_dir.or(self.base_dir),
            result_file: overrides.result_file.or(self.result_file),
            attack_file: overrides.attack_file.or(self.attack_file),
            output_file: overrides.output_file.or(self.output_file),
            output_result: overrides.output_result.or(self.output_result),
            options: overrides.options.or(self.options),
            seed: overrides.seed.or(self.seed),
        }
    }
}
