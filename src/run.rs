use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::ScoreSettings;
use crate::dataset::Inputs;
use crate::error::ScoreError;
use crate::output::write_json_pretty;
use crate::scoring::{score_split, ScoreReport};

/// Pick the run seed: the configured one, or a fresh random one.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

/// Generator behind the random fallback
pub fn fallback_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Load every input named in `settings` and score the split.
pub fn load_and_score(
    settings: &ScoreSettings,
    rng: &mut impl Rng,
) -> Result<ScoreReport, ScoreError> {
    let inputs = Inputs::load(settings.inputs.clone())?;
    score_split(&inputs, &settings.alphabet, rng)
}

/// Write the analysis dump, then the aggregate result.
pub fn write_reports(settings: &ScoreSettings, report: &ScoreReport) -> Result<()> {
    write_json_pretty(&settings.output_file, &report.analysis)?;
    debug!(path = %settings.output_file.display(), "Wrote analysis");

    write_json_pretty(&settings.output_result, &report.result)?;
    debug!(path = %settings.output_result.display(), "Wrote result");

    Ok(())
}
