use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::scoring::AggregateResult;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format the one-line run summary:
/// "Total: {count}, Correct: {correct}, Accuracy: {acc:.2}%"
pub fn format_summary(result: &AggregateResult, use_colors: bool) -> String {
    let accuracy = format!("{:.2}%", result.acc);
    if use_colors {
        format!(
            "Total: {}, Correct: {}, Accuracy: {}",
            result.count.cyan(),
            result.correct.green(),
            accuracy.bold()
        )
    } else {
        format!(
            "Total: {}, Correct: {}, Accuracy: {}",
            result.count, result.correct, accuracy
        )
    }
}
