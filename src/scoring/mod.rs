pub mod engine;
pub mod extract;
pub mod resolve;

pub use engine::{
    join_split, score_split, AggregateResult, Analysis, AnalysisRecord, ScoreReport, SplitEntry,
};
pub use extract::{extract_answer, ParsedAnswer, FAILED};
pub use resolve::{resolve_index, OptionAlphabet, Resolution};
