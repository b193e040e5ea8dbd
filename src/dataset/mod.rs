pub mod loader;
pub mod types;

pub use loader::{
    index_predictions, load_attacks, load_predictions, load_problems, InputPaths, Inputs,
    PROBLEMS_FILE,
};
pub use types::{AttackRecord, Prediction, Problem, ProblemId, IMAGE_TOKEN};
