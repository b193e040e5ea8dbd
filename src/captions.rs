//! Conversion of model predictions into the `{image_id, caption}` layout used
//! by caption-evaluation tooling.

use serde::Serialize;

use crate::dataset::Prediction;
use crate::error::InputFault;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Caption {
    pub image_id: i64,
    pub caption: String,
}

/// Convert predictions to captions in input order. Every question id must be
/// an integer.
pub fn convert_captions(predictions: &[Prediction]) -> Result<Vec<Caption>, InputFault> {
    predictions
        .iter()
        .map(|pred| {
            pred.question_id
                .as_integer()
                .map(|image_id| Caption {
                    image_id,
                    caption: pred.text.clone(),
                })
                .ok_or_else(|| InputFault::NonNumericId(pred.question_id.clone()))
        })
        .collect()
}
