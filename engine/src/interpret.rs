//! Arg-max over a model's class vector.

use serde::Serialize;

use crate::error::{InterpretError, InterpretReason};
use crate::labels::LabelTable;
use crate::output::OutputTensor;

/// The highest-scoring class of one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub class_index: usize,
    pub class_name: String,
    /// The raw output value at `class_index`. Expected in `[0, 1]` when the
    /// model ends in a softmax; not rescaled here.
    pub confidence: f32,
}

/// Picks the arg-max class from `output`.
///
/// The class vector is the last dimension; every leading dimension must be 1
/// and the rank must be 2 or 3. Ties go to the lowest index. NaN scores never
/// win.
pub fn interpret(
    output: &OutputTensor,
    labels: &LabelTable,
) -> Result<ClassificationResult, InterpretError> {
    let shape = output.shape();
    if !(2..=3).contains(&shape.len()) {
        return Err(InterpretError::new(
            InterpretReason::RankMismatch,
            format!("expected rank 2 or 3, got shape {shape:?}"),
        ));
    }
    if shape[..shape.len() - 1].iter().any(|&d| d != 1) {
        return Err(InterpretError::new(
            InterpretReason::RankMismatch,
            format!("leading dimensions must be 1, got shape {shape:?}"),
        ));
    }

    let scores = output.values();
    if scores.len() != labels.len() {
        return Err(InterpretError::new(
            InterpretReason::LabelCountMismatch,
            format!("{} scores for {} labels", scores.len(), labels.len()),
        ));
    }
    if scores.is_empty() {
        return Err(InterpretError::new(
            InterpretReason::LabelCountMismatch,
            "empty class vector",
        ));
    }

    let mut best = 0;
    for (i, &v) in scores.iter().enumerate().skip(1) {
        if v > scores[best] || scores[best].is_nan() {
            best = i;
        }
    }

    Ok(ClassificationResult {
        class_index: best,
        class_name: labels.get(best).unwrap_or_default().to_string(),
        confidence: scores[best],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> LabelTable {
        LabelTable::new((0..n).map(|i| format!("class{i}")).collect())
    }

    fn output(shape: Vec<usize>, values: Vec<f32>) -> OutputTensor {
        OutputTensor::new(shape, values).unwrap()
    }

    #[test]
    fn tie_goes_to_first() {
        let r = interpret(&output(vec![1, 4], vec![0.5, 0.9, 0.9, 0.1]), &labels(4)).unwrap();
        assert_eq!(r.class_index, 1);
        assert_eq!(r.class_name, "class1");
        assert_eq!(r.confidence, 0.9);
    }

    #[test]
    fn picks_last_when_largest() {
        let r = interpret(&output(vec![1, 3], vec![0.1, 0.2, 0.7]), &labels(3)).unwrap();
        assert_eq!(r.class_index, 2);
    }

    #[test]
    fn rank_three_with_unit_leading_dims() {
        let r = interpret(&output(vec![1, 1, 3], vec![0.6, 0.3, 0.1]), &labels(3)).unwrap();
        assert_eq!(r.class_index, 0);
    }

    #[test]
    fn rank_mismatch() {
        for (shape, values) in [
            (vec![4], vec![0.0; 4]),
            (vec![1, 1, 1, 4], vec![0.0; 4]),
            (vec![2, 2], vec![0.0; 4]),
        ] {
            let err = interpret(&output(shape.clone(), values), &labels(4)).unwrap_err();
            assert_eq!(err.reason, InterpretReason::RankMismatch, "{shape:?}");
        }
    }

    #[test]
    fn label_count_mismatch() {
        let err = interpret(&output(vec![1, 4], vec![0.0; 4]), &labels(5)).unwrap_err();
        assert_eq!(err.reason, InterpretReason::LabelCountMismatch);
        let err = interpret(&output(vec![1, 0], Vec::new()), &labels(0)).unwrap_err();
        assert_eq!(err.reason, InterpretReason::LabelCountMismatch);
    }

    #[test]
    fn nan_never_wins() {
        let r = interpret(
            &output(vec![1, 3], vec![f32::NAN, 0.2, f32::NAN]),
            &labels(3),
        )
        .unwrap();
        assert_eq!(r.class_index, 1);
    }
}
