//! Top-k extraction for classification outputs.

use crate::core::errors::{VisionError, VisionResult};
use itertools::Itertools;
use ndarray::ArrayView2;

/// Result of top-k processing over a batch of classification outputs.
#[derive(Debug, Clone)]
pub struct TopkResult {
    /// Top-k class indexes per prediction, best first.
    pub indexes: Vec<Vec<usize>>,
    /// Scores aligned with `indexes`.
    pub scores: Vec<Vec<f32>>,
    /// Class names aligned with `indexes`, if a table was provided.
    pub class_names: Option<Vec<Vec<String>>>,
}

/// Extracts the top-k most confident classes from classification outputs.
#[derive(Debug, Clone)]
pub struct Topk {
    class_names: Option<Vec<String>>,
}

impl Topk {
    /// Creates a processor with a class-name table (index = class ID).
    pub fn with_class_names(class_names: Vec<String>) -> Self {
        Self {
            class_names: Some(class_names),
        }
    }

    /// Creates a processor without class names.
    pub fn without_class_names() -> Self {
        Self { class_names: None }
    }

    /// Applies softmax to each row and extracts the top `k` classes.
    ///
    /// Input is `[batch, classes]` raw logits.
    pub fn apply(&self, logits: ArrayView2<'_, f32>, k: usize) -> VisionResult<TopkResult> {
        if k == 0 {
            return Err(VisionError::config_error("top_k must be greater than 0"));
        }
        let classes = logits.ncols();
        if classes == 0 {
            return Err(VisionError::invalid_input(
                "classification output has zero classes",
            ));
        }

        let mut indexes = Vec::with_capacity(logits.nrows());
        let mut scores = Vec::with_capacity(logits.nrows());
        let mut names: Option<Vec<Vec<String>>> =
            self.class_names.as_ref().map(|_| Vec::with_capacity(logits.nrows()));

        for row in logits.rows() {
            let probs = softmax(row.as_slice().unwrap_or(&row.to_vec()));
            let top: Vec<(usize, f32)> = probs
                .iter()
                .copied()
                .enumerate()
                .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
                .take(k.min(classes))
                .collect();

            if let (Some(table), Some(names)) = (self.class_names.as_ref(), names.as_mut()) {
                names.push(
                    top.iter()
                        .map(|&(idx, _)| {
                            table
                                .get(idx)
                                .cloned()
                                .unwrap_or_else(|| format!("class_{idx}"))
                        })
                        .collect(),
                );
            }
            indexes.push(top.iter().map(|&(idx, _)| idx).collect());
            scores.push(top.iter().map(|&(_, s)| s).collect());
        }

        Ok(TopkResult {
            indexes,
            scores,
            class_names: names,
        })
    }
}

/// Numerically-stable softmax over a logit slice.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 {
        vec![1.0 / logits.len().max(1) as f32; logits.len()]
    } else {
        exps.into_iter().map(|e| e / sum).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_topk_orders_by_score() {
        let logits = array![[0.1f32, 3.0, 1.0, 2.0]];
        let topk = Topk::without_class_names();
        let result = topk.apply(logits.view(), 2).unwrap();
        assert_eq!(result.indexes[0], vec![1, 3]);
        assert!(result.scores[0][0] > result.scores[0][1]);
    }

    #[test]
    fn test_topk_with_names_falls_back_for_missing() {
        let logits = array![[0.0f32, 5.0, 1.0]];
        let topk = Topk::with_class_names(vec!["cat".into(), "dog".into()]);
        let result = topk.apply(logits.view(), 3).unwrap();
        let names = result.class_names.unwrap();
        assert_eq!(names[0][0], "dog");
        // index 2 has no table entry
        assert_eq!(names[0][1], "class_2");
    }

    #[test]
    fn test_topk_zero_k_is_config_error() {
        let logits = array![[0.0f32, 1.0]];
        let topk = Topk::without_class_names();
        assert!(topk.apply(logits.view(), 0).is_err());
    }

    #[test]
    fn test_topk_clamps_k_to_class_count() {
        let logits = array![[0.0f32, 1.0]];
        let topk = Topk::without_class_names();
        let result = topk.apply(logits.view(), 10).unwrap();
        assert_eq!(result.indexes[0].len(), 2);
    }
}
