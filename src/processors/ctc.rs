//! Greedy CTC decoding for sequence heads.
//!
//! Recognition models emit `[timesteps, classes]` logits where class 0 is
//! the CTC blank. Decoding takes the argmax per timestep, collapses repeats,
//! drops blanks, and maps the remaining indexes through a character table.

use crate::core::errors::{VisionError, VisionResult};
use ndarray::ArrayView2;
use once_cell::sync::Lazy;

/// Printable ASCII characters, the default table for text recognition heads.
static ASCII_CHARSET: Lazy<Vec<String>> = Lazy::new(|| {
    (32u8..127).map(|b| (b as char).to_string()).collect()
});

/// Digits plus uppercase letters and common separators, the default table
/// for barcode payload heads.
static BARCODE_CHARSET: Lazy<Vec<String>> = Lazy::new(|| {
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-.$/+% "
        .chars()
        .map(|c| c.to_string())
        .collect()
});

/// Decodes sequence-head logits into strings via greedy CTC.
#[derive(Debug, Clone)]
pub struct SequenceDecoder {
    /// Character table; entry `i` maps class `i + 1` (class 0 is blank).
    charset: Vec<String>,
}

impl SequenceDecoder {
    /// Creates a decoder over a custom character table.
    ///
    /// # Errors
    ///
    /// Returns `VisionError::ConfigError` if the table is empty.
    pub fn new(charset: Vec<String>) -> VisionResult<Self> {
        if charset.is_empty() {
            return Err(VisionError::config_error(
                "sequence decoder charset must not be empty",
            ));
        }
        Ok(Self { charset })
    }

    /// Creates a decoder over printable ASCII.
    pub fn ascii() -> Self {
        Self {
            charset: ASCII_CHARSET.clone(),
        }
    }

    /// Creates a decoder over the barcode payload alphabet.
    pub fn barcode() -> Self {
        Self {
            charset: BARCODE_CHARSET.clone(),
        }
    }

    /// Returns the number of classes the head must emit (charset + blank).
    pub fn class_count(&self) -> usize {
        self.charset.len() + 1
    }

    /// Decodes `[timesteps, classes]` logits into a string and a mean
    /// per-character confidence.
    ///
    /// Returns an empty string with zero confidence when every timestep is
    /// blank.
    pub fn decode(&self, logits: ArrayView2<'_, f32>) -> VisionResult<(String, f32)> {
        let classes = logits.ncols();
        if classes < 2 {
            return Err(VisionError::decode_error(format!(
                "sequence head must emit at least 2 classes, got {classes}"
            )));
        }

        let mut text = String::new();
        let mut confidences: Vec<f32> = Vec::new();
        let mut previous: Option<usize> = None;

        for row in logits.rows() {
            let (best_idx, best_val) = row.iter().copied().enumerate().fold(
                (0usize, f32::NEG_INFINITY),
                |acc, (idx, val)| if val > acc.1 { (idx, val) } else { acc },
            );

            // Collapse repeated emissions of the same class.
            if previous == Some(best_idx) {
                continue;
            }
            previous = Some(best_idx);

            if best_idx == 0 {
                continue;
            }
            let entry = self.charset.get(best_idx - 1).ok_or_else(|| {
                VisionError::decode_error(format!(
                    "class index {best_idx} outside charset of {} entries",
                    self.charset.len()
                ))
            })?;
            text.push_str(entry);
            confidences.push(sigmoid_like_confidence(row.as_slice(), best_val));
        }

        let confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };
        Ok((text, confidence))
    }
}

/// Converts a winning logit into a softmax probability over its row.
fn sigmoid_like_confidence(row: Option<&[f32]>, best: f32) -> f32 {
    match row {
        Some(row) => {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let sum: f32 = row.iter().map(|&v| (v - max).exp()).sum();
            if sum > 0.0 { ((best - max).exp()) / sum } else { 0.0 }
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn logits_for(sequence: &[usize], classes: usize) -> Array2<f32> {
        let mut arr = Array2::from_elem((sequence.len(), classes), -10.0f32);
        for (t, &c) in sequence.iter().enumerate() {
            arr[[t, c]] = 10.0;
        }
        arr
    }

    #[test]
    fn test_decode_collapses_repeats_and_blanks() {
        let decoder =
            SequenceDecoder::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        // classes: 0=blank, 1=a, 2=b, 3=c
        let logits = logits_for(&[1, 1, 0, 2, 2, 0, 0, 3], 4);
        let (text, confidence) = decoder.decode(logits.view()).unwrap();
        assert_eq!(text, "abc");
        assert!(confidence > 0.9);
    }

    #[test]
    fn test_decode_all_blank_is_empty() {
        let decoder = SequenceDecoder::ascii();
        let logits = logits_for(&[0, 0, 0], decoder.class_count());
        let (text, confidence) = decoder.decode(logits.view()).unwrap();
        assert!(text.is_empty());
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_decode_repeat_after_blank_emits_twice() {
        let decoder = SequenceDecoder::new(vec!["x".into()]).unwrap();
        let logits = logits_for(&[1, 0, 1], 2);
        let (text, _) = decoder.decode(logits.view()).unwrap();
        assert_eq!(text, "xx");
    }

    #[test]
    fn test_empty_charset_rejected() {
        assert!(SequenceDecoder::new(vec![]).is_err());
    }

    #[test]
    fn test_barcode_charset_digits() {
        let decoder = SequenceDecoder::barcode();
        // "42" = digits at charset positions 4 and 2 -> classes 5 and 3
        let logits = logits_for(&[5, 0, 3], decoder.class_count());
        let (text, _) = decoder.decode(logits.view()).unwrap();
        assert_eq!(text, "42");
    }
}
