//! Small tensor helpers shared by postprocessing code.

/// Returns the index and value of the maximum element.
///
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |acc, (idx, val)| match acc {
            Some((_, best)) if best >= val => acc,
            _ => Some((idx, val)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_finds_maximum() {
        assert_eq!(argmax(&[0.1, 0.9, 0.5]), Some((1, 0.9)));
    }

    #[test]
    fn test_argmax_empty_is_none() {
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
    }
}
