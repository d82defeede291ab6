//! Chroma averaging over frame ranges

use super::normalization::l1_normalize;
use std::ops::Range;

/// Mean chroma over `range` (clamped to the available frames), L1-normalized
///
/// Returns all zeros for an empty range.
pub fn average_chroma(chroma: &[[f32; 12]], range: Range<usize>) -> [f32; 12] {
    let end = range.end.min(chroma.len());
    let start = range.start.min(end);
    let mut avg = [0.0f32; 12];
    for frame in &chroma[start..end] {
        for (a, &c) in avg.iter_mut().zip(frame) {
            *a += c;
        }
    }
    l1_normalize(&mut avg);
    avg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_chroma() {
        let mut a = [0.0f32; 12];
        a[0] = 1.0;
        let mut b = [0.0f32; 12];
        b[4] = 1.0;
        let avg = average_chroma(&[a, b], 0..2);
        assert!((avg[0] - 0.5).abs() < 1e-6);
        assert!((avg[4] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut a = [0.0f32; 12];
        a[7] = 1.0;
        let avg = average_chroma(&[a], 0..10);
        assert!((avg[7] - 1.0).abs() < 1e-6);
        assert!(average_chroma(&[a], 5..10).iter().all(|v| *v == 0.0));
    }
}
