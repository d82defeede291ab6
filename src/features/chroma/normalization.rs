//! Chroma normalization and comparison

use crate::features::spectrum::EPSILON;

/// Scale a vector so its elements sum to 1 (no-op for an all-zero vector)
pub fn l1_normalize(values: &mut [f32]) {
    let sum: f32 = values.iter().map(|v| v.abs()).sum();
    if sum > EPSILON {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

/// Cosine similarity of two vectors (0.0 when either has no energy)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= EPSILON || nb <= EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}

/// Rotate a chroma vector up by `semitones` (element `pc` moves to `pc + semitones`)
pub fn rotate_chroma(chroma: &[f32; 12], semitones: u8) -> [f32; 12] {
    let mut out = [0.0f32; 12];
    for (pc, &value) in chroma.iter().enumerate() {
        out[(pc + semitones as usize) % 12] = value;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l1_normalize() {
        let mut v = [1.0, 3.0, 0.0, 0.0];
        l1_normalize(&mut v);
        assert_eq!(v, [0.25, 0.75, 0.0, 0.0]);

        let mut zeros = [0.0f32; 12];
        l1_normalize(&mut zeros);
        assert!(zeros.iter().all(|v| *v == 0.0 && v.is_finite()));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rotate_chroma() {
        let mut c = [0.0f32; 12];
        c[11] = 1.0;
        let r = rotate_chroma(&c, 2);
        assert_eq!(r[1], 1.0);
    }
}
