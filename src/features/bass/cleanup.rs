//! Bass sequence cleanup

/// Discard bass values on frames quieter than `threshold`
pub fn gate_by_energy(bass: &mut [Option<u8>], energy: &[f32], threshold: f32) {
    let mut gated = 0usize;
    for (b, &e) in bass.iter_mut().zip(energy) {
        if b.is_some() && e < threshold {
            *b = None;
            gated += 1;
        }
    }
    log::trace!("Energy gate {:.6} removed {} bass values", threshold, gated);
}

/// Remove bass values that disagree with both neighbouring frames
///
/// The decision uses the sequence as it was before cleanup, so removals never
/// cascade. The first and last frames have a single neighbour and are kept.
pub fn remove_isolated_outliers(bass: &[Option<u8>]) -> Vec<Option<u8>> {
    let mut cleaned = bass.to_vec();
    if bass.len() < 3 {
        return cleaned;
    }
    for i in 1..bass.len() - 1 {
        if let Some(pc) = bass[i] {
            if bass[i - 1] != Some(pc) && bass[i + 1] != Some(pc) {
                cleaned[i] = None;
            }
        }
    }
    cleaned
}
