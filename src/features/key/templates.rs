//! Krumhansl-Kessler key templates
//!
//! Defines tonal profiles for 24 keys (12 major + 12 minor) by rotating the
//! C major and C minor probe-tone profiles.

/// Krumhansl-Kessler C major profile
pub const KK_MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler C minor profile
pub const KK_MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates (12 keys: C, C#, D, ..., B)
    pub major: [[f32; 12]; 12],

    /// Minor key templates (12 keys: C, C#, D, ..., B)
    pub minor: [[f32; 12]; 12],
}

impl KeyTemplates {
    /// Create key templates with Krumhansl-Kessler profiles
    pub fn new() -> Self {
        Self {
            major: std::array::from_fn(|tonic| rotate(&KK_MAJOR_PROFILE, tonic)),
            minor: std::array::from_fn(|tonic| rotate(&KK_MINOR_PROFILE, tonic)),
        }
    }

    /// Template for the major key on `tonic`
    pub fn get_major_template(&self, tonic: u8) -> &[f32; 12] {
        &self.major[tonic as usize % 12]
    }

    /// Template for the minor key on `tonic`
    pub fn get_minor_template(&self, tonic: u8) -> &[f32; 12] {
        &self.minor[tonic as usize % 12]
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}

/// `out[(i + tonic) % 12] = profile[i]`
fn rotate(profile: &[f32; 12], tonic: usize) -> [f32; 12] {
    let mut out = [0.0f32; 12];
    for (i, &v) in profile.iter().enumerate() {
        out[(i + tonic) % 12] = v;
    }
    out
}
