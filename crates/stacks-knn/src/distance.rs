//! Distance and similarity primitives.
//!
//! Callers are expected to have checked that both slices share a length;
//! the functions only assert it in debug builds.

/// Dot product of two vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Squared L2 norm.
pub fn norm_squared(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum()
}

/// Euclidean (L2) distance.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}

/// Cosine similarity in [-1.0, 1.0].
///
/// Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let magnitude = (norm_squared(a) * norm_squared(b)).sqrt();
    if magnitude == 0.0 {
        return 0.0;
    }
    dot(a, b) / magnitude
}

/// Cosine distance, `1 - cosine_similarity`, in [0.0, 2.0].
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
