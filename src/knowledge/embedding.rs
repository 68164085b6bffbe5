//! Hashed bag-of-words vectors.
//!
//! Each whitespace token is hashed with a 32-bit rolling hash into one of
//! [`EMBEDDING_DIMS`] buckets; bucket counts are then L2-normalized. The
//! result is deterministic for identical input but carries no learned
//! semantics.

/// Dimension of every node embedding.
pub const EMBEDDING_DIMS: usize = 100;

/// 32-bit rolling hash (`h = h * 31 + unit`, wrapping) over UTF-16 code units.
pub fn token_hash(token: &str) -> i32 {
    token.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32)
    })
}

/// Bucket a token hashes into.
pub fn token_bucket(token: &str) -> usize {
    (token_hash(token).unsigned_abs() as usize) % EMBEDDING_DIMS
}

/// Vectorize text. Tokens are lowercased before hashing; text without
/// tokens yields the zero vector.
pub fn simple_text_to_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIMS];

    for token in text.split_whitespace() {
        vector[token_bucket(&token.to_lowercase())] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
    vector
}

/// Cosine similarity of two vectors; 0.0 if either is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn l2_norm(v: &[f32]) -> f64 {
        v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
    }

    #[test]
    fn test_known_hash() {
        // "a" is the single code unit 97
        assert_eq!(token_hash("a"), 97);
        assert_eq!(token_hash("ab"), 97 * 31 + 98);
        assert_eq!(token_hash(""), 0);
    }

    #[test]
    fn test_repeated_token_is_deterministic() {
        let first = simple_text_to_vector("battery battery");
        let second = simple_text_to_vector("battery battery");
        assert_eq!(first.len(), EMBEDDING_DIMS);
        assert!(first
            .iter()
            .zip(&second)
            .all(|(a, b)| a.to_bits() == b.to_bits()));

        // Both tokens land in the same bucket
        assert_eq!(first[token_bucket("battery")], 1.0);
        assert!((l2_norm(&first) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_input_is_zero_vector() {
        let vector = simple_text_to_vector("   \n\t ");
        assert_eq!(vector.len(), EMBEDDING_DIMS);
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            simple_text_to_vector("GPU Battery"),
            simple_text_to_vector("gpu battery")
        );
    }

    #[test]
    fn test_long_token_does_not_overflow() {
        let token = "x".repeat(10_000);
        assert!(token_bucket(&token) < EMBEDDING_DIMS);
    }

    #[test]
    fn test_cosine_similarity() {
        let a = simple_text_to_vector("gpu battery");
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &vec![0.0; EMBEDDING_DIMS]), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    proptest! {
        /// Non-empty input always yields a unit vector.
        #[test]
        fn vector_is_unit_length(words in prop::collection::vec("[a-zA-Z0-9]{1,12}", 1..40)) {
            let text = words.join(" ");
            let vector = simple_text_to_vector(&text);
            prop_assert!((l2_norm(&vector) - 1.0).abs() < 1e-6);
        }

        /// Word order does not change the vector.
        #[test]
        fn vector_ignores_order(words in prop::collection::vec("[a-z]{1,8}", 1..20)) {
            let forward = simple_text_to_vector(&words.join(" "));
            let mut reversed = words.clone();
            reversed.reverse();
            let backward = simple_text_to_vector(&reversed.join(" "));
            prop_assert_eq!(forward, backward);
        }
    }
}
