//! Fallback vectorizer: a term-frequency / inverse-document-frequency space
//! built from exactly the two documents being compared.

use std::collections::HashMap;

/// Cosine similarity between two documents in a TF-IDF space fit on just
/// those documents, clipped into [0, 1] to absorb floating-point overshoot.
pub fn pairwise_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let tf_a = term_frequencies(&tokens_a);
    let tf_b = term_frequencies(&tokens_b);

    // Smoothed idf over the two-document corpus: ln((1+n)/(1+df)) + 1.
    let mut vocabulary: Vec<&str> = tf_a.keys().chain(tf_b.keys()).map(String::as_str).collect();
    vocabulary.sort_unstable();
    vocabulary.dedup();

    let mut vec_a = Vec::with_capacity(vocabulary.len());
    let mut vec_b = Vec::with_capacity(vocabulary.len());
    for term in &vocabulary {
        let in_a = tf_a.contains_key(*term);
        let in_b = tf_b.contains_key(*term);
        let df = usize::from(in_a) + usize::from(in_b);
        let idf = ((1.0 + 2.0) / (1.0 + df as f64)).ln() + 1.0;
        vec_a.push(tf_a.get(*term).copied().unwrap_or(0) as f64 * idf);
        vec_b.push(tf_b.get(*term).copied().unwrap_or(0) as f64 * idf);
    }

    cosine(&vec_a, &vec_b).clamp(0.0, 1.0)
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
