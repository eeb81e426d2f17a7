use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Scoring function an index ranks its entries by. Fixed per index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    L2,
    #[serde(rename = "ip")]
    InnerProduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::L2 => "l2",
            Metric::InnerProduct => "ip",
        }
    }

    /// Similarity of `candidate` to `query`; higher is always closer.
    ///
    /// Callers guarantee equal, non-zero lengths.
    pub fn score(&self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(query, candidate),
            Metric::InnerProduct => dot(query, candidate),
            Metric::L2 => -squared_l2(query, candidate),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "cosine" => Ok(Metric::Cosine),
            "l2" => Ok(Metric::L2),
            "ip" => Ok(Metric::InnerProduct),
            other => Err(format!("unknown metric '{}' (expected cosine, l2 or ip)", other)),
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot(a, b) / denom
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Sorts by descending score. Stable, so equal scores keep their input order.
///
/// A NaN score (overflowing vectors, for example) ranks below every number.
pub fn sort_descending<T>(items: &mut [T], score: impl Fn(&T) -> f32) {
    let key = |item: &T| {
        let value = score(item);
        if value.is_nan() {
            f32::NEG_INFINITY
        } else {
            value
        }
    };
    items.sort_by(|left, right| key(right).total_cmp(&key(left)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(Metric::Cosine.score(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        assert!(approx_eq(Metric::Cosine.score(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn l2_score_prefers_nearer_vectors() {
        let query = [0.0, 0.0];
        let near = Metric::L2.score(&query, &[1.0, 0.0]);
        let far = Metric::L2.score(&query, &[3.0, 4.0]);
        assert!(approx_eq(near, -1.0));
        assert!(approx_eq(far, -25.0));
        assert!(near > far);
    }

    #[test]
    fn inner_product_is_unnormalized() {
        assert!(approx_eq(Metric::InnerProduct.score(&[2.0, 1.0], &[3.0, 4.0]), 10.0));
    }

    #[test]
    fn sort_descending_is_stable_for_ties() {
        let mut items = vec![("a", 0.5), ("b", 0.9), ("c", 0.5)];
        sort_descending(&mut items, |item| item.1);
        let ids: Vec<&str> = items.iter().map(|item| item.0).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn nan_scores_rank_last_without_disturbing_the_rest() {
        let mut items = vec![("nan", f32::NAN), ("low", -3.0), ("high", 0.7), ("mid", 0.2)];
        sort_descending(&mut items, |item| item.1);
        let ids: Vec<&str> = items.iter().map(|item| item.0).collect();
        assert_eq!(ids, vec!["high", "mid", "low", "nan"]);
    }

    #[test]
    fn cosine_of_overflowing_vectors_is_nan() {
        assert!(Metric::Cosine.score(&[1.0, 1.0], &[3e38, 3e38]).is_nan());
    }

    #[test]
    fn metric_names_round_trip_through_serde() {
        let parsed: Metric = serde_json::from_str("\"ip\"").unwrap();
        assert_eq!(parsed, Metric::InnerProduct);
        assert_eq!("l2".parse::<Metric>().unwrap(), Metric::L2);
        assert!("manhattan".parse::<Metric>().is_err());
    }
}
