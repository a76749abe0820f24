//! Relevance filtering of retrieval candidates.

use crate::models::RetrievalCandidate;

/// Payload field holding the passage text.
pub const SOURCE_FIELD: &str = "source";

/// Keep the `source` text of every candidate scoring at least `min_score`.
///
/// The threshold is a hard cutoff, and a `NaN` score never passes it. Candidates whose payload has no string
/// `source` are dropped without failing the request; the count is logged at
/// debug level. Candidate order is preserved. An empty result is the
/// normal "no grounding available" case.
pub fn filter_relevant(candidates: &[RetrievalCandidate], min_score: f32) -> Vec<String> {
    let mut context = Vec::new();
    let mut below_threshold = 0usize;
    let mut malformed = 0usize;

    for candidate in candidates {
        // NaN never clears the threshold.
        if candidate.score.is_nan() || candidate.score < min_score {
            below_threshold += 1;
            continue;
        }
        match candidate.payload.get(SOURCE_FIELD).and_then(|v| v.as_str()) {
            Some(text) => context.push(text.to_string()),
            None => malformed += 1,
        }
    }

    if malformed > 0 {
        tracing::debug!(malformed, "Dropped candidates without a string source payload");
    }
    tracing::debug!(
        kept = context.len(),
        below_threshold,
        min_score,
        "Filtered retrieval candidates"
    );

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(id: &str, score: f32, payload: serde_json::Value) -> RetrievalCandidate {
        RetrievalCandidate {
            id: id.to_string(),
            score,
            payload: payload.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_threshold_is_hard_cutoff() {
        let candidates = vec![
            candidate("a", 0.9, json!({"source": "A"})),
            candidate("b", 0.4, json!({"source": "B"})),
            candidate("c", 0.2, json!({"source": "C"})),
        ];
        assert_eq!(filter_relevant(&candidates, 0.5), vec!["A"]);
    }

    #[test]
    fn test_score_equal_to_threshold_is_kept() {
        let candidates = vec![candidate("a", 0.5, json!({"source": "A"}))];
        assert_eq!(filter_relevant(&candidates, 0.5), vec!["A"]);
    }

    #[test]
    fn test_nan_score_dropped() {
        let candidates = vec![
            candidate("a", f32::NAN, json!({"source": "not comparable"})),
            candidate("b", 0.7, json!({"source": "B"})),
        ];
        assert_eq!(filter_relevant(&candidates, 0.5), vec!["B"]);
        assert_eq!(filter_relevant(&candidates, f32::NEG_INFINITY), vec!["B"]);
    }

    #[test]
    fn test_malformed_payloads_dropped() {
        let candidates = vec![
            candidate("a", 0.9, json!({"text": "no source field"})),
            candidate("b", 0.9, json!({"source": 42})),
            candidate("c", 0.9, json!({"source": null})),
            candidate("d", 0.8, json!({"source": "kept"})),
        ];
        assert_eq!(filter_relevant(&candidates, 0.1), vec!["kept"]);
    }

    #[test]
    fn test_order_preserved() {
        let candidates = vec![
            candidate("a", 0.6, json!({"source": "first"})),
            candidate("b", 0.95, json!({"source": "second"})),
            candidate("c", 0.7, json!({"source": "third"})),
        ];
        assert_eq!(
            filter_relevant(&candidates, 0.5),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_nothing_qualifies() {
        let candidates = vec![candidate("a", 0.1, json!({"source": "A"}))];
        assert!(filter_relevant(&candidates, 0.5).is_empty());
        assert!(filter_relevant(&[], 0.5).is_empty());
    }

    #[test]
    fn test_never_returns_below_threshold() {
        let scores = [0.0, 0.1, 0.25, 0.49, 0.5, 0.51, 0.75, 1.0];
        let candidates: Vec<RetrievalCandidate> = scores
            .iter()
            .map(|s| candidate(&s.to_string(), *s, json!({"source": s.to_string()})))
            .collect();
        for min in [0.0f32, 0.3, 0.5, 0.9, 1.1] {
            let kept = filter_relevant(&candidates, min);
            let expected: Vec<String> = scores
                .iter()
                .filter(|s| **s >= min)
                .map(|s| s.to_string())
                .collect();
            assert_eq!(kept, expected, "min_score = {}", min);
        }
    }
}
