use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::tokenize;

/// Outcome of evaluating a multi-term query.
///
/// `PartialMiss` and `EmptyQuery` are ordinary results, not errors: a term
/// that was never indexed is part of expected evaluation flow and carries
/// the offending term for the caller to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Intersection of all query terms, ascending by document ID.
    Hits(Vec<DocId>),
    /// At least one term was never indexed; evaluation stopped there.
    PartialMiss(String),
    /// The query tokenized to nothing.
    EmptyQuery,
}

/// Evaluate `query` as an AND over its terms.
///
/// The query goes through the same tokenizer as documents, so a term is
/// found exactly when it would have been found inside an indexed document.
/// Terms are looked up left to right; the first unknown term short-circuits
/// with no partial intersection computed.
pub fn evaluate(index: &InvertedIndex, query: &str) -> QueryOutcome {
    let terms = tokenize(query);
    if terms.is_empty() {
        return QueryOutcome::EmptyQuery;
    }

    let mut sets = Vec::with_capacity(terms.len());
    for term in &terms {
        match index.lookup_term(term) {
            Some(ids) => sets.push(ids),
            None => return QueryOutcome::PartialMiss(term.clone()),
        }
    }

    let (first, rest) = sets.split_first().expect("at least one term");
    let hits = first
        .iter()
        .copied()
        .filter(|id| rest.iter().all(|s| s.contains(id)))
        .collect();
    QueryOutcome::Hits(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> InvertedIndex {
        let mut idx = InvertedIndex::new();
        idx.add_document(0, "Python is great").unwrap();
        idx.add_document(1, "Python is essential").unwrap();
        idx.add_document(2, "Great minds").unwrap();
        idx
    }

    #[test]
    fn intersection_across_terms() {
        let idx = sample_index();
        assert_eq!(evaluate(&idx, "python great"), QueryOutcome::Hits(vec![0]));
    }

    #[test]
    fn single_term_hits() {
        let idx = sample_index();
        assert_eq!(evaluate(&idx, "minds"), QueryOutcome::Hits(vec![2]));
        assert_eq!(evaluate(&idx, "python"), QueryOutcome::Hits(vec![0, 1]));
    }

    #[test]
    fn unknown_term_short_circuits() {
        let idx = sample_index();
        assert_eq!(
            evaluate(&idx, "python unknown great"),
            QueryOutcome::PartialMiss("unknown".to_string())
        );
    }

    #[test]
    fn known_terms_with_empty_intersection_are_hits_not_miss() {
        let idx = sample_index();
        assert_eq!(evaluate(&idx, "essential minds"), QueryOutcome::Hits(vec![]));
    }

    #[test]
    fn empty_query_is_tagged() {
        let idx = sample_index();
        assert_eq!(evaluate(&idx, ""), QueryOutcome::EmptyQuery);
        assert_eq!(evaluate(&idx, "  ,,, "), QueryOutcome::EmptyQuery);
    }

    #[test]
    fn query_normalization_matches_document_normalization() {
        let idx = sample_index();
        assert_eq!(evaluate(&idx, "PYTHON, Great!"), QueryOutcome::Hits(vec![0]));
    }
}
