//! crates/em_pipeline/src/score.rs
//! Scoring stage: always against the original tables held by the store.

use em_algo::{score_assignment, Assignment, PreferenceStore, ScoreReport};
use em_core::ApplicantId;

use crate::PipelineError;

/// Score a produced assignment; an empty one (nobody eligible) has no score.
pub fn score_if_any(
    store: &PreferenceStore,
    assignment: &Assignment,
    normalize: bool,
) -> Result<Option<ScoreReport>, PipelineError> {
    if assignment.is_empty() {
        tracing::warn!("empty assignment, skipping score");
        return Ok(None);
    }
    Ok(Some(score_assignment(store, assignment, normalize)?))
}

/// Score an assignment read from elsewhere (another run, an external solver).
pub fn score_external(
    store: &PreferenceStore,
    assignment: &Assignment,
    normalize: bool,
) -> Result<ScoreReport, PipelineError> {
    let missing = missing_applicants(store, assignment).len();
    if missing > 0 {
        tracing::warn!(missing, "assignment leaves eligible applicants unplaced");
    }
    Ok(score_assignment(store, assignment, normalize)?)
}

/// Eligible applicants the assignment does not place, preference-table order.
pub fn missing_applicants(store: &PreferenceStore, assignment: &Assignment) -> Vec<ApplicantId> {
    store
        .profiles()
        .iter()
        .filter(|p| !assignment.contains_key(&p.id))
        .map(|p| p.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use em_algo::ScoreError;
    use em_core::GroupCode;

    use crate::{fixtures, load};

    #[test]
    fn external_assignment_with_stranger_fails() {
        let t = fixtures::tables(
            fixtures::TWO_GROUP_VACANCIES,
            fixtures::TWO_GROUP_PREFERENCES,
            fixtures::TWO_GROUP_RATINGS,
            true,
        );
        let (store, _) = load::build_store(&t).unwrap();
        let mut a = Assignment::new();
        a.insert("nobody".parse().unwrap(), GroupCode::A);
        assert!(matches!(
            score_external(&store, &a, false),
            Err(PipelineError::Scoring(ScoreError::UnknownApplicant(_)))
        ));
        assert_eq!(score_if_any(&store, &Assignment::new(), false).unwrap(), None);
    }

    #[test]
    fn missing_applicants_in_table_order() {
        let t = fixtures::tables(
            fixtures::TWO_GROUP_VACANCIES,
            fixtures::TWO_GROUP_PREFERENCES,
            fixtures::TWO_GROUP_RATINGS,
            true,
        );
        let (store, _) = load::build_store(&t).unwrap();
        let mut a = Assignment::new();
        assert_eq!(
            missing_applicants(&store, &a),
            vec!["x1".parse::<ApplicantId>().unwrap(), "x2".parse().unwrap()]
        );
        a.insert("x2".parse().unwrap(), GroupCode::B);
        assert_eq!(missing_applicants(&store, &a), vec!["x1".parse::<ApplicantId>().unwrap()]);
        a.insert("x1".parse().unwrap(), GroupCode::A);
        assert!(missing_applicants(&store, &a).is_empty());
    }
}
