//! Plan composer
//!
//! Turns a candidate pool, a profile, exclusions and pins into a bounded plan
//! plus an alternate pool. Pure: all session mutation is the caller's job.

use chrono::NaiveTime;
use std::collections::HashSet;
use tracing::debug;

use crate::domain::{Candidate, CandidateId, PreferenceProfile};
use crate::scoring::{self, Score};

/// Maximum number of picks in a plan
pub const PLAN_SIZE: usize = 3;

/// Maximum number of alternates kept ready for swapping
pub const ALTERNATE_POOL_SIZE: usize = 4;

/// A scored candidate in ranked order
#[derive(Debug, Clone)]
pub struct Ranked<'a> {
    pub candidate: &'a Candidate,
    pub score: Score,
}

/// Output of [`compose`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub plan: Vec<CandidateId>,
    pub alternates: Vec<CandidateId>,
}

impl Composition {
    /// No eligible candidates at all ("no results", not a failure)
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty() && self.alternates.is_empty()
    }
}

/// Score every candidate and sort descending by score
///
/// The sort is stable: equal scores keep their input order.
pub fn rank<'a>(candidates: &[&'a Candidate], profile: &PreferenceProfile, at: NaiveTime) -> Vec<Ranked<'a>> {
    let mut ranked: Vec<Ranked<'a>> = candidates
        .iter()
        .map(|&c| Ranked {
            candidate: c,
            score: scoring::score(c, profile, at),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.value.total_cmp(&a.score.value));
    ranked
}

/// Compose a plan and alternate pool
///
/// 1. drop excluded candidates
/// 2. rank the rest (stable)
/// 3. seed the plan with locked ids present in the filtered pool, in `locked` order
/// 4. fill from the ranked list up to [`PLAN_SIZE`]
/// 5. alternates are the next ranked ids not in the plan or `locked`, up to [`ALTERNATE_POOL_SIZE`]
pub fn compose(
    candidates: &[Candidate],
    profile: &PreferenceProfile,
    excluded: &HashSet<CandidateId>,
    locked: &[CandidateId],
    at: NaiveTime,
) -> Composition {
    debug!(
        candidates = candidates.len(),
        excluded = excluded.len(),
        locked = locked.len(),
        "compose: called"
    );

    let eligible: Vec<&Candidate> = candidates.iter().filter(|c| !excluded.contains(&c.id)).collect();
    let ranked = rank(&eligible, profile, at);

    let mut plan: Vec<CandidateId> = Vec::with_capacity(PLAN_SIZE);
    for id in locked {
        if plan.len() >= PLAN_SIZE {
            break;
        }
        if !plan.contains(id) && eligible.iter().any(|c| &c.id == id) {
            plan.push(id.clone());
        }
    }

    for entry in &ranked {
        if plan.len() >= PLAN_SIZE {
            break;
        }
        if !plan.contains(&entry.candidate.id) {
            plan.push(entry.candidate.id.clone());
        }
    }

    let mut alternates: Vec<CandidateId> = Vec::with_capacity(ALTERNATE_POOL_SIZE);
    for entry in &ranked {
        if alternates.len() >= ALTERNATE_POOL_SIZE {
            break;
        }
        let id = &entry.candidate.id;
        if !plan.contains(id) && !locked.contains(id) && !alternates.contains(id) {
            alternates.push(id.clone());
        }
    }

    debug!(plan = ?plan, alternates = ?alternates, "compose: done");
    Composition { plan, alternates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Location, StartPoint};
    use proptest::prelude::*;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn profile() -> PreferenceProfile {
        PreferenceProfile {
            vibes: vec!["cozy".to_string()],
            price_cap: 2,
            start: Some(StartPoint::new("Boston Common", 42.355, -71.065)),
        }
    }

    /// Candidate at the start point whose score is driven by vibe matches
    fn cand(id: &str, cozy: bool) -> Candidate {
        let c = Candidate::new(id, id.to_uppercase(), Location::new(42.355, -71.065)).with_price(1);
        if cozy { c.with_vibes(&["cozy"]) } else { c }
    }

    fn ids(v: &[&str]) -> Vec<CandidateId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compose_ranks_and_splits() {
        let pool = vec![
            cand("a", false),
            cand("b", true),
            cand("c", false),
            cand("d", true),
            cand("e", false),
            cand("f", false),
            cand("g", false),
            cand("h", false),
        ];
        let out = compose(&pool, &profile(), &HashSet::new(), &[], noon());
        // Cozy ones first, then the rest in input order
        assert_eq!(out.plan, ids(&["b", "d", "a"]));
        assert_eq!(out.alternates, ids(&["c", "e", "f", "g"]));
    }

    #[test]
    fn test_locked_seeded_first_even_when_ranked_last() {
        let pool = vec![cand("c1", true), cand("c2", false), cand("c3", true)];
        let out = compose(&pool, &profile(), &HashSet::new(), &ids(&["c2"]), noon());
        assert_eq!(out.plan, ids(&["c2", "c1", "c3"]));
        assert!(out.alternates.is_empty());
    }

    #[test]
    fn test_locked_absent_from_pool_is_skipped() {
        let pool = vec![cand("a", true)];
        let out = compose(&pool, &profile(), &HashSet::new(), &ids(&["ghost", "a"]), noon());
        assert_eq!(out.plan, ids(&["a"]));
    }

    #[test]
    fn test_excluded_are_dropped() {
        let pool = vec![cand("a", true), cand("b", true), cand("c", false)];
        let excluded: HashSet<CandidateId> = ids(&["a"]).into_iter().collect();
        let out = compose(&pool, &profile(), &excluded, &[], noon());
        assert_eq!(out.plan, ids(&["b", "c"]));
    }

    #[test]
    fn test_locked_never_in_alternates() {
        let pool: Vec<Candidate> = (0..9).map(|i| cand(&format!("p{}", i), false)).collect();
        let locked = ids(&["p0", "p1", "p2", "p3"]);
        let out = compose(&pool, &profile(), &HashSet::new(), &locked, noon());
        assert_eq!(out.plan, ids(&["p0", "p1", "p2"]));
        assert!(!out.alternates.contains(&"p3".to_string()));
        assert_eq!(out.alternates, ids(&["p4", "p5", "p6", "p7"]));
    }

    #[test]
    fn test_empty_pool() {
        let out = compose(&[], &profile(), &HashSet::new(), &ids(&["x"]), noon());
        assert!(out.is_empty());
    }

    #[test]
    fn test_rank_is_stable() {
        let pool = [cand("x", false), cand("y", false), cand("z", false)];
        let refs: Vec<&Candidate> = pool.iter().collect();
        let ranked = rank(&refs, &profile(), noon());
        let order: Vec<&str> = ranked.iter().map(|r| r.candidate.id.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    fn arb_pool() -> impl Strategy<Value = Vec<Candidate>> {
        prop::collection::vec((any::<bool>(), 1u8..=3, 0.0f64..24.0, 0.0f64..24.0), 0..12).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (cozy, price, open, close))| {
                    cand(&format!("p{}", i), cozy).with_price(price).with_hours(open, close)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_bounds_and_disjointness(
            pool in arb_pool(),
            locked_idx in prop::collection::vec(0usize..12, 0..4),
            excluded_idx in prop::collection::vec(0usize..12, 0..4),
        ) {
            let locked: Vec<CandidateId> = locked_idx.iter().map(|i| format!("p{}", i)).collect();
            let excluded: HashSet<CandidateId> = excluded_idx.iter().map(|i| format!("p{}", i)).collect();
            let out = compose(&pool, &profile(), &excluded, &locked, noon());

            prop_assert!(out.plan.len() <= PLAN_SIZE);
            prop_assert!(out.alternates.len() <= ALTERNATE_POOL_SIZE);
            for id in &out.plan {
                prop_assert!(!out.alternates.contains(id));
                prop_assert!(!excluded.contains(id));
            }
            let unique: HashSet<&CandidateId> = out.plan.iter().collect();
            prop_assert_eq!(unique.len(), out.plan.len());
        }

        #[test]
        fn prop_locked_in_pool_lead_the_plan(
            pool in arb_pool(),
            locked_idx in prop::collection::vec(0usize..12, 0..3),
        ) {
            let mut locked: Vec<CandidateId> = Vec::new();
            for i in locked_idx {
                let id = format!("p{}", i);
                if !locked.contains(&id) {
                    locked.push(id);
                }
            }
            let out = compose(&pool, &profile(), &HashSet::new(), &locked, noon());
            let present: Vec<&CandidateId> = locked.iter().filter(|id| pool.iter().any(|c| &c.id == *id)).collect();
            let head: Vec<&CandidateId> = out.plan.iter().take(present.len()).collect();
            prop_assert_eq!(head, present);
        }
    }
}
