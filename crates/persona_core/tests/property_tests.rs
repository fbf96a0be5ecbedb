//! Property-based tests for persona_core.
//!
//! Clamping, threshold monotonicity and compound bucketing must hold for
//! every input, not just hand-picked ones.

use persona_core::{
    Changes, ClassProbabilities, MentalState, Role, SentimentAggregator, SentimentLabel,
    TriggerDescriptor, TriggerSet, DEFAULT_ATTRIBUTES, STATE_MAX, STATE_MIN,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_attribute() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(DEFAULT_ATTRIBUTES.to_vec()).prop_map(String::from),
        "[a-z]{3,8}",
    ]
}

fn arb_changes() -> impl Strategy<Value = Changes> {
    prop::collection::btree_map(arb_attribute(), -20i32..=20, 0..6)
}

fn arb_vector(dims: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..=1.0, dims)
}

fn arb_trigger_set(dims: usize) -> impl Strategy<Value = TriggerSet> {
    prop::collection::vec((arb_vector(dims), arb_changes()), 0..6).prop_map(|items| {
        TriggerSet::new(
            items
                .into_iter()
                .enumerate()
                .map(|(i, (emb, changes))| TriggerDescriptor::new(format!("t{}", i), emb, changes))
                .collect(),
        )
    })
}

// ============================================================================
// Mental state
// ============================================================================

proptest! {
    /// Any sequence of updates keeps every attribute inside [0, 10].
    #[test]
    fn mental_state_always_in_bounds(updates in prop::collection::vec(arb_changes(), 0..30)) {
        let mut state = MentalState::default();
        for changes in &updates {
            let snap = state.update(changes);
            for (_, v) in snap.iter() {
                prop_assert!((STATE_MIN..=STATE_MAX).contains(&v));
            }
        }
        prop_assert_eq!(state.len(), DEFAULT_ATTRIBUTES.len());
    }

    /// Saturation is idempotent: pushing past the ceiling stays at the ceiling.
    #[test]
    fn saturation_is_idempotent(name in prop::sample::select(DEFAULT_ATTRIBUTES.to_vec()), extra in 1i32..50) {
        let mut state = MentalState::default();
        let mut up = Changes::new();
        up.insert(name.to_string(), STATE_MAX + extra);
        state.update(&up);
        let once = state.clone();
        let mut plus_one = Changes::new();
        plus_one.insert(name.to_string(), 1);
        state.update(&plus_one);
        prop_assert_eq!(state, once);
    }
}

// ============================================================================
// Trigger matching
// ============================================================================

proptest! {
    /// Raising the threshold can only add firings.
    #[test]
    fn trigger_matching_is_monotonic_in_threshold(
        set in arb_trigger_set(4),
        embedding in arb_vector(4),
        low in 0.0f32..2.0,
        bump in 0.0f32..2.0,
    ) {
        let high = low + bump;
        let at_low: Vec<usize> = set.matches(&embedding, low).unwrap().iter().map(|f| f.index).collect();
        let at_high: Vec<usize> = set.matches(&embedding, high).unwrap().iter().map(|f| f.index).collect();
        for idx in at_low {
            prop_assert!(at_high.contains(&idx));
        }
    }

    /// Matching never mutates the trigger set and check keeps state bounded.
    #[test]
    fn trigger_check_keeps_state_bounded(
        set in arb_trigger_set(3),
        embeddings in prop::collection::vec(arb_vector(3), 1..10),
    ) {
        let before = set.clone();
        let mut state = MentalState::default();
        for e in &embeddings {
            set.check(e, 1.0, &mut state).unwrap();
        }
        prop_assert_eq!(set, before);
        for (_, v) in state.iter() {
            prop_assert!((STATE_MIN..=STATE_MAX).contains(&v));
        }
    }
}

// ============================================================================
// Sentiment
// ============================================================================

proptest! {
    /// The bucket is a pure function of compound.
    #[test]
    fn bucket_depends_only_on_compound(neg in 0.0f32..1.0, pos in 0.0f32..1.0, neu in 0.0f32..1.0) {
        let probs = ClassProbabilities::new(neg, neu, pos);
        let mut agg = SentimentAggregator::new();
        let reading = agg.record(&Role::participant("x"), probs);
        prop_assert_eq!(reading.label, SentimentLabel::from_compound(pos - neg));
    }

    /// Global count equals the sum of per-role counts.
    #[test]
    fn global_counts_equal_role_sum(
        events in prop::collection::vec((0usize..3, -1.0f32..1.0), 0..40),
    ) {
        let roles = [Role::participant("a"), Role::participant("b"), Role::Narrator];
        let mut agg = SentimentAggregator::new();
        for (r, c) in &events {
            let probs = if *c >= 0.0 {
                ClassProbabilities::new(0.0, 1.0 - c, *c)
            } else {
                ClassProbabilities::new(-c, 1.0 + c, 0.0)
            };
            agg.record(&roles[*r], probs);
        }
        let sum: u32 = roles.iter().filter_map(|r| agg.role_counts(r)).map(|c| c.total()).sum();
        prop_assert_eq!(agg.overall().total(), sum);
        prop_assert_eq!(sum as usize, events.len());
    }
}
