use super::*;

fn id(n: usize) -> Option<SourceId> {
    Some(SourceId(n))
}

#[test]
fn initial_build_subscribes_until_the_first_gap() {
    let (state, diff) = rebuild(&ChainState::new(3), 0, &[id(1), id(2), id(3)]);
    assert!(state.is_complete());
    assert_eq!(diff.release, Vec::<usize>::new());
    assert_eq!(diff.subscribe, [0, 1, 2]);

    let (state, diff) = rebuild(&ChainState::new(3), 0, &[id(1), None, id(3)]);
    assert_eq!(diff.subscribe, [0]);
    assert_eq!(state.subscribed(), 1);
    assert_eq!(state.segment(2), SegmentState::Unsubscribed);
}

#[test]
fn reroot_releases_the_tail_before_resubscribing() {
    let (state, _) = rebuild(&ChainState::new(3), 0, &[id(1), id(2), id(3)]);
    let (next, diff) = rebuild(&state, 1, &[id(7), id(8)]);
    assert_eq!(diff.release, [1, 2]);
    assert_eq!(diff.subscribe, [1, 2]);
    assert_eq!(next.segment(0), state.segment(0));
    assert_eq!(next.segment(1), SegmentState::Subscribed { source: SourceId(7) });
}

#[test]
fn null_intermediate_halts_and_recovers() {
    let (state, _) = rebuild(&ChainState::new(3), 0, &[id(1), id(2), id(3)]);
    let (halted, diff) = rebuild(&state, 1, &[None]);
    assert_eq!(diff.release, [1, 2]);
    assert!(diff.subscribe.is_empty());
    assert_eq!(halted.subscribed(), 1);

    // Nothing is released twice once the value comes back.
    let (healed, diff) = rebuild(&halted, 1, &[id(4), id(5)]);
    assert!(diff.release.is_empty());
    assert_eq!(diff.subscribe, [1, 2]);
    assert!(healed.is_complete());
}

#[test]
fn rebuilding_past_the_end_is_a_no_op() {
    let (state, _) = rebuild(&ChainState::new(2), 0, &[id(1), id(2)]);
    let (same, diff) = rebuild(&state, 2, &[]);
    assert_eq!(same, state);
    assert!(diff.is_empty());
}

#[test]
fn plain_values_share_an_identity() {
    assert_eq!(SourceId::of(&Value::Null), None);
    assert_eq!(SourceId::of(&Value::Int(1)), SourceId::of(&Value::from("x")));
}
