use super::*;

fn names(path: &MemberPath) -> Vec<String> {
    path.segments().iter().map(ToString::to_string).collect()
}

#[test]
fn splits_members_and_indexers() {
    let path = MemberPath::parse("Items[0].Name").unwrap();
    assert_eq!(names(&path), ["Items", "[0]", "Name"]);
    assert_eq!(path.segments()[1], PathSegment::Index(vec![Value::Int(0)]));
    assert_eq!(path.segments()[1].notification_name(), "Item[]");
    assert_eq!(path.to_string(), "Items[0].Name");
}

#[test]
fn self_paths_have_no_segments() {
    assert!(MemberPath::parse("").unwrap().is_empty());
    assert!(MemberPath::parse(".").unwrap().is_empty());
    assert!(MemberPath::parse("  ").unwrap().is_empty());
}

#[test]
fn index_arguments_respect_quotes() {
    let path = MemberPath::parse("Map['a.b]', \"c\"][2,-1]").unwrap();
    assert_eq!(
        path.segments(),
        [
            PathSegment::Member(Arc::from("Map")),
            PathSegment::Index(vec![Value::from("a.b]"), Value::from("c")]),
            PathSegment::Index(vec![Value::Int(2), Value::Int(-1)]),
        ]
    );
}

#[test]
fn leading_indexer_reads_the_source() {
    let path = MemberPath::parse("[1].Name").unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path.first(), Some(&PathSegment::Index(vec![Value::Int(1)])));
}

#[test]
fn large_indices_widen_to_long() {
    let path = MemberPath::parse("[5000000000]").unwrap();
    assert_eq!(
        path.segments(),
        [PathSegment::Index(vec![Value::Long(5_000_000_000)])]
    );
}

#[test]
fn malformed_paths_are_errors() {
    for text in [
        "A[0", "A]", "A..B", ".A", "A.", "A.[0]", "A[x]", "A[0]B", "A['x'y]", "A-B",
    ] {
        assert!(MemberPath::parse(text).is_err(), "{text} should not parse");
    }
}

#[test]
fn cache_interns_identical_text() {
    let cache = MemberPathCache::new();
    let a = cache.get("A.B").unwrap();
    let b = cache.get("A.B").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(cache.get("A[").is_err());
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
    let c = cache.get("A.B").unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(a, c);
}
