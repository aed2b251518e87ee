use super::*;
use crate::foundation::value::ValueKind;
use crate::members::descriptor::{ChangeSignal, MemberKind, Parameters};
use crate::members::dynamic::DynamicObject;

fn point_type() -> TypeDescriptor {
    TypeDescriptor::new("Point")
        .member(MemberInfo::property("Point", "X", |_| Ok(Value::Int(3))))
        .member(MemberInfo::method(
            "Point",
            "Scale",
            Parameters::Fixed(vec![Some(ValueKind::Int)]),
            |_, args| Ok(Value::from(format!("int:{:?}", args[0]))),
        ))
        .member(MemberInfo::method(
            "Point",
            "Scale",
            Parameters::Fixed(vec![Some(ValueKind::Double)]),
            |_, args| Ok(Value::from(format!("double:{:?}", args[0]))),
        ))
        .member(
            MemberInfo::property("Point", "Origin", |_| Ok(Value::from("0,0")))
                .static_member()
                .notifies(ChangeSignal::None),
        )
}

#[test]
fn builtin_string_members_resolve() {
    let members = MemberManager::new();
    let text = Value::from("hello");
    assert_eq!(members.get_value(&text, "Length").unwrap(), Value::Int(5));
    assert_eq!(
        members.invoke(&text, "ToUpper", &[]).unwrap(),
        Value::from("HELLO")
    );
    assert_eq!(
        members.get_index(&text, &[Value::Int(1)]).unwrap(),
        Value::Char('e')
    );
}

#[test]
fn lookups_are_cached_until_registration() {
    let members = MemberManager::new();
    let key = TypeKey::named("Point");
    let first = members.try_get_members(&key, "X", MemberKinds::VALUE, MemberFlags::INSTANCE, None);
    assert!(first.is_empty());

    members.register_type(point_type());
    let found = members.try_get_members(&key, "X", MemberKinds::VALUE, MemberFlags::INSTANCE, None);
    assert_eq!(found.len(), 1);
    let again = members.try_get_members(&key, "X", MemberKinds::VALUE, MemberFlags::INSTANCE, None);
    assert!(Arc::ptr_eq(&found, &again));
}

#[test]
fn overloads_prefer_exact_matches() {
    let members = MemberManager::new();
    members.register_type(point_type());
    let found = members.try_get_members(
        &TypeKey::named("Point"),
        "Scale",
        MemberKinds::METHOD,
        MemberFlags::INSTANCE,
        None,
    );
    let (_, args) = MemberManager::resolve_overload(&found, &[Value::Int(2)]).unwrap();
    assert_eq!(args, vec![Value::Int(2)]);
    let (member, args) = MemberManager::resolve_overload(&found, &[Value::Double(2.0)]).unwrap();
    assert_eq!(args, vec![Value::Double(2.0)]);
    assert_eq!(member.parameters, Parameters::Fixed(vec![Some(ValueKind::Double)]));
    assert!(MemberManager::resolve_overload(&found, &[Value::from("x")]).is_none());
}

#[test]
fn statics_are_separate_from_instance_members() {
    let members = MemberManager::new();
    members.register_type(point_type());
    assert!(members.has_static_type("Point"));
    assert!(!members.has_static_type("Nope"));
    let point = TypeKey::named("Point");
    let origin = members
        .try_get_member(&point, "Origin", MemberKinds::VALUE, MemberFlags::STATIC, None)
        .unwrap();
    assert_eq!(origin.get_value(&Value::Null, &[]).unwrap(), Value::from("0,0"));
    assert!(
        members
            .try_get_member(&point, "X", MemberKinds::VALUE, MemberFlags::STATIC, None)
            .is_none()
    );
}

#[test]
fn null_receivers_and_missing_members_are_distinct_errors() {
    let members = MemberManager::new();
    assert!(matches!(
        members.get_value(&Value::Null, "Length"),
        Err(BindError::NullReference(_))
    ));
    assert!(matches!(
        members.get_value(&Value::Int(1), "Length"),
        Err(BindError::MemberNotFound { .. })
    ));
    match members.get_index(&Value::Int(1), &[Value::Int(0)]) {
        Err(BindError::MemberNotFound { member, .. }) => assert_eq!(member, "[]"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn dynamic_objects_answer_any_property() {
    let members = MemberManager::new();
    let obj = DynamicObject::from_pairs("Bag", [("Name", "a")]);
    let value = Value::object(Arc::clone(&obj));
    assert_eq!(members.get_value(&value, "Name").unwrap(), Value::from("a"));
    members.set_value(&value, "Age", Value::Int(3)).unwrap();
    assert_eq!(obj.get("Age"), Some(Value::Int(3)));
    assert_eq!(
        members.get_index(&value, &[Value::from("Age")]).unwrap(),
        Value::Int(3)
    );
    assert!(members.get_value(&value, "Missing").is_err());
}

#[test]
fn to_string_works_on_anything() {
    let members = MemberManager::new();
    assert_eq!(members.invoke(&Value::Int(4), "ToString", &[]).unwrap(), Value::from("4"));
    assert_eq!(
        members.invoke(&Value::Bool(true), "ToString", &[]).unwrap(),
        Value::from("true")
    );
}

struct Fixed;

impl MemberProvider for Fixed {
    fn try_get_members(
        &self,
        key: &TypeKey,
        name: &str,
        kinds: MemberKinds,
        _flags: MemberFlags,
    ) -> Vec<Arc<MemberInfo>> {
        if name == "Length" && kinds.contains(MemberKind::Property) {
            vec![Arc::new(MemberInfo::property(&key.name, "Length", |_| Ok(Value::Int(-1))))]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn added_providers_take_precedence() {
    let members = MemberManager::new();
    let text = Value::from("abc");
    assert_eq!(members.get_value(&text, "Length").unwrap(), Value::Int(3));
    members.add_provider(Arc::new(Fixed));
    assert_eq!(members.get_value(&text, "Length").unwrap(), Value::Int(-1));
}

#[test]
fn value_members_and_indexers_resolve_per_receiver() {
    let members = MemberManager::new();
    let list = Value::list([Value::Int(1)]);
    assert_eq!(&*members.value_member(&list, "Count").unwrap().name, "Count");
    let (indexer, args) = members.indexer(&list, &[Value::Int(0)]).unwrap();
    assert_eq!(&*indexer.name, INDEXER_NAME);
    assert_eq!(args, vec![Value::Int(0)]);
    assert!(matches!(
        members.value_member(&Value::Int(1), "Nope"),
        Err(BindError::MemberNotFound { .. })
    ));
    assert!(members.indexer(&Value::Int(1), &[Value::Int(0)]).is_err());
}
