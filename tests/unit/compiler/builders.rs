use super::*;
use crate::expression::operators::BinaryOp;
use crate::expression::parser::ExpressionParser;

fn program(text: &str) -> BindResult<Program> {
    let members = MemberManager::new();
    let builders = default_builders();
    let node = ExpressionParser::default().try_parse(text, None).unwrap();
    let mut ctx = CompileContext::new(&builders, &members, None, Vec::new());
    ctx.compile(&node)?;
    Ok(ctx.finish().0)
}

#[test]
fn member_chain_loads_the_target_once() {
    let p = program("A.B").unwrap();
    assert_eq!(p.ops, [Op::LoadTarget, Op::GetMember(0), Op::GetMember(1)]);
    assert_eq!(&*p.names[1], "B");
}

#[test]
fn repeated_names_share_a_slot() {
    let p = program("A.A").unwrap();
    assert_eq!(p.names.len(), 1);
}

#[test]
fn null_conditional_jumps_to_the_end_of_the_chain() {
    let p = program("A?.B.C").unwrap();
    assert_eq!(
        p.ops,
        [
            Op::LoadTarget,
            Op::GetMember(0),
            Op::JumpIfNull(5),
            Op::GetMember(1),
            Op::GetMember(2),
        ]
    );
}

#[test]
fn null_conditional_stays_inside_its_operand() {
    // The jump lands before the addition, not past it.
    let p = program("A?.B + 1").unwrap();
    let guard = p
        .ops
        .iter()
        .find_map(|op| match op {
            Op::JumpIfNull(to) => Some(*to),
            _ => None,
        })
        .unwrap();
    assert_eq!(p.ops[guard], Op::PushConst(0));
    assert_eq!(p.ops.last(), Some(&Op::Binary(BinaryOp::Add)));
}

#[test]
fn and_lowers_to_conditional_jumps() {
    let p = program("A && B").unwrap();
    assert_eq!(
        p.ops,
        [
            Op::LoadTarget,
            Op::GetMember(0),
            Op::JumpIfFalse(7),
            Op::LoadTarget,
            Op::GetMember(1),
            Op::Truthy,
            Op::Jump(8),
            Op::PushConst(0),
        ]
    );
    assert_eq!(p.consts[0], Value::Bool(false));
}

#[test]
fn coalesce_keeps_the_left_value() {
    let p = program("A ?? 1").unwrap();
    assert_eq!(
        p.ops,
        [
            Op::LoadTarget,
            Op::GetMember(0),
            Op::JumpIfNotNull(4),
            Op::PushConst(0),
        ]
    );
}

#[test]
fn static_members_compile_to_resolved_slots() {
    let p = program("Math.Max(1, 2)").unwrap();
    assert_eq!(
        p.ops,
        [
            Op::PushConst(0),
            Op::PushConst(1),
            Op::CallStatic { index: 0, argc: 2 },
        ]
    );
    assert_eq!(&*p.statics[0].type_name, "Math");
    assert_eq!(p.statics[0].members.len(), 1);

    let p = program("Math.Round(1.5)").unwrap();
    assert_eq!(p.statics[0].members.len(), 2);
}

#[test]
fn unknown_static_member_fails_with_its_node() {
    let err = program("Math.Nope").unwrap_err();
    assert!(err.to_string().contains("Nope"), "{err}");
    assert!(matches!(
        err.node(),
        Some(ExpressionNode::Member { name, .. }) if &**name == "Nope"
    ));
}

#[test]
fn generic_type_arguments_become_leading_arguments() {
    let p = program("Items.OfType<string>()").unwrap();
    assert_eq!(
        p.ops,
        [
            Op::LoadTarget,
            Op::GetMember(0),
            Op::PushConst(0),
            Op::Call { name: 1, argc: 1 },
        ]
    );
    assert_eq!(p.consts[0], Value::from("string"));
}

#[test]
fn unknown_generic_type_arguments_fail_with_their_node() {
    let node = ExpressionNode::generic_method_call(None, "Get", vec![Arc::from("Nope")], Vec::new());
    let members = MemberManager::new();
    let builders = default_builders();
    let mut ctx = CompileContext::new(&builders, &members, None, Vec::new());
    let err = ctx.compile(&node).unwrap_err();
    assert!(err.to_string().contains("unknown type 'Nope'"), "{err}");
    assert!(matches!(err.node(), Some(ExpressionNode::MethodCall { .. })));
}

#[test]
fn lambdas_compile_to_sub_programs() {
    let p = program("Items.Where(x => x > Limit)").unwrap();
    assert_eq!(p.lambdas.len(), 1);
    let lambda = &p.lambdas[0];
    assert_eq!(lambda.arity, 1);
    assert_eq!(lambda.captured, 0);
    assert_eq!(lambda.program.ops[0], Op::LoadLocal(0));
    assert_eq!(lambda.program.ops[1], Op::LoadTarget);
}

#[test]
fn nested_lambdas_capture_enclosing_parameters() {
    let p = program("A.Any(x => B.Any(y => y == x))").unwrap();
    let outer = &p.lambdas[0].program;
    let inner = &outer.lambdas[0];
    assert_eq!(inner.captured, 1);
    assert_eq!(
        inner.program.ops,
        [Op::LoadLocal(1), Op::LoadLocal(0), Op::Binary(BinaryOp::Equality)]
    );
}

#[test]
fn free_parameters_are_numbered_in_first_use_order() {
    let node = ExpressionNode::binary(
        BinaryOp::Add,
        ExpressionNode::parameter("b"),
        ExpressionNode::lambda(&["x"], ExpressionNode::parameter("a")),
    );
    let members = MemberManager::new();
    let builders = default_builders();
    let mut ctx = CompileContext::new(&builders, &members, None, Vec::new());
    // The lambda side fails at run time, but it still registers `a`.
    ctx.compile(&node).unwrap();
    let (p, params) = ctx.finish();
    let names: Vec<&str> = params.iter().map(|p| &**p).collect();
    assert_eq!(names, ["b", "a"]);
    assert_eq!(p.lambdas[0].program.ops, [Op::LoadArg(1)]);
}

struct Shout;

impl ExpressionBuilder for Shout {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Constant(Value::String(s)) = node else {
            return None;
        };
        let index = ctx.constant(Value::from(s.to_uppercase()));
        ctx.emit(Op::PushConst(index));
        Some(Ok(()))
    }
}

#[test]
fn earlier_builders_win() {
    let members = MemberManager::new();
    let mut builders: Vec<Arc<dyn ExpressionBuilder>> = vec![Arc::new(Shout)];
    builders.extend(default_builders());
    let mut ctx = CompileContext::new(&builders, &members, None, Vec::new());
    ctx.compile(&ExpressionNode::constant("hi")).unwrap();
    let (p, _) = ctx.finish();
    assert_eq!(p.consts, [Value::from("HI")]);
}

#[test]
fn unhandled_nodes_are_reported() {
    let members = MemberManager::new();
    let builders: Vec<Arc<dyn ExpressionBuilder>> = vec![Arc::new(ConstantBuilder)];
    let mut ctx = CompileContext::new(&builders, &members, None, Vec::new());
    let err = ctx.compile(&ExpressionNode::member(None, "A")).unwrap_err();
    assert!(err.to_string().contains("no builder"));
}
