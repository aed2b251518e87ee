//! Stack evaluator for compiled programs.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::compiler::bytecode::{Op, Program};
use crate::compiler::compiled::LambdaValue;
use crate::compiler::ops;
use crate::foundation::error::{BindError, BindResult};
use crate::foundation::value::Value;
use crate::members::manager::MemberManager;

pub(crate) type Stack = SmallVec<[Value; 8]>;

/// Everything a program reads besides its own stack.
pub(crate) struct Frame<'a> {
    pub program: &'a Program,
    pub target: &'a Value,
    pub args: &'a Arc<[Value]>,
    pub locals: &'a [Value],
    pub members: &'a Arc<MemberManager>,
}

fn pop(stack: &mut Stack) -> BindResult<Value> {
    stack
        .pop()
        .ok_or_else(|| BindError::evaluation("evaluation stack underflow"))
}

fn pop_n(stack: &mut Stack, n: usize) -> BindResult<Vec<Value>> {
    if stack.len() < n {
        return Err(BindError::evaluation("evaluation stack underflow"));
    }
    Ok(stack.drain(stack.len() - n..).collect())
}

fn peek(stack: &Stack) -> BindResult<&Value> {
    stack
        .last()
        .ok_or_else(|| BindError::evaluation("evaluation stack underflow"))
}

/// Runs the program and returns whatever is left on the stack.
pub(crate) fn run_to_stack(frame: &Frame<'_>) -> BindResult<Stack> {
    let Frame {
        program,
        target,
        args,
        locals,
        members,
    } = frame;
    let mut stack = Stack::new();
    let mut pc = 0;
    while let Some(op) = program.ops.get(pc) {
        pc += 1;
        match op {
            Op::PushConst(i) => stack.push(program.consts[*i].clone()),
            Op::LoadTarget => stack.push((*target).clone()),
            Op::LoadArg(i) => stack.push(args.get(*i).cloned().ok_or_else(|| {
                BindError::evaluation(format!("missing argument {i}"))
            })?),
            Op::LoadLocal(i) => stack.push(locals.get(*i).cloned().ok_or_else(|| {
                BindError::evaluation(format!("missing lambda local {i}"))
            })?),
            Op::GetMember(name) => {
                let receiver = pop(&mut stack)?;
                stack.push(members.get_value(&receiver, &program.names[*name])?);
            }
            Op::GetIndex(argc) => {
                let index = pop_n(&mut stack, *argc)?;
                let receiver = pop(&mut stack)?;
                stack.push(members.get_index(&receiver, &index)?);
            }
            Op::Call { name, argc } => {
                let call_args = pop_n(&mut stack, *argc)?;
                let receiver = pop(&mut stack)?;
                stack.push(members.invoke(&receiver, &program.names[*name], &call_args)?);
            }
            Op::GetStatic(i) => {
                let group = &program.statics[*i];
                let member = group.members.first().ok_or_else(|| {
                    BindError::member_not_found(group.type_name.as_ref(), group.name.as_ref())
                })?;
                stack.push(member.get_value(&Value::Null, &[])?);
            }
            Op::CallStatic { index, argc } => {
                let call_args = pop_n(&mut stack, *argc)?;
                let group = &program.statics[*index];
                let (member, converted) = MemberManager::resolve_overload(&group.members, &call_args)
                    .ok_or_else(|| {
                        BindError::evaluation(format!(
                            "no overload of {}.{} accepts {} argument(s)",
                            group.type_name,
                            group.name,
                            call_args.len()
                        ))
                    })?;
                stack.push(member.get_value(&Value::Null, &converted)?);
            }
            Op::SetMember(name) => {
                let value = pop(&mut stack)?;
                let receiver = pop(&mut stack)?;
                members.set_value(&receiver, &program.names[*name], value.clone())?;
                stack.push(value);
            }
            Op::SetIndex(argc) => {
                let value = pop(&mut stack)?;
                let index = pop_n(&mut stack, *argc)?;
                let receiver = pop(&mut stack)?;
                members.set_index(&receiver, &index, value.clone())?;
                stack.push(value);
            }
            Op::Unary(op) => {
                let operand = pop(&mut stack)?;
                stack.push(ops::unary(*op, &operand)?);
            }
            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                stack.push(ops::binary(*op, &left, &right)?);
            }
            Op::Truthy => {
                let value = pop(&mut stack)?;
                stack.push(Value::Bool(ops::truthy(&value)?));
            }
            Op::Jump(to) => pc = *to,
            Op::JumpIfFalse(to) => {
                if !ops::truthy(&pop(&mut stack)?)? {
                    pc = *to;
                }
            }
            Op::JumpIfTrue(to) => {
                if ops::truthy(&pop(&mut stack)?)? {
                    pc = *to;
                }
            }
            Op::JumpIfNull(to) => {
                if peek(&stack)?.is_null() {
                    pc = *to;
                }
            }
            Op::JumpIfNotNull(to) => {
                if peek(&stack)?.is_null() {
                    stack.pop();
                } else {
                    pc = *to;
                }
            }
            Op::MakeLambda(i) => {
                let lambda = &program.lambdas[*i];
                stack.push(Value::Function(Arc::new(LambdaValue {
                    program: Arc::clone(&lambda.program),
                    arity: lambda.arity,
                    target: (*target).clone(),
                    args: Arc::clone(args),
                    captured: locals[..lambda.captured.min(locals.len())].to_vec(),
                    members: Arc::clone(members),
                })));
            }
        }
    }
    Ok(stack)
}

/// Runs the program and returns its result.
pub(crate) fn run(frame: &Frame<'_>) -> BindResult<Value> {
    let mut stack = run_to_stack(frame)?;
    pop(&mut stack)
}

#[cfg(test)]
#[path = "../../tests/unit/compiler/vm.rs"]
mod tests;
