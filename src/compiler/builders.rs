//! Compiler components.
//!
//! Each [`ExpressionBuilder`] recognizes some node shapes and emits code for them through a
//! [`CompileContext`]. Builders are consulted in priority order and the first one that answers
//! a node wins, so a host can override any built-in lowering by inserting a builder in front.

use std::sync::Arc;

use crate::compiler::bytecode::{LambdaProgram, Op, Program, StaticMember};
use crate::expression::ast::ExpressionNode;
use crate::expression::operators::BinaryOp;
use crate::foundation::error::{BindError, BindResult};
use crate::foundation::metadata::Metadata;
use crate::foundation::value::Value;
use crate::members::descriptor::{MemberFlags, MemberKinds};
use crate::members::manager::{MemberManager, TypeKey};

pub trait ExpressionBuilder: Send + Sync {
    /// Emits code for `node`, or returns `None` to let the next builder try.
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>>;
}

/// Marks whether a postfix node opened the null-conditional scope it must close.
#[must_use]
pub struct ChainScope {
    opened: bool,
}

pub struct CompileContext<'a> {
    builders: &'a [Arc<dyn ExpressionBuilder>],
    members: &'a MemberManager,
    metadata: Option<&'a Metadata>,
    program: Program,
    /// Lambda parameters in scope: enclosing lambdas first, innermost last.
    locals: Vec<Arc<str>>,
    /// Free parameters, in order of first use.
    parameters: Vec<Arc<str>>,
    null_jumps: Vec<Vec<usize>>,
    next_is_target: bool,
    current_is_target: bool,
}

impl<'a> CompileContext<'a> {
    pub(crate) fn new(
        builders: &'a [Arc<dyn ExpressionBuilder>],
        members: &'a MemberManager,
        metadata: Option<&'a Metadata>,
        parameters: Vec<Arc<str>>,
    ) -> Self {
        Self {
            builders,
            members,
            metadata,
            program: Program::default(),
            locals: Vec::new(),
            parameters,
            null_jumps: Vec::new(),
            next_is_target: false,
            current_is_target: false,
        }
    }

    pub(crate) fn finish(self) -> (Program, Vec<Arc<str>>) {
        (self.program, self.parameters)
    }

    pub fn members(&self) -> &MemberManager {
        self.members
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata
    }

    /// Compiles `node` with the first builder that accepts it.
    pub fn compile(&mut self, node: &ExpressionNode) -> BindResult<()> {
        self.current_is_target = std::mem::take(&mut self.next_is_target);
        let builders = self.builders;
        for builder in builders {
            if let Some(result) = builder.build(node, self) {
                return result;
            }
        }
        Err(BindError::compile("no builder accepts this expression", node))
    }

    /// Compiles the receiver of a postfix node, keeping it inside the caller's null-conditional
    /// scope.
    pub fn compile_target(&mut self, node: &ExpressionNode) -> BindResult<()> {
        self.next_is_target = true;
        self.compile(node)
    }

    /// Opens a null-conditional scope unless this node is itself a receiver. Call before
    /// compiling any child.
    pub fn begin_chain(&mut self) -> ChainScope {
        let opened = !self.current_is_target;
        if opened {
            self.null_jumps.push(Vec::new());
        }
        ChainScope { opened }
    }

    /// Lands every `?.` jump of the scope here.
    pub fn end_chain(&mut self, scope: ChainScope) {
        if !scope.opened {
            return;
        }
        for at in self.null_jumps.pop().unwrap_or_default() {
            self.patch(at);
        }
    }

    /// Short-circuits the enclosing postfix chain when the value on the stack is null.
    pub fn null_guard(&mut self) {
        let at = self.emit(Op::JumpIfNull(0));
        match self.null_jumps.last_mut() {
            Some(jumps) => jumps.push(at),
            // Outside any chain the guard has nothing to skip.
            None => self.patch(at),
        }
    }

    pub fn emit(&mut self, op: Op) -> usize {
        self.program.ops.push(op);
        self.program.ops.len() - 1
    }

    /// Points the jump at `at` to the next op to be emitted.
    pub fn patch(&mut self, at: usize) {
        let here = self.program.ops.len();
        if let Some(
            Op::Jump(to)
            | Op::JumpIfFalse(to)
            | Op::JumpIfTrue(to)
            | Op::JumpIfNull(to)
            | Op::JumpIfNotNull(to),
        ) = self.program.ops.get_mut(at)
        {
            *to = here;
        }
    }

    pub fn constant(&mut self, value: Value) -> usize {
        self.program.constant(value)
    }

    pub fn name(&mut self, name: &Arc<str>) -> usize {
        self.program.name(name)
    }

    pub fn local(&self, name: &str) -> Option<usize> {
        self.locals.iter().rposition(|l| &**l == name)
    }

    pub fn parameter(&mut self, name: &Arc<str>) -> usize {
        match self.parameters.iter().position(|p| p == name) {
            Some(i) => i,
            None => {
                self.parameters.push(Arc::clone(name));
                self.parameters.len() - 1
            }
        }
    }

    /// The static type a receiver node names, if any.
    pub fn static_type(&self, node: &ExpressionNode) -> Option<Arc<str>> {
        match node {
            ExpressionNode::TypeAccess(name) => Some(Arc::clone(name)),
            ExpressionNode::Member { target: None, name }
                if self.local(name).is_none() && self.members.has_static_type(name) =>
            {
                Some(Arc::clone(name))
            }
            _ => None,
        }
    }

    /// Resolves a static member group now; an unknown member fails compilation.
    pub fn resolve_static(
        &mut self,
        type_name: &Arc<str>,
        name: &Arc<str>,
        kinds: MemberKinds,
        node: &ExpressionNode,
    ) -> BindResult<usize> {
        let members = self.members.try_get_members(
            &TypeKey::named(type_name),
            name,
            kinds,
            MemberFlags::STATIC,
            self.metadata,
        );
        if members.is_empty() {
            return Err(BindError::compile(
                format!("type '{type_name}' has no static member '{name}'"),
                node,
            ));
        }
        self.program.statics.push(StaticMember {
            type_name: Arc::clone(type_name),
            name: Arc::clone(name),
            members,
        });
        Ok(self.program.statics.len() - 1)
    }

    /// Compiles a lambda body into a sub-program and returns its index.
    pub fn compile_lambda(
        &mut self,
        parameters: &[Arc<str>],
        body: &ExpressionNode,
    ) -> BindResult<usize> {
        let captured = self.locals.len();
        let mut inner = CompileContext::new(
            self.builders,
            self.members,
            self.metadata,
            std::mem::take(&mut self.parameters),
        );
        inner.locals = self.locals.iter().chain(parameters).cloned().collect();
        let result = inner.compile(body);
        let (program, free) = inner.finish();
        self.parameters = free;
        result?;
        self.program.lambdas.push(LambdaProgram {
            program: Arc::new(program),
            arity: parameters.len(),
            captured,
        });
        Ok(self.program.lambdas.len() - 1)
    }
}

pub struct ConstantBuilder;

impl ExpressionBuilder for ConstantBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Constant(value) = node else {
            return None;
        };
        let index = ctx.constant(value.clone());
        ctx.emit(Op::PushConst(index));
        Some(Ok(()))
    }
}

/// Lambda locals first, then free parameters bound from the invocation arguments.
pub struct ParameterBuilder;

impl ExpressionBuilder for ParameterBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Parameter(name) = node else {
            return None;
        };
        let op = match ctx.local(name) {
            Some(index) => Op::LoadLocal(index),
            None => Op::LoadArg(ctx.parameter(name)),
        };
        ctx.emit(op);
        Some(Ok(()))
    }
}

pub struct LambdaBuilder;

impl ExpressionBuilder for LambdaBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Lambda { body, parameters } = node else {
            return None;
        };
        let mut names = Vec::with_capacity(parameters.len());
        for p in parameters {
            match p {
                ExpressionNode::Parameter(name) => names.push(Arc::clone(name)),
                other => {
                    return Some(Err(BindError::compile(
                        "lambda parameters must be names",
                        other,
                    )));
                }
            }
        }
        Some(ctx.compile_lambda(&names, body).map(|index| {
            ctx.emit(Op::MakeLambda(index));
        }))
    }
}

/// `Type.Member` and `Type.Method(args)` on registered static types.
pub struct StaticMemberBuilder;

impl ExpressionBuilder for StaticMemberBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        match node {
            ExpressionNode::Member {
                target: Some(target),
                name,
            } => {
                let type_name = ctx.static_type(target)?;
                Some(
                    ctx.resolve_static(&type_name, name, MemberKinds::VALUE, node)
                        .map(|index| {
                            ctx.emit(Op::GetStatic(index));
                        }),
                )
            }
            ExpressionNode::MethodCall {
                target: Some(target),
                name,
                args,
                type_args,
            } => {
                let type_name = ctx.static_type(target)?;
                Some((|| {
                    let index = ctx.resolve_static(&type_name, name, MemberKinds::METHOD, node)?;
                    push_type_args(ctx, type_args, node)?;
                    for arg in args {
                        ctx.compile(arg)?;
                    }
                    ctx.emit(Op::CallStatic {
                        index,
                        argc: type_args.len() + args.len(),
                    });
                    Ok(())
                })())
            }
            _ => None,
        }
    }
}

/// A type name used as a value rather than as a member receiver.
pub struct TypeAccessBuilder;

impl ExpressionBuilder for TypeAccessBuilder {
    fn build(&self, node: &ExpressionNode, _ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::TypeAccess(name) = node else {
            return None;
        };
        Some(Err(BindError::compile(
            format!("type '{name}' cannot be used as a value"),
            node,
        )))
    }
}

/// Type arguments of a generic call are resolved by name and passed as leading string arguments.
fn push_type_args(
    ctx: &mut CompileContext<'_>,
    type_args: &[Arc<str>],
    node: &ExpressionNode,
) -> BindResult<()> {
    for type_arg in type_args {
        if !ctx.members().knows_type(type_arg) {
            return Err(BindError::compile(format!("unknown type '{type_arg}'"), node));
        }
        let index = ctx.constant(Value::String(Arc::clone(type_arg)));
        ctx.emit(Op::PushConst(index));
    }
    Ok(())
}

fn compile_receiver(ctx: &mut CompileContext<'_>, target: Option<&ExpressionNode>) -> BindResult<()> {
    match target {
        Some(t) => ctx.compile_target(t),
        None => {
            ctx.emit(Op::LoadTarget);
            Ok(())
        }
    }
}

pub struct MemberBuilder;

impl ExpressionBuilder for MemberBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Member { target, name } = node else {
            return None;
        };
        let scope = ctx.begin_chain();
        let result = compile_receiver(ctx, target.as_deref()).map(|()| {
            let index = ctx.name(name);
            ctx.emit(Op::GetMember(index));
        });
        ctx.end_chain(scope);
        Some(result)
    }
}

pub struct IndexBuilder;

impl ExpressionBuilder for IndexBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Index { target, args } = node else {
            return None;
        };
        let scope = ctx.begin_chain();
        let result = (|| {
            compile_receiver(ctx, target.as_deref())?;
            for arg in args {
                ctx.compile(arg)?;
            }
            ctx.emit(Op::GetIndex(args.len()));
            Ok(())
        })();
        ctx.end_chain(scope);
        Some(result)
    }
}

pub struct MethodCallBuilder;

impl ExpressionBuilder for MethodCallBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::MethodCall {
            target,
            name,
            args,
            type_args,
        } = node
        else {
            return None;
        };
        let scope = ctx.begin_chain();
        let result = (|| {
            compile_receiver(ctx, target.as_deref())?;
            push_type_args(ctx, type_args, node)?;
            for arg in args {
                ctx.compile(arg)?;
            }
            let name = ctx.name(name);
            ctx.emit(Op::Call {
                name,
                argc: type_args.len() + args.len(),
            });
            Ok(())
        })();
        ctx.end_chain(scope);
        Some(result)
    }
}

/// `target?.` guards: a null receiver ends the whole postfix chain with null.
pub struct NullConditionalBuilder;

impl ExpressionBuilder for NullConditionalBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::NullConditionalMember(target) = node else {
            return None;
        };
        let scope = ctx.begin_chain();
        let result = ctx.compile_target(target).map(|()| ctx.null_guard());
        ctx.end_chain(scope);
        Some(result)
    }
}

pub struct UnaryBuilder;

impl ExpressionBuilder for UnaryBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Unary { op, operand } = node else {
            return None;
        };
        Some(ctx.compile(operand).map(|()| {
            ctx.emit(Op::Unary(*op));
        }))
    }
}

/// Binary operators; `&&`, `||` and `??` short-circuit.
pub struct BinaryBuilder;

impl ExpressionBuilder for BinaryBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Binary { op, left, right } = node else {
            return None;
        };
        Some((|| {
            ctx.compile(left)?;
            match op {
                BinaryOp::ConditionalAnd | BinaryOp::ConditionalOr => {
                    let and = *op == BinaryOp::ConditionalAnd;
                    let skip = ctx.emit(if and { Op::JumpIfFalse(0) } else { Op::JumpIfTrue(0) });
                    ctx.compile(right)?;
                    ctx.emit(Op::Truthy);
                    let end = ctx.emit(Op::Jump(0));
                    ctx.patch(skip);
                    let short = ctx.constant(Value::Bool(!and));
                    ctx.emit(Op::PushConst(short));
                    ctx.patch(end);
                }
                BinaryOp::NullCoalescing => {
                    let end = ctx.emit(Op::JumpIfNotNull(0));
                    ctx.compile(right)?;
                    ctx.patch(end);
                }
                op => {
                    ctx.compile(right)?;
                    ctx.emit(Op::Binary(*op));
                }
            }
            Ok(())
        })())
    }
}

pub struct ConditionBuilder;

impl ExpressionBuilder for ConditionBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Condition {
            test,
            if_true,
            if_false,
        } = node
        else {
            return None;
        };
        Some((|| {
            ctx.compile(test)?;
            let otherwise = ctx.emit(Op::JumpIfFalse(0));
            ctx.compile(if_true)?;
            let end = ctx.emit(Op::Jump(0));
            ctx.patch(otherwise);
            ctx.compile(if_false)?;
            ctx.patch(end);
            Ok(())
        })())
    }
}

/// `target = value`; the expression's value is the assigned value. A `?.` receiver that is
/// null skips the assignment.
pub struct AssignmentBuilder;

impl ExpressionBuilder for AssignmentBuilder {
    fn build(&self, node: &ExpressionNode, ctx: &mut CompileContext<'_>) -> Option<BindResult<()>> {
        let ExpressionNode::Assignment { target, value } = node else {
            return None;
        };
        let (receiver, args, name) = match target.as_ref() {
            ExpressionNode::Member {
                target: receiver,
                name,
            } => (receiver, None, Some(name)),
            ExpressionNode::Index {
                target: receiver,
                args,
            } => (receiver, Some(args), None),
            other => {
                return Some(Err(BindError::compile("expression is not assignable", other)));
            }
        };
        if name.is_some() && receiver.as_deref().and_then(|r| ctx.static_type(r)).is_some() {
            return Some(Err(BindError::compile(
                "static members cannot be assigned",
                target,
            )));
        }
        let scope = ctx.begin_chain();
        let result = (|| {
            compile_receiver(ctx, receiver.as_deref())?;
            for arg in args.into_iter().flatten() {
                ctx.compile(arg)?;
            }
            ctx.compile(value)?;
            match name {
                Some(name) => {
                    let name = ctx.name(name);
                    ctx.emit(Op::SetMember(name));
                }
                None => {
                    ctx.emit(Op::SetIndex(args.map_or(0, Vec::len)));
                }
            }
            Ok(())
        })();
        ctx.end_chain(scope);
        Some(result)
    }
}

/// A receiver compiled as a standalone value, closing its own null-conditional scope.
pub(crate) fn compile_receiver_value(
    ctx: &mut CompileContext<'_>,
    receiver: Option<&ExpressionNode>,
) -> BindResult<()> {
    match receiver {
        Some(r) => ctx.compile(r),
        None => {
            ctx.emit(Op::LoadTarget);
            Ok(())
        }
    }
}

/// The built-in builders in priority order.
pub fn default_builders() -> Vec<Arc<dyn ExpressionBuilder>> {
    vec![
        Arc::new(ConstantBuilder),
        Arc::new(ParameterBuilder),
        Arc::new(LambdaBuilder),
        Arc::new(StaticMemberBuilder),
        Arc::new(TypeAccessBuilder),
        Arc::new(NullConditionalBuilder),
        Arc::new(MemberBuilder),
        Arc::new(IndexBuilder),
        Arc::new(MethodCallBuilder),
        Arc::new(UnaryBuilder),
        Arc::new(BinaryBuilder),
        Arc::new(ConditionBuilder),
        Arc::new(AssignmentBuilder),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/compiler/builders.rs"]
mod tests;
