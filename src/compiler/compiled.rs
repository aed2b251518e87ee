use std::fmt;
use std::sync::Arc;

use crate::compiler::builders::{
    CompileContext, ExpressionBuilder, compile_receiver_value, default_builders,
};
use crate::compiler::bytecode::Program;
use crate::compiler::vm::{self, Frame};
use crate::expression::ast::ExpressionNode;
use crate::foundation::error::{BindError, BindResult};
use crate::foundation::metadata::Metadata;
use crate::foundation::value::{Callable, Value};
use crate::members::manager::MemberManager;

/// Where [`CompiledExpression::set_value`] writes.
#[derive(Debug, Clone)]
enum SetTarget {
    Member(Arc<str>),
    Index(usize),
}

/// Program leaving the receiver (and index arguments) of an assignable expression on the stack.
#[derive(Debug, Clone)]
struct Setter {
    receiver: Arc<Program>,
    target: SetTarget,
}

/// An executable expression.
#[derive(Clone)]
pub struct CompiledExpression {
    program: Arc<Program>,
    setter: Option<Setter>,
    parameters: Arc<[Arc<str>]>,
    members: Arc<MemberManager>,
}

impl CompiledExpression {
    /// Evaluates against `target`. `args` bind positionally to [`parameters`](Self::parameters).
    pub fn invoke(
        &self,
        target: &Value,
        args: &[Value],
        _metadata: Option<&Metadata>,
    ) -> BindResult<Value> {
        if args.len() != self.parameters.len() {
            return Err(BindError::evaluation(format!(
                "expected {} argument(s), got {}",
                self.parameters.len(),
                args.len()
            )));
        }
        let args: Arc<[Value]> = Arc::from(args);
        vm::run(&Frame {
            program: &self.program,
            target,
            args: &args,
            locals: &[],
            members: &self.members,
        })
    }

    /// Writes `value` through a member or indexer expression. Returns `false` when the receiver
    /// evaluates to null.
    pub fn set_value(
        &self,
        target: &Value,
        value: Value,
        _metadata: Option<&Metadata>,
    ) -> BindResult<bool> {
        let setter = self
            .setter
            .as_ref()
            .ok_or_else(|| BindError::evaluation("expression is not assignable"))?;
        let no_args: Arc<[Value]> = Arc::from(Vec::new());
        let mut stack = vm::run_to_stack(&Frame {
            program: &setter.receiver,
            target,
            args: &no_args,
            locals: &[],
            members: &self.members,
        })?;
        match &setter.target {
            SetTarget::Member(name) => {
                let receiver = stack.pop().unwrap_or_default();
                if receiver.is_null() {
                    return Ok(false);
                }
                self.members.set_value(&receiver, name, value)?;
            }
            SetTarget::Index(argc) => {
                let split = stack.len().saturating_sub(*argc);
                let args: Vec<Value> = stack.drain(split..).collect();
                let receiver = stack.pop().unwrap_or_default();
                if receiver.is_null() {
                    return Ok(false);
                }
                self.members.set_index(&receiver, &args, value)?;
            }
        }
        Ok(true)
    }

    pub fn is_assignable(&self) -> bool {
        self.setter.is_some()
    }

    /// Free parameter names in binding order.
    pub fn parameters(&self) -> &[Arc<str>] {
        &self.parameters
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("ops", &self.program.len())
            .field("parameters", &self.parameters)
            .field("assignable", &self.is_assignable())
            .finish()
    }
}

/// A lambda closed over the source, the arguments and the enclosing lambda locals.
pub(crate) struct LambdaValue {
    pub program: Arc<Program>,
    pub arity: usize,
    pub target: Value,
    pub args: Arc<[Value]>,
    pub captured: Vec<Value>,
    pub members: Arc<MemberManager>,
}

impl Callable for LambdaValue {
    fn call(&self, args: &[Value]) -> BindResult<Value> {
        if args.len() != self.arity {
            return Err(BindError::evaluation(format!(
                "lambda takes {} argument(s), got {}",
                self.arity,
                args.len()
            )));
        }
        let locals: Vec<Value> = self.captured.iter().chain(args).cloned().collect();
        vm::run(&Frame {
            program: &self.program,
            target: &self.target,
            args: &self.args,
            locals: &locals,
            members: &self.members,
        })
    }
}

/// Turns expression trees into [`CompiledExpression`]s.
pub struct ExpressionCompiler {
    builders: Vec<Arc<dyn ExpressionBuilder>>,
    members: Arc<MemberManager>,
}

impl ExpressionCompiler {
    pub fn new(members: Arc<MemberManager>) -> Self {
        Self {
            builders: default_builders(),
            members,
        }
    }

    /// Inserts `builder` ahead of the built-in ones.
    pub fn add_builder(&mut self, builder: Arc<dyn ExpressionBuilder>) {
        self.builders.insert(0, builder);
    }

    pub fn members(&self) -> &Arc<MemberManager> {
        &self.members
    }

    pub fn compile(
        &self,
        node: &ExpressionNode,
        metadata: Option<&Metadata>,
    ) -> BindResult<CompiledExpression> {
        let mut ctx = CompileContext::new(&self.builders, &self.members, metadata, Vec::new());
        ctx.compile(node)?;
        let (program, parameters) = ctx.finish();
        let (setter, parameters) = self.setter(node, metadata, parameters)?;
        Ok(CompiledExpression {
            program: Arc::new(program),
            setter,
            parameters: parameters.into(),
            members: Arc::clone(&self.members),
        })
    }

    /// [`compile`](Self::compile), logging the failure instead of returning it.
    pub fn try_compile(
        &self,
        node: &ExpressionNode,
        metadata: Option<&Metadata>,
    ) -> Option<CompiledExpression> {
        match self.compile(node, metadata) {
            Ok(compiled) => Some(compiled),
            Err(err) => {
                tracing::debug!(expression = %node, error = %err, "compile failed");
                None
            }
        }
    }

    fn setter(
        &self,
        node: &ExpressionNode,
        metadata: Option<&Metadata>,
        parameters: Vec<Arc<str>>,
    ) -> BindResult<(Option<Setter>, Vec<Arc<str>>)> {
        let (receiver, args, target) = match node {
            ExpressionNode::Member { target, name } => {
                (target.as_deref(), &[][..], SetTarget::Member(Arc::clone(name)))
            }
            ExpressionNode::Index { target, args } => {
                (target.as_deref(), args.as_slice(), SetTarget::Index(args.len()))
            }
            _ => return Ok((None, parameters)),
        };
        let mut ctx = CompileContext::new(&self.builders, &self.members, metadata, parameters);
        if matches!(target, SetTarget::Member(_))
            && receiver.and_then(|r| ctx.static_type(r)).is_some()
        {
            let (_, parameters) = ctx.finish();
            return Ok((None, parameters));
        }
        compile_receiver_value(&mut ctx, receiver)?;
        for arg in args {
            ctx.compile(arg)?;
        }
        let (receiver, parameters) = ctx.finish();
        Ok((
            Some(Setter {
                receiver: Arc::new(receiver),
                target,
            }),
            parameters,
        ))
    }
}

/// Ops the program executes, for diagnostics.
pub fn disassemble(compiled: &CompiledExpression) -> String {
    let mut out = compiled.program().to_string();
    if let Some(setter) = &compiled.setter {
        out.push_str("setter:\n");
        out.push_str(&setter.receiver.to_string());
        match &setter.target {
            SetTarget::Member(name) => out.push_str(&format!("     set .{name}\n")),
            SetTarget::Index(argc) => out.push_str(&format!("     set [{argc}]\n")),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/compiler/compiled.rs"]
mod tests;
