use std::fmt;
use std::sync::Arc;

use crate::expression::operators::{BinaryOp, UnaryOp};
use crate::foundation::value::Value;
use crate::members::descriptor::MemberInfo;

/// One stack-machine instruction. Jump operands are absolute op indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    PushConst(usize),
    /// The source object the expression is evaluated against.
    LoadTarget,
    /// A free parameter bound from the invocation arguments.
    LoadArg(usize),
    /// A lambda parameter or captured enclosing lambda parameter.
    LoadLocal(usize),
    GetMember(usize),
    /// Pops `argc` arguments and the receiver.
    GetIndex(usize),
    Call { name: usize, argc: usize },
    GetStatic(usize),
    CallStatic { index: usize, argc: usize },
    /// Pops value and receiver, pushes the value back.
    SetMember(usize),
    /// Pops value, `argc` arguments and the receiver, pushes the value back.
    SetIndex(usize),
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Replaces the top with itself, failing unless it is a bool.
    Truthy,
    Jump(usize),
    /// Pops a bool; jumps when false.
    JumpIfFalse(usize),
    /// Pops a bool; jumps when true.
    JumpIfTrue(usize),
    /// Jumps leaving the null on the stack; otherwise falls through keeping the value.
    JumpIfNull(usize),
    /// Jumps keeping the value; otherwise pops the null and falls through.
    JumpIfNotNull(usize),
    MakeLambda(usize),
}

/// A static member group resolved during compilation.
#[derive(Debug, Clone)]
pub struct StaticMember {
    pub type_name: Arc<str>,
    pub name: Arc<str>,
    pub members: Arc<[Arc<MemberInfo>]>,
}

/// A lambda body. Its locals are the enclosing lambda locals followed by its own parameters.
#[derive(Debug, Clone)]
pub struct LambdaProgram {
    pub program: Arc<Program>,
    pub arity: usize,
    pub captured: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub ops: Vec<Op>,
    pub consts: Vec<Value>,
    pub names: Vec<Arc<str>>,
    pub statics: Vec<StaticMember>,
    pub lambdas: Vec<LambdaProgram>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn constant(&mut self, value: Value) -> usize {
        self.consts.push(value);
        self.consts.len() - 1
    }

    pub(crate) fn name(&mut self, name: &Arc<str>) -> usize {
        match self.names.iter().position(|n| n == name) {
            Some(i) => i,
            None => {
                self.names.push(Arc::clone(name));
                self.names.len() - 1
            }
        }
    }

    fn write_op(&self, f: &mut fmt::Formatter<'_>, depth: usize, at: usize, op: &Op) -> fmt::Result {
        write!(f, "{:indent$}{at:04} ", "", indent = depth * 2)?;
        match op {
            Op::PushConst(i) => writeln!(f, "push {:?}", self.consts[*i]),
            Op::GetMember(i) => writeln!(f, "get .{}", self.names[*i]),
            Op::SetMember(i) => writeln!(f, "set .{}", self.names[*i]),
            Op::Call { name, argc } => writeln!(f, "call .{}/{argc}", self.names[*name]),
            Op::GetStatic(i) => {
                let s = &self.statics[*i];
                writeln!(f, "get {}.{}", s.type_name, s.name)
            }
            Op::CallStatic { index, argc } => {
                let s = &self.statics[*index];
                writeln!(f, "call {}.{}/{argc}", s.type_name, s.name)
            }
            Op::Unary(op) => writeln!(f, "unary {}", op.sign()),
            Op::Binary(op) => writeln!(f, "binary {}", op.sign()),
            Op::MakeLambda(i) => {
                let lambda = &self.lambdas[*i];
                writeln!(f, "lambda/{}", lambda.arity)?;
                lambda.program.write_ops(f, depth + 1)
            }
            other => writeln!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }

    fn write_ops(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for (at, op) in self.ops.iter().enumerate() {
            self.write_op(f, depth, at, op)?;
        }
        Ok(())
    }
}

/// Disassembly, one op per line; lambda bodies are indented under their `lambda` op.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_ops(f, 0)
    }
}
