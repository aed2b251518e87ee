use std::fmt;
use std::sync::Arc;

use crate::expression::operators::{BinaryOp, UnaryOp};
use crate::foundation::value::Value;

/// Immutable parse tree produced by the token parsers.
///
/// Equality is structural, so two parses of the same text compare equal.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    Constant(Value),
    Member {
        target: Option<Box<ExpressionNode>>,
        name: Arc<str>,
    },
    Index {
        target: Option<Box<ExpressionNode>>,
        args: Vec<ExpressionNode>,
    },
    MethodCall {
        target: Option<Box<ExpressionNode>>,
        name: Arc<str>,
        args: Vec<ExpressionNode>,
        type_args: Vec<Arc<str>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExpressionNode>,
        right: Box<ExpressionNode>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<ExpressionNode>,
    },
    Condition {
        test: Box<ExpressionNode>,
        if_true: Box<ExpressionNode>,
        if_false: Box<ExpressionNode>,
    },
    Assignment {
        target: Box<ExpressionNode>,
        value: Box<ExpressionNode>,
    },
    Lambda {
        body: Box<ExpressionNode>,
        parameters: Vec<ExpressionNode>,
    },
    Parameter(Arc<str>),
    NullConditionalMember(Box<ExpressionNode>),
    TypeAccess(Arc<str>),
}

impl ExpressionNode {
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    pub fn null() -> Self {
        Self::Constant(Value::Null)
    }

    pub fn member(target: Option<ExpressionNode>, name: &str) -> Self {
        Self::Member {
            target: target.map(Box::new),
            name: Arc::from(name),
        }
    }

    pub fn index(target: Option<ExpressionNode>, args: Vec<ExpressionNode>) -> Self {
        Self::Index {
            target: target.map(Box::new),
            args,
        }
    }

    pub fn method_call(target: Option<ExpressionNode>, name: &str, args: Vec<ExpressionNode>) -> Self {
        Self::generic_method_call(target, name, Vec::new(), args)
    }

    pub fn generic_method_call(
        target: Option<ExpressionNode>,
        name: &str,
        type_args: Vec<Arc<str>>,
        args: Vec<ExpressionNode>,
    ) -> Self {
        Self::MethodCall {
            target: target.map(Box::new),
            name: Arc::from(name),
            args,
            type_args,
        }
    }

    pub fn binary(op: BinaryOp, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: ExpressionNode) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn condition(test: ExpressionNode, if_true: ExpressionNode, if_false: ExpressionNode) -> Self {
        Self::Condition {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    pub fn assignment(target: ExpressionNode, value: ExpressionNode) -> Self {
        Self::Assignment {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn lambda(parameters: &[&str], body: ExpressionNode) -> Self {
        Self::Lambda {
            body: Box::new(body),
            parameters: parameters.iter().map(|p| Self::parameter(p)).collect(),
        }
    }

    pub fn parameter(name: &str) -> Self {
        Self::Parameter(Arc::from(name))
    }

    pub fn null_conditional(target: ExpressionNode) -> Self {
        Self::NullConditionalMember(Box::new(target))
    }

    pub fn type_access(name: &str) -> Self {
        Self::TypeAccess(Arc::from(name))
    }

    /// Nodes a value can be written through.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Member { .. } | Self::Index { .. })
    }

    /// Member path text of a pure member/indexer chain rooted at the source.
    ///
    /// Indexers qualify only with constant integer or string arguments.
    pub fn as_member_path(&self) -> Option<String> {
        match self {
            Self::Member { target: None, name } => Some(name.to_string()),
            Self::Member {
                target: Some(t),
                name,
            } => Some(format!("{}.{name}", t.as_member_path()?)),
            Self::Index { target, args } => {
                let mut path = match target {
                    Some(t) => t.as_member_path()?,
                    None => String::new(),
                };
                path.push('[');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        path.push(',');
                    }
                    match arg {
                        Self::Constant(Value::String(s)) => {
                            path.push('"');
                            path.push_str(s);
                            path.push('"');
                        }
                        Self::Constant(v) if v.kind().is_integral() => {
                            path.push_str(&v.to_string());
                        }
                        _ => return None,
                    }
                }
                path.push(']');
                Some(path)
            }
            Self::NullConditionalMember(t) => t.as_member_path(),
            _ => None,
        }
    }

    /// Member paths whose changes can affect this expression's value, in order of first use.
    ///
    /// The member written by an assignment is excluded; its receiver chain is not.
    pub fn member_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_paths(self, &mut out);
        out
    }
}

fn push_unique(out: &mut Vec<String>, path: String) {
    if !out.contains(&path) {
        out.push(path);
    }
}

fn collect_paths(node: &ExpressionNode, out: &mut Vec<String>) {
    if let Some(path) = node.as_member_path() {
        push_unique(out, path);
        return;
    }
    match node {
        ExpressionNode::Member { target, .. } => {
            if let Some(t) = target {
                collect_paths(t, out);
            }
        }
        ExpressionNode::Index { target, args } => {
            if let Some(t) = target {
                collect_paths(t, out);
            }
            args.iter().for_each(|a| collect_paths(a, out));
        }
        ExpressionNode::MethodCall { target, args, .. } => {
            if let Some(t) = target {
                collect_paths(t, out);
            }
            args.iter().for_each(|a| collect_paths(a, out));
        }
        ExpressionNode::Binary { left, right, .. } => {
            collect_paths(left, out);
            collect_paths(right, out);
        }
        ExpressionNode::Unary { operand, .. } => collect_paths(operand, out),
        ExpressionNode::Condition {
            test,
            if_true,
            if_false,
        } => {
            collect_paths(test, out);
            collect_paths(if_true, out);
            collect_paths(if_false, out);
        }
        ExpressionNode::Assignment { target, value } => {
            match target.as_ref() {
                ExpressionNode::Member {
                    target: Some(receiver),
                    ..
                } => collect_paths(receiver, out),
                ExpressionNode::Index { target, args } => {
                    if let Some(receiver) = target {
                        collect_paths(receiver, out);
                    }
                    args.iter().for_each(|a| collect_paths(a, out));
                }
                _ => {}
            }
            collect_paths(value, out);
        }
        ExpressionNode::Lambda { body, .. } => collect_paths(body, out),
        ExpressionNode::NullConditionalMember(t) => collect_paths(t, out),
        ExpressionNode::Constant(_) | ExpressionNode::Parameter(_) | ExpressionNode::TypeAccess(_) => {}
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[ExpressionNode]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// Receivers that would otherwise bind looser than the access applied to them get parentheses.
fn write_receiver(f: &mut fmt::Formatter<'_>, node: &ExpressionNode) -> fmt::Result {
    match node {
        ExpressionNode::Unary { .. }
        | ExpressionNode::Assignment { .. }
        | ExpressionNode::Lambda { .. } => write!(f, "({node})"),
        _ => write!(f, "{node}"),
    }
}

fn write_target(f: &mut fmt::Formatter<'_>, target: &Option<Box<ExpressionNode>>) -> fmt::Result {
    match target.as_deref() {
        Some(ExpressionNode::NullConditionalMember(inner)) => {
            write_receiver(f, inner)?;
            f.write_str("?.")
        }
        Some(t) => {
            write_receiver(f, t)?;
            f.write_str(".")
        }
        None => Ok(()),
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => match v {
                Value::Null => f.write_str("null"),
                Value::String(s) => write!(f, "{:?}", &**s),
                Value::Char(c) => write!(f, "{c:?}"),
                Value::UInt(n) => write!(f, "{n}U"),
                Value::Long(n) => write!(f, "{n}L"),
                Value::ULong(n) => write!(f, "{n}UL"),
                Value::Float(n) => write!(f, "{n:?}F"),
                Value::Double(n) => write!(f, "{n:?}"),
                Value::Decimal(n) => write!(f, "{n}M"),
                other => write!(f, "{other:?}"),
            },
            Self::Member { target, name } => {
                write_target(f, target)?;
                f.write_str(name)
            }
            Self::Index { target, args } => {
                match target.as_deref() {
                    Some(Self::NullConditionalMember(inner)) => {
                        write_receiver(f, inner)?;
                        f.write_str("?")?;
                    }
                    Some(t) => write_receiver(f, t)?,
                    None => {}
                }
                f.write_str("[")?;
                write_args(f, args)?;
                f.write_str("]")
            }
            Self::MethodCall {
                target,
                name,
                args,
                type_args,
            } => {
                write_target(f, target)?;
                f.write_str(name)?;
                if !type_args.is_empty() {
                    write!(f, "<{}>", type_args.join(", "))?;
                }
                f.write_str("(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Self::Binary { op, left, right } => write!(f, "({left} {} {right})", op.sign()),
            Self::Unary { op, operand } => write!(f, "{}{operand}", op.sign()),
            Self::Condition {
                test,
                if_true,
                if_false,
            } => write!(f, "({test} ? {if_true} : {if_false})"),
            Self::Assignment { target, value } => write!(f, "{target} = {value}"),
            Self::Lambda { body, parameters } => {
                f.write_str("(")?;
                write_args(f, parameters)?;
                write!(f, ") => {body}")
            }
            Self::Parameter(name) => f.write_str(name),
            Self::NullConditionalMember(target) => {
                write_receiver(f, target)?;
                f.write_str("?")
            }
            Self::TypeAccess(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/ast.rs"]
mod tests;
