use crate::expression::ast::ExpressionNode;

pub type BindResult<T> = Result<T, BindError>;

#[derive(thiserror::Error, Debug)]
pub enum BindError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("compile error: {message}")]
    Compile {
        message: String,
        node: Option<Box<ExpressionNode>>,
    },

    #[error("member not found: {type_name}.{member}")]
    MemberNotFound { type_name: String, member: String },

    #[error("null reference: {0}")]
    NullReference(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("observation error: {0}")]
    Observation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BindError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn compile(msg: impl Into<String>, node: &ExpressionNode) -> Self {
        Self::Compile {
            message: msg.into(),
            node: Some(Box::new(node.clone())),
        }
    }

    pub fn member_not_found(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MemberNotFound {
            type_name: type_name.into(),
            member: member.into(),
        }
    }

    pub fn null_reference(msg: impl Into<String>) -> Self {
        Self::NullReference(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn observation(msg: impl Into<String>) -> Self {
        Self::Observation(msg.into())
    }

    /// The node a compile error was raised for, if any.
    pub fn node(&self) -> Option<&ExpressionNode> {
        match self {
            Self::Compile { node, .. } => node.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
