use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Multiply,
    Divide,
    Remainder,
    Add,
    Subtract,
    LeftShift,
    RightShift,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equality,
    NotEquality,
    LogicalAnd,
    ExclusiveOr,
    LogicalOr,
    ConditionalAnd,
    ConditionalOr,
    NullCoalescing,
}

impl BinaryOp {
    pub fn sign(self) -> &'static str {
        match self {
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Remainder => "%",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThanOrEqual => ">=",
            Self::Equality => "==",
            Self::NotEquality => "!=",
            Self::LogicalAnd => "&",
            Self::ExclusiveOr => "^",
            Self::LogicalOr => "|",
            Self::ConditionalAnd => "&&",
            Self::ConditionalOr => "||",
            Self::NullCoalescing => "??",
        }
    }

    /// Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Multiply | Self::Divide | Self::Remainder => 100,
            Self::Add | Self::Subtract => 90,
            Self::LeftShift | Self::RightShift => 80,
            Self::LessThan
            | Self::GreaterThan
            | Self::LessThanOrEqual
            | Self::GreaterThanOrEqual => 70,
            Self::Equality | Self::NotEquality => 60,
            Self::LogicalAnd => 50,
            Self::ExclusiveOr => 40,
            Self::LogicalOr => 30,
            Self::ConditionalAnd => 20,
            Self::ConditionalOr => 10,
            Self::NullCoalescing => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Minus,
    Plus,
    LogicalNegation,
    BitwiseNegation,
}

impl UnaryOp {
    pub fn sign(self) -> &'static str {
        match self {
            Self::Minus => "-",
            Self::Plus => "+",
            Self::LogicalNegation => "!",
            Self::BitwiseNegation => "~",
        }
    }
}

/// A binary operator as the parser recognizes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryToken {
    pub op: BinaryOp,
    pub sign: Arc<str>,
    pub precedence: u8,
    pub aliases: Vec<Arc<str>>,
}

impl BinaryToken {
    pub fn new(op: BinaryOp) -> Self {
        Self {
            op,
            sign: Arc::from(op.sign()),
            precedence: op.precedence(),
            aliases: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(Arc::from(alias));
        self
    }

    /// Sign followed by aliases.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(&*self.sign).chain(self.aliases.iter().map(|a| &**a))
    }
}

pub fn default_binary_tokens() -> Vec<BinaryToken> {
    use BinaryOp::*;
    vec![
        BinaryToken::new(Multiply),
        BinaryToken::new(Divide),
        BinaryToken::new(Remainder),
        BinaryToken::new(Add),
        BinaryToken::new(Subtract),
        BinaryToken::new(LeftShift),
        BinaryToken::new(RightShift),
        BinaryToken::new(LessThan).alias("&lt;"),
        BinaryToken::new(GreaterThan).alias("&gt;"),
        BinaryToken::new(LessThanOrEqual).alias("&lt;="),
        BinaryToken::new(GreaterThanOrEqual).alias("&gt;="),
        BinaryToken::new(Equality),
        BinaryToken::new(NotEquality),
        BinaryToken::new(LogicalAnd).alias("&amp;"),
        BinaryToken::new(ExclusiveOr),
        BinaryToken::new(LogicalOr),
        BinaryToken::new(ConditionalAnd).alias("and").alias("&amp;&amp;"),
        BinaryToken::new(ConditionalOr).alias("or"),
        BinaryToken::new(NullCoalescing),
    ]
}

/// A unary operator as the parser recognizes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryToken {
    pub op: UnaryOp,
    pub sign: Arc<str>,
    /// Operand is one primary expression rather than a full postfix chain.
    pub is_single_expression: bool,
}

impl UnaryToken {
    pub fn new(op: UnaryOp) -> Self {
        Self {
            op,
            sign: Arc::from(op.sign()),
            is_single_expression: false,
        }
    }

    pub fn single_expression(mut self, value: bool) -> Self {
        self.is_single_expression = value;
        self
    }
}

pub fn default_unary_tokens(single_expression: bool) -> Vec<UnaryToken> {
    [
        UnaryOp::Minus,
        UnaryOp::Plus,
        UnaryOp::LogicalNegation,
        UnaryOp::BitwiseNegation,
    ]
    .into_iter()
    .map(|op| UnaryToken::new(op).single_expression(single_expression))
    .collect()
}
