use std::collections::HashMap;

use crate::expression::ast::ExpressionNode;
use crate::expression::context::TokenParserContext;
use crate::expression::parsers::TokenParser;
use crate::foundation::value::Value;

/// Named literals such as `null`, `true` and `false`.
pub struct ConstantTokenParser {
    constants: HashMap<String, Value>,
}

impl ConstantTokenParser {
    pub fn new(constants: HashMap<String, Value>) -> Self {
        Self { constants }
    }

    pub fn with_constant(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.constants.insert(name.to_string(), value.into());
        self
    }
}

impl Default for ConstantTokenParser {
    fn default() -> Self {
        Self::new(HashMap::new())
            .with_constant("null", Value::Null)
            .with_constant("true", true)
            .with_constant("false", false)
    }
}

impl TokenParser for ConstantTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        if prev.is_some() {
            return None;
        }
        let start = ctx.skip_whitespace();
        let (name, end) = ctx.read_identifier_at(start)?;
        let value = self.constants.get(&name)?;
        ctx.set_position(end);
        Some(ExpressionNode::Constant(value.clone()))
    }
}
