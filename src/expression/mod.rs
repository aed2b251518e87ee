pub(crate) mod ast;
pub(crate) mod context;
pub(crate) mod format;
pub(crate) mod operators;
pub(crate) mod parser;
pub(crate) mod parsers;
