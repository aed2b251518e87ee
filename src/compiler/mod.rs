pub(crate) mod builders;
pub(crate) mod bytecode;
pub(crate) mod compiled;
pub(crate) mod ops;
pub(crate) mod vm;
