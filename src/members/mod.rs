pub(crate) mod builtins;
pub(crate) mod descriptor;
pub(crate) mod dynamic;
pub(crate) mod manager;
