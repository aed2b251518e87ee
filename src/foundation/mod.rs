pub(crate) mod error;
pub(crate) mod metadata;
pub(crate) mod opts;
pub(crate) mod sync;
pub(crate) mod value;
