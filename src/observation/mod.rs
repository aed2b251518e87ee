pub(crate) mod chain;
pub(crate) mod dispatch;
pub(crate) mod manager;
pub(crate) mod member_observer;
pub(crate) mod path;
pub(crate) mod path_observer;
pub(crate) mod registry;
pub(crate) mod resource;
