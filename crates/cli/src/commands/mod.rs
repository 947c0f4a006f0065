pub(crate) mod complete;
pub(crate) mod context;
pub(crate) mod scope;
