pub(crate) mod deferred;
#[allow(clippy::module_inception)]
pub mod frame;
pub mod sequence;
pub mod store;
