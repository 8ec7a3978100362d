pub mod buffer;
pub mod shape;
pub mod smooth;
