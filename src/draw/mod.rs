pub mod history;
pub mod surface;
pub mod tool;
