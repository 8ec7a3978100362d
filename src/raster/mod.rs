pub mod bitmap;
pub mod blur;
pub mod composite;
pub mod cpu;
