pub mod layer;
pub mod sample;
pub mod swd;
