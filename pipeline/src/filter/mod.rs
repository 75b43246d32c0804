pub mod area;
pub mod sampler;
pub mod traits;
