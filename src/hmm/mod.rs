pub mod gaussian;
pub mod model;

pub use gaussian::GaussianHmm;
pub use model::{Frame, Scorable};
