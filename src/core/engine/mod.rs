pub mod perturbation;
pub mod traits;
