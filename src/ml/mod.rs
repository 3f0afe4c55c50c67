//! Networks, augmentation, metrics and explanations.
//!
//! Both networks are Burn modules trained on the autodiff ndarray backend and
//! frozen onto the plain backend for inference.

pub mod augment;
pub mod backend;
pub mod explain;
pub mod gan;
pub mod layers;
pub mod metrics;
pub mod transformer;
