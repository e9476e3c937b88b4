mod catalog;
mod engine;
mod error;
mod observer;
mod pass_finder;
mod propagation;
mod types;

pub use catalog::{Catalog, NameFilter};
pub use engine::Sgp4Engine;
pub use error::PredictError;
pub use observer::Observer;
pub use pass_finder::{predict_passes, PassQuery};
pub use types::Window;

#[cfg(test)]
pub(crate) use types::fixtures;
