pub mod football_data;
pub mod updater;
pub mod update_job;
pub mod predictor;
pub mod context;

pub use football_data::*;
pub use updater::*;
pub use update_job::*;
pub use predictor::*;
pub use context::*;
