pub mod matches;
pub mod predictions;
pub mod market;
pub mod error;

pub use matches::*;
pub use predictions::*;
pub use market::*;
pub use error::*;
