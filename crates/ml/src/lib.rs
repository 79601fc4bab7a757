pub mod form;
pub mod features;
pub mod models;
pub mod inference;

pub use form::*;
pub use features::*;
pub use models::*;
pub use inference::*;
