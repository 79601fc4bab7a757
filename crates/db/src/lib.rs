pub mod schema;
pub mod repository;
pub mod store;

pub use schema::*;
pub use repository::*;
pub use store::*;
