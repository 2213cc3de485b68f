// Domain layer module
pub mod aggregates;
pub mod base;
pub mod front_matter;
pub mod value_objects;

pub use aggregates::*;
pub use base::*;
pub use front_matter::*;
pub use value_objects::*;
