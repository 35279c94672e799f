pub mod element;
pub mod error;
pub mod prelude;
pub mod transform;
