pub mod curve;
pub mod error;
pub mod traits;
pub mod types;

pub use curve::*;
pub use error::*;
pub use traits::*;
pub use types::*;
