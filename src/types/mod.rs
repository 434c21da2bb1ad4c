pub mod features;
pub mod prediction;
pub mod price;

pub use features::*;
pub use prediction::*;
pub use price::*;
