pub mod bucket;
pub mod measurement;
pub mod range;
pub mod viewport;

pub use bucket::*;
pub use measurement::*;
pub use range::*;
pub use viewport::*;
