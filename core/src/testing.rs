pub mod executor;
pub mod result;
pub mod runner;

pub use executor::*;
pub use result::*;
pub use runner::*;
