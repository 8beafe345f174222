pub mod error;
pub mod region;
pub mod time;

pub use error::{ExporterError, Result};
pub use region::Region;
