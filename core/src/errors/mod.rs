mod status;

pub use status::{Result, Status};
