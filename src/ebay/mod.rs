pub mod finding;

pub use finding::{FindingClient, FindingError};
