pub mod draft;
pub mod openai;

pub use draft::{DraftOutcome, classify, fallback_draft, mock_draft};
pub use openai::{VisionClient, VisionError};
