pub mod events;
pub mod extract;

pub use events::event_keys;
pub use extract::{extract_break, ComparisonPayload, ExtractOutcome, PayloadEntry};
