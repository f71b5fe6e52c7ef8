pub mod job;
pub mod outcome;
pub mod progress;
pub mod recipient;
pub mod run;

pub use job::{DispatchJob, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedImage, JobPart, parse_color};
pub use outcome::DeliveryOutcome;
pub use progress::ProgressSnapshot;
pub use recipient::Recipient;
pub use run::{RunLogEntry, RunState, RunSummary, RunTally};
