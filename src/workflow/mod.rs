pub mod session;
pub mod summary_session;

pub use session::{CheckOutcome, SessionFlags, TestSession};
pub use summary_session::{AiSummarySession, AppendState, AppendTicket, SummaryEvent, SummaryTicket};
