pub mod question;
pub mod results;
pub mod summary;

pub use question::{PresentedQuestion, Question, TestDefinition};
pub use results::{AnswerReview, ResultsReport};
pub use summary::{AppendRequest, AppendResponse, ErrorBody, SummaryRequest, SummaryResponse};
