//! 业务能力层
//!
//! 每个服务只提供一种能力，不持有会话状态，互不依赖（投影器只读取作答状态）

pub mod ai_summary;
pub mod answer_state;
pub mod navigator;
pub mod projector;
pub mod shuffle;

pub use ai_summary::{
    AiSummaryClient, AppendOutcome, SummaryPhase, SummaryUpdate, Utf8ChunkDecoder, SUMMARY_PREFIX,
};
pub use answer_state::AnswerState;
pub use navigator::{NavOutcome, QuestionNavigator};
pub use projector::{Projection, SubmissionPayload, SubmissionProjector};
pub use shuffle::{ShuffleEngine, ShuffleMode, ShuffleOutcome};
