pub mod api;
pub mod scripted;

pub use api::{ChunkStream, HttpQuizApi, QuizApi};
pub use scripted::{ScriptedQuizApi, StreamReply, TextReply};
