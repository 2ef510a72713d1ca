//! 摘要会话 - 流程层
//!
//! 封装"当前这道题的 AI 摘要进行到哪一步"这一信息。
//! 每次导航都会换一个全新的会话。

use std::fmt::Display;

use crate::models::SummaryRequest;
use crate::services::{AppendOutcome, SummaryPhase, SummaryUpdate};

/// 一次摘要请求的凭证
///
/// 由会话签发，交给后台任务；任务完成后连同 `generation` 一起带回
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTicket {
    pub generation: u64,
    pub presented_index: usize,
    pub original_index: usize,
    pub request: SummaryRequest,
}

impl Display for SummaryTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[摘要 代#{} 题目#{} 原始#{}]",
            self.generation,
            self.presented_index + 1,
            self.original_index
        )
    }
}

/// 一次追加解析请求的凭证
#[derive(Debug, Clone, PartialEq)]
pub struct AppendTicket {
    pub generation: u64,
    /// 签发时的加载序号
    pub load_seq: u64,
    pub test_id: u64,
    pub presented_index: usize,
    pub original_index: usize,
    pub summary: String,
}

/// 后台摘要任务推送的事件
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEvent {
    pub generation: u64,
    pub update: SummaryUpdate,
}

/// 追加解析按钮状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendState {
    /// 还没有可追加的摘要
    #[default]
    Unavailable,
    Ready,
    Appending,
    /// 已追加，直到下一次摘要前不可重复
    Appended,
}

impl AppendState {
    pub fn label(&self) -> &'static str {
        match self {
            AppendState::Appending => "Appending...",
            AppendState::Appended => "Appended",
            _ => "Append AI Summary To Explanation",
        }
    }
}

/// 当前题目的摘要会话
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiSummarySession {
    pub phase: SummaryPhase,
    /// 展示给用户的文本（进度、摘要或错误）
    pub display: String,
    /// 最近一次成功的摘要（已去除首尾空白）
    pub summary: Option<String>,
    /// 发起摘要时记录的原始题号
    pub original_index: Option<usize>,
    pub append: AppendState,
}

impl AiSummarySession {
    /// 开始新一轮摘要，清掉上一轮的结果
    pub fn start(&mut self, original_index: usize) {
        *self = Self {
            phase: SummaryPhase::RequestingStream,
            display: "Generating AI summary...".to_string(),
            summary: None,
            original_index: Some(original_index),
            append: AppendState::Unavailable,
        };
    }

    /// 请求进行中，摘要按钮应禁用
    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            SummaryPhase::RequestingStream
                | SummaryPhase::Streaming
                | SummaryPhase::RequestingFallback
        )
    }

    pub fn apply(&mut self, update: SummaryUpdate) {
        match update {
            SummaryUpdate::Phase(phase) => self.phase = phase,
            SummaryUpdate::Partial { display } => self.display = display,
            SummaryUpdate::Complete { summary, display } => {
                self.phase = SummaryPhase::Complete;
                self.display = display;
                self.summary = Some(summary);
                self.append = AppendState::Ready;
            }
            SummaryUpdate::Failed { message } => {
                self.phase = SummaryPhase::Failed;
                self.display = message;
                self.summary = None;
                self.append = AppendState::Unavailable;
            }
        }
    }

    /// 只有摘要完成且记录了原始题号时才能追加
    pub fn can_append(&self) -> bool {
        self.phase == SummaryPhase::Complete
            && self.append == AppendState::Ready
            && self.summary.is_some()
            && self.original_index.is_some()
    }

    /// 追加成功清空摘要展示；失败恢复按钮并展示错误
    pub fn apply_append(&mut self, outcome: &AppendOutcome) {
        match outcome {
            AppendOutcome::Appended { .. } => {
                self.append = AppendState::Appended;
                self.display.clear();
            }
            AppendOutcome::Failed { message } => {
                self.append = AppendState::Ready;
                self.display = message.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_enables_append() {
        let mut session = AiSummarySession::default();
        assert!(!session.can_append());

        session.start(4);
        assert!(session.is_busy());
        assert_eq!(session.display, "Generating AI summary...");

        session.apply(SummaryUpdate::Complete {
            summary: "S".to_string(),
            display: "AI Summary: S".to_string(),
        });
        assert!(!session.is_busy());
        assert!(session.can_append());
        assert_eq!(session.append.label(), "Append AI Summary To Explanation");
    }

    #[test]
    fn test_failed_append_restores_button() {
        let mut session = AiSummarySession::default();
        session.start(0);
        session.apply(SummaryUpdate::Complete {
            summary: "S".to_string(),
            display: "AI Summary: S".to_string(),
        });
        session.append = AppendState::Appending;
        assert_eq!(session.append.label(), "Appending...");

        session.apply_append(&AppendOutcome::Failed {
            message: "nope".to_string(),
        });
        assert!(session.can_append());
        assert_eq!(session.display, "nope");

        session.apply_append(&AppendOutcome::Appended {
            explanation: "E".to_string(),
        });
        assert!(!session.can_append());
        assert_eq!(session.append.label(), "Appended");
        assert!(session.display.is_empty());
    }

    #[test]
    fn test_ticket_display() {
        let ticket = SummaryTicket {
            generation: 3,
            presented_index: 0,
            original_index: 5,
            request: SummaryRequest {
                question: String::new(),
                options: vec![],
                correct_index: -1,
                selected_index: None,
                explanation: String::new(),
            },
        };
        assert_eq!(ticket.to_string(), "[摘要 代#3 题目#1 原始#5]");
    }
}
