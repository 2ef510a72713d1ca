//! 作答状态 - 业务能力层
//!
//! "用户目前选了什么"的唯一真实来源，全部使用呈现坐标

use std::collections::BTreeMap;
use tracing::debug;

/// 作答状态
///
/// 呈现题号 → 呈现选项号，只记录已作答的题目。
/// 加载时为空；只有显式选择会新增或覆盖；只有重新加载才会清空。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerState {
    /// 每道呈现题目的选项数量，用于越界检查
    option_counts: Vec<usize>,
    answers: BTreeMap<usize, usize>,
}

impl AnswerState {
    pub fn new(option_counts: Vec<usize>) -> Self {
        Self {
            option_counts,
            answers: BTreeMap::new(),
        }
    }

    /// 记录作答，覆盖之前的选择
    ///
    /// 题号或选项号越界时忽略本次调用，返回 `false`
    pub fn record_answer(&mut self, presented_question: usize, presented_option: usize) -> bool {
        match self.option_counts.get(presented_question) {
            Some(&count) if presented_option < count => {
                self.answers.insert(presented_question, presented_option);
                true
            }
            _ => {
                debug!(
                    "忽略越界作答: 题目 {} 选项 {}",
                    presented_question, presented_option
                );
                false
            }
        }
    }

    pub fn selected(&self, presented_question: usize) -> Option<usize> {
        self.answers.get(&presented_question).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn question_count(&self) -> usize {
        self.option_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
