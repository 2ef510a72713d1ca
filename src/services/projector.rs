//! 提交投影 - 业务能力层
//!
//! 把呈现坐标下的作答转换为后端使用的原始坐标

use super::answer_state::AnswerState;

/// 单题投影结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub original_question: usize,
    /// `None` 表示未作答
    pub original_option: Option<usize>,
}

/// 完整提交载荷
///
/// `slots[original_question]`，每道原始题目恰好一个槽位，未作答为 `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub slots: Vec<Option<usize>>,
}

impl SubmissionPayload {
    pub fn total(&self) -> usize {
        self.slots.len()
    }

    pub fn answered(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// 未全部作答时需要用户确认后才能提交
    pub fn needs_confirmation(&self) -> bool {
        self.answered() < self.total()
    }

    /// 确认提示文案
    pub fn confirmation_prompt(&self) -> String {
        format!(
            "You've answered {} of {} questions.\n\nFinish the test anyway?",
            self.answered(),
            self.total()
        )
    }

    /// 表单字段 `q{原始题号}` → 原始选项号或空字符串，按原始题号排列
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(original, slot)| {
                let value = slot.map(|opt| opt.to_string()).unwrap_or_default();
                (format!("q{}", original), value)
            })
            .collect()
    }
}

/// 提交投影器
///
/// 借用打乱映射和作答状态，不持有任何数据
pub struct SubmissionProjector<'a> {
    index_map: &'a [usize],
    option_map: &'a [Vec<usize>],
    answers: &'a AnswerState,
}

impl<'a> SubmissionProjector<'a> {
    pub fn new(
        index_map: &'a [usize],
        option_map: &'a [Vec<usize>],
        answers: &'a AnswerState,
    ) -> Self {
        Self {
            index_map,
            option_map,
            answers,
        }
    }

    /// 投影单题；题号不在本试卷内时返回 `None`
    pub fn project(&self, presented_question: usize) -> Option<Projection> {
        let original_question = *self.index_map.get(presented_question)?;
        let original_option = self.answers.selected(presented_question).and_then(|opt| {
            self.option_map
                .get(presented_question)
                .and_then(|perm| perm.get(opt))
                .copied()
        });
        Some(Projection {
            original_question,
            original_option,
        })
    }

    /// 对每道呈现题目投影，按原始题号填充槽位
    pub fn project_all(&self) -> SubmissionPayload {
        let mut slots = vec![None; self.index_map.len()];
        for presented in 0..self.index_map.len() {
            if let Some(projection) = self.project(presented) {
                if let Some(slot) = slots.get_mut(projection.original_question) {
                    *slot = projection.original_option;
                }
            }
        }
        SubmissionPayload { slots }
    }
}
