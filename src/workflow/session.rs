//! 答题会话 - 流程层
//!
//! 核心职责：持有"一次加载"的全部状态，并决定每个用户操作会改变什么
//!
//! - 打乱结果、作答状态、导航位置、当前题目的摘要会话
//! - 为后台请求签发带 `generation` 的凭证，丢弃过期的完成事件
//! - 不发起任何网络请求（由编排层在后台任务中完成）

use rand::Rng;
use tracing::{debug, info};

use super::summary_session::{
    AiSummarySession, AppendState, AppendTicket, SummaryEvent, SummaryTicket,
};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{PresentedQuestion, SummaryRequest, TestDefinition};
use crate::services::{
    AnswerState, AppendOutcome, NavOutcome, QuestionNavigator, ShuffleEngine, ShuffleMode,
    ShuffleOutcome, SubmissionPayload, SubmissionProjector,
};

const MSG_ANSWER_UNKNOWN: &str = "Correct answer not available.";

/// 会话功能开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFlags {
    pub ai_summary_enabled: bool,
    /// 闪卡模式：不打乱选项、最后一题不交卷
    pub flashcard_mode: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            ai_summary_enabled: true,
            flashcard_mode: false,
        }
    }
}

impl From<&Config> for SessionFlags {
    fn from(config: &Config) -> Self {
        Self {
            ai_summary_enabled: config.ai_summary_enabled,
            flashcard_mode: config.flashcard_mode,
        }
    }
}

/// "检查答案"的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Correct { explanation: String },
    Incorrect { explanation: String },
    NoSelection,
}

impl CheckOutcome {
    pub fn message(&self) -> String {
        let (verdict, explanation) = match self {
            CheckOutcome::Correct { explanation } => ("✅ Correct!", explanation),
            CheckOutcome::Incorrect { explanation } => ("❌ Incorrect.", explanation),
            CheckOutcome::NoSelection => return "Please select an answer.".to_string(),
        };
        if explanation.trim().is_empty() {
            verdict.to_string()
        } else {
            format!("{}\nExplanation: {}", verdict, explanation)
        }
    }
}

/// 答题会话
#[derive(Debug, Default)]
pub struct TestSession {
    flags: SessionFlags,
    test_id: u64,
    title: String,
    shuffle: ShuffleOutcome,
    answers: AnswerState,
    navigator: QuestionNavigator,
    summary: AiSummarySession,
    revealed: bool,
    feedback: Option<CheckOutcome>,
    /// 导航 / 重新加载 / 新摘要都会递增
    generation: u64,
    /// 每次加载递增，用于判断追加结果是否仍属于当前卷子
    load_seq: u64,
    loaded: bool,
}

impl TestSession {
    pub fn new(flags: SessionFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    /// 加载试卷并重新打乱，之前的全部状态被替换
    pub fn load<R: Rng + ?Sized>(&mut self, test: &TestDefinition, rng: &mut R) {
        let mode = if self.flags.flashcard_mode {
            ShuffleMode::QuestionsOnly
        } else {
            ShuffleMode::QuestionsAndOptions
        };
        let shuffle = ShuffleEngine::shuffle(&test.questions, mode, rng);
        let option_counts = shuffle.presented.iter().map(|q| q.options.len()).collect();
        let count = shuffle.presented.len();

        self.test_id = test.id;
        self.title = test.display_title().to_string();
        self.answers = AnswerState::new(option_counts);
        self.navigator = QuestionNavigator::new(count, !self.flags.flashcard_mode);
        self.shuffle = shuffle;
        self.loaded = true;
        self.load_seq += 1;
        self.clear_transient();

        info!("✓ 会话已加载: {} ({} 道题)", self.title, count);
    }

    /// 回到未加载状态
    pub fn reset(&mut self) {
        let flags = self.flags;
        let generation = self.generation + 1;
        let load_seq = self.load_seq + 1;
        *self = Self {
            flags,
            generation,
            load_seq,
            ..Self::default()
        };
        debug!("会话已重置");
    }

    fn clear_transient(&mut self) {
        self.generation += 1;
        self.summary = AiSummarySession::default();
        self.revealed = false;
        self.feedback = None;
    }

    // ========== 只读访问 ==========

    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn test_id(&self) -> u64 {
        self.test_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn question_count(&self) -> usize {
        self.shuffle.presented.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.navigator.current()
    }

    pub fn current_question(&self) -> Option<&PresentedQuestion> {
        self.current_index()
            .and_then(|idx| self.shuffle.presented.get(idx))
    }

    pub fn presented(&self) -> &[PresentedQuestion] {
        &self.shuffle.presented
    }

    pub fn index_map(&self) -> &[usize] {
        &self.shuffle.index_map
    }

    pub fn option_map(&self) -> &[Vec<usize>] {
        &self.shuffle.option_map
    }

    pub fn answers(&self) -> &AnswerState {
        &self.answers
    }

    /// 当前题目的已选选项
    pub fn selected(&self) -> Option<usize> {
        self.current_index()
            .and_then(|idx| self.answers.selected(idx))
    }

    pub fn navigator(&self) -> &QuestionNavigator {
        &self.navigator
    }

    pub fn summary(&self) -> &AiSummarySession {
        &self.summary
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn feedback(&self) -> Option<&CheckOutcome> {
        self.feedback.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 答题模式 "Question i of N"，闪卡模式 "i / N"
    pub fn progress_label(&self) -> String {
        match self.current_index() {
            Some(idx) if self.flags.flashcard_mode => {
                format!("{} / {}", idx + 1, self.question_count())
            }
            _ => self.navigator.progress_label(),
        }
    }

    // ========== 用户操作 ==========

    /// 选择当前题目的选项；越界或无题目时返回 `false`
    pub fn select_option(&mut self, presented_option: usize) -> bool {
        let Some(current) = self.current_index() else {
            return false;
        };
        let recorded = self.answers.record_answer(current, presented_option);
        if recorded {
            self.feedback = None;
        }
        recorded
    }

    pub fn check_answer(&mut self) -> CheckOutcome {
        let Some(question) = self.current_question() else {
            return CheckOutcome::NoSelection;
        };
        let outcome = match self.selected() {
            None => CheckOutcome::NoSelection,
            Some(selected) if question.correct_index == Some(selected) => CheckOutcome::Correct {
                explanation: question.explanation.clone(),
            },
            Some(_) => CheckOutcome::Incorrect {
                explanation: question.explanation.clone(),
            },
        };
        if outcome != CheckOutcome::NoSelection {
            self.feedback = Some(outcome.clone());
        }
        outcome
    }

    /// 揭示当前题目的答案；没有已知正确答案时返回提示文案
    pub fn reveal_answer(&mut self) -> Option<String> {
        let question = self.current_question()?;
        let answer = question
            .correct_option()
            .unwrap_or(MSG_ANSWER_UNKNOWN)
            .to_string();
        self.revealed = true;
        Some(answer)
    }

    pub fn prev(&mut self) -> NavOutcome {
        let outcome = self.navigator.prev();
        if let NavOutcome::Moved(_) = outcome {
            self.clear_transient();
        }
        outcome
    }

    pub fn next(&mut self) -> NavOutcome {
        let outcome = self.navigator.next();
        if let NavOutcome::Moved(_) = outcome {
            self.clear_transient();
        }
        outcome
    }

    // ========== AI 摘要 ==========

    /// 为当前题目开始新一轮摘要
    ///
    /// 功能关闭、无题目或上一轮仍在进行时返回 `None`
    pub fn begin_summary(&mut self) -> Option<SummaryTicket> {
        if !self.flags.ai_summary_enabled || self.summary.is_busy() {
            return None;
        }
        let presented_index = self.current_index()?;
        let question = self.shuffle.presented.get(presented_index)?;
        let original_index = question.original_index;
        let request =
            SummaryRequest::from_presented(question, self.answers.selected(presented_index));

        self.generation += 1;
        self.summary.start(original_index);

        Some(SummaryTicket {
            generation: self.generation,
            presented_index,
            original_index,
            request,
        })
    }

    /// 应用后台摘要事件；过期事件被丢弃并返回 `false`
    pub fn apply_summary_event(&mut self, event: SummaryEvent) -> bool {
        if event.generation != self.generation {
            debug!(
                "丢弃过期摘要事件 (代 {} ≠ 当前 {})",
                event.generation, self.generation
            );
            return false;
        }
        self.summary.apply(event.update);
        true
    }

    pub fn begin_append(&mut self) -> Option<AppendTicket> {
        if !self.summary.can_append() {
            return None;
        }
        let presented_index = self.current_index()?;
        let original_index = self.summary.original_index?;
        let summary = self.summary.summary.clone()?;

        self.summary.append = AppendState::Appending;

        Some(AppendTicket {
            generation: self.generation,
            load_seq: self.load_seq,
            test_id: self.test_id,
            presented_index,
            original_index,
            summary,
        })
    }

    /// 应用追加结果
    ///
    /// 服务端已保存的解析只要仍属于本次加载就会写回题目；
    /// 摘要会话只在凭证未过期时更新（返回 `true`）
    pub fn finish_append(&mut self, ticket: &AppendTicket, outcome: &AppendOutcome) -> bool {
        if let AppendOutcome::Appended { explanation } = outcome {
            if ticket.load_seq == self.load_seq {
                if let Some(question) = self.shuffle.presented.get_mut(ticket.presented_index) {
                    question.explanation = explanation.clone();
                }
            }
        }

        if ticket.generation != self.generation {
            debug!("丢弃过期追加结果 (原始题目 {})", ticket.original_index);
            return false;
        }

        self.summary.apply_append(outcome);
        if matches!(outcome, AppendOutcome::Appended { .. }) {
            self.revealed = true;
        }
        true
    }

    // ========== 交卷 ==========

    /// 生成提交载荷；没有题目时拒绝
    pub fn prepare_submission(&self) -> AppResult<SubmissionPayload> {
        if self.question_count() == 0 {
            return Err(AppError::Session("No questions to submit.".to_string()));
        }
        let projector = SubmissionProjector::new(
            &self.shuffle.index_map,
            &self.shuffle.option_map,
            &self.answers,
        );
        Ok(projector.project_all())
    }
}
