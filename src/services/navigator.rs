//! 题目导航 - 业务能力层

/// 导航结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// 已移动到新的呈现题号
    Moved(usize),
    /// 位于最后一题时触发交卷流程
    Finish,
    /// 不允许移动（第一题时后退、空试卷、闪卡模式最后一题）
    Blocked,
}

/// 题目导航器
///
/// `current ∈ [0, count)`；题目数为 0 时处于"无内容"状态，所有导航都被阻止
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionNavigator {
    current: usize,
    count: usize,
    finish_on_last: bool,
}

impl Default for QuestionNavigator {
    fn default() -> Self {
        Self::new(0, true)
    }
}

impl QuestionNavigator {
    /// # 参数
    /// - `count`: 题目数量
    /// - `finish_on_last`: 最后一题按"下一题"时是否触发交卷（闪卡模式为 `false`）
    pub fn new(count: usize, finish_on_last: bool) -> Self {
        Self {
            current: 0,
            count,
            finish_on_last,
        }
    }

    pub fn current(&self) -> Option<usize> {
        (self.count > 0).then_some(self.current)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.count > 0 && self.current == self.count - 1
    }

    pub fn prev(&mut self) -> NavOutcome {
        if self.count == 0 || self.current == 0 {
            return NavOutcome::Blocked;
        }
        self.current -= 1;
        NavOutcome::Moved(self.current)
    }

    pub fn next(&mut self) -> NavOutcome {
        if self.count == 0 {
            return NavOutcome::Blocked;
        }
        if self.current < self.count - 1 {
            self.current += 1;
            return NavOutcome::Moved(self.current);
        }
        if self.finish_on_last {
            NavOutcome::Finish
        } else {
            NavOutcome::Blocked
        }
    }

    /// 进度文案，例如 "Question 2 of 5"；空试卷为空字符串
    pub fn progress_label(&self) -> String {
        match self.current() {
            Some(current) => format!("Question {} of {}", current + 1, self.count),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_forward_then_finish() {
        let mut nav = QuestionNavigator::new(3, true);
        assert_eq!(nav.current(), Some(0));
        assert_eq!(nav.prev(), NavOutcome::Blocked);
        assert_eq!(nav.next(), NavOutcome::Moved(1));
        assert_eq!(nav.next(), NavOutcome::Moved(2));
        assert!(nav.is_last());
        assert_eq!(nav.next(), NavOutcome::Finish);
        assert_eq!(nav.current(), Some(2));
        assert_eq!(nav.prev(), NavOutcome::Moved(1));
        assert_eq!(nav.progress_label(), "Question 2 of 3");
    }

    #[test]
    fn test_flashcard_mode_stops_at_last() {
        let mut nav = QuestionNavigator::new(2, false);
        assert_eq!(nav.next(), NavOutcome::Moved(1));
        assert_eq!(nav.next(), NavOutcome::Blocked);
    }

    #[test]
    fn test_empty_blocks_everything() {
        let mut nav = QuestionNavigator::new(0, true);
        assert!(nav.is_empty());
        assert_eq!(nav.current(), None);
        assert_eq!(nav.next(), NavOutcome::Blocked);
        assert_eq!(nav.prev(), NavOutcome::Blocked);
        assert_eq!(nav.progress_label(), "");
    }

    #[test]
    fn test_single_question_next_finishes() {
        let mut nav = QuestionNavigator::new(1, true);
        assert!(nav.is_first() && nav.is_last());
        assert_eq!(nav.next(), NavOutcome::Finish);
    }
}
