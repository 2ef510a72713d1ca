use serde::{Deserialize, Serialize};

/// 单题批改结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerReview {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub selected: Option<i64>,
    #[serde(default)]
    pub correct: Option<i64>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl AnswerReview {
    /// 用户所选答案文本
    pub fn selected_text(&self) -> &str {
        option_text(&self.options, self.selected).unwrap_or("No answer selected")
    }

    /// 正确答案文本
    pub fn correct_text(&self) -> &str {
        option_text(&self.options, self.correct).unwrap_or("Not provided")
    }
}

/// `GET /api/results/{token}` 的响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsReport {
    #[serde(default)]
    pub test_title: String,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub answers: Vec<AnswerReview>,
}

impl ResultsReport {
    /// 正确率（百分比，保留一位小数）
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.score as f64 / self.total as f64 * 1000.0).round() / 10.0
    }

    pub fn display_title(&self) -> &str {
        if self.test_title.trim().is_empty() {
            "Test Results"
        } else {
            &self.test_title
        }
    }
}

/// 按下标取选项文本，越界或缺失时返回 `None`
pub fn option_text(options: &[String], index: Option<i64>) -> Option<&str> {
    let idx = usize::try_from(index?).ok()?;
    options.get(idx).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_to_one_decimal() {
        let report = ResultsReport {
            score: 2,
            total: 3,
            ..Default::default()
        };
        assert_eq!(report.percent(), 66.7);

        let empty = ResultsReport::default();
        assert_eq!(empty.percent(), 0.0);
        assert_eq!(empty.display_title(), "Test Results");
    }

    #[test]
    fn test_option_text_fallbacks() {
        let review = AnswerReview {
            options: vec!["a".into(), "b".into()],
            selected: None,
            correct: Some(7),
            ..Default::default()
        };
        assert_eq!(review.selected_text(), "No answer selected");
        assert_eq!(review.correct_text(), "Not provided");
        assert_eq!(option_text(&review.options, Some(1)), Some("b"));
        assert_eq!(option_text(&review.options, Some(-1)), None);
    }
}
