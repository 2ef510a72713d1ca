//! 交卷与成绩展示 - 编排层

use tracing::info;

use crate::error::AppResult;
use crate::infrastructure::QuizApi;
use crate::models::ResultsReport;
use crate::services::SubmissionPayload;

/// 提交答卷并拉取成绩
pub async fn submit_and_fetch<A: QuizApi>(
    api: &A,
    test_id: u64,
    payload: &SubmissionPayload,
) -> AppResult<ResultsReport> {
    info!(
        "📤 正在提交试卷 #{} ({}/{} 已作答)",
        test_id,
        payload.answered(),
        payload.total()
    );
    let token = api.submit_answers(test_id, &payload.form_fields()).await?;
    info!("✓ 提交成功，成绩 token: {}", token);

    let report = api.fetch_results(&token).await?;
    info!(
        "✓ 成绩已获取: {}/{} ({:.1}%)",
        report.score,
        report.total,
        report.percent()
    );
    Ok(report)
}

/// 把成绩渲染为终端文本
pub fn render_report(report: &ResultsReport) -> String {
    let mut lines = vec![
        report.display_title().to_string(),
        format!("{} / {}", report.score, report.total),
        format!("{}% Correct", report.percent()),
        String::new(),
    ];

    for (idx, answer) in report.answers.iter().enumerate() {
        let status = if answer.is_correct {
            "Correct"
        } else {
            "Incorrect"
        };
        lines.push(format!("Question {} - {}", idx + 1, status));
        let question = if answer.question.trim().is_empty() {
            "Untitled question"
        } else {
            &answer.question
        };
        lines.push(format!("  {}", question));
        lines.push(format!("  Your answer: {}", answer.selected_text()));
        lines.push(format!("  Correct answer: {}", answer.correct_text()));
        if !answer.explanation.trim().is_empty() {
            lines.push(format!("  Explanation: {}", answer.explanation));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
