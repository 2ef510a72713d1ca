use quiz_session::infrastructure::{StreamReply, TextReply};
use quiz_session::models::{AnswerReview, Question, ResultsReport, TestDefinition};
use quiz_session::orchestrator::{AppEvent, Flow, Output, Step};
use quiz_session::services::{SummaryPhase, SummaryUpdate};
use quiz_session::workflow::{AppendState, SessionFlags, TestSession};
use quiz_session::{App, Config, ScriptedQuizApi};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn sample_test(id: u64, count: usize) -> TestDefinition {
    TestDefinition {
        id,
        title: "Sample Test".to_string(),
        questions: (0..count)
            .map(|i| Question {
                question: format!("Question {}", i),
                options: (0..4).map(|o| format!("q{}-o{}", i, o)).collect(),
                correct_index: Some((i % 4) as i64),
                explanation: format!("Explanation {}", i),
                image: None,
            })
            .collect(),
    }
}

fn report() -> ResultsReport {
    ResultsReport {
        test_title: "Sample Test".to_string(),
        score: 2,
        total: 3,
        answers: vec![AnswerReview::default()],
    }
}

fn config(test_id: u64, name: &str) -> Config {
    Config {
        test_id,
        output_log_file: std::env::temp_dir()
            .join(format!("quiz_session_{}.log", name))
            .display()
            .to_string(),
        ..Config::default()
    }
}

async fn app_with(
    api: ScriptedQuizApi,
    config: Config,
) -> (App<ScriptedQuizApi>, Arc<ScriptedQuizApi>) {
    let api = Arc::new(api);
    let mut app = App::with_api(config, Arc::clone(&api));
    let step = app.load_test().await;
    assert_eq!(step.flow, Flow::Continue, "test loads");
    (app, api)
}

fn text(step: &Step) -> String {
    step.output
        .iter()
        .map(|o| match o {
            Output::Line(line) | Output::Inline(line) => line.as_str(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 一直处理后台事件直到摘要结束，返回所有输出
async fn drain_summary(app: &mut App<ScriptedQuizApi>) -> Vec<Output> {
    let mut outputs = Vec::new();
    while let Some(event) = app.next_event().await {
        let finished = matches!(
            &event,
            AppEvent::Summary(e) if matches!(
                e.update,
                SummaryUpdate::Complete { .. } | SummaryUpdate::Failed { .. }
            )
        );
        outputs.extend(app.apply_event(event));
        if finished {
            break;
        }
    }
    outputs
}

#[test]
fn test_projection_targets_original_question_and_option() {
    let mut session = TestSession::new(SessionFlags::default());
    session.load(&sample_test(1, 3), &mut StdRng::seed_from_u64(21));

    // 找到原始第 2 题在呈现顺序中的位置
    let p = session
        .index_map()
        .iter()
        .position(|&orig| orig == 2)
        .expect("original question 2 is presented");
    while session.current_index() != Some(p) {
        session.next();
    }
    assert!(session.select_option(3));

    let payload = session.prepare_submission().unwrap();
    assert_eq!(payload.slots.len(), 3);
    assert_eq!(payload.slots[2], Some(session.option_map()[p][3]));
    assert_eq!(payload.answered(), 1);
    assert!(payload.needs_confirmation());

    let chosen_text = &session.presented()[p].options[3];
    assert_eq!(
        chosen_text,
        &format!("q2-o{}", session.option_map()[p][3])
    );
}

#[tokio::test]
async fn test_full_run_submits_every_original_question() {
    let api = ScriptedQuizApi::new()
        .with_test(sample_test(7, 3))
        .with_results("abc", report());
    let (mut app, api) = app_with(api, config(7, "full_run")).await;

    for _ in 0..2 {
        app.handle_line("1").await.unwrap();
        app.handle_line("n").await.unwrap();
    }
    app.handle_line("1").await.unwrap();
    let step = app.handle_line("n").await.unwrap();

    assert_eq!(step.flow, Flow::Submitted(report()));
    assert!(text(&step).contains("2 / 3\n66.7% Correct"));

    let submitted = api.submitted();
    assert_eq!(submitted.len(), 1);
    let (test_id, fields) = &submitted[0];
    assert_eq!(*test_id, 7);
    let names: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, vec!["q0", "q1", "q2"]);
    assert!(fields.iter().all(|(_, v)| !v.is_empty()));
}

#[tokio::test]
async fn test_partial_submission_needs_confirmation() {
    let api = ScriptedQuizApi::new()
        .with_test(sample_test(3, 3))
        .with_results("tok", report());
    let (mut app, api) = app_with(api, config(3, "confirm")).await;

    app.handle_line("2").await.unwrap();
    let step = app.handle_line("finish").await.unwrap();
    assert_eq!(step.flow, Flow::Continue);
    assert_eq!(
        text(&step),
        "You've answered 1 of 3 questions.\n\nFinish the test anyway? [y/N]"
    );

    let step = app.handle_line("n").await.unwrap();
    assert_eq!(text(&step), "Submission cancelled.");
    assert!(api.submitted().is_empty());
    assert_eq!(app.session().answers().answered_count(), 1);

    app.handle_line("f").await.unwrap();
    let step = app.handle_line("y").await.unwrap();
    assert!(matches!(step.flow, Flow::Submitted(_)));

    let submitted = api.submitted();
    let fields = &submitted[0].1;
    assert_eq!(fields.iter().filter(|(_, v)| v.is_empty()).count(), 2);
}

#[tokio::test]
async fn test_summary_streams_then_appends() {
    let api = ScriptedQuizApi::new()
        .with_test(sample_test(5, 2))
        .with_stream(StreamReply::Chunks(vec![
            b"The ".to_vec(),
            b"answer ".to_vec(),
            b"is B.".to_vec(),
        ]))
        .with_append(TextReply::Ok("Explanation merged".to_string()));
    let (mut app, api) = app_with(api, config(5, "summary")).await;

    let step = app.handle_line("s").await.unwrap();
    assert_eq!(text(&step), "Generating AI summary...");

    let outputs = drain_summary(&mut app).await;
    let streamed: String = outputs
        .iter()
        .filter_map(|o| match o {
            Output::Inline(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, "\nAI Summary: The answer is B.");
    assert_eq!(app.session().summary().display, "AI Summary: The answer is B.");
    assert_eq!(app.session().summary().phase, SummaryPhase::Complete);

    let original = app.session().current_question().unwrap().original_index;
    let requests = api.summary_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].selected_index, None);

    let step = app.handle_line("a").await.unwrap();
    assert_eq!(text(&step), "Appending...");
    let event = app.next_event().await.unwrap();
    let outputs = app.apply_event(event);
    assert_eq!(
        outputs,
        vec![
            Output::Line("Appended".to_string()),
            Output::Line("Explanation: Explanation merged".to_string()),
        ]
    );
    assert_eq!(
        app.session().current_question().unwrap().explanation,
        "Explanation merged"
    );
    assert_eq!(app.session().summary().append, AppendState::Appended);
    assert_eq!(api.appended(), vec![(5, original, "The answer is B.".to_string())]);

    let step = app.handle_line("a").await.unwrap();
    assert_eq!(text(&step), "Nothing to append.");
}

#[tokio::test]
async fn test_summary_after_navigation_is_discarded() {
    let api = ScriptedQuizApi::new()
        .with_test(sample_test(9, 3))
        .with_stream(StreamReply::Chunks(vec![b"late".to_vec()]));
    let (mut app, _api) = app_with(api, config(9, "stale")).await;

    app.handle_line("s").await.unwrap();
    app.handle_line("n").await.unwrap();

    let outputs = drain_summary(&mut app).await;
    assert!(outputs.is_empty());
    assert_eq!(app.session().current_index(), Some(1));
    assert_eq!(app.session().summary().phase, SummaryPhase::Idle);
    assert!(app.session().summary().display.is_empty());
}

#[tokio::test]
async fn test_summary_failure_and_append_failure_messages() {
    let api = ScriptedQuizApi::new()
        .with_test(sample_test(2, 1))
        .with_stream(StreamReply::Status(500))
        .with_summary(TextReply::Rejected(502, Some("down".to_string())));
    let (mut app, api) = app_with(api, config(2, "failures")).await;

    app.handle_line("s").await.unwrap();
    let outputs = drain_summary(&mut app).await;
    assert_eq!(outputs.last(), Some(&Output::Line("down".to_string())));
    assert_eq!(app.session().summary().phase, SummaryPhase::Failed);
    assert_eq!(text(&app.handle_line("a").await.unwrap()), "Nothing to append.");

    api.set_summary(TextReply::Ok("Fallback summary".to_string()));
    api.set_append(TextReply::Rejected(500, None));
    app.handle_line("s").await.unwrap();
    drain_summary(&mut app).await;
    assert_eq!(app.session().summary().display, "AI Summary: Fallback summary");

    app.handle_line("a").await.unwrap();
    let event = app.next_event().await.unwrap();
    assert_eq!(
        app.apply_event(event),
        vec![Output::Line("Failed to append explanation.".to_string())]
    );
    assert_eq!(app.session().current_question().unwrap().explanation, "Explanation 0");
    assert_eq!(app.session().summary().append, AppendState::Ready);
}

#[tokio::test]
async fn test_flashcard_mode_never_submits() {
    let api = ScriptedQuizApi::new().with_test(sample_test(4, 2));
    let mut cfg = config(4, "flashcard");
    cfg.flashcard_mode = true;
    let (mut app, api) = app_with(api, cfg).await;

    for (p, question) in app.session().presented().iter().enumerate() {
        assert_eq!(app.session().option_map()[p], vec![0, 1, 2, 3]);
        assert_eq!(question.correct_index, Some(question.original_index % 4));
    }

    let step = app.handle_line("r").await.unwrap();
    assert!(text(&step).starts_with("Answer: q"));
    assert!(app.session().is_revealed());

    app.handle_line("n").await.unwrap();
    assert!(!app.session().is_revealed());
    assert_eq!(text(&app.handle_line("n").await.unwrap()), "Already at the last question.");
    assert_eq!(
        text(&app.handle_line("f").await.unwrap()),
        "Flashcard mode has nothing to submit."
    );
    assert!(api.submitted().is_empty());
}

#[tokio::test]
async fn test_empty_test_refuses_submission() {
    let api = ScriptedQuizApi::new().with_test(sample_test(8, 0));
    let (mut app, api) = app_with(api, config(8, "empty")).await;

    assert_eq!(text(&app.handle_line("f").await.unwrap()), "No questions to submit.");
    assert_eq!(text(&app.handle_line("n").await.unwrap()), "No questions available in this test.");
    assert_eq!(text(&app.handle_line("s").await.unwrap()), "No questions available in this test.");
    assert!(api.submitted().is_empty());
}

#[tokio::test]
async fn test_missing_test_reports_not_found() {
    let api = Arc::new(ScriptedQuizApi::new());
    let mut app = App::with_api(config(404, "missing"), api);
    let step = app.load_test().await;
    assert_eq!(step.flow, Flow::Quit);
    assert_eq!(text(&step), "Test not found.");
    assert_eq!(app.session().question_count(), 0);
}

#[tokio::test]
async fn test_load_prints_first_question_and_hint() {
    let api = Arc::new(ScriptedQuizApi::new().with_test(sample_test(6, 2)));
    let mut app = App::with_api(config(6, "first_question"), api);
    let step = app.load_test().await;
    assert_eq!(step.flow, Flow::Continue);
    assert!(text(&step).ends_with("(type 'help' for commands)"));
    assert_eq!(app.session().current_index(), Some(0));
}
