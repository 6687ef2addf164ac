use std::io::Write;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use studyquiz_lib::quiz::{
    build_session, review, score, QuizType, RecordOutcome, SessionQuestion, SessionRunner,
    SessionSource, SkipReason,
};

use crate::app::App;
use crate::render::terminal::{band_color, bold, dim, paint, percent, progress_bar, Color};
use crate::OutputFormat;

const LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Interactive output goes to stderr in JSON mode so stdout stays parseable
fn say(format: &OutputFormat, line: &str) {
    match format {
        OutputFormat::Json => eprintln!("{}", line),
        OutputFormat::Plain => println!("{}", line),
    }
}

fn prompt(format: &OutputFormat, text: &str) {
    match format {
        OutputFormat::Json => {
            eprint!("{}", text);
            std::io::stderr().flush().ok();
        }
        OutputFormat::Plain => {
            print!("{}", text);
            std::io::stdout().flush().ok();
        }
    }
}

fn parse_letter(input: &str) -> Option<usize> {
    let mut chars = input.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() {
        return None;
    }
    LETTERS.iter().position(|&l| l == letter)
}

pub async fn run_document(
    app: &App,
    document: &str,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let document = app.find_document(document).await?;
    let questions = build_session(
        &app.store,
        app.user,
        SessionSource::SingleDocument {
            document_id: document.id,
        },
    )
    .await
    .context("Failed to load questions")?;

    say(format, &bold(&document.name, use_color));
    run_session(
        app,
        questions,
        QuizType::Standard,
        document.subject_id,
        Some(document.id),
        format,
        use_color,
    )
    .await
}

pub async fn run_mega(
    app: &App,
    subject: &str,
    limit: Option<usize>,
    no_shuffle: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let summary = app.find_subject(subject).await?;
    let source = SessionSource::Subject {
        subject_id: summary.subject.id,
        question_limit: limit.or(app.config.quiz.mega_question_limit),
        shuffle: !no_shuffle && app.config.quiz.mega_shuffle,
    };
    let questions = build_session(&app.store, app.user, source)
        .await
        .context("Failed to load questions")?;

    say(
        format,
        &bold(&format!("Mega Quiz: {}", summary.subject.name), use_color),
    );
    run_session(
        app,
        questions,
        QuizType::Standard,
        summary.subject.id,
        None,
        format,
        use_color,
    )
    .await
}

pub async fn run_wrong(
    app: &App,
    subject: Option<&str>,
    document: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let (subject_id, document_id) = match (subject, document) {
        (_, Some(query)) => {
            let document = app.find_document(query).await?;
            (document.subject_id, Some(document.id))
        }
        (Some(query), None) => (app.find_subject(query).await?.subject.id, None),
        (None, None) => {
            bail!("Pass --subject or --document to choose which missed questions to practice")
        }
    };

    let questions = build_session(
        &app.store,
        app.user,
        SessionSource::Remediation {
            subject_id: Some(subject_id),
            document_id,
        },
    )
    .await
    .context("Failed to load missed questions")?;

    say(
        format,
        &bold("Practice: previously missed questions (not recorded)", use_color),
    );
    run_session(
        app,
        questions,
        QuizType::Remediation,
        subject_id,
        document_id,
        format,
        use_color,
    )
    .await
}

async fn run_session(
    app: &App,
    questions: Vec<SessionQuestion>,
    quiz_type: QuizType,
    subject_id: Uuid,
    document_id: Option<Uuid>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    if questions.is_empty() {
        say(format, "No questions available for this quiz.");
        return Ok(());
    }

    let mut runner = match quiz_type {
        QuizType::Standard => SessionRunner::new(questions),
        QuizType::Remediation => SessionRunner::new(Vec::new()).with_remediation(questions),
    };
    runner.start(quiz_type)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let total = runner.questions().len();

    while let Some(index) = runner.current_index() {
        let question = &runner.questions()[index];
        say(format, "");
        say(
            format,
            &dim(
                &format!("{} Question {}/{}", progress_bar(index, total, 20), index + 1, total),
                use_color,
            ),
        );
        say(format, &bold(question.text(), use_color));
        for (letter, option) in LETTERS.iter().zip(question.options()) {
            say(format, &format!("  {}. {}", letter, option));
        }

        loop {
            prompt(format, "Answer (A-D, q to quit): ");
            let Some(line) = lines.next_line().await? else {
                runner.exit();
                say(format, "\nQuiz abandoned, nothing recorded.");
                return Ok(());
            };
            let input = line.trim();
            if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
                runner.exit();
                say(format, "Quiz abandoned, nothing recorded.");
                return Ok(());
            }
            match parse_letter(input) {
                Some(choice) => match runner.answer(choice) {
                    Ok(_) => break,
                    Err(e) => say(format, &paint(&e.to_string(), Color::RED, use_color)),
                },
                None => say(
                    format,
                    &paint("Please enter A, B, C or D.", Color::YELLOW, use_color),
                ),
            }
        }
    }

    let completed = runner
        .completed()
        .context("Quiz ended before every question was answered")?;
    let result = score(&completed.questions, &completed.answers)?;
    let lines = review(&completed.questions, &completed.answers)?;

    let outcome = app
        .recorder
        .record(&app.store, app.user, subject_id, document_id, &completed)
        .await;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "score": result,
                "band": result.band(),
                "review": lines,
                "recorded": outcome.is_recorded(),
                "durationSeconds": completed.duration_seconds,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!();
            println!(
                "Score: {}/{} ({})",
                result.correct,
                result.total,
                paint(&format!("{}%", result.percent), band_color(result.band()), use_color)
            );
            println!();
            for (i, line) in lines.iter().enumerate() {
                let mark = if line.is_correct {
                    paint("✓", Color::GREEN, use_color)
                } else {
                    paint("✗", Color::RED, use_color)
                };
                println!("{} {}. {}", mark, i + 1, line.question);
                if !line.is_correct {
                    println!(
                        "    Your answer: {}",
                        line.chosen_option.as_deref().unwrap_or("-")
                    );
                    println!("    Correct: {}", line.correct_option);
                }
            }
            println!();
            match outcome {
                RecordOutcome::Recorded(attempt) => {
                    println!("Saved attempt ({})", percent(attempt.score, use_color));
                }
                RecordOutcome::Skipped(SkipReason::Remediation) => {
                    println!("{}", dim("Practice session, not recorded.", use_color));
                }
                RecordOutcome::Skipped(SkipReason::Unauthenticated) => {
                    println!("{}", dim("No user configured, attempt not saved.", use_color));
                }
                RecordOutcome::Failed => {
                    println!(
                        "{}",
                        paint("Could not save this attempt.", Color::YELLOW, use_color)
                    );
                }
            }
        }
    }

    Ok(())
}
