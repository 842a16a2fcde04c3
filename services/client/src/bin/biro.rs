//! services/client/src/bin/biro.rs

use std::path::PathBuf;
use std::sync::Arc;

use biro_core::Report;
use clap::{Parser, Subcommand};
use client_lib::{
    config::Config, error::ClientError, prompt::TerminalPrompt, BiroClient, PollOutcome,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "biro", about = "Command-line access to the coursework portal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the subject instances you are enrolled in
    Subjects,
    /// List the assignments of a subject instance
    Assignments { subject_instance_id: i64 },
    /// Show an assignment of a subject instance and its exercises
    Assignment {
        subject_instance_id: i64,
        assignment_id: i64,
    },
    /// Show an exercise with its submissions, statuses and reports
    Exercise { exercise_id: i64 },
    /// Upload a file as a new submission
    Submit {
        exercise_id: i64,
        file: PathBuf,
        /// Wait for the evaluation to finish
        #[arg(long)]
        wait: bool,
    },
    /// Show the evaluation status of a submission
    Status {
        submission_id: i64,
        #[arg(long)]
        wait: bool,
    },
    /// Print the reports of an evaluation
    Reports { evaluation_id: i64 },
    /// Print the files uploaded with a submission
    Files { submission_id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded for {}", config.base_url);

    // --- 2. Build the Client ---
    let prompt = Arc::new(TerminalPrompt::stdio());
    let client = BiroClient::new(config)?.with_prompts(prompt.clone(), prompt);

    // --- 3. Run the Command ---
    match cli.command {
        Command::Subjects => print_json(&*client.get_subject_instances().await?)?,
        Command::Assignments {
            subject_instance_id,
        } => print_json(&*client.get_assignments(subject_instance_id).await?)?,
        Command::Assignment {
            subject_instance_id,
            assignment_id,
        } => {
            let assignments = client.get_assignments(subject_instance_id).await?;
            let assignment = assignments
                .iter()
                .find(|a| a.assignment_assigned_student_id == assignment_id)
                .ok_or_else(|| ClientError::NotFound(format!("assignment {assignment_id}")))?;
            print_json(assignment)?;
            if assignment.is_locked() {
                println!("assignment is locked");
            } else {
                print_json(&client.expand_assignment(assignment).await?)?;
            }
        }
        Command::Exercise { exercise_id } => {
            let view = client.refresh_exercise_view(exercise_id).await?;
            print_json(&*view.exercise)?;
            for submission in &view.submissions {
                println!("--- submission {}", submission.submission_id);
                match &submission.status {
                    Ok(status) => print_json(&**status)?,
                    Err(e) => println!("status unavailable: {e}"),
                }
                for (evaluation_id, reports) in &submission.reports {
                    match reports {
                        Ok(reports) => print_reports(reports),
                        Err(e) => println!("reports of evaluation {evaluation_id} unavailable: {e}"),
                    }
                }
            }
        }
        Command::Submit {
            exercise_id,
            file,
            wait,
        } => {
            let submission = client.submit_file_path(exercise_id, &file).await?;
            println!("submission {}", submission.id);
            if wait {
                wait_for(&client, submission.id).await?;
            }
        }
        Command::Status {
            submission_id,
            wait,
        } => {
            if wait {
                wait_for(&client, submission_id).await?;
            } else {
                print_json(&*client.fetch_submission_status(submission_id).await?)?;
            }
        }
        Command::Reports { evaluation_id } => {
            print_reports(&client.get_reports(evaluation_id).await?);
        }
        Command::Files { submission_id } => {
            for file in client.get_submission_files(submission_id).await?.iter() {
                println!("=== {}", file.filename);
                println!("{}", file.content);
            }
        }
    }

    Ok(())
}

async fn wait_for(client: &BiroClient, submission_id: i64) -> Result<(), ClientError> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match client.poller().poll(submission_id, &cancel).await? {
        PollOutcome::Finished { status, reports } => {
            print_json(&*status)?;
            if let Some(reports) = reports {
                print_reports(&reports);
            }
        }
        PollOutcome::TimedOut { .. } => println!("evaluation still running, try again later"),
        PollOutcome::Cancelled => println!("stopped waiting"),
    }
    Ok(())
}

fn print_reports(reports: &[biro_core::NamedReport]) {
    for named in reports {
        println!("=== {}", named.filename);
        match &named.report {
            Report::Text { content } => println!("{content}"),
            Report::Structured { tree } => {
                println!(
                    "{}: {} / {}",
                    tree.report_type,
                    tree.total_score(),
                    tree.total_max_score()
                );
                for test in &tree.tests {
                    println!("  {}: {} / {}", test.name, test.total_score(), test.total_max_score());
                }
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), ClientError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
