//! Answers one recruiting question from the terminal.
//!
//! The message is taken from the arguments, or from one line of stdin when
//! there are none. With `--json`, a `{"input_message": ...}` document is
//! read from stdin and a `{"result": ...}` document is printed instead.

#[macro_use]
extern crate tracing;

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use recruit_agent::core::{RunInput, TranscriptSource};
use recruit_agent::{Config, SessionBuilder};
use tokio::io::{self, AsyncBufReadExt, AsyncReadExt};

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut args: Vec<String> = env::args().skip(1).collect();
    let json_mode = args.first().is_some_and(|arg| arg == "--json");
    if json_mode {
        args.remove(0);
    }

    let input = if json_mode {
        read_json_input().await
    } else if !args.is_empty() {
        Some(RunInput {
            input_message: args.join(" "),
        })
    } else {
        read_line().await.map(|line| RunInput {
            input_message: line.trim().to_owned(),
        })
    };
    let Some(input) = input else {
        eprintln!("no input message");
        return ExitCode::FAILURE;
    };

    let progress_bar = if json_mode {
        ProgressBar::hidden()
    } else {
        let progress_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg}")
        {
            progress_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        progress_bar
    };

    let session = SessionBuilder::from_config(&config)
        .on_transcript({
            let progress_bar = progress_bar.clone();
            move |transcript, source| {
                if source == TranscriptSource::Tool {
                    progress_bar.println(format!(
                        "{}🔧 {}",
                        BAR_CHAR.bright_yellow(),
                        transcript.dimmed()
                    ));
                    progress_bar.set_message(format!("🔧 {transcript}..."));
                } else if source == TranscriptSource::Assistant {
                    progress_bar.set_message("🤔 Thinking...");
                }
            }
        })
        .build();

    let result = session.invoke(input).await;
    progress_bar.finish_and_clear();

    let output = match result {
        Ok(output) => output,
        Err(err) => {
            error!("run failed: {err}");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if json_mode {
        match serde_json::to_string(&output) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("failed to encode output: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}🤖 {}", BAR_CHAR.bright_cyan(), output.result.bright_white());
    }
    ExitCode::SUCCESS
}

async fn read_json_input() -> Option<RunInput> {
    let mut buf = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut buf).await {
        error!("error reading input: {}", err);
        return None;
    }
    match serde_json::from_str(&buf) {
        Ok(input) => Some(input),
        Err(err) => {
            error!("malformed input document: {}", err);
            None
        }
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
