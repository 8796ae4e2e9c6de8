//! The Journi terminal app.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use journi::chat::{ChatMessage, MessageContent};
use journi::{Config, ModelSettings, SessionBuilder};
use journi_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

enum SessionEvent {
    Message(ChatMessage),
    Idle,
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Some(settings) = ModelSettings::from_env() else {
        eprintln!(
            "No model API key found. Set JOURNI_API_KEY, HF_TOKEN or \
             OPENAI_API_KEY."
        );
        return;
    };
    let mut config_builder = OpenAIConfigBuilder::with_api_key(settings.api_key);
    if let Some(base_url) = settings.base_url {
        config_builder = config_builder.with_base_url(base_url);
    }
    if let Some(model) = settings.model {
        config_builder = config_builder.with_model(model);
    }
    let model_provider = OpenAIProvider::new(config_builder.build());

    let config = Config::from_env();
    debug!("tool settings: {config:?}");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let session = SessionBuilder::with_model_provider(model_provider)
        .with_config(config)
        .on_message({
            let event_tx = event_tx.clone();
            move |message| {
                event_tx.send(SessionEvent::Message(message)).ok();
            }
        })
        .on_idle(move || {
            event_tx.send(SessionEvent::Idle).ok();
        })
        .build();

    println!(
        "{}",
        "✈️ Journi - Multi-Agent AI Travel Companion".bright_white().bold()
    );
    println!(
        "Ask me about any destination, local time, weather, currency \
         conversion, or travel phrases!\n"
    );

    let progress_style = match ProgressStyle::with_template("{spinner} {wide_msg}")
    {
        Ok(style) => style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        Err(err) => {
            error!("invalid progress template: {err}");
            ProgressStyle::default_spinner()
        }
    };

    let mut stdin = io::BufReader::new(io::stdin());

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        session.send_message(line);

        let mut progress_bar = None;

        loop {
            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🧭 Planning...");
                    progress_bar
                })
                .inc(1);

            let sleep = sleep(Duration::from_millis(100));
            let event = select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break 'outer;
                    };
                    event
                },
                _ = sleep => {
                    continue;
                }
            };

            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = &progress_bar {
                progress_bar.finish_and_clear();
            }
            progress_bar = None;

            match event {
                SessionEvent::Message(message) => print_message(&message),
                SessionEvent::Idle => {
                    println!();
                    break;
                }
            }
        }
    }
}

fn print_message(message: &ChatMessage) {
    match &message.content {
        MessageContent::Text(text) => {
            let bar = BAR_CHAR.bright_cyan();
            for line in text.lines() {
                println!("{bar}{}", line.bright_white());
            }
            println!();
        }
        MessageContent::File { path, mime_type } => {
            println!(
                "{}🖼️  {} ({mime_type})\n",
                BAR_CHAR.bright_magenta(),
                path.display().bright_white().underline()
            );
        }
    }
}

async fn read_line<R>(reader: &mut R) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();

    match reader.read_line(&mut line).await {
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
