// gemguard - Resilient Gemini client with caching, admission control and retries
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use gemguard::cli::{Args, Command};
use gemguard::config::AppConfig;
use gemguard::metrics::gather_metrics;
use gemguard::utils::logging;
use gemguard::{GenerativeClient, RequestOptions};
use std::io::Write;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting gemguard v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the client
    let client = GenerativeClient::from_config(config)?;

    // Phase 4: Run the command, then tear the client down either way
    let outcome = run(&client, args.command).await;
    client.destroy();
    outcome
}

async fn run(client: &GenerativeClient, command: Command) -> Result<()> {
    match command {
        Command::Generate {
            prompt,
            model,
            no_cache,
            raw,
        } => {
            let mut options = RequestOptions::new().cache(!no_cache);
            if let Some(model) = model {
                options = options.model(model);
            }

            if raw {
                let response = client.generate_raw_content(&prompt, &options).await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", client.generate_text(&prompt, &options).await?);
            }
        }
        Command::Stream { prompt, model } => {
            let mut options = RequestOptions::new();
            if let Some(model) = model {
                options = options.model(model);
            }

            let mut stream = client.generate_stream(&prompt, &options);
            let mut stdout = std::io::stdout();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                if let Some(text) = &chunk.text {
                    write!(stdout, "{}", text)?;
                    stdout.flush()?;
                }
                if let Some(call) = &chunk.function_call {
                    writeln!(stdout, "\n[function call] {} {}", call.name, call.args)?;
                }
                if chunk.is_complete {
                    writeln!(stdout)?;
                    if let Some(metadata) = &chunk.metadata {
                        info!(
                            "Stream finished: reason={:?}, tokens={:?}",
                            metadata.finish_reason, metadata.token_count
                        );
                    }
                }
            }
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&client.stats())?);
            print!("{}", gather_metrics());
        }
    }

    Ok(())
}
