//! Sends a batch of personalised e-mails through an authenticated relay.
//!
//! The batch document names the sender, the subject and the relay, followed
//! by one document per message. Messages go out in order over a single
//! session that is rebuilt when the relay drops it.

use std::{path::PathBuf, process::ExitCode};

use batchmail::{credentials, load_batch};
use batchmail_common::logging;
use batchmail_dispatch::{DispatchEngine, DispatchOptions, SmtpConnector};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "batchmail")]
#[command(about = "Send a batch of e-mails through an SMTP relay", long_about = None)]
#[command(version)]
struct Cli {
    /// Do not actually send e-mails
    #[arg(short, long)]
    dry_run: bool,

    /// Sender's e-mail address, overriding the batch document
    #[arg(short, long, value_name = "ADDRESS")]
    from: Option<String>,

    /// YAML file with configuration and messages
    #[arg(short, long, default_value = "messages.yaml")]
    messages: PathBuf,

    /// Report progress and message contents
    #[arg(short, long)]
    verbose: bool,

    /// Transport failures tolerated per message before giving up
    #[arg(long, value_name = "N")]
    max_attempts: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let batch = load_batch(&cli.messages, cli.from.as_deref())?;
    let mut config = batch.config;
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }

    let password = if cli.dry_run {
        String::new()
    } else {
        credentials::resolve_password()?
    };

    let options = DispatchOptions {
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };
    let connector = SmtpConnector::new(&config, password);
    let mut engine = DispatchEngine::new(config, connector, options);

    let (report, cause) = match engine.dispatch(&batch.messages).await {
        Ok(report) => (report, None),
        Err(error) => (error.report, Some(error.cause)),
    };

    for (index, refused) in report.rejected() {
        for recipient in refused {
            eprintln!(
                "FAILED: message {index} to {}: [{}] {}",
                recipient.address, recipient.code, recipient.detail
            );
        }
    }

    println!("{report}");

    match cause {
        None => Ok(ExitCode::SUCCESS),
        Some(cause) => {
            eprintln!("{cause}");
            Ok(ExitCode::FAILURE)
        }
    }
}
