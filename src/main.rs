//! CLI entry point for media-dl.

use clap::Parser;
use media_dl::api::{AppState, start_api_server};
use media_dl::{
    Config, DownloadRequest, Downloader, HttpFetcher, LocalFileSystem, RecordStore,
    TerminalProgress, logging, notifier,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> media_dl::Result<()> {
    let mut config = Config::load(args.config_dir.as_deref())?;
    if let Command::Serve { port: Some(port) } = &args.command {
        config.server.bind_address.set_port(*port);
    }

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let log_file = logging::init(
        logging::default_level(args.verbose, args.quiet),
        &config.storage.log_dir,
    );
    debug!(?args, log_file = ?log_file, "CLI arguments parsed");

    config.ensure_dirs().await?;
    let config = Arc::new(config);

    let downloader = Arc::new(Downloader::new(
        config.clone(),
        Arc::new(HttpFetcher::default()),
        Arc::new(LocalFileSystem),
        Arc::new(RecordStore::new()),
        notifier::from_config(&config.notifier),
    ));

    match args.command {
        Command::Download { url, requester } => {
            let mut request = DownloadRequest::new(url);
            request.requester = requester;

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            let signal_task = tokio::spawn(async move {
                media_dl::wait_for_signal().await;
                on_signal.cancel();
            });

            let progress = TerminalProgress::new();
            let result = downloader.download(&request, &progress, &cancel).await;
            signal_task.abort();

            let completed = result?;
            info!(id = %completed.id, path = %completed.path.display(), "stored");
            println!("Download complete.");
            Ok(())
        }
        Command::Serve { .. } => {
            info!("media-dl starting");
            start_api_server(AppState::new(downloader, config)).await
        }
    }
}
