mod abort;
mod config;
mod executor;
mod predict;
mod report;
mod scheduler;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tokio::sync::oneshot;

use crate::config::{Cli, Mode, Settings};
use crate::executor::ProcessGroupSupervisor;
use crate::predict::{predict_passes, Catalog, Sgp4Engine, Window};
use crate::scheduler::{
    merge, sort_windows, ArtifactsManager, Chunk, RunOutcome, Runner, SystemClock,
};

/// Exit code after SIGINT/SIGTERM stopped a run.
const EXIT_ABORTED: u8 = 130;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = match Settings::resolve(cli, Utc::now()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let passes = match find_passes(&settings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match settings.mode {
        Mode::Display { chunks, json } => display(passes, chunks, json),
        Mode::Execute { command, log_dir } => execute(merge(passes), command, log_dir),
    }
}

/// Passes of every matching satellite, sorted by AOS.
fn find_passes(settings: &Settings) -> Result<Vec<Window>, predict::PredictError> {
    let engine = Sgp4Engine::with_horizon(settings.horizon);
    let observer = settings.observer();
    let catalog = Catalog::load(&settings.catalog, &engine, &observer)?;

    let mut passes = Vec::new();
    for satellite in catalog.matching(&settings.filter) {
        passes.extend(predict_passes(&engine, satellite, &observer, &settings.query)?);
    }
    log::debug!(
        "{} passes from {} satellites",
        passes.len(),
        catalog.satellites().len()
    );

    sort_windows(&mut passes);
    Ok(passes)
}

fn display(passes: Vec<Window>, chunks: bool, json: bool) -> ExitCode {
    let mut out = io::stdout().lock();
    let result = if json {
        report::write_json(&mut out, &passes)
    } else if chunks {
        report::display_chunks(&mut out, &merge(passes))
    } else {
        report::display(&mut out, &passes)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error writing output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(chunks: Vec<Chunk>, command: Vec<String>, log_dir: Option<PathBuf>) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move {
        let (abort_tx, mut abort_rx) = oneshot::channel();
        tokio::spawn(async move {
            let signal = abort::shutdown_requested().await;
            let _ = abort_tx.send(signal);
        });

        let mut runner = Runner::new(
            SystemClock,
            ProcessGroupSupervisor::new(log_dir.clone()),
            io::stdout(),
            command,
        );
        if let Some(dir) = log_dir {
            match ArtifactsManager::new(dir, Utc::now()) {
                Ok(artifacts) => runner = runner.with_artifacts(artifacts),
                Err(e) => {
                    eprintln!("Error creating log directory: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }

        log::info!("Scheduled {} chunks", chunks.len());
        match runner.run(&chunks, &mut abort_rx).await {
            Ok(RunOutcome::Completed { chunks }) => {
                log::info!("Schedule completed ({} chunks)", chunks);
                ExitCode::SUCCESS
            }
            Ok(RunOutcome::Aborted(signal)) => {
                eprintln!("Aborted: {}", signal.reason);
                ExitCode::from(EXIT_ABORTED)
            }
            Err(e) => {
                eprintln!("Execution error: {}", e);
                ExitCode::FAILURE
            }
        }
    })
}
