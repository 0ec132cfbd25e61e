//! cdsleuth -- find a directory while the scan is still running.
//!
//! Thin binary entry point. Scanning lives in `cdsleuth-core`, the session
//! loop in `cdsleuth-ui`. The selected path goes to stdout so a shell
//! function can `cd` to it; logs go to stderr. SIGINT and SIGTERM cancel
//! the scan and exit with the cancelled status.
mod cli;
mod headless;

use anyhow::Context;
use cdsleuth_core::config::ScanSettings;
use cdsleuth_core::scanner::{
    filesystem_root, scan_stream, scan_two_phase, scan_two_phase_from, BatchStream,
};
use cdsleuth_core::CancelToken;
use cdsleuth_ui::{Session, SessionOutcome};
use clap::Parser;
use cli::CliArgs;
use headless::HeadlessFrontend;
use std::process::ExitCode;

const EXIT_ERROR: u8 = 1;
const EXIT_CANCELLED: u8 = 2;

fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version land here too, on stdout.
            let code = if err.use_stderr() { EXIT_ERROR } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(SessionOutcome::Selected(path)) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Ok(SessionOutcome::Cancelled) => ExitCode::from(EXIT_CANCELLED),
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("cdsleuth: {err:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(args: &CliArgs) -> anyhow::Result<SessionOutcome> {
    let mut settings = ScanSettings::from_env().context("failed to load settings")?;
    args.apply(&mut settings);

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::info!("Interrupt received, cancelling scan");
        on_signal.cancel();
    })
    .context("failed to set signal handler")?;

    let stream = start_scan(args, &settings, cancel)?;
    let mut session = Session::start(stream)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut frontend = HeadlessFrontend::new(tx, &args.query)?;
    Ok(session.run(&mut frontend, &rx)?)
}

fn start_scan(
    args: &CliArgs,
    settings: &ScanSettings,
    cancel: CancelToken,
) -> anyhow::Result<BatchStream> {
    let start = match &args.path {
        Some(path) => Some(cli::resolve_start(path)?),
        None => None,
    };

    let stream = match (start, args.local_only) {
        (Some(start), true) => scan_stream(settings.request_for(&start), cancel),
        (Some(start), false) => {
            let global = filesystem_root(&start);
            tracing::info!("cdsleuth starting from {}", start.display());
            scan_two_phase_from(settings.request_for(&global), start, global, cancel)
        }
        (None, true) => {
            let cwd = std::env::current_dir().context("cannot determine working directory")?;
            scan_stream(settings.request_for(cwd), cancel)
        }
        (None, false) => {
            let fallback = std::env::current_dir()
                .map(|cwd| filesystem_root(&cwd))
                .unwrap_or_else(|_| std::path::PathBuf::from(std::path::MAIN_SEPARATOR_STR));
            scan_two_phase(settings.request_for(fallback), cancel)
        }
    };
    Ok(stream)
}
