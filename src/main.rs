use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use ncm_restore::{batch, pipeline};

/// Restores playable audio files from encrypted ncm containers.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// A single .ncm file, or a directory searched recursively
    input: PathBuf,

    /// Directory for restored files; defaults to next to each input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Worker threads for batch runs
    #[arg(short, long, default_value_t = 4)]
    threads: usize,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if !cli.input.exists() {
        error!("input {:?} does not exist", cli.input);
        return ExitCode::from(1);
    }

    if let Some(output) = &cli.output {
        if output.exists() && !output.is_dir() {
            error!("output {:?} is not a directory", output);
            return ExitCode::from(2);
        }
        if let Err(create_error) = std::fs::create_dir_all(output) {
            error!("cannot create output directory {:?}: {}", output, create_error);
            return ExitCode::from(2);
        }
    }

    if cli.input.is_file() {
        return match pipeline::process_file(&cli.input, cli.output.as_deref()) {
            Ok(path) => {
                println!("{}", path.display());
                ExitCode::SUCCESS
            }
            Err(process_error) => {
                error!("{:?} failed: {}", cli.input, process_error);
                ExitCode::from(1)
            }
        };
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cli.threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(runtime_error) => {
            error!("cannot start runtime: {}", runtime_error);
            return ExitCode::from(3);
        }
    };

    match runtime.block_on(batch::run(cli.input, cli.output)) {
        Ok(summary) => {
            println!(
                "restored {}, skipped {}, failed {}",
                summary.restored, summary.skipped, summary.failed
            );
            ExitCode::SUCCESS
        }
        Err(batch_error) => {
            error!("batch aborted: {}", batch_error);
            ExitCode::from(3)
        }
    }
}
