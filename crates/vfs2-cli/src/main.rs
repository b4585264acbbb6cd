use clap::Parser;
use tracing::Level;

use vfs2_cli::{Commands, OutputFormat, commands};

#[derive(Parser)]
#[command(
    name = "vfs2",
    about = "Extract, build and fix VFS2 game archives",
    version,
    long_about = "A command-line tool for VFS2 archives: extract them to a folder, pack a folder into one, or pack a folder while copying per-entry flags from a known-good archive."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Output format for list and hash
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries list and hash output
    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Extract { input, output } => commands::extract::handle(input, output)?,
        Commands::Compress {
            output,
            input,
            build,
        } => commands::compress::handle(output, input, build)?,
        Commands::Fix {
            output,
            input,
            reference,
            build,
        } => commands::fix::handle(output, input, reference.as_deref(), build)?,
        Commands::List { input } => commands::list::handle(input, cli.format)?,
        Commands::Hash { paths } => commands::hash::handle(paths, cli.format)?,
    }

    Ok(())
}
