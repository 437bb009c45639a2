//! CLI entry point for `mailsift`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailsift::config::{Config, PathStyle};
use mailsift::search;
use mailsift::{ScanOptions, ScanReport};

#[derive(Parser)]
#[command(
    name = "mailsift",
    version,
    about = "Search a directory of documents and .eml messages for keywords"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory for keywords
    Scan(ScanArgs),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
    /// Write the effective configuration to the config file
    InitConfig,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Directory to scan
    path: PathBuf,

    /// File with comma-separated keywords
    #[arg(short, long, value_name = "FILE", required_unless_present = "keyword")]
    keywords_file: Option<PathBuf>,

    /// Keyword to search for (repeatable)
    #[arg(long, value_name = "WORD")]
    keyword: Vec<String>,

    /// Output directory for logs and saved attachments
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Save attachments that contain a keyword
    #[arg(short, long)]
    attachments: bool,

    /// Match log file (relative to the output directory)
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Error log file (relative to the output directory)
    #[arg(short, long, value_name = "FILE")]
    errors: Option<PathBuf>,

    /// Show full paths instead of `/parent/file` in the match log
    #[arg(long)]
    full_paths: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = mailsift::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Scan(args) => cmd_scan(args, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
        Commands::InitConfig => cmd_init_config(&config),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailsift::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailsift.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsift", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn cmd_init_config(config: &Config) -> anyhow::Result<()> {
    mailsift::config::save_config(config)?;
    if let Some(path) = mailsift::config::config_file_path() {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Scan a directory and print the report.
fn cmd_scan(args: ScanArgs, config: &Config) -> anyhow::Result<()> {
    if !args.path.is_dir() {
        anyhow::bail!("Directory not found: {}", args.path.display());
    }

    let keywords = search::merge_keywords(args.keywords_file.as_deref(), &args.keyword)?;
    let mut options = ScanOptions::from_config(config, &args.path, &args.output, keywords);
    options.persist_attachments |= args.attachments;
    if let Some(log) = args.log {
        options.log_file = log;
    }
    if let Some(errors) = args.errors {
        options.error_file = errors;
    }
    if args.full_paths {
        options.path_style = PathStyle::Full;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Scanning {msg} [{elapsed}]")
            .expect("valid template"),
    );
    pb.set_message(args.path.display().to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(mailsift::scan_corpus(options));
    pb.finish_and_clear();
    let report = report?;

    if args.json {
        print_report_json(&report)
    } else {
        print_report_table(&report);
        Ok(())
    }
}

/// Print the report in a human-readable table, followed by the matches.
fn print_report_table(report: &ScanReport) {
    use humansize::{format_size, BINARY};

    let elapsed = (report.finished_at - report.started_at)
        .to_std()
        .unwrap_or_default();

    println!();
    println!("  {:<20} {}", "Directory", report.root.display());
    println!("  {:<20} {}", "Files processed", report.files_processed);
    println!(
        "  {:<20} {}",
        "Data scanned",
        format_size(report.bytes_scanned, BINARY)
    );
    println!("  {:<20} {}", "Matches", report.match_count);
    println!("  {:<20} {}", "Errors", report.error_count);
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    println!("  {:<20} {}", "Match log", report.log_file.display());
    println!("  {:<20} {}", "Error log", report.error_file.display());
    if let Some(dir) = &report.attachments_dir {
        println!("  {:<20} {}", "Attachments", dir.display());
    }
    println!();

    for line in report.log.lines() {
        println!("  {line}");
    }
    if !report.log.is_empty() {
        println!();
    }
}

/// Print the report as JSON.
fn print_report_json(report: &ScanReport) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "message": "Directory processed",
        "files_processed": report.files_processed,
        "bytes_scanned": report.bytes_scanned,
        "match_count": report.match_count,
        "error_count": report.error_count,
        "started_at": report.started_at.to_rfc3339(),
        "finished_at": report.finished_at.to_rfc3339(),
        "attachments_dir": report.attachments_dir.as_ref().map(|d| d.display().to_string()),
        "log": report.log,
        "errors": report.errors,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
