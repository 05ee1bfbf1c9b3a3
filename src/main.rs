use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use noc_generator::config::{init_default_config, Overrides, ResolvedConfig};
use noc_generator::generator::{FillReport, NocGenerator};
use noc_generator::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "noc-generator")]
#[command(about = "Fill the Full Name / Job Title / Department labels of a DOCX template", long_about = None)]
struct Args {
    /// Generate a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file into (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Employee full name (prompted for when omitted)
    #[arg(long)]
    full_name: Option<String>,

    /// Job title (prompted for when omitted)
    #[arg(long)]
    job_title: Option<String>,

    /// Department (prompted for when omitted)
    #[arg(long)]
    department: Option<String>,

    /// Template .docx (default: from config, else NDA-1.docx)
    #[arg(short, long, value_name = "DOCX")]
    template: Option<PathBuf>,

    /// Output directory (default: from config, else generated_noc)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output file name prefix (default: NOC_)
    #[arg(long)]
    file_prefix: Option<String>,

    /// Config file path (default: search for noc-generator.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the output path and fill report as JSON
    #[arg(long)]
    json: bool,

    /// No status lines on stderr
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    path: String,
    report: &'a FillReport,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if args.init_config {
        let dir = match args.init_config_dir.clone() {
            Some(d) => d,
            None => std::env::current_dir().context("current dir")?,
        };
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        progress.info(format!("Wrote config: {}", cfg_path.display()));
        return Ok(());
    }

    let cfg = ResolvedConfig::resolve(Overrides {
        config: args.config.clone(),
        template: args.template.clone(),
        output_dir: args.output_dir.clone(),
        file_prefix: args.file_prefix.clone(),
    })
    .context("build config")?;
    if let Some(p) = cfg.config_path.as_ref() {
        progress.info(format!("Config: {}", p.display()));
    }

    let generator = NocGenerator::new(&cfg.template)?.with_file_prefix(cfg.file_prefix.clone());

    let full_name = field_value(args.full_name, "Full Name")?;
    let job_title = field_value(args.job_title, "Job Title")?;
    let department = field_value(args.department, "Department")?;

    let (path, report) =
        generator.generate_with_report(&full_name, &job_title, &department, &cfg.output_dir)?;

    for field in report.unfilled() {
        progress.warn(format!("\"{}:\" not found in {}", field.label(), generator.template().display()));
    }
    progress.info(format!("NOC generated for {full_name}: {}", path.display()));

    if args.json {
        let out = JsonOutput {
            path: path.display().to_string(),
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&out).context("serialize report")?);
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

/// The flag value, or a line read from stdin. Blank values are rejected.
fn field_value(arg: Option<String>, label: &str) -> anyhow::Result<String> {
    let raw = match arg {
        Some(v) => v,
        None => prompt(label)?,
    };
    let value = raw.trim();
    if value.is_empty() {
        return Err(anyhow!("{label} must not be empty"));
    }
    Ok(value.to_string())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "Enter {label}: ").context("write prompt")?;
    stdout.flush().context("flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("read {label}"))?;
    Ok(line)
}
