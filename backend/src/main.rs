//! assaynorm CLI - normalize protein assay exports into xlsx workbooks
//!
//! # Main Commands
//!
//! ```bash
//! assaynorm process plate.csv -c groups.json      # Write plate_normalized.xlsx
//! assaynorm process plate.csv -g Control=1,2,3     # Groups from the command line
//! assaynorm serve                                  # Start HTTP server (port 3000)
//! ```
//!
//! # Other Commands
//!
//! ```bash
//! assaynorm preview plate.csv          # Print the sheets as JSON
//! assaynorm export-csv plate.csv       # Print the normalized table as CSV
//! assaynorm validate-config groups.json
//! assaynorm example-config
//! ```
//!
//! `ASSAYNORM_CONFIG` (environment or `.env`) names a default config file.

use assaynorm::{
    example_config, export_csv, output_file_name, process_file, validate_run_config,
    write_workbook, GroupSpec, RunConfig,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "assaynorm")]
#[command(about = "Normalize protein assay exports against a reference protein", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: export CSV → normalized xlsx workbook
    Process {
        /// Input CSV export
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Output file (default: derived from the file name pattern)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for the derived output file (default: next to the input)
        #[arg(long, conflicts_with = "output")]
        out_dir: Option<PathBuf>,
    },

    /// Run the pipeline and print the sheets as JSON
    Preview {
        /// Input CSV export
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the pipeline and write the normalized table as CSV
    ExportCsv {
        /// Input CSV export
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show an example run configuration
    ExampleConfig,

    /// Check a run configuration file against the schema
    ValidateConfig {
        /// Configuration JSON file
        input: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

/// Configuration file plus per-run overrides.
#[derive(Args)]
struct RunArgs {
    /// Run configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference concentration
    #[arg(long)]
    concentration: Option<f64>,

    /// Identity label of the reference protein
    #[arg(long)]
    reference: Option<String>,

    /// Sample group as NAME=COLUMNS, e.g. Control=1,2,3 (repeatable; replaces
    /// the groups of the config file)
    #[arg(short, long = "group", value_name = "NAME=COLUMNS")]
    groups: Vec<String>,

    /// Keep NaN/inf values instead of failing
    #[arg(long)]
    lenient: bool,

    /// Leave AVG and SD columns out of group sheets
    #[arg(long)]
    no_stats: bool,

    /// Output file name pattern ({name}, {date})
    #[arg(long)]
    pattern: Option<String>,
}

impl RunArgs {
    fn resolve(&self) -> CliResult<RunConfig> {
        let path = self
            .config
            .clone()
            .or_else(|| std::env::var_os("ASSAYNORM_CONFIG").map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                eprintln!("⚙️  Config: {}", path.display());
                RunConfig::load(&path)?
            }
            None => RunConfig::default(),
        };

        if let Some(concentration) = self.concentration {
            if !(concentration.is_finite() && concentration > 0.0) {
                return Err(format!("Concentration must be positive, got {}", concentration).into());
            }
            config.reference_concentration = concentration;
        }
        if let Some(ref reference) = self.reference {
            config.reference_key = reference.clone();
        }
        if !self.groups.is_empty() {
            config.groups = self
                .groups
                .iter()
                .map(|g| parse_group_arg(g))
                .collect::<CliResult<_>>()?;
        }
        if self.lenient {
            config.strict = false;
        }
        if self.no_stats {
            config.summary_statistics = false;
        }
        if let Some(ref pattern) = self.pattern {
            config.file_name_pattern = pattern.clone();
        }

        Ok(config)
    }
}

/// `Control=1,2,3` → group spec
fn parse_group_arg(arg: &str) -> CliResult<GroupSpec> {
    let (name, columns) = arg
        .split_once('=')
        .ok_or_else(|| format!("Expected NAME=COLUMNS, got '{}'", arg))?;
    Ok(GroupSpec::new(name.trim(), columns.trim()))
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input,
            run,
            output,
            out_dir,
        } => cmd_process(&input, &run, output, out_dir).await,

        Commands::Preview { input, run, output } => {
            cmd_preview(&input, &run, output.as_deref()).await
        }

        Commands::ExportCsv { input, run, output } => {
            cmd_export_csv(&input, &run, output.as_deref()).await
        }

        Commands::ExampleConfig => cmd_example_config(),

        Commands::ValidateConfig { input } => cmd_validate_config(&input),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_process(
    input: &Path,
    run: &RunArgs,
    output: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> CliResult<()> {
    let config = run.resolve()?;
    let output = match output {
        Some(path) => path,
        None => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("export");
            let today = chrono::Local::now().format("%Y-%m-%d").to_string();
            let name = output_file_name(&config.file_name_pattern, stem, &today);
            let dir = out_dir
                .or_else(|| input.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            dir.join(name)
        }
    };

    eprintln!("📄 Processing: {}", input.display());
    let result = process_file(input, &config).await?;

    eprintln!("   Encoding: {}", result.csv_info.encoding);
    eprintln!("   Rows: {} ({} data)", result.csv_info.row_count, result.csv_info.data_rows);
    eprintln!("   Proteins: {}", result.csv_info.proteins);
    eprintln!("   Samples: {}", result.csv_info.samples.join(", "));

    write_workbook(&result.sheets, &output).await?;

    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_preview(input: &Path, run: &RunArgs, output: Option<&Path>) -> CliResult<()> {
    let config = run.resolve()?;
    let result = process_file(input, &config).await?;
    let json = serde_json::to_string_pretty(&result.sheets)?;
    write_output(&json, output)
}

async fn cmd_export_csv(input: &Path, run: &RunArgs, output: Option<&Path>) -> CliResult<()> {
    let config = run.resolve()?;
    let result = process_file(input, &config).await?;

    let mut buf = Vec::new();
    export_csv(&result.normalized, &mut buf)?;
    write_output(String::from_utf8_lossy(&buf).trim_end(), output)
}

fn cmd_example_config() -> CliResult<()> {
    println!("{}", example_config().to_json()?);
    Ok(())
}

fn cmd_validate_config(input: &Path) -> CliResult<()> {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let value: Value = serde_json::from_str(&content)?;

    if let Err(errors) = validate_run_config(&value) {
        eprintln!("\n❌ {} problems:", errors.len());
        for err in &errors {
            eprintln!("   - {}", err);
        }
        std::process::exit(1);
    }

    let config = RunConfig::from_value(&value)?;
    for group in config.parsed_groups()? {
        eprintln!("   {} → columns {:?}", group.name, group.columns);
    }
    eprintln!("✅ Configuration is valid");
    Ok(())
}

async fn cmd_serve(port: u16) -> CliResult<()> {
    assaynorm::server::start_server(port).await
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult<()> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
