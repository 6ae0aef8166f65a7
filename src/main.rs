//! deepnog CLI - device and parameter file utilities
//!
//! Resolve compute devices, fetch trained parameters into the local data home
//! and inspect parameter files.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};

use rs_deepnog::{
    config::Settings,
    load_model, resolve_device, resolve_weights_with,
    utils::{format_count, init_tracing},
    CountParameters, WeightsDescriptor,
};

#[derive(Parser)]
#[command(name = "deepnog")]
#[command(author, version, about = "Protein orthologous group assignment utilities", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON settings file (data_home, remote_url, timeout_secs)
    #[arg(long, env = "DEEPNOG_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which device a token resolves to
    Device {
        /// auto, cpu or gpu
        #[arg(short, long, default_value = "auto")]
        device: String,
    },

    /// Make sure the parameters for a database/level/architecture are cached
    Fetch {
        /// Orthology database, e.g. eggNOG5
        #[arg(long)]
        database: String,

        /// Taxonomic level, e.g. 2 or 1236
        #[arg(long)]
        level: String,

        /// Network architecture
        #[arg(long, default_value = "deepnog")]
        architecture: String,

        /// Local data home (overrides DEEPNOG_DATA)
        #[arg(long)]
        data_home: Option<PathBuf>,

        /// Fail instead of downloading on a cache miss
        #[arg(long)]
        no_download: bool,
    },

    /// Print the effective settings as JSON
    Config {
        /// Local data home (overrides DEEPNOG_DATA)
        #[arg(long)]
        data_home: Option<PathBuf>,
    },

    /// Count the parameters in a weights file
    Count {
        /// Path to a .pth or .safetensors file
        #[arg(short, long)]
        weights: PathBuf,

        /// Network architecture
        #[arg(short, long, default_value = "deepnog")]
        architecture: String,

        /// auto, cpu or gpu
        #[arg(short, long, default_value = "auto")]
        device: String,

        /// Module prefixes to freeze before counting
        #[arg(long)]
        freeze: Vec<String>,

        /// Only count tunable parameters
        #[arg(long)]
        tunable_only: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Device { device } => {
            let device = resolve_device(&device)?;
            println!("{}", device);
        }

        Commands::Fetch {
            database,
            level,
            architecture,
            data_home,
            no_download,
        } => {
            let settings = load_settings(cli.config.as_deref(), data_home.as_deref())?;
            let descriptor = WeightsDescriptor::new(database, level, architecture)?;
            let path = resolve_weights_with(&settings, &descriptor, !no_download, cli.verbose)?;
            println!("{}", path.display());
        }

        Commands::Config { data_home } => {
            let mut settings = load_settings(cli.config.as_deref(), data_home.as_deref())?;
            settings.timeout_secs = Some(settings.timeout()?.as_secs());
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }

        Commands::Count {
            weights,
            architecture,
            device,
            freeze,
            tunable_only,
        } => {
            let device = resolve_device(&device)?;
            let mut model = load_model(&architecture, &weights, &device)?;
            for prefix in freeze {
                model.state_dict_mut().freeze(prefix);
            }

            let total = model.count_parameters(false);
            let tunable = model.count_parameters(true);

            println!("Architecture: {}", model.architecture());
            println!("Device: {}", model.device());
            if tunable_only {
                println!("Tunable parameters: {} ({})", tunable, format_count(tunable));
            } else {
                println!("Parameters: {} ({})", total, format_count(total));
                println!("Tunable parameters: {} ({})", tunable, format_count(tunable));
            }
        }
    }

    Ok(())
}

fn load_settings(config: Option<&Path>, data_home: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match config {
        Some(path) => Settings::from_file_with_data_home(path, data_home)?,
        None => Settings::from_env_with_data_home(data_home)?,
    };
    Ok(settings)
}
