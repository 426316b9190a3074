use clap::{command, Parser, Subcommand};
use selner::{Error, PreviewOutcome, Script, Selner, SelnerConfig};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, default_value = "selner.json", global = true)]
    config: PathBuf,

    /// Directory holding the script store, overrides the config file
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression without saving it
    Eval(InputArgs),

    /// Show what an expression would produce for the first selection
    Preview(InputArgs),

    /// Save a new named script and run it
    New {
        name: String,

        expression: String,

        #[arg(long)]
        description: Option<String>,

        /// Selection text. Each line of stdin is one selection when absent
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Run a stored script
    Run {
        name: String,

        #[arg(short, long)]
        input: Option<String>,
    },

    /// Remove a stored script
    Rm { name: String },

    /// List stored scripts by name
    Ls,

    /// List stored scripts, most recently used first
    Recent,
}

#[derive(Parser)]
struct InputArgs {
    expression: String,

    /// Selection text. Each line of stdin is one selection when absent
    #[arg(short, long)]
    input: Option<String>,
}

fn load_config(cli: &Cli) -> Result<SelnerConfig, Error> {
    let mut config = if cli.config.exists() {
        SelnerConfig::from_file(&cli.config)?
    } else {
        debug!("{} not found, using defaults", cli.config.display());
        SelnerConfig::default()
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.local.base_dir = dir.to_string_lossy().to_string();
    }
    Ok(config)
}

fn selections(input: &Option<String>) -> Result<Vec<String>, Error> {
    match input {
        Some(text) => Ok(vec![text.clone()]),
        None => io::stdin()
            .lock()
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::Internal(format!("Failed to read stdin: {}", e))),
    }
}

fn print_scripts(scripts: &[Script]) {
    for script in scripts {
        match &script.description {
            Some(description) => println!("{}\t{}\t{}", script.name, script.body, description),
            None => println!("{}\t{}", script.name, script.body),
        }
    }
}

async fn run(cli: &Cli) -> Result<(), Error> {
    let config = load_config(cli)?;
    info!("config loaded.");
    debug!("config: {:?}", config);

    let selner = Selner::from_config(config);

    match &cli.command {
        Commands::Eval(args) => {
            let replacements = selner.run_without_saving(&args.expression, &selections(&args.input)?)?;
            replacements.iter().for_each(|line| println!("{}", line));
        }
        Commands::Preview(args) => match selner.preview(&args.expression, &selections(&args.input)?) {
            PreviewOutcome::Info(message) => println!("{}", message),
            PreviewOutcome::Error(message) => eprintln!("{}", message),
        },
        Commands::New {
            name,
            expression,
            description,
            input,
        } => {
            let replacements = selner
                .new_script(name, expression, description.clone(), &selections(input)?)
                .await?;
            replacements.iter().for_each(|line| println!("{}", line));
        }
        Commands::Run { name, input } => {
            let replacements = selner.run_stored(name, &selections(input)?).await?;
            replacements.iter().for_each(|line| println!("{}", line));
        }
        Commands::Rm { name } => selner.remove(name).await?,
        Commands::Ls => print_scripts(&selner.scripts().await?),
        Commands::Recent => print_scripts(&selner.recent().await?),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
