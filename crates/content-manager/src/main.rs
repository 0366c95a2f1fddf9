use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{init_config, plan_payload, show_config, PlanArgs};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log resolution details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the one next to the executable
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show where the content of a payload would be installed
    Plan {
        /// Directory holding the unpacked payload
        payload: Utf8PathBuf,

        /// Game installation directory, overrides the configured one
        #[arg(long)]
        game_root: Option<Utf8PathBuf>,

        /// Prefer removing existing content before installing
        #[arg(long)]
        clean: bool,

        /// Print a machine-readable report
        #[arg(long)]
        json: bool,
    },
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Write a default configuration file if none exists
    Init,
}

fn parse_args() -> Args {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "content_manager=debug,cm_install=debug"
    } else {
        "content_manager=info,cm_install=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();
    init_logging(args.verbose);

    match args.command {
        Commands::Plan {
            payload,
            game_root,
            clean,
            json,
        } => {
            plan_payload(PlanArgs {
                payload,
                game_root,
                clean,
                json,
                config_path: args.config,
            })
            .await
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => show_config(args.config.as_deref()),
            ConfigAction::Init => init_config(args.config.as_deref()),
        },
    }
}
