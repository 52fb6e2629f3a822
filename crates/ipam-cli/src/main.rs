//! Deployment IPAM CLI (ipamctl)

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;

use deploy_ipam_cli::commands::reserve::ReserveRequest;
use deploy_ipam_cli::commands::{
    CheckCommand, ListCommand, ReconcileCommand, ReleaseCommand, ReserveCommand,
};
use deploy_ipam_cli::context::DEFAULT_MANIFEST;
use deploy_ipam_cli::{render, CliContext, OutputFormat, Render};

#[derive(Parser)]
#[command(name = "ipamctl")]
#[command(about = "Deployment IP address management")]
#[command(version)]
#[command(long_about = "
Deployment IP address management

Reserves, releases and reconciles instance IPs on the networks of a
deployment manifest. Settings are read from --config and DEPLOY_IPAM_*
environment variables.

Examples:
  ipamctl check                                        # Validate networks, show capacity
  ipamctl reserve -n default -i web/0 --az z1          # Allocate a dynamic IP
  ipamctl reserve -n default -i web/0 --ip 10.0.0.10 --static
  ipamctl reconcile -n default -i web/0 --ip 10.0.0.20 # Record an observed IP
  ipamctl release -n default -i web/0 --ip 10.0.0.20
  ipamctl list --format json                           # Show durable reservations
")]
struct Cli {
    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network manifest (YAML or JSON)
    #[arg(short, long, global = true, default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reserve an IP, allocating one when --ip is not given
    Reserve {
        /// Network name
        #[arg(short, long)]
        network: String,

        /// Instance owning the reservation
        #[arg(short, long)]
        instance: String,

        /// Availability zone of the instance
        #[arg(long)]
        az: Option<String>,

        /// IP to reserve
        #[arg(long)]
        ip: Option<IpAddr>,

        /// Reserve from the static pool
        #[arg(long = "static", requires = "ip")]
        static_ip: bool,
    },

    /// Release a reserved IP
    Release {
        /// Network name
        #[arg(short, long)]
        network: String,

        /// Instance owning the reservation
        #[arg(short, long)]
        instance: String,

        /// IP to release
        #[arg(long)]
        ip: IpAddr,
    },

    /// Record an IP observed on a running instance
    Reconcile {
        /// Network name
        #[arg(short, long)]
        network: String,

        /// Instance the IP was observed on
        #[arg(short, long)]
        instance: String,

        /// Availability zone of the instance
        #[arg(long)]
        az: Option<String>,

        /// Observed IP
        #[arg(long)]
        ip: IpAddr,
    },

    /// List durable reservations
    List {
        /// Show reservations of one instance only
        #[arg(short, long)]
        instance: Option<String>,
    },

    /// Validate the manifest and show allocatable capacity per subnet
    Check,
}

fn emit<T: Serialize + Render>(value: &T, format: OutputFormat, quiet: bool) -> Result<()> {
    if !quiet || format == OutputFormat::Json {
        println!("{}", render(value, format)?);
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let context = CliContext::load(cli.config.as_deref(), &cli.manifest)?;

    match &cli.command {
        Commands::Reserve {
            network,
            instance,
            az,
            ip,
            static_ip,
        } => {
            let provider = context.provider()?;
            let request = ReserveRequest {
                network: network.clone(),
                instance: instance.clone(),
                az: az.clone(),
                ip: *ip,
                static_ip: *static_ip,
            };
            let report = ReserveCommand::new(&context, &provider).execute(&request)?;
            emit(&report, cli.format, cli.quiet)
        }

        Commands::Release {
            network,
            instance,
            ip,
        } => {
            let provider = context.provider()?;
            let report = ReleaseCommand::new(&context, &provider).execute(network, instance, *ip)?;
            emit(&report, cli.format, cli.quiet)
        }

        Commands::Reconcile {
            network,
            instance,
            az,
            ip,
        } => {
            let provider = context.provider()?;
            let report = ReconcileCommand::new(&context, &provider).execute(
                network,
                instance,
                az.as_deref(),
                *ip,
            )?;
            emit(&report, cli.format, cli.quiet)
        }

        Commands::List { instance } => {
            let records = ListCommand::new(&context).execute(instance.as_deref())?;
            emit(&records, cli.format, cli.quiet)
        }

        Commands::Check => {
            let report = CheckCommand::new(&context).execute()?;
            emit(&report, cli.format, cli.quiet)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("  Caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
