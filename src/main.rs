// meshctl - operations CLI for distributed storage clusters

use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use meshctl::api::{ApiClient, ControlJob};
use meshctl::config::{credentials, files, Paths, Settings};
use meshctl::ops::{runcmd, service, show, volumes, RunOptions, Scope, ServiceAction};
use meshctl::ops::volumes::{parse_size, CreateVolume, RaidLevel};
use meshctl::output::{Listing, MeshError, OutputFormat, TerminalOutput};
use meshctl::remote::{RemoteExecutor, SshExecutor};

#[derive(Parser)]
#[command(
    name = "meshctl",
    about = "Operate a distributed storage cluster: fleet-wide service control over SSH and management API access",
    version,
    disable_colored_help = true,
    term_width = 0,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Maximum number of concurrent SSH sessions
    #[arg(long, global = true, default_value = "32")]
    forks: usize,

    /// SSH connection timeout in seconds
    #[arg(long, global = true, default_value = "5")]
    timeout: u64,
}

#[derive(Subcommand)]
#[command(disable_colored_help = true)]
enum Commands {
    /// Show cluster resources and status
    Show {
        /// The resource to show
        what: ShowWhat,

        /// Output format (table, tsv or json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Check the service status on the selected part of the cluster
    Check {
        #[command(flatten)]
        fleet: FleetArgs,
    },

    /// Start the services on the selected part of the cluster
    Start {
        #[command(flatten)]
        fleet: FleetArgs,
    },

    /// Stop the services on the selected part of the cluster
    Stop {
        #[command(flatten)]
        fleet: FleetArgs,

        /// Drain the targets through the management plane before stopping
        #[arg(short, long)]
        graceful: bool,
    },

    /// Restart the services on the selected part of the cluster
    Restart {
        #[command(flatten)]
        fleet: FleetArgs,

        /// Drain the targets through the management plane before stopping
        #[arg(short, long)]
        graceful: bool,
    },

    /// Run an arbitrary command on the selected part of the cluster
    Runcmd {
        /// Which hosts to run on
        scope: Scope,

        /// Explicit host list, overrides the scope
        #[arg(short, long, num_args = 1..)]
        servers: Vec<String>,

        /// The command to execute remotely
        #[arg(short, long, num_args = 1.., required = true)]
        command: Vec<String>,

        /// Prefix every output line with the host name
        #[arg(short, long)]
        prefix: bool,

        /// Run the hosts in parallel
        #[arg(short = 'P', long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
        parallel: bool,
    },

    /// Attach volumes to clients
    Attach {
        /// Client names, or 'all'
        #[arg(short, long, num_args = 1.., required = true)]
        clients: Vec<String>,

        /// Volume names, or 'all'
        #[arg(short = 'V', long, num_args = 1.., required = true)]
        volumes: Vec<String>,
    },

    /// Detach volumes from clients
    Detach {
        /// Client names, or 'all'
        #[arg(short, long, num_args = 1.., required = true)]
        clients: Vec<String>,

        /// Volume names, or 'all'
        #[arg(short = 'V', long, num_args = 1.., required = true)]
        volumes: Vec<String>,
    },

    /// Create or delete volumes
    Volume {
        #[command(subcommand)]
        action: VolumeCommands,
    },

    /// Manage the locally saved host list
    Hosts {
        #[command(subcommand)]
        action: HostsCommands,
    },

    /// Define the management servers and stored credentials
    Define {
        #[command(subcommand)]
        what: DefineCommands,
    },
}

/// Shared arguments for the service lifecycle commands
#[derive(clap::Args)]
struct FleetArgs {
    /// Which part of the cluster to address
    scope: Scope,

    /// Explicit host list, overrides the scope
    #[arg(short, long, num_args = 1..)]
    servers: Vec<String>,

    /// Show the captured service output under each status line
    #[arg(short, long)]
    details: bool,

    /// Prefix every output line with the host name
    #[arg(short, long)]
    prefix: bool,

    /// Run the hosts in parallel
    #[arg(short = 'P', long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    parallel: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShowWhat {
    Cluster,
    Targets,
    Clients,
    Volumes,
    Vpgs,
    DriveClasses,
    TargetClasses,
}

#[derive(Subcommand)]
enum VolumeCommands {
    /// Create a new volume
    Create {
        /// Volume name
        #[arg(short, long)]
        name: String,

        /// Volume size, e.g. 12GB, 1.5TiB, or MAX
        #[arg(short = 'S', long)]
        size: String,

        /// Volume description
        #[arg(short, long)]
        description: Option<String>,

        /// Limit placement to these drive classes
        #[arg(short = 'D', long = "drive-class", num_args = 1..)]
        drive_classes: Vec<String>,

        /// Limit placement to these target classes
        #[arg(short = 'T', long = "target-class", num_args = 1..)]
        target_classes: Vec<String>,

        /// Limit placement to these target nodes
        #[arg(short = 'N', long = "limit-node", num_args = 1..)]
        limit_nodes: Vec<String>,

        /// Limit placement to these drives
        #[arg(short = 'L', long = "limit-drive", num_args = 1..)]
        limit_drives: Vec<String>,

        /// RAID level (lvm, 0, 1 or 10); mutually exclusive with --vpg
        #[arg(short, long)]
        raid_level: Option<RaidLevel>,

        /// Stripe width, required for RAID 0 and 10
        #[arg(short = 'w', long)]
        stripe_width: Option<u64>,

        /// Provision from this volume provisioning group
        #[arg(short = 'g', long)]
        vpg: Option<String>,
    },

    /// Delete volumes by name
    Delete {
        /// Volume names
        #[arg(required = true)]
        names: Vec<String>,

        /// Force the deletion
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum HostsCommands {
    /// Add hosts to the saved host list
    Add {
        #[arg(required = true)]
        hosts: Vec<String>,
    },
    /// List the saved hosts
    List,
    /// Remove hosts from the saved host list
    Delete {
        #[arg(required = true)]
        hosts: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DefineCommands {
    /// Set the management servers (full names; the first one serves the API)
    Manager {
        #[arg(short, long, num_args = 1.., required = true)]
        servers: Vec<String>,
    },
    /// Set and store the SSH credentials
    Sshuser,
    /// Set and store the management API credentials
    Apiuser,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("meshctl=debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let out = TerminalOutput::new(cli.verbose);

    if let Err(err) = dispatch(&cli, &out).await {
        out.print_error(&err);
    }

    if out.had_error() {
        std::process::exit(1);
    }
}

async fn dispatch(cli: &Cli, out: &TerminalOutput) -> Result<(), MeshError> {
    let paths = Paths::from_env()?;

    // Local-state commands must work before a manager or credentials exist
    match &cli.command {
        Commands::Hosts { action } => return run_hosts(action, &paths, out),
        Commands::Define { what } => return run_define(what, &paths, out),
        _ => {}
    }

    let settings = Settings::load(paths, cli.forks, cli.timeout)?;

    match &cli.command {
        Commands::Show { what, format } => {
            let format = parse_format(format)?;
            let api = ApiClient::connect(&settings).await?;
            match what {
                ShowWhat::Cluster => show::cluster(&api, out, format).await,
                ShowWhat::Targets => show::targets(&api, out, format).await,
                ShowWhat::Clients => show::clients(&api, out, format).await,
                ShowWhat::Volumes => show::volumes(&api, out, format).await,
                ShowWhat::Vpgs => show::vpgs(&api, out, format).await,
                ShowWhat::DriveClasses => show::drive_classes(&api, out, format).await,
                ShowWhat::TargetClasses => show::target_classes(&api, out, format).await,
            }
        }

        Commands::Check { fleet } => {
            run_lifecycle(&settings, out, fleet, ServiceAction::Check, false).await
        }
        Commands::Start { fleet } => {
            run_lifecycle(&settings, out, fleet, ServiceAction::Start, false).await
        }
        Commands::Stop { fleet, graceful } => {
            run_lifecycle(&settings, out, fleet, ServiceAction::Stop, *graceful).await
        }
        Commands::Restart { fleet, graceful } => {
            run_lifecycle(&settings, out, fleet, ServiceAction::Restart, *graceful).await
        }

        Commands::Runcmd {
            scope,
            servers,
            command,
            prefix,
            parallel,
        } => {
            let api = connect_if_needed(*scope, servers, &settings).await?;
            let executor = ssh_executor(&settings);
            runcmd::run(
                executor,
                api.as_ref(),
                &settings,
                out,
                *scope,
                servers,
                &command.join(" "),
                *prefix,
                *parallel,
            )
            .await
        }

        Commands::Attach { clients, volumes } => {
            let api = ApiClient::connect(&settings).await?;
            volumes::attach_detach(&api, out, clients, volumes, ControlJob::Attach).await
        }
        Commands::Detach { clients, volumes } => {
            let api = ApiClient::connect(&settings).await?;
            volumes::attach_detach(&api, out, clients, volumes, ControlJob::Detach).await
        }

        Commands::Volume { action } => {
            let api = ApiClient::connect(&settings).await?;
            match action {
                VolumeCommands::Create {
                    name,
                    size,
                    description,
                    drive_classes,
                    target_classes,
                    limit_nodes,
                    limit_drives,
                    raid_level,
                    stripe_width,
                    vpg,
                } => {
                    let request = CreateVolume {
                        name: name.clone(),
                        capacity: parse_size(size)?,
                        description: description.clone(),
                        drive_classes: drive_classes.clone(),
                        target_classes: target_classes.clone(),
                        limit_by_nodes: limit_nodes.clone(),
                        limit_by_drives: limit_drives.clone(),
                        raid_level: *raid_level,
                        stripe_width: *stripe_width,
                        vpg: vpg.clone(),
                    };
                    volumes::create(&api, out, &request).await
                }
                VolumeCommands::Delete { names, force } => {
                    volumes::delete(&api, out, names, *force).await
                }
            }
        }

        Commands::Hosts { .. } | Commands::Define { .. } => unreachable!("handled above"),
    }
}

async fn run_lifecycle(
    settings: &Settings,
    out: &TerminalOutput,
    fleet: &FleetArgs,
    action: ServiceAction,
    graceful: bool,
) -> Result<(), MeshError> {
    let api = connect_if_needed(fleet.scope, &fleet.servers, settings).await?;
    let executor = ssh_executor(settings);

    service::run(
        executor,
        api.as_ref(),
        settings,
        out,
        fleet.scope,
        &fleet.servers,
        action,
        RunOptions {
            details: fleet.details,
            prefix: fleet.prefix,
            parallel: fleet.parallel,
            graceful,
        },
    )
    .await
}

/// Log in to the management API only when the scope resolution will need it
async fn connect_if_needed(
    scope: Scope,
    explicit: &[String],
    settings: &Settings,
) -> Result<Option<ApiClient>, MeshError> {
    if explicit.is_empty() && scope.needs_api() {
        Ok(Some(ApiClient::connect(settings).await?))
    } else {
        Ok(None)
    }
}

fn ssh_executor(settings: &Settings) -> Arc<dyn RemoteExecutor> {
    Arc::new(SshExecutor::new(settings.ssh.clone(), settings.connect_timeout))
}

fn parse_format(format: &str) -> Result<OutputFormat, MeshError> {
    match format.to_ascii_lowercase().as_str() {
        "table" => Ok(OutputFormat::Table),
        "tsv" => Ok(OutputFormat::Tsv),
        "json" => Ok(OutputFormat::Json),
        other => Err(MeshError::InvalidInput {
            message: format!("unknown output format '{}'", other),
            suggestion: Some("Use table, tsv or json".to_string()),
        }),
    }
}

fn run_hosts(action: &HostsCommands, paths: &Paths, out: &TerminalOutput) -> Result<(), MeshError> {
    match action {
        HostsCommands::Add { hosts } => {
            files::add_hosts(&paths.hosts_file, hosts)?;
            out.print_ok(&format!("Added {} host(s).", hosts.len()));
        }
        HostsCommands::List => {
            let hosts = files::load_hosts(&paths.hosts_file)?;
            let mut listing = Listing::new(&["Host"]);
            for host in hosts {
                listing.push(vec![host]);
            }
            out.print_listing(&listing, OutputFormat::Table);
        }
        HostsCommands::Delete { hosts } => {
            files::delete_hosts(&paths.hosts_file, hosts)?;
            out.print_ok(&format!("Deleted {} host(s).", hosts.len()));
        }
    }
    Ok(())
}

fn run_define(what: &DefineCommands, paths: &Paths, out: &TerminalOutput) -> Result<(), MeshError> {
    match what {
        DefineCommands::Manager { servers } => {
            files::save_managers(&paths.manager_file, servers)?;
            out.print_ok(&format!("Management server list set to {}.", servers.join(", ")));
        }
        DefineCommands::Sshuser => {
            redefine_credentials(&paths.ssh_secrets_file, "SSH")?;
            out.print_ok("SSH credentials stored.");
        }
        DefineCommands::Apiuser => {
            redefine_credentials(&paths.api_secrets_file, "API")?;
            out.print_ok("API credentials stored.");
        }
    }
    Ok(())
}

/// Drop any stored entry first so the prompt always fires
fn redefine_credentials(path: &std::path::Path, label: &str) -> Result<(), MeshError> {
    if path.is_file() {
        std::fs::remove_file(path).map_err(|e| {
            MeshError::io(format!("cannot replace secrets file: {}", e), Some(path.to_path_buf()))
        })?;
    }
    credentials::load_or_prompt(path, label)?;
    Ok(())
}
