use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use stackgraph::BootstrapMode;

#[derive(Parser)]
#[command(name = "stackgen")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Generate a single-instance provisioning template scoped to your address",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate the template and print it to stdout
    Generate(GenerateArgs),

    /// Print the effective configuration as TOML
    Config(StackArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Stack settings
// ============================================================================

/// Config file selection plus per-field overrides
#[derive(Args, Default)]
pub struct StackArgs {
    /// Config file (default: ~/.config/stackgen/config.toml if present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Application name, also the playbook file name
    #[arg(long)]
    pub app_name: Option<String>,

    /// Application port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Playbook repository URL
    #[arg(long)]
    pub repo: Option<String>,

    /// Machine image identifier
    #[arg(long)]
    pub image: Option<String>,

    /// Instance size class
    #[arg(long)]
    pub instance_type: Option<String>,

    /// Service principal trusted to assume the instance role
    #[arg(long)]
    pub principal: Option<String>,

    /// How the instance applies its playbook
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Periodic ansible-pull from the repository
    Pull,
    /// Clone once, run ansible-playbook, re-run from cron
    Playbook,
}

impl From<ModeArg> for BootstrapMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Pull => BootstrapMode::PullPeriodic,
            ModeArg::Playbook => BootstrapMode::PlaybookOnce,
        }
    }
}

// ============================================================================
// Generate
// ============================================================================

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Use this address instead of looking it up
    #[arg(short, long)]
    pub address: Option<String>,

    /// Address lookup endpoint
    #[arg(long, env = "STACKGEN_LOOKUP_URL", default_value = publicip::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Address lookup timeout in seconds
    #[arg(long, default_value = "5")]
    pub timeout: u64,

    /// Emit single-line JSON
    #[arg(long)]
    pub compact: bool,
}
