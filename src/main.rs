use anyhow::Result;
use clap::{ArgGroup, Parser};
use gbtool::{
    commands::{self, MassTestArgs, config::{Config, GlobalOptions}},
    masstest::{DEFAULT_LOG, DEFAULT_RUNS},
    vcpkg::{DEFAULT_ARCHIVE_URL, DEFAULT_PORT, VcpkgSource},
};
use std::path::PathBuf;

/// gbtool - GameBackbone release tooling
///
/// Keeps the version number in sync across the GameBackbone build files,
/// maintains the vcpkg port, prepares vcpkg checkouts and runs the unit
/// tests repeatedly to catch flaky failures.
///
/// Examples:
///   gbtool get                        # Print the current version
///   gbtool validate --last-version 0.3.0
///   gbtool set 0.4.0                  # Bump every tracked file
#[derive(Parser, Debug)]
#[command(author, version = env!("GBTOOL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GameBackbone checkout (defaults to the parent directory; also via GB_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "GB_ROOT",
        value_name = "PATH",
        default_value = "..",
        global = true
    )]
    pub root: PathBuf,

    /// vcpkg port directory whose portfile and CONTROL are kept in sync too
    #[arg(long = "port-dir", value_name = "PATH", global = true)]
    pub port_dir: Option<PathBuf>,

    /// JSON file replacing the built-in list of version locations
    #[arg(long = "locations", value_name = "FILE", global = true)]
    pub locations: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the version from the primary CMake manifest
    Get,

    /// Check that every location carries the same version
    Validate(ValidateArgs),

    /// Write a new version to every location
    Set(SetArgs),

    /// Point the vcpkg port at the current version and refresh its SHA512
    UpdatePort(UpdatePortArgs),

    /// Bootstrap vcpkg and install the libraries GameBackbone needs
    InstallVcpkg(InstallVcpkgArgs),

    /// Run a unit-test executable several times in a row
    MassTest(MassTestCliArgs),
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Previously released version; the current one must be greater
    #[arg(long = "last-version", value_name = "VERSION")]
    pub last_version: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// New version, e.g. 0.4.0
    #[arg(value_name = "VERSION")]
    pub version: String,
}

#[derive(clap::Args, Debug)]
pub struct UpdatePortArgs {
    /// vcpkg checkout containing the port
    #[arg(long = "vcpkg", value_name = "PATH")]
    pub vcpkg: PathBuf,

    /// Port name under <vcpkg>/ports
    #[arg(long = "port", value_name = "NAME", default_value = DEFAULT_PORT)]
    pub port: String,

    /// Triplet to install with (defaults to the platform's)
    #[arg(long = "triplet", value_name = "TRIPLET")]
    pub triplet: Option<String>,
}

#[derive(clap::Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["path", "download"])))]
pub struct InstallVcpkgArgs {
    /// Use an existing vcpkg checkout
    #[arg(long = "path", value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Download a fresh checkout
    #[arg(long = "download")]
    pub download: bool,

    /// Directory the checkout is downloaded into
    #[arg(long = "dest", value_name = "PATH", default_value = ".")]
    pub dest: PathBuf,

    /// Archive to download
    #[arg(long = "url", value_name = "URL", default_value = DEFAULT_ARCHIVE_URL)]
    pub url: String,
}

impl InstallVcpkgArgs {
    fn source(self) -> VcpkgSource {
        match self.path {
            Some(path) => VcpkgSource::Existing(path),
            None => VcpkgSource::Download {
                dest_dir: self.dest,
                url: self.url,
            },
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct MassTestCliArgs {
    /// Test executable to run
    #[arg(long = "exe", value_name = "PATH")]
    pub exe: PathBuf,

    /// Shared library copied next to the executable (repeatable)
    #[arg(long = "lib", value_name = "PATH")]
    pub libs: Vec<PathBuf>,

    /// Directory the copies run in (defaults to the current directory)
    #[arg(long = "work-dir", value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Number of runs
    #[arg(long = "runs", default_value_t = DEFAULT_RUNS, value_parser = clap::value_parser!(u32).range(1..))]
    pub runs: u32,

    /// Log for failed runs, relative to the work directory
    #[arg(long = "log", value_name = "FILE", default_value = DEFAULT_LOG)]
    pub log: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let options = GlobalOptions {
        root: cli.root,
        port_dir: cli.port_dir,
        locations: cli.locations,
    };
    let config = Config::new(gbtool::runtime::RealRuntime, options)?;

    match cli.command {
        Commands::Get => {
            commands::get(&config)?;
        }
        Commands::Validate(args) => {
            commands::validate(&config, args.last_version.as_deref())?;
        }
        Commands::Set(args) => {
            commands::set(&config, &args.version)?;
        }
        Commands::UpdatePort(args) => {
            commands::update_port(&config, &args.vcpkg, &args.port, args.triplet.as_deref())?;
        }
        Commands::InstallVcpkg(args) => {
            commands::install_vcpkg(&config, args.source()).await?;
        }
        Commands::MassTest(args) => {
            let args = MassTestArgs {
                executable: args.exe,
                libraries: args.libs,
                work_dir: args.work_dir,
                runs: args.runs,
                log: args.log,
            };
            commands::mass_test(&config, args)?;
        }
    }
    Ok(())
}
