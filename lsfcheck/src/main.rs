use eyre::WrapErr;
use lsfcheck::executor::{ScriptedConnector, SshConnector, Transcript};
use lsfcheck::poller::{self, JobSize};
use lsfcheck::{Config, Connector, Report, Retrying, Scenario};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(&cli.verbose);

    match cli.command {
        Command::InitConfig {
            ref path,
            ref from_vars,
        } => {
            let path = match path.clone().or_else(Config::default_path) {
                Some(p) => p,
                None => eyre::bail!("no config directory available, pass a path"),
            };
            if path.exists() {
                eprintln!("{path:?} already exists, not overwriting it");
                std::process::exit(1);
            }
            let mut config = Config::default();
            if let Some(file) = from_vars {
                config.expected = lsfcheck::ExpectedTopology::from_provisioning_vars(&read_json(file)?)?;
            }
            config.save_to_file(&path)?;
            println!("Default configuration written to {path:?}");
            Ok(())
        }
        Command::CheckOutputs {
            ref file,
            app_center,
            ldap,
        } => {
            let outputs = read_json(file)?;
            let mut report = Report::new();
            let _ = report.record(
                "check terraform outputs",
                lsfcheck::verify_provisioning_outputs(&outputs, app_center, ldap),
            );
            finish(&report)
        }
        Command::Replay {
            ref transcript,
            scenario,
        } => {
            let config = cli.load_config()?;
            let transcript = Transcript::load_from_file(transcript)?;
            let connector = ScriptedConnector::from_transcript(transcript);
            let report = lsfcheck::run_scenario(&connector, &config, scenario).await;
            finish(&report)
        }
        Command::Run {
            scenario,
            validate_env,
        } => {
            if validate_env {
                let vars = std::env::vars().collect();
                lsfcheck::validate_required_env(&vars)
                    .wrap_err("required environment is incomplete")?;
            }
            let config = cli.load_config()?;
            let connector = SshConnector::new(config.ssh.clone());
            let report = lsfcheck::run_scenario(&connector, &config, scenario).await;
            finish(&report)
        }
        Command::Nodes => {
            let config = cli.load_config()?;
            let master = connect_master(&config).await?;
            for ip in lsfcheck::discovery::discover_dynamic_nodes(&master).await? {
                println!("{ip}");
            }
            master.into_inner().close().await?;
            Ok(())
        }
        Command::Job {
            ref command,
            ref size,
            ref owner,
        } => {
            let config = cli.load_config()?;
            let command = command.clone().unwrap_or_else(|| {
                poller::job_command(&config.expected.zone, JobSize::parse_lenient(size))
            });
            let owner = owner.as_deref().unwrap_or(&config.expected.job_owner);
            let master = connect_master(&config).await?;
            let outcome = poller::run_job(&master, &command, owner, &config.timing).await?;
            println!(
                "job {} done after {} polls ({:?})",
                outcome.job_id, outcome.polls, outcome.elapsed
            );
            master.into_inner().close().await?;
            Ok(())
        }
        Command::WaitDrain => {
            let config = cli.load_config()?;
            let master = connect_master(&config).await?;
            poller::wait_for_drain(&master, &config.timing).await?;
            println!("all dynamic compute nodes have disappeared");
            master.into_inner().close().await?;
            Ok(())
        }
    }
}

fn init_tracing(verbose: &clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>) {
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over -v/-q when it is set
    let level = verbose.log_level_filter().to_string().to_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lsfcheck={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn connect_master(config: &Config) -> eyre::Result<Retrying<lsfcheck::executor::SshSession>> {
    let ip = config.master_ip()?;
    let session = SshConnector::new(config.ssh.clone())
        .connect(ip, None)
        .await
        .wrap_err_with(|| format!("failed to connect to the master {ip}"))?;
    Ok(Retrying::new(session, config.retry))
}

fn read_json(file: &std::path::Path) -> eyre::Result<serde_json::Value> {
    let content =
        std::fs::read_to_string(file).wrap_err_with(|| format!("failed to read {file:?}"))?;
    serde_json::from_str(&content).wrap_err_with(|| format!("{file:?} is not valid JSON"))
}

fn finish(report: &Report) -> eyre::Result<()> {
    print!("{}", report.summary());
    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(clap::Parser, Debug)]
#[command(version, about = "Verify a provisioned LSF cluster over SSH", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    #[arg(
        long,
        global = true,
        help = "Config file. Defaults to config.toml in the user config directory."
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "SSH_FILE_PATH", help = "Private key used for every SSH session.")]
    identity_file: Option<PathBuf>,

    #[arg(long, global = true, env = "CLUSTER_ID")]
    cluster_id: Option<String>,

    #[arg(long, global = true, env = "ZONE")]
    zone: Option<String>,

    #[arg(long, global = true, env = "RESERVATION_ID")]
    reservation_id: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Config file (when there is one) with command line and environment
    /// values layered on top.
    fn load_config(&self) -> eyre::Result<Config> {
        let path = self.config.clone().or_else(Config::default_path);
        let mut config = match path {
            Some(p) if p.exists() => Config::load_from_file(&p)?,
            Some(p) if self.config.is_some() => eyre::bail!("config file {p:?} does not exist"),
            _ => Config::default(),
        };

        if let Some(key) = &self.identity_file {
            config.ssh.identity_file = Some(key.clone());
        }
        if let Some(v) = &self.cluster_id {
            config.expected.cluster_id = v.clone();
        }
        if let Some(v) = &self.zone {
            config.expected.zone = v.clone();
        }
        if let Some(v) = &self.reservation_id {
            config.expected.reservation_id = v.clone();
        }
        tracing::debug!(?config, "effective configuration");
        Ok(config)
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    #[clap(about = "Run a verification scenario: basic, full, app-center or ldap")]
    Run {
        scenario: Scenario,
        #[arg(
            long,
            help = "Fail early unless SSH_FILE_PATH, SSH_KEY, CLUSTER_ID, ZONE and RESERVATION_ID are set."
        )]
        validate_env: bool,
    },
    #[clap(about = "Print the IPs of the dynamic compute nodes that are up")]
    Nodes,
    #[clap(about = "Submit a job on the master and wait until it is done")]
    Job {
        #[arg(help = "bsub command to submit. Defaults to the canned sleep job for the zone.")]
        command: Option<String>,
        #[arg(long, default_value = "low", help = "Memory class of the canned job: low, med or high.")]
        size: String,
        #[arg(long, help = "User the job runs as. Defaults to the configured job owner.")]
        owner: Option<String>,
    },
    #[clap(about = "Wait until every dynamic compute node has disappeared")]
    WaitDrain,
    #[clap(about = "Validate the provisioning outputs JSON")]
    CheckOutputs {
        file: PathBuf,
        #[arg(long)]
        app_center: bool,
        #[arg(long)]
        ldap: bool,
    },
    #[clap(about = "Write a default config file")]
    InitConfig {
        path: Option<PathBuf>,
        #[arg(
            long,
            help = "Provisioning variables JSON to fill the expected topology from."
        )]
        from_vars: Option<PathBuf>,
    },
    #[clap(about = "Run a scenario against a recorded transcript instead of a live cluster")]
    Replay {
        transcript: PathBuf,
        scenario: Scenario,
    },
}
