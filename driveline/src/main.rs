#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use driveconfig::{DriveConfig, FileTokenStore};
use drivesafe::types::{DrivingRecordDto, LoginBinding, LoginRequest};
use drivesafe::{bearer, ClientFactory, DriveSafeClient, Error as DriveSafeError, TokenStore};
use std::fmt::Write;
use std::process;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;
mod display;
mod upload;

#[derive(Parser)]
#[command(name = "driveline", about = "A CLI for the DriveSafe backend")]
struct Cli {
    /// Override the configured backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Log requests and responses to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the backend root endpoint
    Health,
    /// Log in and store the returned token
    Login {
        /// Login contract: members, json or form
        #[arg(long)]
        binding: Option<LoginBinding>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Show whether a token is stored
    Whoami,
    /// List members
    Members,
    /// List fatigue records of a user
    Records {
        #[arg(long)]
        user_id: String,
        /// Lower bound, Unix milliseconds
        #[arg(long)]
        start_ms: Option<i64>,
        /// Upper bound, Unix milliseconds
        #[arg(long)]
        end_ms: Option<i64>,
    },
    /// Upload one record or an array of records from JSON
    Upload {
        /// Path to JSON file (use - for stdin)
        file: String,
    },
    /// List driving records of a member
    DrivingRecords {
        #[arg(long)]
        member_id: i64,
    },
    /// Store a driving record
    RecordAdd {
        #[arg(long)]
        member_id: i64,
        /// Fatigue score, 0 to 100
        #[arg(long)]
        score: f64,
        #[arg(long)]
        device: Option<String>,
        /// Fatigue level label; derived from the score when omitted
        #[arg(long)]
        level: Option<String>,
    },
    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        /// The shell to generate completions for
        shell: Shell,
    },
}

/// Composition root: one factory and one token store per process.
struct App {
    config: DriveConfig,
    base_url: String,
    store: Arc<FileTokenStore>,
    factory: ClientFactory,
}

impl App {
    fn load(base_url: Option<String>) -> Result<Self> {
        let config = if base_url.is_some() {
            DriveConfig::load().with_context(|| "Failed to load drivesafe config")?
        } else {
            DriveConfig::load_or_onboard().with_context(|| "Failed to load drivesafe config")?
        };
        let base_url = match base_url {
            Some(url) => url,
            None => config
                .base_url()
                .with_context(|| "Missing base_url in drivesafe config")?,
        };
        tracing::debug!(base_url = %base_url, "using backend");
        let store = Arc::new(FileTokenStore::open().with_context(|| "Failed to open token store")?);
        let shared: Arc<dyn TokenStore> = store.clone();
        let factory = ClientFactory::new(shared).with_policy(config.transport_policy());
        Ok(Self {
            config,
            base_url,
            store,
            factory,
        })
    }

    fn plain(&self) -> Result<Arc<DriveSafeClient>> {
        Ok(self.factory.plain(&self.base_url)?)
    }

    fn authenticated(&self) -> Result<Arc<DriveSafeClient>> {
        Ok(self.factory.authenticated(&self.base_url)?)
    }

    /// Explicit `Authorization` value for the record endpoints.
    fn authorization(&self) -> Result<String> {
        self.store
            .get()
            .map(|token| bearer(&token))
            .ok_or_else(|| anyhow::anyhow!("Not logged in; run `driveline login` first"))
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,drivesafe=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn format_http_error(status: u16, reason: &str, body: &str) -> String {
    let reason = if reason.is_empty() {
        "HTTP error"
    } else {
        reason
    };
    let mut output = format!("DriveSafe API error ({status} {reason}):");

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|v| v.as_str()) {
            let _ = write!(output, "\n  - {}", detail.replace('\n', " "));
            return output;
        }

        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            output.push('\n');
            output.push_str(&pretty);
            return output;
        }
    }

    if !body.trim().is_empty() {
        output.push('\n');
        output.push_str(body);
    }

    output
}

fn handle_error(err: &anyhow::Error) -> ! {
    if let Some(api_err) = err.downcast_ref::<DriveSafeError>() {
        match api_err {
            DriveSafeError::HttpStatus {
                status,
                reason,
                body,
            } => eprintln!("{}", format_http_error(*status, reason, body)),
            e if e.is_transport() => eprintln!("Network unavailable: {e}"),
            e if e.is_decode() => eprintln!("Unexpected server response: {e}"),
            e => eprintln!("{e}"),
        }
        process::exit(1);
    }

    eprintln!("{err:#}");
    process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        handle_error(&err);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "driveline", &mut std::io::stdout());
        return Ok(());
    }

    let app = App::load(cli.base_url)?;
    match cli.command {
        Command::Completions { .. } => {}
        Command::Health => {
            let root = app.plain()?.root().await?;
            println!("{}", display::format_root(&root));
        }
        Command::Login {
            binding,
            email,
            username,
            password,
        } => {
            let binding = binding.unwrap_or(app.config.login);
            let request = LoginRequest {
                email,
                username,
                password: Some(password),
            };
            let response = app.plain()?.login(binding, &request).await?;
            let Some(token) = response.token() else {
                anyhow::bail!("Invalid credentials: the server did not return a token");
            };
            app.store.save(token);
            match (response.account.as_deref(), response.user_id) {
                (Some(account), Some(id)) => println!("Logged in as {account} (id {id})"),
                (Some(account), None) => println!("Logged in as {account}"),
                (None, Some(id)) => println!("Logged in (id {id})"),
                (None, None) => println!("Logged in"),
            }
        }
        Command::Logout => {
            app.store.clear();
            println!("Logged out");
        }
        Command::Whoami => match app.store.get() {
            Some(_) => println!("Token stored at {}", app.store.path().display()),
            None => println!("Not logged in"),
        },
        Command::Members => {
            let members = app.authenticated()?.get_members().await?;
            for member in members {
                println!("{}", display::format_member(&member));
            }
        }
        Command::Records {
            user_id,
            start_ms,
            end_ms,
        } => {
            let authorization = app.authorization()?;
            let records = app
                .plain()?
                .get_records(Some(&authorization), Some(&user_id), start_ms, end_ms)
                .await?;
            for record in records {
                println!("{}", display::format_record(&record));
            }
        }
        Command::Upload { file } => {
            let authorization = app.authorization()?;
            let payload = upload::read_json_input(&file)?;
            let client = app.plain()?;
            match upload::parse_upload(&payload)? {
                upload::Upload::One(record) => {
                    let stored = client.post_record(Some(&authorization), &record).await?;
                    println!("{}", display::format_record(&stored));
                }
                upload::Upload::Many(records) => {
                    let stored = client.post_records(Some(&authorization), &records).await?;
                    println!("Uploaded {} records.", stored.len());
                }
            }
        }
        Command::DrivingRecords { member_id } => {
            let records = app.authenticated()?.get_driving_records(member_id).await?;
            for record in records {
                println!("{}", display::format_driving_record(&record));
            }
        }
        Command::RecordAdd {
            member_id,
            score,
            device,
            level,
        } => {
            let recorded_at =
                i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000)
                    .with_context(|| "System clock out of range")?;
            let mut record = DrivingRecordDto::new(member_id, score, recorded_at);
            let derived = record.fatigue_level().to_string();
            record.device = device;
            record.fatigue_level = Some(level.unwrap_or(derived));
            let stored = app.authenticated()?.post_driving_record(&record).await?;
            println!("{}", display::format_driving_record(&stored));
        }
    }

    Ok(())
}
