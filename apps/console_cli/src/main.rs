use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use console_client::{ConsoleClient, DownloadedResult, SessionContext};
use console_types::domain::{
    ChassisParams, Credentials, LicenseKey, ResultFileType, ScriptType, ScriptUpload,
    CURRENT_INSTALLATION_SET,
};
use session_cache::SessionCache;
use tracing::info;
use url::Url;

mod config;

#[derive(Parser, Debug)]
#[command(about = "Command-line client for the provisioning console API")]
struct Args {
    /// Anti-forgery token attached to mutating requests.
    #[arg(long, global = true)]
    csrf_token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether the current session is authenticated.
    Status,
    /// Log in with username and password.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log out and wipe the local session cache.
    Logout,
    /// Manage license keys.
    LicenseKeys {
        #[command(subcommand)]
        command: LicenseKeyCommand,
    },
    /// Manage commissioning and testing scripts.
    Scripts {
        #[command(subcommand)]
        command: ScriptCommand,
    },
    /// Download a machine's script results.
    Results {
        #[arg(long)]
        system_id: String,
        #[arg(long, default_value = CURRENT_INSTALLATION_SET)]
        script_set_id: String,
        #[arg(long)]
        filters: Option<String>,
        /// Requested file type: "txt" or "tar.xz".
        #[arg(long)]
        filetype: Option<String>,
        /// Where to write an archive download.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Enlist a chassis of machines; parameters are driver-specific
    /// key=value pairs.
    AddChassis {
        #[arg(value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
}

#[derive(Subcommand, Debug)]
enum LicenseKeyCommand {
    List,
    Create {
        #[arg(long)]
        osystem: String,
        #[arg(long)]
        distro_series: String,
        #[arg(long)]
        license_key: String,
    },
    Update {
        #[arg(long)]
        osystem: String,
        #[arg(long)]
        distro_series: String,
        #[arg(long)]
        license_key: String,
    },
    Delete {
        #[arg(long)]
        osystem: String,
        #[arg(long)]
        distro_series: String,
    },
}

#[derive(Subcommand, Debug)]
enum ScriptCommand {
    List,
    Upload {
        #[arg(long)]
        name: String,
        /// Script kind: "commissioning" or "testing".
        #[arg(long)]
        script_type: String,
        /// Path of the script file to upload.
        #[arg(long)]
        path: PathBuf,
    },
    Delete {
        #[arg(long)]
        name: String,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    Ok((key.to_string(), value.to_string()))
}

fn parse_filetype(raw: &str) -> Result<ResultFileType> {
    match raw {
        "txt" => Ok(ResultFileType::Txt),
        "tar.xz" => Ok(ResultFileType::TarXz),
        other => bail!("unknown filetype '{other}' (expected 'txt' or 'tar.xz')"),
    }
}

fn parse_script_type(raw: &str) -> Result<ScriptType> {
    match raw {
        "commissioning" => Ok(ScriptType::Commissioning),
        "testing" => Ok(ScriptType::Testing),
        other => bail!("unknown script type '{other}' (expected 'commissioning' or 'testing')"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = config::load_settings();

    let base = Url::parse(&settings.api_root)
        .map_err(|err| anyhow!("invalid api_root '{}': {err}", settings.api_root))?;
    let cache = SessionCache::new(&settings.session_db).await?;
    let client = ConsoleClient::with_session_state(base, Arc::new(cache));

    let mut events = client.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(kind = %event.kind, error = event.error, "lifecycle");
        }
    });

    let session = match args.csrf_token {
        Some(token) => SessionContext::with_csrf_token(token),
        None => SessionContext::anonymous(),
    };

    match args.command {
        Command::Status => {
            let status = client.check_authenticated().await?;
            print_json(&status)?;
        }
        Command::Login { username, password } => {
            client.login(&Credentials { username, password }).await?;
            println!("logged in");
        }
        Command::Logout => {
            client.logout(&session).await?;
            println!("logged out");
        }
        Command::LicenseKeys { command } => match command {
            LicenseKeyCommand::List => {
                let keys = client.fetch_license_keys(&session).await?;
                print_json(&keys)?;
            }
            LicenseKeyCommand::Create {
                osystem,
                distro_series,
                license_key,
            } => {
                let created = client
                    .create_license_key(
                        &LicenseKey {
                            osystem,
                            distro_series,
                            license_key,
                            resource_uri: None,
                        },
                        &session,
                    )
                    .await?;
                print_json(&created)?;
            }
            LicenseKeyCommand::Update {
                osystem,
                distro_series,
                license_key,
            } => {
                let updated = client
                    .update_license_key(
                        &LicenseKey {
                            osystem,
                            distro_series,
                            license_key,
                            resource_uri: None,
                        },
                        &session,
                    )
                    .await?;
                print_json(&updated)?;
            }
            LicenseKeyCommand::Delete {
                osystem,
                distro_series,
            } => {
                client
                    .delete_license_key(&osystem, &distro_series, &session)
                    .await?;
                println!("deleted license key for {osystem}/{distro_series}");
            }
        },
        Command::Scripts { command } => match command {
            ScriptCommand::List => {
                let scripts = client.fetch_scripts(&session).await?;
                print_json(&scripts)?;
            }
            ScriptCommand::Upload {
                name,
                script_type,
                path,
            } => {
                let contents = fs::read_to_string(&path)?;
                let record = client
                    .upload_script(
                        &ScriptUpload {
                            name,
                            script_type: parse_script_type(&script_type)?,
                            contents,
                        },
                        &session,
                    )
                    .await?;
                print_json(&record)?;
            }
            ScriptCommand::Delete { name } => {
                client.delete_script(&name, &session).await?;
                println!("deleted script {name}");
            }
        },
        Command::Results {
            system_id,
            script_set_id,
            filters,
            filetype,
            output,
        } => {
            let filetype = filetype.as_deref().map(parse_filetype).transpose()?;
            let result = client
                .download_script_results(
                    &system_id,
                    &script_set_id,
                    filters.as_deref(),
                    filetype,
                    &session,
                )
                .await?;
            match result {
                DownloadedResult::Text(text) => println!("{text}"),
                DownloadedResult::Archive(bytes) => {
                    let path = output
                        .ok_or_else(|| anyhow!("--output is required for archive downloads"))?;
                    fs::write(&path, bytes)?;
                    println!("wrote archive to {}", path.display());
                }
            }
        }
        Command::AddChassis { params } => {
            let params: ChassisParams = params.into_iter().collect();
            client.add_chassis(&params, &session).await?;
            println!("chassis enlistment requested");
        }
    }

    Ok(())
}
