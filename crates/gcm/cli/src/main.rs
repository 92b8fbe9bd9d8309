//! GCM CLI - register Android devices and push notifications to them.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::WrapErr as _;
use gcm_core::{Config, DeviceRegistration, Payload, SendOptions};
use gcm_push::{Dispatcher, FcmDispatcher, PushService};
use gcm_storage::{DeviceStore, SqliteStorage};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gcm")]
#[command(about = "Push notifications to Android devices through FCM", long_about = None)]
struct Cli {
    /// TOML config file; configuration is read from the environment when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a device (reactivates it if already known)
    Register {
        registration_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        device_id: Option<String>,
    },

    /// List registered devices
    List {
        /// Include inactive devices
        #[arg(long)]
        all: bool,
    },

    /// Mark a device inactive
    Deactivate { registration_id: String },

    /// Send a notification to one registration id
    Send {
        registration_id: String,
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Send a notification to many registration ids
    SendBulk {
        /// Registration ids to notify
        #[arg(required_unless_present = "active", conflicts_with = "active")]
        registration_ids: Vec<String>,
        /// Notify every active device instead
        #[arg(long)]
        active: bool,
        #[command(flatten)]
        message: MessageArgs,
    },
}

#[derive(Args)]
struct MessageArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    message: Option<String>,
    /// Extra data entry, KEY=VALUE (repeatable)
    #[arg(long = "data", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    data: Vec<(String, Value)>,
    /// Extra request option, KEY=VALUE with a JSON or plain string value (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    options: Vec<(String, Value)>,
}

impl MessageArgs {
    fn payload(&self) -> Payload {
        let mut payload = Payload::new();
        if let Some(title) = &self.title {
            payload.insert("title", title.as_str());
        }
        if let Some(message) = &self.message {
            payload.insert("message", message.as_str());
        }
        for (key, value) in &self.data {
            payload.insert(key.as_str(), value.clone());
        }
        payload
    }

    fn options(&self) -> SendOptions {
        let mut options = SendOptions::new();
        for (key, value) in &self.options {
            options.insert(key.as_str(), value.clone());
        }
        options
    }
}

/// Parse `KEY=VALUE`, reading the value as JSON when it parses and as a plain
/// string otherwise.
fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;

    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn load_config(path: Option<&PathBuf>) -> color_eyre::eyre::Result<Config> {
    let config = match path {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    };
    config.wrap_err("failed to load configuration")
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let storage =
        SqliteStorage::new(&config.database.url).wrap_err("failed to initialize storage")?;
    storage
        .run_migrations()
        .wrap_err("failed to run migrations")?;

    match cli.command {
        Commands::Register {
            registration_id,
            name,
            device_id,
        } => {
            let registration = DeviceRegistration {
                registration_id,
                name,
                device_id,
            };
            let device = storage.register(&registration)?;
            println!("{}", serde_json::to_string_pretty(&device)?);
        }
        Commands::List { all } => {
            for device in storage.list(!all)? {
                println!(
                    "{:>5}  {:<8}  {}  {}",
                    device.id,
                    if device.active { "active" } else { "inactive" },
                    device.registration_id,
                    device.name.as_deref().unwrap_or("-"),
                );
            }
        }
        Commands::Deactivate { registration_id } => {
            let updated = storage.deactivate(&registration_id)?;
            if updated == 0 {
                color_eyre::eyre::bail!("no device with registration id {}", registration_id);
            }
            println!("deactivated {updated} device(s)");
        }
        Commands::Send {
            registration_id,
            message,
        } => {
            let dispatcher = FcmDispatcher::from_config(config, storage)?;
            let raw = dispatcher
                .send_single(&registration_id, &message.payload(), &message.options())
                .await?;
            println!("{raw}");
        }
        Commands::SendBulk {
            registration_ids,
            active,
            message,
        } => {
            let dispatcher = FcmDispatcher::from_config(config, storage.clone())?;
            let payload = message.payload();
            let options = message.options();

            let results = if active {
                PushService::new(storage, dispatcher)
                    .send_to_active(&payload, &options)
                    .await?
            } else {
                dispatcher
                    .send_bulk(&registration_ids, &payload, &options)
                    .await?
            };

            for (index, chunk) in results.iter().enumerate() {
                for raw in chunk {
                    println!("[chunk {index}] {raw}");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("priority=high").unwrap(),
            ("priority".to_string(), Value::String("high".into()))
        );
        assert_eq!(
            parse_key_value("time_to_live=3600").unwrap(),
            ("time_to_live".to_string(), Value::from(3600))
        );
        assert_eq!(
            parse_key_value("delay_while_idle=true").unwrap(),
            ("delay_while_idle".to_string(), Value::Bool(true))
        );
        assert_eq!(
            parse_key_value("url=https://example.com/?a=b").unwrap().1,
            Value::String("https://example.com/?a=b".into())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_message_args() {
        let cli = Cli::parse_from([
            "gcm",
            "send",
            "reg-1",
            "--title",
            "Hi",
            "--message",
            "Body",
            "--data",
            "badge=2",
            "--option",
            "dry_run=true",
        ]);

        let Commands::Send {
            registration_id,
            message,
        } = cli.command
        else {
            panic!("expected send");
        };

        assert_eq!(registration_id, "reg-1");
        let payload = message.payload();
        assert_eq!(payload.title(), Some("Hi"));
        assert_eq!(payload.get("badge"), Some("2"));
        assert_eq!(
            message.options().normalized().get("dry_run"),
            Some(&Value::String("1".into()))
        );
    }

    #[test]
    fn test_send_bulk_requires_ids_or_active() {
        assert!(Cli::try_parse_from(["gcm", "send-bulk"]).is_err());
        assert!(Cli::try_parse_from(["gcm", "send-bulk", "--active"]).is_ok());
        assert!(Cli::try_parse_from(["gcm", "send-bulk", "a", "--active"]).is_err());
    }
}
