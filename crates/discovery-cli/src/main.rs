//! `discovery` - operate on encrypted discovery profiles in a local directory

mod settings;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use discovery_engine::prelude::*;
use discovery_engine::{Client, ClientStatus, SectionUpdate};
use discovery_vault::{DirectoryStore, SessionKey};
use settings::{Settings, DEFAULT_DATA_DIR};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const KEY_ENV: &str = "DISCOVERY_SESSION_KEY";

fn id_arg() -> Arg {
    Arg::new("id").long("id").required(true).help("Client id")
}

fn section_arg() -> Arg {
    Arg::new("section")
        .long("section")
        .required(true)
        .help("Section wire name, e.g. basicContext")
}

fn cli() -> Command {
    Command::new("discovery")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect and edit encrypted discovery profiles")
        .subcommand_required(true)
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .default_value(DEFAULT_DATA_DIR)
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding encrypted blobs"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with data_dir and an [engine] table"),
        )
        .arg(
            Arg::new("tenant")
                .long("tenant")
                .global(true)
                .help("Client id to act on; omit for the consumer profile"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(Command::new("keygen").about("Print a new hex session key"))
        .subcommand(Command::new("show").about("Print the profile and section progress"))
        .subcommand(
            Command::new("set")
                .about("Merge a JSON object into one section")
                .arg(section_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .required(true)
                        .help("Patch object, e.g. '{\"firstName\":\"Jo\"}'"),
                ),
        )
        .subcommand(
            Command::new("invalidate")
                .about("Reset every pipeline step after the given one")
                .arg(section_arg())
                .arg(Arg::new("step").long("step").required(true)),
        )
        .subcommand(
            Command::new("complete-step")
                .about("Mark a pipeline step complete")
                .arg(section_arg())
                .arg(Arg::new("step").long("step").required(true)),
        )
        .subcommand(
            Command::new("complete-section")
                .about("Mark a pipeline section complete")
                .arg(section_arg()),
        )
        .subcommand(
            Command::new("status")
                .about("Move the profile status forward")
                .arg(
                    Arg::new("value")
                        .long("value")
                        .required(true)
                        .value_parser(["not_started", "in_progress", "needs_review", "complete"]),
                ),
        )
        .subcommand(
            Command::new("notes")
                .about("Replace the advisor notes")
                .arg(Arg::new("text").long("text").required(true)),
        )
        .subcommand(
            Command::new("clients")
                .about("Manage the advisor's client registry")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list").arg(
                        Arg::new("all")
                            .long("all")
                            .action(ArgAction::SetTrue)
                            .help("Include archived clients"),
                    ),
                )
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("email").long("email"))
                        .arg(Arg::new("phone").long("phone"))
                        .arg(Arg::new("id").long("id").help("Explicit client id")),
                )
                .subcommand(Command::new("archive").arg(id_arg()))
                .subcommand(Command::new("restore").arg(id_arg()))
                .subcommand(
                    Command::new("delete")
                        .about("Remove a client and purge their stored profile")
                        .arg(id_arg()),
                )
                .subcommand(
                    Command::new("sync")
                        .about("Refresh cached progress from the client's profile")
                        .arg(id_arg()),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
        }))
        .init();
}

fn session_key() -> Result<SessionKey> {
    let raw = std::env::var(KEY_ENV)
        .with_context(|| format!("{KEY_ENV} is not set; generate one with `discovery keygen`"))?;
    SessionKey::from_hex(raw.trim()).with_context(|| format!("{KEY_ENV} is not a valid key"))
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.get_one::<String>(name).map_or("", String::as_str)
}

fn parse_section(args: &ArgMatches) -> Result<SectionName> {
    Ok(required(args, "section").parse()?)
}

fn print_update(update: &SectionUpdate) {
    println!("applied: {}", update.applied.join(", "));
    if !update.dropped.is_empty() {
        println!("dropped: {}", update.dropped.join(", "));
    }
    if !update.stripped.is_empty() {
        println!("stripped: {}", update.stripped.join(", "));
    }
    if !update.healed.is_empty() {
        println!("reset out-of-order steps: {}", update.healed.join(", "));
    }
}

fn status_label(status: ClientStatus) -> &'static str {
    match status {
        ClientStatus::Pending => "pending",
        ClientStatus::Active => "active",
        ClientStatus::Completed => "completed",
        ClientStatus::Archived => "archived",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    if let Some(("keygen", _)) = matches.subcommand() {
        println!("{}", SessionKey::generate().to_hex());
        return Ok(());
    }

    let settings = Settings::resolve(&matches)?;
    let key = session_key()?;
    let backend = DirectoryStore::open(&settings.data_dir)
        .await
        .with_context(|| format!("cannot open {}", settings.data_dir.display()))?;
    let mut store = ProfileStore::new(backend, &key, &settings.engine)?;

    if let Some(("clients", args)) = matches.subcommand() {
        return run_clients(&mut store, &settings, args).await;
    }

    let tenant = matches
        .get_one::<String>("tenant")
        .map(|id| Tenant::client(id.as_str()))
        .unwrap_or_default();
    let outcome = store.switch_tenant(tenant).await?;
    tracing::debug!(source = ?outcome.source, "profile ready");

    match matches.subcommand() {
        Some(("show", _)) => {
            let Some(profile) = store.profile() else {
                bail!("no profile resident");
            };
            println!("{}", serde_json::to_string_pretty(profile)?);
            for (section, progress) in profile.progress_by_section() {
                println!("{section:>20}: {:>3.0}%", progress * 100.0);
            }
            return Ok(());
        }
        Some(("set", args)) => {
            let section = parse_section(args)?;
            let patch: serde_json::Value =
                serde_json::from_str(required(args, "json")).context("--json is not valid JSON")?;
            let update = store.update_section(section, patch)?;
            print_update(&update);
        }
        Some(("invalidate", args)) => {
            let section = parse_section(args)?;
            let reset = store.invalidate_from(section, required(args, "step"))?;
            println!("reset: {}", reset.join(", "));
        }
        Some(("complete-step", args)) => {
            let section = parse_section(args)?;
            store.complete_step(section, required(args, "step"))?;
        }
        Some(("complete-section", args)) => {
            store.complete_section(parse_section(args)?)?;
        }
        Some(("status", args)) => {
            let status: ProfileStatus =
                serde_json::from_value(serde_json::Value::String(required(args, "value").to_string()))?;
            store.update_status(status)?;
        }
        Some(("notes", args)) => {
            store.update_notes(required(args, "text"))?;
        }
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("no command given"),
    }

    store.persist().await?;
    Ok(())
}

async fn run_clients(
    store: &mut ProfileStore<DirectoryStore>,
    settings: &Settings,
    args: &ArgMatches,
) -> Result<()> {
    let registry_key = settings.engine.registry_storage_key()?;
    let mut registry = ClientRegistry::load(store.storage(), &registry_key).await?;

    match args.subcommand() {
        Some(("list", list)) => {
            let clients: Vec<_> = if list.get_flag("all") {
                registry.all_clients().collect()
            } else {
                registry.clients().collect()
            };
            for client in clients {
                println!(
                    "{}\t{}\t{}\t{:.0}%",
                    client.id,
                    client.name,
                    status_label(client.status),
                    client.profile_completion() * 100.0
                );
            }
            return Ok(());
        }
        Some(("add", add)) => {
            let mut new = NewClient::new(required(add, "name"));
            if let Some(email) = add.get_one::<String>("email") {
                new = new.with_email(email.as_str());
            }
            if let Some(phone) = add.get_one::<String>("phone") {
                new = new.with_phone(phone.as_str());
            }
            if let Some(id) = add.get_one::<String>("id") {
                new = new.with_id(id.as_str());
            }
            let id = registry.add_client(new)?;
            println!("{id}");
        }
        Some(("archive", target)) => {
            registry.archive_client(&ClientId::new(required(target, "id")))?;
        }
        Some(("restore", target)) => {
            registry.restore_client(&ClientId::new(required(target, "id")))?;
        }
        Some(("delete", target)) => {
            let id = ClientId::new(required(target, "id"));
            registry.delete_client(&id)?;
            store.purge_tenant(&Tenant::Client(id)).await?;
        }
        Some(("sync", target)) => {
            let id = ClientId::new(required(target, "id"));
            if registry.get(&id).is_none() {
                bail!("client not found: {id}");
            }
            store.switch_tenant(Tenant::Client(id.clone())).await?;
            let Some(profile) = store.profile() else {
                bail!("no profile resident for {id}");
            };
            registry.sync_from_profile(&id, profile)?;
            let completion = registry.get(&id).map_or(0.0, Client::profile_completion);
            println!("{id}\t{:.0}%", completion * 100.0);
        }
        Some((other, _)) => bail!("unknown clients command: {other}"),
        None => bail!("no clients command given"),
    }

    registry.save(store.storage(), &registry_key).await?;
    Ok(())
}
