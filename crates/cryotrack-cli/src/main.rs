//! Command-line client for the sample inventory
//!
//! Operates on a file-backed local store and drains the sync queue
//! against a logging backend stand-in. Intended for bench-side use and
//! for inspecting state the scanner UI produced.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use cryotrack_core::resolver::Decision;
use cryotrack_core::types::{ContainerId, ContainerType, Position, SampleId, SampleType};
use cryotrack_engine::{LifecycleEngine, PlacementService, ServiceConfig, TracingAuditSink};
use cryotrack_store::{JsonFileStore, KeyValueStore};
use cryotrack_sync::{
    BackendError, SyncBackend, SyncConfig, SyncOp, SyncProcessor, SyncQueue,
};

/// Accepts every write and logs it; stands in for the remote backend
struct LoggingBackend;

#[async_trait::async_trait]
impl SyncBackend for LoggingBackend {
    async fn apply(&self, op: &SyncOp) -> Result<(), BackendError> {
        tracing::info!(kind = op.kind(), "backend write");
        Ok(())
    }
}

fn cli() -> Command {
    Command::new("cryotrack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Laboratory sample inventory client")
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .default_value(".cryotrack")
                .help("Directory holding the local store"),
        )
        .subcommand(
            Command::new("container")
                .about("Manage containers")
                .subcommand(
                    Command::new("create")
                        .about("Create a container")
                        .arg(Arg::new("name").required(true).help("Display name"))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .default_value("9x9-box")
                                .help("Layout code, e.g. 9x9-box or 7x14-rack"),
                        )
                        .arg(
                            Arg::new("sample-type")
                                .long("sample-type")
                                .default_value("DP Pools")
                                .help("Specimen kind stored in this container"),
                        ),
                )
                .subcommand(Command::new("list").about("List containers"))
                .subcommand(
                    Command::new("archive")
                        .about("Set or clear the archived flag")
                        .arg(Arg::new("id").required(true).help("Container id"))
                        .arg(
                            Arg::new("restore")
                                .long("restore")
                                .action(ArgAction::SetTrue)
                                .help("Clear the flag instead of setting it"),
                        ),
                ),
        )
        .subcommand(
            Command::new("scan")
                .about("Process one scan against a container")
                .arg(Arg::new("container").required(true).help("Container id"))
                .arg(Arg::new("id").required(true).help("Scanned sample identifier"))
                .arg(
                    Arg::new("position")
                        .long("position")
                        .help("Target position; omitted means next free"),
                )
                .arg(
                    Arg::new("user")
                        .long("user")
                        .default_value("cli")
                        .help("Operator initials for the history entry"),
                ),
        )
        .subcommand(
            Command::new("check-out")
                .about("Move a sample to the checked-out holding area")
                .arg(Arg::new("id").required(true).help("Sample identifier"))
                .arg(Arg::new("user").long("user").default_value("cli")),
        )
        .subcommand(
            Command::new("grid")
                .about("Print a container layout with disabled cells")
                .arg(
                    Arg::new("type")
                        .long("type")
                        .default_value("9x9-box")
                        .help("Layout code"),
                )
                .arg(
                    Arg::new("sample-type")
                        .long("sample-type")
                        .default_value("DP Pools"),
                ),
        )
        .subcommand(Command::new("queue").about("Show pending sync queue items"))
        .subcommand(
            Command::new("sync-run")
                .about("Drain the sync queue until interrupted")
                .arg(
                    Arg::new("max-attempts")
                        .long("max-attempts")
                        .default_value("5")
                        .value_parser(value_parser!(u32))
                        .help("Delivery attempts before an item is dropped"),
                ),
        )
}

fn open_service(data_dir: &str) -> Result<(PlacementService, Arc<SyncQueue>)> {
    let store: Arc<dyn KeyValueStore> = Arc::new(
        JsonFileStore::open(data_dir)
            .with_context(|| format!("opening store at {data_dir}"))?,
    );
    let queue = Arc::new(SyncQueue::new(Arc::clone(&store)));
    let engine = LifecycleEngine::new(store, Arc::clone(&queue), Arc::new(TracingAuditSink));
    Ok((
        PlacementService::new(engine, ServiceConfig::new()),
        queue,
    ))
}

fn layout(code: &str) -> Result<ContainerType> {
    ContainerType::preset(code)
        .with_context(|| format!("unknown layout code {code}, known: {:?}", ContainerType::known_codes()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let matches = cli().get_matches();
    let data_dir = matches
        .get_one::<String>("data-dir")
        .cloned()
        .unwrap_or_else(|| ".cryotrack".to_string());

    match matches.subcommand() {
        Some(("container", sub)) => match sub.subcommand() {
            Some(("create", args)) => {
                let (service, _) = open_service(&data_dir)?;
                let name = args.get_one::<String>("name").unwrap();
                let container_type = layout(args.get_one::<String>("type").unwrap())?;
                let sample_type =
                    SampleType::new(args.get_one::<String>("sample-type").unwrap().clone());
                let container = cryotrack_core::types::Container::new(
                    name.clone(),
                    container_type,
                    sample_type,
                );
                service.engine().repo().upsert_container(&container)?;
                println!("{} {}", container.id, container.name);
            }
            Some(("list", _)) => {
                let (service, _) = open_service(&data_dir)?;
                let repo = service.engine().repo();
                for container in repo.containers()? {
                    let occupied = repo.view(&container.id)?.occupied_count();
                    let flag = if container.is_archived { " [archived]" } else { "" };
                    println!(
                        "{}  {}  {}  {} samples{}",
                        container.id,
                        container.name,
                        container.container_type.code,
                        occupied,
                        flag
                    );
                }
            }
            Some(("archive", args)) => {
                let (service, _) = open_service(&data_dir)?;
                let id = ContainerId::from_string(args.get_one::<String>("id").unwrap().clone());
                let archived = !args.get_flag("restore");
                let container = service.engine().set_archived(&id, archived, "cli")?;
                println!("{} archived={}", container.name, container.is_archived);
            }
            _ => bail!("missing container subcommand, see --help"),
        },
        Some(("scan", args)) => {
            let (service, _) = open_service(&data_dir)?;
            let container =
                ContainerId::from_string(args.get_one::<String>("container").unwrap().clone());
            let raw_id = args.get_one::<String>("id").unwrap();
            let position = args.get_one::<String>("position").map(String::as_str);
            let user = args.get_one::<String>("user").unwrap();

            let outcome = service.scan(&container, raw_id, position, user)?;
            match &outcome.decision {
                Decision::PlaceNew { position } => println!("placed at {position}"),
                Decision::MoveWithinContainer { from, to } => {
                    println!("moved {from} -> {to}");
                }
                Decision::MoveFromOtherContainer {
                    source_container,
                    source_position,
                    to,
                    requires_confirmation,
                } => {
                    if *requires_confirmation {
                        println!(
                            "needs confirmation: move from {source_container} {source_position} to {to}"
                        );
                    } else {
                        println!("relocated from {source_container} {source_position} to {to}");
                    }
                }
                Decision::Reject(reason) => println!("rejected: {reason}"),
                Decision::OverwriteRequired { occupant, position } => {
                    println!("{position} already holds {occupant}; confirm overwrite first");
                }
            }
            if let Some(next) = outcome.next_target {
                println!("next: {next}");
            }
        }
        Some(("check-out", args)) => {
            let (service, _) = open_service(&data_dir)?;
            let id = SampleId::new(args.get_one::<String>("id").unwrap());
            let user = args.get_one::<String>("user").unwrap();
            let sample = service.engine().check_out(&id, user)?;
            println!("{} checked out", sample.sample_id);
        }
        Some(("grid", args)) => {
            let (service, _) = open_service(&data_dir)?;
            let container_type = layout(args.get_one::<String>("type").unwrap())?;
            let sample_type =
                SampleType::new(args.get_one::<String>("sample-type").unwrap().clone());
            let grid = service.grid_for(&container_type, &sample_type);
            for cell in grid.cells() {
                let marker = if cell.disabled { " (disabled)" } else { "" };
                println!("{}{}", cell.position, marker);
            }
            println!("{} usable cells", grid.usable_count());
        }
        Some(("queue", _)) => {
            let (_, queue) = open_service(&data_dir)?;
            for item in queue.items()? {
                println!(
                    "{}  {}  attempts={}  {}",
                    item.id,
                    item.op.kind(),
                    item.attempts,
                    item.created_at
                );
            }
            println!("{} pending", queue.len()?);
        }
        Some(("sync-run", args)) => {
            let (_, queue) = open_service(&data_dir)?;
            let max_attempts = *args.get_one::<u32>("max-attempts").unwrap();
            let config = SyncConfig::new().with_max_attempts(max_attempts);
            let processor = Arc::new(SyncProcessor::new(
                queue,
                Arc::new(LoggingBackend),
                config,
            ));
            let handle = processor.start()?;
            tokio::signal::ctrl_c().await?;
            handle.stop().await?;
        }
        Some((other, _)) => bail!("unknown command: {other}"),
        None => {
            cli().print_help()?;
        }
    }
    Ok(())
}
