//! threadboard CLI — REST control and a live watch mode for the
//! sender/receiver thread dashboard backend.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sync::api::ApiClient;
use sync::{ConnectionState, RunState, Snapshot, SyncConfig, Synchronizer, ThreadKind};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Sync(#[from] sync::SyncError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "threadboard", about = "Thread dashboard API and live-watch CLI")]
struct Cli {
    /// Backend origin.
    #[arg(long, env = "THREADBOARD_ORIGIN", default_value = "http://127.0.0.1:8080")]
    origin: String,

    /// Realtime channel endpoint; derived from the origin when omitted.
    #[arg(long, env = "THREADBOARD_CHANNEL")]
    channel: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Thread collection operations.
    Thread(ThreadCommand),
    /// Message queue operations.
    Queue(QueueCommand),
    /// Run a live synchronizer session and print state as it changes.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct ThreadCommand {
    #[command(subcommand)]
    command: ThreadSubcommand,
}

#[derive(Subcommand, Debug)]
enum ThreadSubcommand {
    /// List threads of one kind, or both when no kind is given.
    List {
        #[arg(value_enum)]
        kind: Option<KindArg>,
    },
    /// Kick off background processing for both thread kinds.
    StartLifecycles,
    /// Create sender and receiver threads.
    Create {
        #[arg(long, default_value_t = 5)]
        senders: u32,
        #[arg(long, default_value_t = 5)]
        receivers: u32,
    },
    /// Update one thread's run state.
    SetState {
        #[arg(value_enum)]
        kind: KindArg,
        id: String,
        #[arg(value_enum)]
        state: StateArg,
    },
    /// Update one thread's priority (1-10).
    SetPriority {
        #[arg(value_enum)]
        kind: KindArg,
        id: String,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=10))]
        priority: u8,
    },
    /// Delete one thread.
    Delete {
        #[arg(value_enum)]
        kind: KindArg,
        id: String,
    },
    /// Delete every thread of one kind.
    DeleteAll {
        #[arg(value_enum)]
        kind: KindArg,
    },
}

#[derive(Args, Debug)]
struct QueueCommand {
    #[command(subcommand)]
    command: QueueSubcommand,
}

#[derive(Subcommand, Debug)]
enum QueueSubcommand {
    /// Fetch one queue page.
    Page {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 14)]
        size: u32,
    },
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Poll interval in milliseconds while degraded.
    #[arg(long, default_value_t = 5000)]
    poll_ms: u64,

    /// Queue page size for the session.
    #[arg(long, default_value_t = 14)]
    page_size: u32,

    /// Queue page to watch.
    #[arg(long, default_value_t = 0)]
    page: u32,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum KindArg {
    Sender,
    Receiver,
}

impl From<KindArg> for ThreadKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Sender => Self::Sender,
            KindArg::Receiver => Self::Receiver,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum StateArg {
    Running,
    Stopped,
}

impl From<StateArg> for RunState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Running => Self::Running,
            StateArg::Stopped => Self::Stopped,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let api = ApiClient::new(&cli.origin);

    match cli.command {
        Command::Thread(thread) => run_thread(&api, thread).await,
        Command::Queue(queue) => run_queue(&api, queue).await,
        Command::Watch(args) => {
            let config = build_config(&cli.origin, cli.channel.as_deref(), &args)?;
            run_watch(config, args.page).await;
            Ok(())
        }
    }
}

fn build_config(
    origin: &str,
    channel: Option<&str>,
    args: &WatchArgs,
) -> Result<SyncConfig, CliError> {
    let mut config = SyncConfig::for_origin(origin)?;
    if let Some(channel) = channel {
        config.realtime_endpoint = channel.to_owned();
    }
    config.poll_interval = Duration::from_millis(args.poll_ms);
    config.page_size = args.page_size;
    Ok(config)
}

async fn run_thread(api: &ApiClient, thread: ThreadCommand) -> Result<(), CliError> {
    match thread.command {
        ThreadSubcommand::List { kind: Some(kind) } => {
            let threads = match ThreadKind::from(kind) {
                ThreadKind::Sender => api.fetch_sender_threads().await?,
                ThreadKind::Receiver => api.fetch_receiver_threads().await?,
            };
            print_json(&serde_json::to_value(threads)?)
        }
        ThreadSubcommand::List { kind: None } => {
            let (senders, receivers) = tokio::try_join!(
                api.fetch_sender_threads(),
                api.fetch_receiver_threads(),
            )?;
            print_json(&serde_json::json!({ "senders": senders, "receivers": receivers }))
        }
        ThreadSubcommand::StartLifecycles => {
            api.start_lifecycles().await?;
            println!("lifecycles started");
            Ok(())
        }
        ThreadSubcommand::Create { senders, receivers } => {
            api.create_threads(senders, receivers).await?;
            println!("created {senders} sender and {receivers} receiver threads");
            Ok(())
        }
        ThreadSubcommand::SetState { kind, id, state } => {
            api.update_thread_state(kind.into(), &id, state.into()).await?;
            println!("ok");
            Ok(())
        }
        ThreadSubcommand::SetPriority { kind, id, priority } => {
            api.update_thread_priority(kind.into(), &id, priority).await?;
            println!("ok");
            Ok(())
        }
        ThreadSubcommand::Delete { kind, id } => {
            api.delete_thread(kind.into(), &id).await?;
            println!("ok");
            Ok(())
        }
        ThreadSubcommand::DeleteAll { kind } => {
            api.delete_all_threads(kind.into()).await?;
            println!("ok");
            Ok(())
        }
    }
}

async fn run_queue(api: &ApiClient, queue: QueueCommand) -> Result<(), CliError> {
    match queue.command {
        QueueSubcommand::Page { page, size } => {
            let queue_page = api.fetch_queue_page(page, size).await?;
            print_json(&serde_json::to_value(queue_page)?)
        }
    }
}

async fn run_watch(config: SyncConfig, page: u32) {
    let synchronizer = Synchronizer::new(config);
    let mut updates = synchronizer.subscribe();
    synchronizer.initialize().await;
    if page > 0 {
        synchronizer.set_page(page).await;
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_snapshot(&updates.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                synchronizer.dispose();
                println!("disposed");
                break;
            }
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    let connection = match snapshot.connection {
        ConnectionState::Connecting => "connecting",
        ConnectionState::Live => "live",
        ConnectionState::Degraded => "polling",
    };
    let pages = if snapshot.total_pages > 0 {
        format!("{}/{}", snapshot.current_page + 1, snapshot.total_pages)
    } else {
        "-".to_owned()
    };

    match &snapshot.error {
        Some(error) => println!(
            "[{connection}] senders={} receivers={} queue page {pages} ({} messages) error: {error}",
            snapshot.senders.len(),
            snapshot.receivers.len(),
            snapshot.messages.len(),
        ),
        None => println!(
            "[{connection}] senders={} receivers={} queue page {pages} ({} messages)",
            snapshot.senders.len(),
            snapshot.receivers.len(),
            snapshot.messages.len(),
        ),
    }
}
