use anyhow::{Context, Result, bail};
use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tlview::config::Config;
use tlview::store::{AccountResolver, Database};
use tlview::timeline::{
    EntityId, OpenRequest, Record, ScrollEvent, ScrollTarget, SyncRequest, TimelineCategory,
    TimelineController, TimelineRequest, TimelineSurface,
};

/// Rows a terminal "screen" shows when simulating scrolling.
const VISIBLE_ROWS: usize = 10;

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tlview=debug"));

    // Try to create a log file in the config directory
    let log_file = Config::config_dir()
        .ok()
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir))
        .map(|dir| dir.join("tlview.log"))
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .ok()
        });

    if let Some(file) = log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        // Fallback to stderr if file logging fails
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_usage() {
    eprintln!(
        r#"tlview - Timeline viewer with remembered reading position

Usage: tlview [command] [options]

Commands:
    show        Show a timeline (default)
    prune       Delete old records using the [history] limits
    help        Show this help message

Options for show:
    --category C    home, mentions, favorites, direct, user, following_user, public
    --account ID    Acting account
    --user ID       Selected user for user timelines
    --search Q      Only records containing Q
    --combined      All accounts at once
    --pages N       Scroll to the bottom N times

Configuration file: ~/.config/tlview/config.toml
"#
    );
}

/// Prints what the controller asks for.
#[derive(Default)]
struct ConsoleSurface {
    scroll: Option<ScrollTarget>,
}

impl TimelineSurface for ConsoleSurface {
    fn records_changed(&mut self, records: &[Record]) {
        tracing::debug!("Window now holds {} records", records.len());
    }

    fn set_loading(&mut self, loading: bool) {
        tracing::debug!("Loading indicator {}", if loading { "on" } else { "off" });
    }

    fn scroll_to(&mut self, target: ScrollTarget) {
        self.scroll = Some(target);
    }

    fn request_sync(&mut self, request: SyncRequest) {
        match request {
            SyncRequest::FetchTimeline {
                account,
                category,
                user_id,
                all_timelines,
            } => {
                let account = account.as_deref().unwrap_or("all accounts");
                if user_id != 0 {
                    println!("sync requested: {category} of user {user_id} via {account}");
                } else {
                    println!("sync requested: {category} for {account}");
                }
                if all_timelines {
                    println!("sync requested: every timeline of {account}");
                }
            }
            SyncRequest::Search { account, query } => {
                let account = account.as_deref().unwrap_or("all accounts");
                println!("remote search requested: {query:?} via {account}");
            }
        }
    }

    fn open_record(&mut self, request: OpenRequest) {
        println!(
            "open record {} as account {}",
            request.record_id, request.account_id
        );
    }
}

#[derive(Debug, Default)]
struct ShowArgs {
    category: Option<TimelineCategory>,
    account: Option<EntityId>,
    user: EntityId,
    search: String,
    combined: bool,
    pages: usize,
}

fn parse_show_args(args: &[String]) -> Result<ShowArgs> {
    let mut parsed = ShowArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{name} needs a value"))
        };
        match arg.as_str() {
            "--category" => {
                let category = TimelineCategory::from_code(&value("--category")?);
                if category.is_unknown() {
                    bail!("Unknown category");
                }
                parsed.category = Some(category);
            }
            "--account" => {
                parsed.account = Some(value("--account")?.parse().context("Invalid account id")?);
            }
            "--user" => {
                parsed.user = value("--user")?.parse().context("Invalid user id")?;
            }
            "--search" => parsed.search = value("--search")?,
            "--pages" => {
                parsed.pages = value("--pages")?.parse().context("Invalid page count")?;
            }
            "--combined" => parsed.combined = true,
            other => bail!("Unknown option: {other}"),
        }
    }
    Ok(parsed)
}

fn print_window(records: &[Record], scroll: Option<ScrollTarget>) {
    let marker = match scroll {
        Some(ScrollTarget::Record { index, .. }) | Some(ScrollTarget::Bottom { index }) => {
            Some(index)
        }
        Some(ScrollTarget::Top) => Some(0),
        None => None,
    };

    for (index, record) in records.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(record.inserted_at, 0)
            .map(|dt| dt.format("%b %d %H:%M").to_string())
            .unwrap_or_default();
        let cursor = if marker == Some(index) { '>' } else { ' ' };
        let favorite = if record.is_favorited() { '*' } else { ' ' };
        println!(
            "{cursor}{favorite}{:>8}  {date:<12}  {}",
            record.id,
            record.preview(60)
        );
    }
}

async fn run_show(config: &Config, args: ShowArgs) -> Result<()> {
    let path = config.database_path()?;
    let db = Arc::new(Database::open(&path).await?);

    let account = match args.account.or(config.timeline.account) {
        Some(id) => id,
        None => db
            .resolve_account_scope(0, true)
            .await?
            .first()
            .copied()
            .context("No accounts in the database")?,
    };

    let request = TimelineRequest {
        category: args.category.unwrap_or(config.timeline.default_category),
        combined: args.combined || config.timeline.combined,
        account_id: account,
        selected_entity_id: args.user,
        search_query: args.search,
        global_search: false,
    };

    let mut controller = TimelineController::new(
        Arc::clone(&db),
        ConsoleSurface::default(),
        config.timeline.page_size,
    );
    controller.activate(request).await?;
    controller.settle().await;

    for _ in 0..args.pages {
        let total = controller.records().len();
        if controller.no_more_items() || total <= VISIBLE_ROWS {
            break;
        }
        controller
            .on_scroll(ScrollEvent {
                first_visible_index: total - VISIBLE_ROWS,
                visible_count: VISIBLE_ROWS,
                total_count: total,
            })
            .await;
        controller.settle().await;
    }

    print_window(controller.records(), controller.surface().scroll);
    let available = controller.count_available().await?;
    println!(
        "{} of {} records{}",
        controller.records().len(),
        available,
        if controller.no_more_items() {
            ", end of timeline"
        } else {
            ""
        }
    );

    controller.shutdown().await;
    controller.settle().await;
    Ok(())
}

async fn run_prune(config: &Config) -> Result<()> {
    let path = config.database_path()?;
    let db = Database::open(&path).await?;
    let stats = db
        .prune(config.history.max_days, config.history.max_size)
        .await?;
    println!("Deleted {} records", stats.deleted());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some("prune") => {
            setup_logging();
            let config = Config::load()?;
            config.ensure_dirs()?;
            run_prune(&config).await
        }
        Some("show") | None => {
            setup_logging();
            let config = Config::load()?;
            config.ensure_dirs()?;
            let show = parse_show_args(args.get(2..).unwrap_or_default())?;
            run_show(&config, show).await
        }
        Some(arg) if arg.starts_with("--") => {
            setup_logging();
            let config = Config::load()?;
            config.ensure_dirs()?;
            let show = parse_show_args(&args[1..])?;
            run_show(&config, show).await
        }
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            std::process::exit(1);
        }
    }
}
