use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Timelike, Utc, Weekday};
use clap::{ArgGroup, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use push_reminder::api::SchedulerClient;
use push_reminder::config::{self, Config};
use push_reminder::datetime::{self, ResolvedSchedule};
use push_reminder::host::{
    ConsoleNotice, ConsolePrompt, FixedPermission, Permission, PermissionPrompt, StaticTokenSource,
};
use push_reminder::orchestrator::{surface, Dispatcher, Orchestrator};
use push_reminder::page::HtmlPage;
use push_reminder::presets;
use push_reminder::push::{self, RenderDefaults};
use push_reminder::schedule::{human_readable, interchange};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read date and time from an HTML page and schedule a reminder
    Run {
        /// HTML page containing the date and time elements
        #[arg(long)]
        page: PathBuf,
        /// Device token (overrides messaging.token)
        #[arg(long)]
        token: Option<String>,
        /// Grant notification permission without prompting
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Schedule a reminder relative to the current time
    #[command(group(ArgGroup::new("when").required(true).args(["in_minutes", "in_hours", "time"])))]
    At {
        #[arg(long)]
        in_minutes: Option<i64>,
        #[arg(long)]
        in_hours: Option<i64>,
        /// Time of day, e.g. `09:30` or `6:00 PM`
        #[arg(long)]
        time: Option<String>,
        /// Days after today, used with --time and ignored with --weekday
        #[arg(long, default_value_t = 0)]
        days_ahead: u32,
        /// Next occurrence of this weekday (with --time)
        #[arg(long, requires = "time")]
        weekday: Option<String>,
        /// Device token (overrides messaging.token)
        #[arg(long)]
        token: Option<String>,
    },
    /// Resolve a date and time without contacting the backend
    Resolve {
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
    },
    /// Render a push payload read from a file, or stdin when omitted
    Render {
        payload: Option<PathBuf>,
        /// Number of open client windows when the notification is clicked
        #[arg(long, default_value_t = 0)]
        open_windows: usize,
    },
    /// Show notification counts from the backend
    Status,
    /// Show the backend's clock and time zone next to the local one
    Timezone,
    /// Print an example configuration
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run { page, token, yes } => {
            let cfg = config::load(Some(&args.config))?;
            let client = SchedulerClient::from_config(&cfg)?;
            let page = HtmlPage::from_file(&page)
                .with_context(|| format!("failed to read page {}", page.display()))?;
            let tokens = StaticTokenSource::new(token.or_else(|| cfg.messaging.token.clone()));
            let fixed = FixedPermission(Permission::Granted);
            let permission: &dyn PermissionPrompt = if yes { &fixed } else { &ConsolePrompt };

            let orchestrator = Orchestrator {
                permission,
                page: &page,
                notice: &ConsoleNotice,
                page_ids: cfg.page.clone(),
                dispatcher: Dispatcher {
                    tokens: &tokens,
                    api: &client,
                    builder: cfg.request_builder(),
                },
            };
            info!("starting notification setup");
            orchestrator.initialize(&Local::now()).await;
        }
        Command::At {
            in_minutes,
            in_hours,
            time,
            days_ahead,
            weekday,
            token,
        } => {
            let cfg = config::load(Some(&args.config))?;
            let client = SchedulerClient::from_config(&cfg)?;
            let resolved = preset(in_minutes, in_hours, time.as_deref(), days_ahead, weekday.as_deref())?;
            let tokens = StaticTokenSource::new(token.or_else(|| cfg.messaging.token.clone()));
            let dispatcher = Dispatcher {
                tokens: &tokens,
                api: &client,
                builder: cfg.request_builder(),
            };
            surface(&ConsoleNotice, dispatcher.dispatch(resolved).await);
        }
        Command::Resolve { date, time } => {
            let resolved = datetime::resolve(&date, &time, &Local::now())?;
            println!("local:        {}", resolved.timestamp.to_rfc3339());
            println!("scheduled_at: {}", interchange(&resolved.timestamp));
            println!("display:      {}", human_readable(&resolved.timestamp));
            println!("strategy:     {:?}", resolved.strategy);
            println!("next day:     {}", resolved.was_adjusted_for_past);
        }
        Command::Render {
            payload,
            open_windows,
        } => {
            let defaults = load_optional(&args.config)?
                .map(|cfg| cfg.render_defaults())
                .unwrap_or_default();
            render(payload.as_deref(), open_windows, &defaults)?;
        }
        Command::Status => {
            let cfg = config::load(Some(&args.config))?;
            let client = SchedulerClient::from_config(&cfg)?;
            let stats = client.status().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Timezone => {
            let cfg = config::load(Some(&args.config))?;
            let client = SchedulerClient::from_config(&cfg)?;
            let info = client.timezone_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            let local = Local::now();
            println!("local clock: {} (UTC{})", local.format("%Y-%m-%d %I:%M:%S %p"), local.offset());
        }
        Command::ExampleConfig => {
            print!("{}", config::example());
        }
    }

    Ok(())
}

fn preset(
    in_minutes: Option<i64>,
    in_hours: Option<i64>,
    time: Option<&str>,
    days_ahead: u32,
    weekday: Option<&str>,
) -> Result<ResolvedSchedule> {
    let now = Local::now();
    if let Some(minutes) = in_minutes {
        return Ok(presets::in_minutes(&now, minutes)?);
    }
    if let Some(hours) = in_hours {
        return Ok(presets::in_hours(&now, hours)?);
    }
    let Some(time) = time else {
        bail!("one of --in-minutes, --in-hours or --time is required");
    };
    let clock = datetime::match_time(time).ok_or_else(|| anyhow!("invalid time of day: {time}"))?;
    let resolved = match weekday {
        Some(day) => {
            let day: Weekday = day
                .parse()
                .map_err(|_| anyhow!("invalid weekday: {day}"))?;
            presets::next_weekly(&now, day, clock.hour(), clock.minute())?
        }
        None => presets::at_local_time(&now, clock.hour(), clock.minute(), days_ahead)?,
    };
    Ok(resolved)
}

fn render(payload: Option<&Path>, open_windows: usize, defaults: &RenderDefaults) -> Result<()> {
    let raw = match payload {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read payload {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    let kind = push::classify(Some(&raw));
    let spec = push::render(&kind, defaults, Utc::now());
    println!("{}", serde_json::to_string_pretty(&spec)?);
    println!("on click: {:?}", push::click_target(&spec.data, open_windows));
    Ok(())
}

fn load_optional(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(config::load(Some(path))?))
}
