use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tv_grid::config::GridConfig;
use tv_grid::daily::EntryKind;
use tv_grid::error::ScheduleError;
use tv_grid::scheduler::Scheduler;
use tv_grid::time_of_day::{DAY_SECS, Period};

#[derive(Parser)]
#[command(name = "tvgrid", about = "Broadcast TV schedule engine CLI")]
struct Cli {
    /// Content directory holding the JSON documents
    #[arg(long, global = true, env = "TVGRID_ROOT")]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show catalog and schedule status
    Status,
    /// Plan the current broadcast week
    Weekly,
    /// Expand today's broadcast day from the weekly plan
    Daily,
    /// Regenerate whatever schedule is missing or out of date
    Ensure,
    /// What a channel is airing now (or at --at)
    Now {
        channel: String,
        /// RFC 3339 timestamp, e.g. 2025-03-10T17:00:30-03:00
        #[arg(long)]
        at: Option<String>,
    },
    /// Series time-of-day preferences
    Series {
        #[command(subcommand)]
        action: SeriesCmd,
    },
    /// Episode cursors
    Cursors {
        #[command(subcommand)]
        action: CursorsCmd,
    },
    /// List today's entries for a channel
    Entries { channel: String },
}

#[derive(Subcommand)]
enum SeriesCmd {
    /// List series with their preferences
    List,
    /// Show one series' preference
    Get { name: String },
    /// Set a preference: early_morning, late_morning, afternoon, evening, night or any
    Set { name: String, value: String },
}

#[derive(Subcommand)]
enum CursorsCmd {
    /// Print the cursor document
    Show,
    /// Clear cursors for one channel, or all of them
    Reset {
        #[arg(short, long)]
        channel: Option<String>,
    },
}

fn fail(e: ScheduleError) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn parse_at(s: &str) -> DateTime<FixedOffset> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(t) => t,
        Err(e) => fail(ScheduleError::InvalidInput(format!("'{}': {}", s, e))),
    }
}

fn clock_time(offset: u32) -> String {
    // Offsets count from 03:00.
    let secs = (offset + 3 * 3600) % DAY_SECS;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = GridConfig::load(cli.root.as_deref());
    let mut scheduler = Scheduler::new(config);

    match cli.command {
        Commands::Status => {
            let s = scheduler.status();
            println!("tvgrid v{}", env!("CARGO_PKG_VERSION"));
            println!("Content: {}", s.content_dir);
            println!("Now: {} (broadcast day {})", s.now.to_rfc3339(), s.broadcast_date);
            println!(
                "Videos: {} | Series: {} | Commercials: {} | Channels: {} ({} series-driven)",
                s.videos, s.series, s.commercials, s.channels, s.series_channels
            );
            println!(
                "Weekly: {} | Daily: {} | Generation: {}",
                if s.weekly_current { "current" } else { "stale" },
                if s.daily_current { "current" } else { "stale" },
                s.meta.generation
            );
            for (id, sum) in scheduler.day_summaries() {
                println!(
                    "  {:<16} {:>3} entries, {:>3} episodes, {:>4} spots, {}s programme / {}s filler",
                    id,
                    sum.entries,
                    sum.episodes,
                    sum.commercials + sum.placeholders,
                    sum.programme_secs,
                    sum.filler_secs
                );
            }
        }
        Commands::Weekly => {
            let plan = scheduler.generate_weekly_schedule().unwrap_or_else(|e| fail(e));
            println!("Weekly plan for week of {}:", plan.week_start);
            for (id, week) in &plan.channels {
                println!("  {}", id);
                for period in Period::ALL {
                    let slots: Vec<String> = week
                        .slots(period)
                        .iter()
                        .map(|s| format!("{} x{}", s.series, s.back_to_back))
                        .collect();
                    println!("    {:<14} {}", period.as_str(), slots.join(", "));
                }
            }
        }
        Commands::Daily => {
            let day = scheduler.generate_daily_schedule().unwrap_or_else(|e| fail(e));
            println!(
                "Daily schedule for {} ({} channel(s)), valid {} to {}",
                day.schedule_date,
                day.channels.len(),
                day.valid_from.to_rfc3339(),
                day.valid_until.to_rfc3339()
            );
        }
        Commands::Ensure => {
            let done = scheduler.ensure_current().unwrap_or_else(|e| fail(e));
            match (done.weekly, done.daily) {
                (false, false) => println!("Schedules are current."),
                (w, d) => println!(
                    "Regenerated:{}{}",
                    if w { " weekly" } else { "" },
                    if d { " daily" } else { "" }
                ),
            }
        }
        Commands::Now { channel, at } => {
            let at = at.as_deref().map(parse_at);
            let content = scheduler
                .get_scheduled_content(&channel, at)
                .unwrap_or_else(|e| fail(e));
            let label = match (content.kind, &content.title) {
                (EntryKind::Episode, Some(title)) => format!("episode '{}'", title),
                (kind, _) => kind.to_string(),
            };
            println!(
                "{}: {} [{} - {}]",
                channel,
                label,
                clock_time(content.start),
                clock_time(content.end)
            );
            println!("  file: {}", content.video_url.display());
            println!("  seek_to: {}s ({}s remaining)", content.seek_to, content.remaining);
        }
        Commands::Series { action } => match action {
            SeriesCmd::List => {
                let catalog = scheduler.catalog();
                if catalog.series.is_empty() {
                    println!("No series registered.");
                }
                for name in catalog.series.names() {
                    let episodes = catalog.series_episodes(name).len();
                    println!(
                        "  {:<24} {:<14} {} episode(s)",
                        name,
                        catalog.series.time_of_day(name).as_str(),
                        episodes
                    );
                }
            }
            SeriesCmd::Get { name } => {
                println!("{}: {}", name, scheduler.get_time_of_day(&name));
            }
            SeriesCmd::Set { name, value } => {
                let pref = scheduler
                    .set_time_of_day(&name, &value)
                    .unwrap_or_else(|e| fail(e));
                println!("{}: {}", name, pref);
            }
        },
        Commands::Cursors { action } => match action {
            CursorsCmd::Show => {
                let cursors = scheduler.load_cursors();
                if cursors.is_empty() {
                    println!("No cursors yet.");
                }
                for (channel, series) in &cursors.0 {
                    println!("  {}", channel);
                    for (name, index) in series {
                        println!("    {:<24} next index {}", name, index);
                    }
                }
            }
            CursorsCmd::Reset { channel } => {
                let removed = scheduler
                    .reset_cursors(channel.as_deref())
                    .unwrap_or_else(|e| fail(e));
                println!("Removed {} cursor(s).", removed);
            }
        },
        Commands::Entries { channel } => {
            let Some(day) = scheduler.load_daily() else {
                fail(ScheduleError::Stale("no daily schedule, run 'tvgrid daily'".into()));
            };
            let Some(entries) = day.channels.get(&channel) else {
                fail(ScheduleError::NotFound(format!("Channel '{}' in daily schedule", channel)));
            };
            println!("{} on {}:", channel, day.schedule_date);
            for e in entries {
                let detail = match e.kind {
                    EntryKind::Episode => format!(
                        "{} S{:02}E{:02} {}",
                        e.series.as_deref().unwrap_or("?"),
                        e.season.unwrap_or(0),
                        e.episode.unwrap_or(0),
                        e.title.as_deref().unwrap_or("")
                    ),
                    EntryKind::Commercial => e.video_id.clone().unwrap_or_default(),
                    _ => String::new(),
                };
                println!(
                    "  {} - {}  {:<20} {}",
                    clock_time(e.start),
                    clock_time(e.end),
                    e.kind.to_string(),
                    detail
                );
            }
        }
    }
}
