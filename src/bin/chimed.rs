use anyhow::Result;
use chrono::{DateTime, Utc};
use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use chime::core::Config;
use chime::database::{Reminder, RepeatRule, SqliteStore};
use chime::dispatch::{InProcessDispatcher, PermissionStatus};
use chime::engine::Engine;
use chime::features::{get_engine_version, get_features};
use chime::{DeliveryPayload, Lifecycle, NotificationDispatcher};

const HELP: &str = "\
commands:
  add <when> [daily|weekly|monthly|yearly] <title...>
      when is RFC3339 (2024-06-01T09:00:00Z) or relative (30s, 10m, 2h, 1d)
  list                 show all reminders
  done <id-prefix>     mark a reminder done
  snooze <id-prefix>   push a reminder forward
  delete <id-prefix>   delete a reminder (and its series children)
  test                 fire a diagnostic notification in 2s
  fg / bg              simulate app foreground / background
  grant / deny         simulate the permission prompt answer
  reconcile            re-run store/dispatcher reconciliation
  quit";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting chimed v{}...", get_engine_version());
    for feature in get_features() {
        info!("   - {} {}", feature.name, feature.version);
    }

    let store = Arc::new(SqliteStore::open(&config.database_path)?);
    info!("📦 Reminder store at {}", config.database_path);

    let lifecycle = Lifecycle::new();
    let dispatcher = Arc::new(
        InProcessDispatcher::new(lifecycle.clone()).with_permission(PermissionStatus::Granted),
    );

    let (engine, report) = Engine::start(
        &config,
        store,
        dispatcher.clone(),
        lifecycle.clone(),
    )
    .await?;
    info!(
        "🔄 Launch reconciliation: {} registered, {} orphan(s) cancelled",
        report.registered, report.orphans_cancelled
    );

    match engine.request_permission().await? {
        PermissionStatus::Granted => info!("🔔 Notification permission granted"),
        PermissionStatus::Denied => {
            warn!("🔕 Notification permission denied - reminders will not notify")
        }
        PermissionStatus::NotDetermined => {
            warn!("❔ Notification permission not determined yet")
        }
    }

    // Print banner changes as the presentation layer would render them.
    let mut banner_updates = engine.banners().subscribe();
    tokio::spawn(async move {
        while let Ok(banners) = banner_updates.recv().await {
            if banners.is_empty() {
                println!("   (banners cleared)");
            } else {
                for banner in &banners {
                    println!("🔔 [{}] {}", &banner.reminder_id[..8], banner.title);
                }
            }
        }
    });

    // Print badge changes.
    let mut badge = engine.badge();
    tokio::spawn(async move {
        while badge.changed().await.is_ok() {
            let count = *badge.borrow();
            println!("🔴 badge: {count}");
        }
    });

    println!("chimed ready - type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        let result = match command {
            "help" => {
                println!("{HELP}");
                Ok(())
            }
            "add" => cmd_add(&engine, &rest).await,
            "list" => cmd_list(&engine).await,
            "done" => cmd_with_id(&engine, &rest, "done").await,
            "snooze" => cmd_with_id(&engine, &rest, "snooze").await,
            "delete" => cmd_with_id(&engine, &rest, "delete").await,
            "test" => cmd_test(dispatcher.as_ref()).await,
            "fg" => {
                engine.set_foregrounded(true).await;
                println!("app foregrounded");
                Ok(())
            }
            "bg" => {
                engine.set_foregrounded(false).await;
                println!("app backgrounded");
                Ok(())
            }
            "grant" => {
                dispatcher.set_permission(PermissionStatus::Granted);
                println!("permission granted - run 'reconcile' to register pending reminders");
                Ok(())
            }
            "deny" => {
                dispatcher.set_permission(PermissionStatus::Denied);
                println!("permission denied");
                Ok(())
            }
            "reconcile" => match engine.reconcile().await {
                Ok(report) => {
                    println!(
                        "reconciled: {} registered, {} orphan(s) cancelled",
                        report.registered, report.orphans_cancelled
                    );
                    Ok(())
                }
                Err(e) => Err(anyhow::anyhow!(e)),
            },
            "quit" | "exit" => break,
            other => {
                println!("unknown command '{other}' - type 'help'");
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("{e}");
        }
    }

    info!("chimed shutting down");
    Ok(())
}

async fn cmd_add(engine: &Engine, args: &[&str]) -> Result<()> {
    if args.len() < 2 {
        println!("usage: add <when> [daily|weekly|monthly|yearly] <title...>");
        return Ok(());
    }

    let fire_at = match parse_when(args[0]) {
        Some(at) => at,
        None => {
            println!("could not parse '{}' - use RFC3339 or 30s/10m/2h/1d", args[0]);
            return Ok(());
        }
    };

    let (repeat_rule, title_args) = match args[1] {
        "daily" => (RepeatRule::Daily, &args[2..]),
        "weekly" => (RepeatRule::Weekly, &args[2..]),
        "monthly" => (RepeatRule::Monthly, &args[2..]),
        "yearly" => (RepeatRule::Yearly, &args[2..]),
        _ => (RepeatRule::None, &args[1..]),
    };
    if title_args.is_empty() {
        println!("a reminder needs a title");
        return Ok(());
    }

    let (reminder, outcome) = engine
        .create_reminder(title_args.join(" "), fire_at, repeat_rule)
        .await?;
    println!(
        "created [{}] \"{}\" at {} ({outcome:?})",
        &reminder.id[..8],
        reminder.title,
        reminder.fire_at.to_rfc3339()
    );
    Ok(())
}

async fn cmd_list(engine: &Engine) -> Result<()> {
    let reminders = engine.list_reminders().await?;
    if reminders.is_empty() {
        println!("no reminders");
        return Ok(());
    }
    let now = Utc::now();
    for r in reminders {
        let state = if r.is_completed {
            "done".to_string()
        } else if r.fire_at <= now {
            "due now".to_string()
        } else {
            format!("in {}", format_duration((r.fire_at - now).num_seconds()))
        };
        let lineage = r
            .parent_id
            .as_deref()
            .map(|p| format!(" (child of {})", &p[..8]))
            .unwrap_or_default();
        println!(
            "[{}] {} - {state} - {:?}{lineage}",
            &r.id[..8],
            r.title,
            r.repeat_rule
        );
    }
    Ok(())
}

async fn cmd_with_id(engine: &Engine, args: &[&str], action: &str) -> Result<()> {
    let Some(prefix) = args.first() else {
        println!("usage: {action} <id-prefix>");
        return Ok(());
    };
    let matches: Vec<Reminder> = engine
        .list_reminders()
        .await?
        .into_iter()
        .filter(|r| r.id.starts_with(prefix))
        .collect();
    let reminder = match matches.as_slice() {
        [one] => one,
        [] => {
            println!("no reminder matches '{prefix}'");
            return Ok(());
        }
        _ => {
            println!("'{prefix}' is ambiguous ({} matches)", matches.len());
            return Ok(());
        }
    };

    match action {
        "done" => engine.complete_reminder(&reminder.id).await?,
        "snooze" => engine.snooze_reminder(&reminder.id).await?,
        "delete" => engine.delete_reminder(&reminder.id).await?,
        _ => unreachable!("unknown id action"),
    }
    println!("{action}: {}", reminder.title);
    Ok(())
}

async fn cmd_test(dispatcher: &InProcessDispatcher) -> Result<()> {
    let id = format!("diagnostic-{}", uuid::Uuid::new_v4());
    dispatcher
        .schedule(
            &id,
            Utc::now() + chrono::Duration::seconds(2),
            DeliveryPayload::test(&id),
        )
        .await?;
    println!("diagnostic notification scheduled in 2s (bypasses in-app routing)");
    Ok(())
}

/// Parse an absolute RFC3339 timestamp or a relative offset like "30s",
/// "10m", "2h", "1d", "1h30m".
fn parse_when(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Some(at.with_timezone(&Utc));
    }
    parse_duration(input).map(|secs| Utc::now() + chrono::Duration::seconds(secs))
}

/// Parse a duration string like "30m", "2h", "1d", "1h30m" into seconds
fn parse_duration(time_str: &str) -> Option<i64> {
    let time_str = time_str.trim().to_lowercase();
    let mut total_seconds: i64 = 0;
    let mut current_number = String::new();

    for c in time_str.chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
        } else if !current_number.is_empty() {
            let value: i64 = current_number.parse().ok()?;
            current_number.clear();

            let seconds = match c {
                's' => value,
                'm' => value * 60,
                'h' => value * 60 * 60,
                'd' => value * 60 * 60 * 24,
                'w' => value * 60 * 60 * 24 * 7,
                _ => return None,
            };
            total_seconds += seconds;
        } else {
            return None;
        }
    }

    if total_seconds > 0 {
        Some(total_seconds)
    } else {
        None
    }
}

/// Format a duration in seconds into a human-readable string
fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{} second{}", seconds, if seconds == 1 { "" } else { "s" })
    } else if seconds < 3600 {
        let mins = seconds / 60;
        format!("{} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!(
                "{} hour{} {} minute{}",
                hours,
                if hours == 1 { "" } else { "s" },
                mins,
                if mins == 1 { "" } else { "s" }
            )
        } else {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        }
    } else {
        let days = seconds / 86400;
        format!("{} day{}", days, if days == 1 { "" } else { "s" })
    }
}
