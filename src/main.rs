use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use focuslog::{
    identity::Identity,
    session::stats,
    timer::{format_clock, ClockDisplay, TimerMode},
    App,
};

fn parse_mode(value: &str) -> Option<TimerMode> {
    match value {
        "timer" => Some(TimerMode::Timer),
        "stopwatch" => Some(TimerMode::Stopwatch),
        "pomodoro" => Some(TimerMode::Pomodoro),
        _ => None,
    }
}

fn print_help() {
    println!("commands:");
    println!("  status                     show the current clock");
    println!("  start | pause | resume | stop");
    println!("  mode <timer|stopwatch|pomodoro>");
    println!("  duration <minutes>         countdown length (timer mode)");
    println!("  category <text>            label for recorded sessions");
    println!("  pomodoro <focus> <break>   segment lengths in minutes");
    println!("  clock <digital|analog>     clock face for the current mode");
    println!("  login <user-id> | logout");
    println!("  sessions                   recent session history");
    println!("  stats                      focus totals by category and day");
    println!("  quit");
}

async fn print_status(app: &App) {
    let snapshot = app.engine.snapshot().await;
    let state = if !snapshot.is_active {
        "idle"
    } else if snapshot.is_paused {
        "paused"
    } else {
        "running"
    };
    let mut line = format!(
        "[{state}] {:?} {} (category: {})",
        snapshot.mode,
        format_clock(snapshot.display_seconds),
        snapshot.category
    );
    if snapshot.mode == TimerMode::Pomodoro {
        let segment = if snapshot.modes.pomodoro.is_break {
            "break"
        } else {
            "focus"
        };
        line.push_str(&format!(" [{segment}]"));
    }
    println!("{line}");
}

async fn print_sessions(app: &App) {
    match app.api.list_sessions().await {
        Ok(sessions) if sessions.is_empty() => println!("no recorded sessions"),
        Ok(sessions) => {
            for session in sessions.iter().take(10) {
                println!(
                    "{}  {:>4}min  {}",
                    session.start_time.format("%Y-%m-%d %H:%M"),
                    session.duration_minutes,
                    session.category
                );
            }
        }
        Err(err) => println!("could not fetch sessions: {err:#}"),
    }
}

async fn print_stats(app: &App) {
    match app.api.list_sessions().await {
        Ok(sessions) => {
            println!("minutes by category:");
            for bucket in stats::minutes_by_category(&sessions) {
                println!("  {:<20} {}", bucket.label, bucket.value);
            }
            println!("last seven days:");
            for day in stats::last_seven_days(&sessions, chrono::Utc::now()) {
                println!("  {} {}  {}min", day.label, day.date, day.minutes);
            }
        }
        Err(err) => println!("could not fetch sessions: {err:#}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("focuslog starting up...");

    let app = Arc::new(App::bootstrap().await?);

    println!("focuslog (type `help` for commands)");
    print_status(&app).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        match command {
            "help" => print_help(),
            "status" => print_status(&app).await,
            "start" => match app.engine.start().await {
                Ok(()) => print_status(&app).await,
                Err(err) => println!("cannot start: {err}"),
            },
            "pause" => {
                app.engine.pause().await;
                print_status(&app).await;
            }
            "resume" => {
                app.engine.resume().await;
                print_status(&app).await;
            }
            "stop" => {
                app.engine.stop().await;
                print_status(&app).await;
            }
            "mode" => match parts.next().and_then(parse_mode) {
                Some(mode) => {
                    app.engine.set_mode(mode).await;
                    print_status(&app).await;
                }
                None => println!("usage: mode <timer|stopwatch|pomodoro>"),
            },
            "duration" => match parts.next().and_then(|v| v.parse().ok()) {
                Some(minutes) => app.engine.set_duration(minutes).await,
                None => println!("usage: duration <minutes>"),
            },
            "category" => {
                let label = line["category".len()..].trim();
                app.engine.set_category(label).await;
            }
            "pomodoro" => {
                let focus = parts.next().and_then(|v| v.parse().ok());
                let pause = parts.next().and_then(|v| v.parse().ok());
                match (focus, pause) {
                    (Some(focus), Some(pause)) => {
                        app.engine.set_pomodoro_config(focus, pause, false).await;
                    }
                    _ => println!("usage: pomodoro <focus-minutes> <break-minutes>"),
                }
            }
            "clock" => {
                let style = match parts.next() {
                    Some("digital") => Some(ClockDisplay::Digital),
                    Some("analog") => Some(ClockDisplay::Analog),
                    _ => None,
                };
                match style {
                    Some(style) => {
                        let mode = app.engine.snapshot().await.mode;
                        app.engine.set_clock_display(mode, style).await;
                    }
                    None => println!("usage: clock <digital|analog>"),
                }
            }
            "login" => match parts.next() {
                Some(user_id) => app.identity.set(Identity::User(user_id.to_owned())),
                None => println!("usage: login <user-id>"),
            },
            "logout" => app.identity.set(Identity::Anonymous),
            "sessions" => print_sessions(&app).await,
            "stats" => print_stats(&app).await,
            "quit" | "exit" => break,
            other => println!("unknown command {other:?}; try `help`"),
        }
    }

    app.engine.shutdown().await;
    Ok(())
}
