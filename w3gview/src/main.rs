use anyhow::Context;
use clap::{App, Arg};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use w3g_replays::Replay;
use w3g_replays::analyzer::{Analyzer, ChatLoggerBuilder, EventDumpBuilder};

use crate::config::ViewerConfig;
use crate::report::Report;
use crate::texts::Locale;

mod config;
mod report;
mod texts;

fn main() -> anyhow::Result<()> {
    let matches = App::new("w3gview")
        .about("Prints the header, players and chat log of a Warcraft III replay")
        .arg(
            Arg::with_name("CONFIG")
                .help("Path to a TOML config file")
                .short("c")
                .long("config")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("LOCALE")
                .help("Output language")
                .short("l")
                .long("locale")
                .takes_value(true)
                .possible_values(&["en", "zh"]),
        )
        .arg(
            Arg::with_name("STRICT")
                .help("Fail on unknown action opcodes")
                .long("strict"),
        )
        .arg(
            Arg::with_name("JSON")
                .help("Print the decoded replay as JSON")
                .long("json"),
        )
        .arg(
            Arg::with_name("DUMP_EVENTS")
                .help("Print every event block as a line of JSON while decoding")
                .long("dump-events"),
        )
        .arg(
            Arg::with_name("LIVE_CHAT")
                .help("Print chat messages as they are decoded")
                .long("live-chat"),
        )
        .arg(
            Arg::with_name("NO_CHAT")
                .help("Do not print the chat log")
                .long("no-chat"),
        )
        .arg(
            Arg::with_name("PRINT_CONFIG")
                .help("Print the default config file and exit")
                .long("print-config"),
        )
        .arg(
            Arg::with_name("REPLAY")
                .help("The replay file to process")
                .required_unless("PRINT_CONFIG")
                .index(1),
        )
        .get_matches();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if matches.is_present("PRINT_CONFIG") {
        print!("{}", ViewerConfig::generate_default_toml());
        return Ok(());
    }

    let mut config = match matches.value_of("CONFIG") {
        Some(path) => ViewerConfig::load(Path::new(path))?,
        None => ViewerConfig::default(),
    };
    if let Some(locale) = matches.value_of("LOCALE") {
        config.locale = Some(
            locale
                .parse::<Locale>()
                .with_context(|| format!("unknown locale {locale:?}"))?,
        );
    }
    if matches.is_present("STRICT") {
        config.decoder.strict_actions = true;
    }
    if matches.is_present("NO_CHAT") {
        config.show_chat = false;
    }

    let replay_path = matches
        .value_of("REPLAY")
        .context("no replay file given")?;
    let data = std::fs::read(replay_path)
        .with_context(|| format!("failed to read replay file {replay_path}"))?;

    let mut analyzers =
        build_analyzers(matches.is_present("DUMP_EVENTS"), matches.is_present("LIVE_CHAT"));

    let replay = Replay::decode(&data, &config.decoder, &mut analyzers)
        .with_context(|| format!("failed to decode {replay_path}"))?;
    debug!(
        "decoded {replay_path}: {} player(s), {} chat message(s)",
        replay.players.len(),
        replay.chat.len()
    );

    if matches.is_present("JSON") {
        println!("{}", serde_json::to_string_pretty(&replay)?);
        return Ok(());
    }

    let report = Report {
        replay: &replay,
        path: replay_path,
        file_size: data.len() as u64,
        locale: config.resolved_locale(),
        show_players: config.show_players,
        show_chat: config.show_chat,
    };
    report.write_to(&mut std::io::stdout().lock())?;
    Ok(())
}

fn build_analyzers(dump_events: bool, live_chat: bool) -> Vec<Box<dyn Analyzer>> {
    let mut analyzers: Vec<Box<dyn Analyzer>> = Vec::new();
    if dump_events {
        analyzers.push(EventDumpBuilder::new().build());
    }
    if live_chat {
        analyzers.push(ChatLoggerBuilder::new().build());
    }
    analyzers
}
