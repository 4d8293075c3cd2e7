use std::io::{self, Write};

use w3g_replays::Replay;
use w3g_replays::events::{ChatMessage, ReceiverScope};
use w3g_replays::roster::Player;
use w3g_replays::types::GameClock;

use crate::texts::{Locale, Text, text};

pub fn format_size(bytes: u64) -> String {
    format!("{:.2} KiB", bytes as f64 / 1024.0)
}

pub fn format_duration(ms: u32) -> String {
    GameClock(ms).to_string()
}

/// APM truncated to a whole number, or `-` when it is undefined.
pub fn format_apm(apm: f64) -> String {
    if apm.is_finite() {
        (apm.trunc() as i64).to_string()
    } else {
        "-".to_owned()
    }
}

/// Human-readable summary of a decoded replay.
pub struct Report<'a> {
    pub replay: &'a Replay,
    pub path: &'a str,
    pub file_size: u64,
    pub locale: Locale,
    pub show_players: bool,
    pub show_chat: bool,
}

impl Report<'_> {
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let t = |key| text(key, self.locale);
        let header = &self.replay.header;
        let settings = &self.replay.settings;

        writeln!(out, "{}", header.title.trim_end_matches('\u{1a}'))?;
        writeln!(out, "{}{}", t(Text::FilePath), self.path)?;
        writeln!(out, "{}{}", t(Text::FileSize), format_size(self.file_size))?;
        writeln!(out, "{}{} {}", t(Text::Version), header.product, header.patch())?;
        writeln!(out, "{}", t(Text::GameKind(header.kind)))?;
        writeln!(out, "{}{}", t(Text::Duration), format_duration(header.duration_ms))?;
        writeln!(out, "{}{}", t(Text::GameName), settings.game_name)?;
        writeln!(out, "{}{}", t(Text::Map), settings.map_name)?;
        writeln!(out, "{}{}", t(Text::Creator), settings.creator_name)?;

        if self.show_players {
            writeln!(out)?;
            writeln!(out, "{}", t(Text::Players))?;
            for player in self.replay.players.iter() {
                writeln!(out)?;
                write_player(out, player, header.duration_ms, self.locale)?;
            }
        }

        if self.show_chat && !self.replay.chat.is_empty() {
            writeln!(out)?;
            writeln!(out, "{}", t(Text::Chat))?;
            for message in &self.replay.chat {
                writeln!(out, "{}", chat_line(message, self.locale))?;
            }
        }
        Ok(())
    }
}

pub fn write_player(
    out: &mut impl Write,
    player: &Player,
    duration_ms: u32,
    locale: Locale,
) -> io::Result<()> {
    let t = |key| text(key, locale);
    let yes_no = |flag: bool| t(if flag { Text::Yes } else { Text::No });

    writeln!(out, "{}{}", t(Text::Name), player.display_name())?;
    writeln!(out, "{}{}", t(Text::Host), yes_no(player.is_host))?;
    match player.ai_strength {
        Some(strength) if player.is_computer => writeln!(
            out,
            "{}{} ({})",
            t(Text::Computer),
            yes_no(true),
            t(Text::AiStrength(strength))
        )?,
        _ => writeln!(out, "{}{}", t(Text::Computer), yes_no(player.is_computer))?,
    }
    writeln!(out, "{}{}", t(Text::Team), u16::from(player.team) + 1)?;
    let color = player
        .color
        .map_or(t(Text::NoColor), |color| t(Text::Color(color)));
    writeln!(out, "{}{}", t(Text::ColorLabel), color)?;
    writeln!(out, "{}{}", t(Text::RaceLabel), t(Text::Race(player.race)))?;
    writeln!(out, "{}{}%", t(Text::Handicap), player.handicap)?;

    if !player.is_computer {
        writeln!(
            out,
            "{}{}",
            t(Text::PlayingTime),
            format_duration(player.playing_time_ms(duration_ms))
        )?;
        writeln!(out, "{}{}", t(Text::Actions), player.actions.action_count)?;
        writeln!(out, "{}{}", t(Text::Apm), format_apm(player.apm(duration_ms)))?;
    }
    Ok(())
}

/// `[m:ss] sender -> receiver: text`
pub fn chat_line(message: &ChatMessage, locale: Locale) -> String {
    let receiver = match (message.scope, &message.receiver_name) {
        (None, _) => text(Text::StartupScreen, locale).to_owned(),
        (Some(ReceiverScope::Slot(_)), Some(name)) => name.clone(),
        (Some(scope @ ReceiverScope::Slot(slot)), None) => {
            format!("{} {}", text(Text::Scope(scope), locale), slot)
        }
        (Some(scope), _) => text(Text::Scope(scope), locale).to_owned(),
    };
    format!(
        "[{}] {} -> {}: {}",
        message.timestamp, message.sender_name, receiver, message.text
    )
}
