use std::path::Path;

use serde::Serialize;
use tracing::{Level, debug, span};

use crate::analyzer::Analyzer;
use crate::blocks::decompress_blocks;
use crate::events::{ChatMessage, EventStreamParser};
use crate::header::{ReplayHeader, decode_header};
use crate::roster::{Player, Roster, RosterResolver};
use crate::settings::{GameSettings, MapInfo, unmask};
use crate::{ByteCursor, DecoderOptions, ErrorKind};

/// A fully decoded replay.
#[derive(Debug, Clone, Serialize)]
pub struct Replay {
    pub header: ReplayHeader,
    pub settings: GameSettings,
    pub players: Roster,
    /// Chat messages in stream order.
    pub chat: Vec<ChatMessage>,
}

impl Replay {
    pub fn from_file(path: &Path) -> Result<Replay, ErrorKind> {
        let data = std::fs::read(path)?;
        Replay::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Replay, ErrorKind> {
        Replay::decode(data, &DecoderOptions::default(), &mut [])
    }

    pub fn from_bytes_with_options(
        data: &[u8],
        options: &DecoderOptions,
    ) -> Result<Replay, ErrorKind> {
        Replay::decode(data, options, &mut [])
    }

    /// Decodes a whole replay file, feeding every event block to `analyzers`.
    /// Analyzers are finished only when the decode succeeds.
    pub fn decode(
        data: &[u8],
        options: &DecoderOptions,
        analyzers: &mut [Box<dyn Analyzer>],
    ) -> Result<Replay, ErrorKind> {
        let span = span!(Level::TRACE, "decode_replay", bytes = data.len());
        let _enter = span.enter();

        let mut cursor = ByteCursor::new(data);
        let header = decode_header(&mut cursor)?;
        let payload = decompress_blocks(&mut cursor, &header, options.block_encoding)?;

        let mut cursor = ByteCursor::new(&payload);
        let (settings, mut players) = decode_lobby(&mut cursor)?;
        debug!(
            "lobby: {:?} on {:?}, {} player(s)",
            settings.game_name,
            settings.map_name,
            players.len()
        );

        let chat = EventStreamParser::new(&mut players, options, analyzers).run(&mut cursor)?;
        for analyzer in analyzers.iter_mut() {
            analyzer.finish();
        }

        Ok(Replay {
            header,
            settings,
            players,
            chat,
        })
    }

    pub fn duration_ms(&self) -> u32 {
        self.header.duration_ms
    }

    /// Actions per minute for `player` over this replay's duration.
    pub fn apm(&self, player: &Player) -> f64 {
        player.apm(self.header.duration_ms)
    }
}

/// Reads everything between the start of the decompressed payload and the
/// first event block: player records, game settings and the slot table.
fn decode_lobby(cursor: &mut ByteCursor<'_>) -> Result<(GameSettings, Roster), ErrorKind> {
    cursor.skip(4)?;
    let mut resolver = RosterResolver::with_host(cursor)?;

    let game_name = String::from_utf8_lossy(cursor.read_cstring()?).into_owned();
    cursor.skip(1)?;
    let map = MapInfo::from_unmasked(&unmask(cursor.read_cstring()?))?;
    let player_count = cursor.read_u32()?;
    let game_type = cursor.read_u8()?;
    let private_flag = cursor.read_u8()?;
    cursor.skip(2)?;
    let language_id = cursor.read_u32()?;

    resolver.read_additional_players(cursor)?;
    let roster = resolver.read_slots(cursor)?;

    let random_seed = cursor.read_u32()?;
    let select_mode = cursor.read_u8()?;
    let start_spot_count = cursor.read_u8()?;

    Ok((
        GameSettings {
            game_name,
            map_name: map.map_name,
            creator_name: map.creator_name,
            player_count,
            game_type,
            private_flag,
            language_id,
            random_seed,
            select_mode,
            start_spot_count,
        },
        roster,
    ))
}
