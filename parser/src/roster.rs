use nom::bytes::complete::take;
use nom::number::complete::{le_u8, le_u32};
use serde::Serialize;
use strum_macros::{Display, EnumIter, FromRepr, IntoStaticStr};
use tracing::{debug, trace, warn};

use crate::actions::ActionStats;
use crate::cursor::cstring;
use crate::types::{PlayerId, SlotId};
use crate::{ByteCursor, ErrorKind, IResult, failure_from_kind};

pub const HOST_RECORD: u8 = 0x00;
pub const ADDITIONAL_PLAYER_RECORD: u8 = 0x16;
pub const GAME_START_RECORD: u8 = 0x19;

const CUSTOM_GAME: u8 = 0x01;
const LADDER_GAME: u8 = 0x08;
const SLOT_USED: u8 = 0x02;
/// Team number shared by observers and referees.
pub const OBSERVER_TEAM: u8 = 12;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr, EnumIter,
)]
pub enum Race {
    Human,
    Orc,
    NightElf,
    Undead,
    Random,
    /// The slot's race flag did not map to a known race.
    Unspecified,
}

impl Race {
    /// Maps a slot race flag. Bit 0x40 marks the race as fixed and is ignored.
    pub fn from_flag(flag: u8) -> Option<Race> {
        match flag {
            0x01 | 0x41 => Some(Race::Human),
            0x02 | 0x42 => Some(Race::Orc),
            0x04 | 0x44 => Some(Race::NightElf),
            0x08 | 0x48 => Some(Race::Undead),
            0x20 | 0x60 => Some(Race::Random),
            _ => None,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Display,
    IntoStaticStr,
    EnumIter,
    FromRepr,
)]
#[repr(u8)]
pub enum Color {
    Red = 0,
    Blue,
    Teal,
    Purple,
    Yellow,
    Orange,
    Green,
    Pink,
    Gray,
    LightBlue,
    DarkGreen,
    Brown,
    /// Observer or referee
    Observer,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Display,
    IntoStaticStr,
    EnumIter,
    FromRepr,
)]
#[repr(u8)]
pub enum AiStrength {
    Easy = 0,
    Normal = 1,
    Insane = 2,
}

/// Extra player data present in ladder games. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LadderInfo {
    pub runtime_ms: u32,
    pub race_flags: u32,
}

/// A host (0x00) or additional (0x16) player record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord<'a> {
    pub record_id: u8,
    pub id: PlayerId,
    pub name: &'a [u8],
    pub ladder: Option<LadderInfo>,
}

pub(crate) fn parse_player_record(i: &[u8]) -> IResult<&[u8], PlayerRecord<'_>> {
    let (i, record_id) = le_u8(i)?;
    let (i, id) = le_u8(i)?;
    let (i, name) = cstring(i)?;
    let (i, kind) = le_u8(i)?;
    let (i, ladder) = match kind {
        CUSTOM_GAME => {
            let (i, _) = take(1usize)(i)?;
            (i, None)
        }
        LADDER_GAME => {
            let (i, runtime_ms) = le_u32(i)?;
            let (i, race_flags) = le_u32(i)?;
            (
                i,
                Some(LadderInfo {
                    runtime_ms,
                    race_flags,
                }),
            )
        }
        other => return Err(failure_from_kind(ErrorKind::UnknownPlayerRecordKind(other))),
    };
    Ok((
        i,
        PlayerRecord {
            record_id,
            id: PlayerId(id),
            name,
            ladder,
        },
    ))
}

/// One entry of the game start record's slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRecord {
    pub player_id: PlayerId,
    pub map_download_percent: u8,
    pub status: u8,
    pub computer_flag: u8,
    pub team: u8,
    pub color: u8,
    pub race_flag: u8,
    pub ai_strength: u8,
    pub handicap: u8,
}

impl SlotRecord {
    pub fn is_used(&self) -> bool {
        self.status == SLOT_USED
    }

    pub fn is_computer(&self) -> bool {
        self.computer_flag == 0x01
    }
}

fn parse_slot_record(i: &[u8]) -> IResult<&[u8], SlotRecord> {
    let (i, player_id) = le_u8(i)?;
    let (i, map_download_percent) = le_u8(i)?;
    let (i, status) = le_u8(i)?;
    let (i, computer_flag) = le_u8(i)?;
    let (i, team) = le_u8(i)?;
    let (i, color) = le_u8(i)?;
    let (i, race_flag) = le_u8(i)?;
    let (i, ai_strength) = le_u8(i)?;
    let (i, handicap) = le_u8(i)?;
    Ok((
        i,
        SlotRecord {
            player_id: PlayerId(player_id),
            map_download_percent,
            status,
            computer_flag,
            team,
            color,
            race_flag,
            ai_strength,
            handicap,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    /// Zero for computer players.
    pub id: PlayerId,
    pub slot: Option<SlotId>,
    /// Absent for computer players.
    pub name: Option<String>,
    pub is_host: bool,
    pub is_computer: bool,
    pub exists: bool,
    pub map_download_percent: u8,
    pub team: u8,
    pub color: Option<Color>,
    pub race: Race,
    pub race_flag: u8,
    pub ai_strength: Option<AiStrength>,
    pub handicap: u8,
    pub ladder: Option<LadderInfo>,
    pub actions: ActionStats,
}

impl Player {
    fn new(id: PlayerId) -> Player {
        Player {
            id,
            slot: None,
            name: None,
            is_host: false,
            is_computer: false,
            exists: false,
            map_download_percent: 0,
            team: 0,
            color: None,
            race: Race::Unspecified,
            race_flag: 0,
            ai_strength: None,
            handicap: 100,
            ladder: None,
            actions: ActionStats::default(),
        }
    }

    fn from_record(record: &PlayerRecord<'_>) -> Player {
        Player {
            name: Some(String::from_utf8_lossy(record.name).into_owned()),
            is_host: record.record_id == HOST_RECORD,
            ladder: record.ladder,
            ..Player::new(record.id)
        }
    }

    fn apply_slot(&mut self, slot: SlotId, record: &SlotRecord) {
        self.slot = Some(slot);
        self.exists = record.is_used();
        self.is_computer = record.is_computer();
        self.map_download_percent = record.map_download_percent;
        self.team = record.team;
        self.handicap = record.handicap;
        self.race_flag = record.race_flag;

        self.color = Color::from_repr(record.color);
        if self.color.is_none() {
            warn!("slot {slot}: color index {} out of range, leaving unset", record.color);
        }

        self.race = Race::from_flag(record.race_flag).unwrap_or_else(|| {
            debug!("slot {slot}: unmapped race flag {:#04x}", record.race_flag);
            Race::Unspecified
        });

        self.ai_strength = if self.is_computer {
            let strength = AiStrength::from_repr(record.ai_strength);
            if strength.is_none() {
                warn!("slot {slot}: unknown AI strength {}", record.ai_strength);
            }
            strength
        } else {
            None
        };
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn is_observer(&self) -> bool {
        self.team == OBSERVER_TEAM
    }

    /// Replay duration minus the time this player spent paused.
    pub fn playing_time_ms(&self, duration_ms: u32) -> u32 {
        duration_ms.saturating_sub(self.actions.paused_ms)
    }

    /// Actions per minute; -1 for computer players.
    pub fn apm(&self, duration_ms: u32) -> f64 {
        if self.is_computer {
            return -1.0;
        }
        self.actions.apm(duration_ms)
    }
}

/// Every player in the replay, in admission order: host, additional
/// players, then computer players in slot order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Looks up a human player by id. Computer players have no id.
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.index_of(id).map(|index| &self.players[index])
    }

    pub(crate) fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.index_of(id).map(move |index| &mut self.players[index])
    }

    /// Like [`Roster::get`], but an unknown id is a format error.
    pub fn resolve(&self, id: PlayerId) -> Result<&Player, ErrorKind> {
        self.get(id).ok_or(ErrorKind::UnknownPlayer(id.raw()))
    }

    pub(crate) fn resolve_mut(&mut self, id: PlayerId) -> Result<&mut Player, ErrorKind> {
        self.get_mut(id).ok_or(ErrorKind::UnknownPlayer(id.raw()))
    }

    pub fn by_slot(&self, slot: SlotId) -> Option<&Player> {
        self.players.iter().find(|player| player.slot == Some(slot))
    }

    pub fn humans(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| !player.is_computer)
    }

    pub fn computers(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| player.is_computer)
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|player| player.is_host)
    }

    fn index_of(&self, id: PlayerId) -> Option<usize> {
        if id.is_computer() {
            return None;
        }
        self.players
            .iter()
            .position(|player| !player.is_computer && player.id == id)
    }

    fn admit(&mut self, player: Player) -> Result<(), ErrorKind> {
        if !player.is_computer && self.index_of(player.id).is_some() {
            return Err(ErrorKind::DuplicatePlayer(player.id.raw()));
        }
        trace!(
            "admitting player {} ({:?}) at roster position {}",
            player.id,
            player.name,
            self.players.len()
        );
        self.players.push(player);
        Ok(())
    }
}

/// Builds the roster from the player records and the slot table.
#[derive(Debug, Default)]
pub struct RosterResolver {
    roster: Roster,
}

impl RosterResolver {
    /// Reads the host record and seeds the roster with it.
    pub fn with_host(cursor: &mut ByteCursor<'_>) -> Result<RosterResolver, ErrorKind> {
        let record = cursor.parse(parse_player_record)?;
        if record.record_id != HOST_RECORD {
            return Err(ErrorKind::UnexpectedRecord {
                expected: HOST_RECORD,
                found: record.record_id,
            });
        }
        let mut resolver = RosterResolver::default();
        resolver.roster.admit(Player::from_record(&record))?;
        Ok(resolver)
    }

    /// Reads additional player records for as long as they follow.
    pub fn read_additional_players(&mut self, cursor: &mut ByteCursor<'_>) -> Result<(), ErrorKind> {
        while cursor.peek_u8()? == ADDITIONAL_PLAYER_RECORD {
            let record = cursor.parse(parse_player_record)?;
            self.roster.admit(Player::from_record(&record))?;

            let next = cursor.peek_u8()?;
            if next != ADDITIONAL_PLAYER_RECORD
                && next != GAME_START_RECORD
                && cursor.rest().get(..4) == Some(&[0u8; 4][..])
            {
                cursor.skip(4)?;
            }
        }
        Ok(())
    }

    /// Reads the game start record and its slot table, completing the roster.
    pub fn read_slots(mut self, cursor: &mut ByteCursor<'_>) -> Result<Roster, ErrorKind> {
        let record_id = cursor.read_u8()?;
        if record_id != GAME_START_RECORD {
            return Err(ErrorKind::UnexpectedRecord {
                expected: GAME_START_RECORD,
                found: record_id,
            });
        }
        let length = cursor.read_u16()?;
        let slot_count = cursor.read_u8()?;
        trace!("game start record: {length} bytes, {slot_count} slot(s)");

        for index in 0..slot_count {
            let slot = SlotId(index);
            let record = cursor.parse(parse_slot_record)?;

            if record.player_id.is_computer() {
                if !(record.is_used() && record.is_computer()) {
                    trace!("slot {slot}: no player");
                    continue;
                }
                let mut player = Player::new(PlayerId::COMPUTER);
                player.apply_slot(slot, &record);
                self.roster.admit(player)?;
            } else {
                self.roster
                    .resolve_mut(record.player_id)?
                    .apply_slot(slot, &record);
            }
        }

        Ok(self.roster)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn player_record(record_id: u8, id: u8, name: &str) -> Vec<u8> {
        let mut out = vec![record_id, id];
        out.extend(name.as_bytes());
        out.extend([0, CUSTOM_GAME, 0]);
        out
    }

    pub(crate) fn slot(
        player_id: u8,
        status: u8,
        computer: u8,
        team: u8,
        color: u8,
        race: u8,
        ai: u8,
    ) -> [u8; 9] {
        [player_id, 100, status, computer, team, color, race, ai, 100]
    }

    pub(crate) fn game_start(slots: &[[u8; 9]]) -> Vec<u8> {
        let mut out = vec![GAME_START_RECORD];
        out.extend((1 + slots.len() as u16 * 9 + 6).to_le_bytes());
        out.push(slots.len() as u8);
        for slot in slots {
            out.extend(slot);
        }
        out
    }

    fn resolve(bytes: &[u8]) -> Result<Roster, ErrorKind> {
        let mut cursor = ByteCursor::new(bytes);
        let mut resolver = RosterResolver::with_host(&mut cursor)?;
        resolver.read_additional_players(&mut cursor)?;
        resolver.read_slots(&mut cursor)
    }

    #[test]
    fn humans_then_existing_computers() {
        let mut bytes = player_record(HOST_RECORD, 3, "Alice");
        bytes.extend(player_record(ADDITIONAL_PLAYER_RECORD, 7, "Bob"));
        bytes.extend(game_start(&[
            slot(3, SLOT_USED, 0, 0, 0, 0x41, 1),
            slot(7, SLOT_USED, 0, 1, 1, 0x02, 1),
            slot(0, SLOT_USED, 1, 1, 2, 0x08, 2),
            slot(0, 0, 1, 0, 3, 0x20, 0),
        ]));

        let roster = resolve(&bytes).unwrap();
        assert_eq!(roster.len(), 3);
        let ids: Vec<u8> = roster.iter().map(|p| p.id.raw()).collect();
        assert_eq!(ids, vec![3, 7, 0]);

        let alice = roster.get(PlayerId(3)).unwrap();
        assert!(alice.is_host);
        assert_eq!(alice.slot, Some(SlotId(0)));
        assert_eq!(alice.race, Race::Human);
        assert_eq!(alice.color, Some(Color::Red));
        assert_eq!(alice.ai_strength, None);

        let computer = roster.by_slot(SlotId(2)).unwrap();
        assert!(computer.is_computer);
        assert!(computer.name.is_none());
        assert_eq!(computer.race, Race::Undead);
        assert_eq!(computer.ai_strength, Some(AiStrength::Insane));
        assert_eq!(computer.apm(600_000), -1.0);

        assert!(roster.by_slot(SlotId(3)).is_none());
        assert_eq!(roster.humans().count(), 2);
        assert_eq!(roster.computers().count(), 1);
        assert!(roster.get(PlayerId::COMPUTER).is_none());
    }

    #[test]
    fn used_slot_without_player_or_computer_is_not_admitted() {
        let mut bytes = player_record(HOST_RECORD, 1, "Alice");
        bytes.extend(game_start(&[
            slot(1, SLOT_USED, 0, 0, 0, 0x01, 1),
            slot(0, SLOT_USED, 0, 1, 1, 0x02, 1),
        ]));

        let roster = resolve(&bytes).unwrap();
        assert_eq!(roster.len(), 1);
        assert!(roster.by_slot(SlotId(1)).is_none());
        assert_eq!(roster.humans().count(), 1);
        assert_eq!(roster.computers().count(), 0);
    }

    #[test]
    fn slot_for_unknown_player_is_rejected() {
        let mut bytes = player_record(HOST_RECORD, 1, "Alice");
        bytes.extend(game_start(&[slot(9, SLOT_USED, 0, 0, 0, 0x01, 1)]));
        assert!(matches!(resolve(&bytes), Err(ErrorKind::UnknownPlayer(9))));
    }

    #[test]
    fn repeated_player_id_is_rejected() {
        let mut bytes = player_record(HOST_RECORD, 1, "Alice");
        bytes.extend(player_record(ADDITIONAL_PLAYER_RECORD, 1, "Mallory"));
        bytes.extend(game_start(&[]));
        assert!(matches!(resolve(&bytes), Err(ErrorKind::DuplicatePlayer(1))));
    }

    #[test]
    fn skips_padding_after_additional_records() {
        let mut bytes = player_record(HOST_RECORD, 1, "Alice");
        bytes.extend(player_record(ADDITIONAL_PLAYER_RECORD, 2, "Bob"));
        bytes.extend([0, 0, 0, 0]);
        bytes.extend(player_record(ADDITIONAL_PLAYER_RECORD, 3, "Carol"));
        bytes.extend([0, 0, 0, 0]);
        bytes.extend(game_start(&[]));

        let roster = resolve(&bytes).unwrap();
        let names: Vec<&str> = roster.iter().map(Player::display_name).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn ladder_record_keeps_runtime_and_race_flags() {
        let mut bytes = vec![HOST_RECORD, 1];
        bytes.extend(b"Grubby\0");
        bytes.push(LADDER_GAME);
        bytes.extend(1234u32.to_le_bytes());
        bytes.extend(0x02u32.to_le_bytes());

        let record = ByteCursor::new(&bytes).parse(parse_player_record).unwrap();
        assert_eq!(
            record.ladder,
            Some(LadderInfo {
                runtime_ms: 1234,
                race_flags: 2
            })
        );
    }

    #[test]
    fn unknown_record_kind_is_rejected() {
        let bytes = [HOST_RECORD, 1, b'A', 0, 0x05, 0];
        assert!(matches!(
            ByteCursor::new(&bytes).parse(parse_player_record),
            Err(ErrorKind::UnknownPlayerRecordKind(0x05))
        ));
    }

    #[test]
    fn missing_game_start_record_is_rejected() {
        let mut bytes = player_record(HOST_RECORD, 1, "Alice");
        bytes.extend([0x1A, 0, 0, 0]);
        assert!(matches!(
            resolve(&bytes),
            Err(ErrorKind::UnexpectedRecord {
                expected: GAME_START_RECORD,
                found: 0x1A
            })
        ));
    }

    #[test]
    fn tolerates_unmapped_race_and_color() {
        let mut bytes = player_record(HOST_RECORD, 1, "Alice");
        bytes.extend(game_start(&[slot(1, SLOT_USED, 0, OBSERVER_TEAM, 40, 0x10, 0)]));

        let roster = resolve(&bytes).unwrap();
        let alice = roster.get(PlayerId(1)).unwrap();
        assert_eq!(alice.race, Race::Unspecified);
        assert_eq!(alice.race_flag, 0x10);
        assert_eq!(alice.color, None);
        assert!(alice.is_observer());
    }

    #[test]
    fn race_flag_aliases() {
        assert_eq!(Race::from_flag(0x44), Some(Race::NightElf));
        assert_eq!(Race::from_flag(0x60), Some(Race::Random));
        assert_eq!(Race::from_flag(0x00), None);
        assert_eq!(Color::from_repr(12), Some(Color::Observer));
        assert_eq!(Color::from_repr(13), None);
    }

    #[test]
    fn apm_uses_playing_time() {
        let mut player = Player::new(PlayerId(1));
        player.actions.action_count = 120;
        assert_eq!(player.apm(600_000), 12.0);
        player.actions.paused_ms = 300_000;
        assert_eq!(player.apm(600_000), 24.0);
        assert_eq!(player.playing_time_ms(600_000), 300_000);
        player.is_computer = true;
        assert_eq!(player.apm(600_000), -1.0);
    }
}
