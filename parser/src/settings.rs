use serde::Serialize;

use crate::{ByteCursor, ErrorKind};

/// Size of the game-settings flags at the start of the unmasked string.
const SETTINGS_FLAGS_LEN: usize = 13;

/// Reverses the bit-mask obfuscation of the encoded settings string.
///
/// The input is processed in groups of 8 bytes. The first byte of a group is
/// the mask; each following byte at position `p` (1..=7) is emitted as-is if
/// mask bit `p` is set, otherwise decremented by one.
pub fn unmask(encoded: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(encoded.len());
    for group in encoded.chunks(8) {
        let mask = group[0];
        for (position, &byte) in group.iter().enumerate().skip(1) {
            if mask & (1 << position) == 0 {
                decoded.push(byte.wrapping_sub(1));
            } else {
                decoded.push(byte);
            }
        }
    }
    decoded
}

/// Map and creator recovered from the masked settings string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MapInfo {
    pub map_name: String,
    /// "Battle.Net" for ladder games.
    pub creator_name: String,
}

impl MapInfo {
    /// Interprets an unmasked settings string: 13 bytes of flags, then the
    /// map path, the creator name and an always-empty string.
    pub fn from_unmasked(decoded: &[u8]) -> Result<MapInfo, ErrorKind> {
        let mut cursor = ByteCursor::new(decoded);
        cursor.skip(SETTINGS_FLAGS_LEN)?;
        let map_name = String::from_utf8_lossy(cursor.read_cstring()?).into_owned();
        let creator_name = String::from_utf8_lossy(cursor.read_cstring()?).into_owned();
        cursor.read_cstring()?;
        Ok(MapInfo {
            map_name,
            creator_name,
        })
    }
}

/// Lobby-level information about the game, outside the player roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameSettings {
    pub game_name: String,
    pub map_name: String,
    pub creator_name: String,
    /// Exact player count on Battle.net, slot count in custom games.
    pub player_count: u32,
    pub game_type: u8,
    pub private_flag: u8,
    pub language_id: u32,
    pub random_seed: u32,
    pub select_mode: u8,
    pub start_spot_count: u8,
}

impl GameSettings {
    pub fn is_private(&self) -> bool {
        self.private_flag == 0x08
    }
}
