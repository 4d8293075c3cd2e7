use nom::bytes::complete::take;
use nom::number::complete::{le_u8, le_u16};
use serde::Serialize;
use tracing::debug;

use crate::cursor::cstring;
use crate::types::PlayerId;
use crate::{ByteCursor, ErrorKind, IResult};

/// Layout of an action record's payload, following its opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionShape {
    /// A fixed number of payload bytes.
    Fixed(usize),
    /// `prefix` bytes, a u16 item count, then `item_len` bytes per item.
    Counted { prefix: usize, item_len: usize },
    /// Selection mode byte, u16 unit count, 8 bytes per unit.
    Selection,
    /// `prefix` bytes, then a zero-terminated string.
    Text { prefix: usize },
    Pause,
    Resume,
}

/// What parsing one record told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Skipped,
    Selected { adding: bool },
    Pause,
    Resume,
}

const SELECT_ADD: u8 = 0x01;

impl ActionShape {
    fn parse(self, i: &[u8]) -> IResult<&[u8], Step> {
        match self {
            ActionShape::Fixed(len) => {
                let (i, _) = take(len)(i)?;
                Ok((i, Step::Skipped))
            }
            ActionShape::Counted { prefix, item_len } => {
                let (i, _) = take(prefix)(i)?;
                let (i, count) = le_u16(i)?;
                let (i, _) = take(usize::from(count) * item_len)(i)?;
                Ok((i, Step::Skipped))
            }
            ActionShape::Selection => {
                let (i, mode) = le_u8(i)?;
                let (i, count) = le_u16(i)?;
                let (i, _) = take(usize::from(count) * 8)(i)?;
                Ok((
                    i,
                    Step::Selected {
                        adding: mode == SELECT_ADD,
                    },
                ))
            }
            ActionShape::Text { prefix } => {
                let (i, _) = take(prefix)(i)?;
                let (i, _) = cstring(i)?;
                Ok((i, Step::Skipped))
            }
            ActionShape::Pause => Ok((i, Step::Pause)),
            ActionShape::Resume => Ok((i, Step::Resume)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionEntry {
    pub name: &'static str,
    pub shape: ActionShape,
    /// Whether the action counts toward APM. Selections count only when adding.
    pub counted: bool,
}

const fn action(name: &'static str, shape: ActionShape, counted: bool) -> Option<ActionEntry> {
    Some(ActionEntry {
        name,
        shape,
        counted,
    })
}

static ACTIONS: [Option<ActionEntry>; 256] = build_action_table();

const fn build_action_table() -> [Option<ActionEntry>; 256] {
    use ActionShape::*;

    let mut table: [Option<ActionEntry>; 256] = [None; 256];
    table[0x01] = action("pause game", Pause, false);
    table[0x02] = action("resume game", Resume, false);
    table[0x03] = action("set game speed", Fixed(1), false);
    table[0x04] = action("increase game speed", Fixed(0), false);
    table[0x05] = action("decrease game speed", Fixed(0), false);
    table[0x06] = action("save game", Text { prefix: 0 }, false);
    table[0x07] = action("save game finished", Fixed(4), false);
    table[0x10] = action("ability", Fixed(14), true);
    table[0x11] = action("ability with target position", Fixed(21), true);
    table[0x12] = action("ability with target position and object", Fixed(29), true);
    table[0x13] = action("give or drop item", Fixed(37), true);
    table[0x14] = action("ability with two targets and items", Fixed(42), true);
    table[0x16] = action("change selection", Selection, false);
    table[0x17] = action(
        "assign group hotkey",
        Counted {
            prefix: 1,
            item_len: 8,
        },
        true,
    );
    table[0x18] = action("select group hotkey", Fixed(2), true);
    table[0x19] = action("select subgroup", Fixed(12), false);
    table[0x1A] = action("pre subselection", Fixed(0), false);
    table[0x1B] = action("unknown 0x1b", Fixed(9), false);
    table[0x1C] = action("select ground item", Fixed(9), true);
    table[0x1D] = action("cancel hero revival", Fixed(8), true);
    table[0x1E] = action("remove unit from queue", Fixed(5), true);
    table[0x21] = action("unknown 0x21", Fixed(8), false);

    // 0x20 and 0x22..=0x32 are single player cheats; most carry no payload
    table[0x20] = action("cheat", Fixed(0), false);
    let mut opcode = 0x22;
    while opcode <= 0x32 {
        table[opcode] = action("cheat", Fixed(0), false);
        opcode += 1;
    }
    table[0x27] = action("cheat with amount", Fixed(5), false);
    table[0x28] = action("cheat with amount", Fixed(5), false);
    table[0x2D] = action("cheat with amount", Fixed(5), false);
    table[0x2E] = action("cheat with value", Fixed(4), false);

    table[0x50] = action("change ally options", Fixed(5), false);
    table[0x51] = action("transfer resources", Fixed(9), false);
    table[0x60] = action("map trigger chat command", Text { prefix: 8 }, false);
    table[0x61] = action("escape pressed", Fixed(0), true);
    table[0x62] = action("scenario trigger", Fixed(12), false);
    table[0x66] = action("enter hero skill submenu", Fixed(0), true);
    table[0x67] = action("enter building submenu", Fixed(0), true);
    table[0x68] = action("minimap ping", Fixed(12), false);
    table[0x69] = action("continue game (block b)", Fixed(16), false);
    table[0x6A] = action("continue game (block a)", Fixed(16), false);
    table[0x75] = action("unknown 0x75", Fixed(1), false);
    table
}

/// Looks up the record layout for an action opcode.
pub fn action_entry(opcode: u8) -> Option<&'static ActionEntry> {
    ACTIONS[usize::from(opcode)].as_ref()
}

/// Per-player action accounting, carried across time slices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionStats {
    pub pausing: bool,
    pub action_count: u32,
    pub paused_ms: u32,
}

impl ActionStats {
    /// Consumes one player's action block for a time slice of `elapsed_ms`.
    ///
    /// While paused, the whole slice counts as paused time, even when the
    /// pause only started partway through it. Returns the number of actions
    /// in the block that counted toward APM.
    pub fn consume_block(
        &mut self,
        player: PlayerId,
        mut block: ByteCursor<'_>,
        elapsed_ms: u16,
        strict: bool,
    ) -> Result<u32, ErrorKind> {
        if self.pausing {
            self.paused_ms = self.paused_ms.saturating_add(u32::from(elapsed_ms));
        }

        let mut counted = 0u32;
        while !block.is_empty() {
            let offset = block.offset();
            let opcode = block.read_u8()?;
            let Some(entry) = action_entry(opcode) else {
                if strict {
                    return Err(ErrorKind::UnknownAction {
                        opcode,
                        player: player.raw(),
                    });
                }
                debug!(
                    "unknown action opcode {opcode:#04x} from player {player} at offset {offset:#x}, treating as zero-length"
                );
                continue;
            };

            let step = block.parse(|i| entry.shape.parse(i))?;
            match step {
                Step::Pause => self.pausing = true,
                Step::Resume => self.pausing = false,
                Step::Selected { adding } if adding => counted += 1,
                Step::Selected { .. } => {}
                Step::Skipped if entry.counted => counted += 1,
                Step::Skipped => {}
            }
        }

        self.action_count = self.action_count.saturating_add(counted);
        Ok(counted)
    }

    /// Actions per minute over the unpaused part of `duration_ms`.
    /// Not finite when the unpaused duration is zero.
    pub fn apm(&self, duration_ms: u32) -> f64 {
        let playing_ms = f64::from(duration_ms) - f64::from(self.paused_ms);
        f64::from(self.action_count) / (playing_ms / 60_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PLAYER: PlayerId = PlayerId(1);

    fn consume(stats: &mut ActionStats, bytes: &[u8], elapsed: u16) -> Result<u32, ErrorKind> {
        stats.consume_block(PLAYER, ByteCursor::new(bytes), elapsed, false)
    }

    #[test]
    fn table_covers_documented_opcodes() {
        let known = (0..=255u8).filter(|op| action_entry(*op).is_some()).count();
        assert_eq!(known, 51);
        assert!(action_entry(0x15).is_none());
        assert_eq!(action_entry(0x11).unwrap().shape, ActionShape::Fixed(21));
        assert_eq!(action_entry(0x16).unwrap().shape, ActionShape::Selection);
    }

    #[test]
    fn counts_commands_and_skips_payloads() {
        let mut block = vec![0x10];
        block.extend([0u8; 14]);
        // selection that adds two units
        block.extend([0x16, 0x01, 0x02, 0x00]);
        block.extend([0u8; 16]);
        // selection that removes one unit
        block.extend([0x16, 0x02, 0x01, 0x00]);
        block.extend([0u8; 8]);
        // assign hotkey with one unit
        block.extend([0x17, 0x00, 0x01, 0x00]);
        block.extend([0u8; 8]);
        block.extend([0x18, 0x00, 0x03]);
        block.push(0x61);
        // save game, not counted
        block.push(0x06);
        block.extend(b"save1\0");

        let mut stats = ActionStats::default();
        assert_eq!(consume(&mut stats, &block, 250).unwrap(), 5);
        assert_eq!(stats.action_count, 5);
        assert!(!stats.pausing);
    }

    #[test]
    fn pause_time_is_charged_per_whole_slice() {
        let mut stats = ActionStats::default();
        consume(&mut stats, &[0x01], 250).unwrap();
        assert!(stats.pausing);
        // the slice that set the pause is not charged
        assert_eq!(stats.paused_ms, 0);

        consume(&mut stats, &[], 250).unwrap();
        // resumed partway through, still charged in full
        consume(&mut stats, &[0x02], 100).unwrap();
        assert!(!stats.pausing);
        assert_eq!(stats.paused_ms, 350);

        consume(&mut stats, &[], 250).unwrap();
        assert_eq!(stats.paused_ms, 350);
        assert_eq!(stats.action_count, 0);
    }

    #[test]
    fn unknown_opcodes_are_zero_length_unless_strict() {
        let block = [0xEE, 0x61];
        let mut stats = ActionStats::default();
        assert_eq!(consume(&mut stats, &block, 100).unwrap(), 1);

        let mut strict = ActionStats::default();
        assert!(matches!(
            strict.consume_block(PLAYER, ByteCursor::new(&block), 100, true),
            Err(ErrorKind::UnknownAction {
                opcode: 0xEE,
                player: 1
            })
        ));
    }

    #[test]
    fn record_overrunning_the_block_is_rejected() {
        let mut block = vec![0x11];
        block.extend([0u8; 20]);
        let mut stats = ActionStats::default();
        assert!(matches!(
            consume(&mut stats, &block, 100),
            Err(ErrorKind::OutOfBounds { .. })
        ));
    }

    #[test]
    fn apm_excludes_paused_time() {
        let stats = ActionStats {
            action_count: 120,
            ..Default::default()
        };
        assert_eq!(stats.apm(600_000), 12.0);

        let paused = ActionStats {
            paused_ms: 300_000,
            ..stats
        };
        assert_eq!(paused.apm(600_000), 24.0);
        assert!(!stats.apm(0).is_finite());
    }

    /// Encodes one well-formed record for `opcode`, returning its bytes and
    /// whether it counts toward APM.
    fn encode(opcode: u8, items: u16, text: &str, adding: bool) -> (Vec<u8>, bool) {
        let entry = action_entry(opcode).unwrap();
        let mut out = vec![opcode];
        let counted = match entry.shape {
            ActionShape::Fixed(len) => {
                out.extend(std::iter::repeat(0xAB).take(len));
                entry.counted
            }
            ActionShape::Counted { prefix, item_len } => {
                out.extend(std::iter::repeat(0).take(prefix));
                out.extend(items.to_le_bytes());
                out.extend(std::iter::repeat(0x7F).take(usize::from(items) * item_len));
                entry.counted
            }
            ActionShape::Selection => {
                out.push(if adding { 0x01 } else { 0x02 });
                out.extend(items.to_le_bytes());
                out.extend(std::iter::repeat(0x11).take(usize::from(items) * 8));
                adding
            }
            ActionShape::Text { prefix } => {
                out.extend(std::iter::repeat(0x05).take(prefix));
                out.extend(text.as_bytes());
                out.push(0);
                entry.counted
            }
            ActionShape::Pause | ActionShape::Resume => false,
        };
        (out, counted)
    }

    fn known_opcodes() -> Vec<u8> {
        (0..=255u8).filter(|op| action_entry(*op).is_some()).collect()
    }

    proptest! {
        #[test]
        fn consumes_exactly_the_declared_length(
            records in prop::collection::vec(
                (prop::sample::select(known_opcodes()), 0u16..4, "[a-z]{0,8}", any::<bool>()),
                1..24,
            ),
            cut in 1usize..64,
        ) {
            let mut block = Vec::new();
            let mut expected = 0u32;
            let mut last_len = 0;
            for (opcode, items, text, adding) in &records {
                let (bytes, counted) = encode(*opcode, *items, text, *adding);
                last_len = bytes.len();
                block.extend(bytes);
                expected += u32::from(counted);
            }

            let mut stats = ActionStats::default();
            prop_assert_eq!(consume(&mut stats, &block, 100).unwrap(), expected);

            // cutting into the last record leaves a partial record behind
            if last_len > 1 {
                let cut = 1 + cut % (last_len - 1);
                let truncated = &block[..block.len() - cut];
                let mut stats = ActionStats::default();
                let result = consume(&mut stats, truncated, 100);
                prop_assert!(
                    matches!(result, Err(ErrorKind::OutOfBounds { .. })),
                    "expected overrun error, got {:?}",
                    result
                );
            }
        }
    }
}
