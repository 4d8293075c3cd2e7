use kinded::Kinded;
use serde::Serialize;
use tracing::{debug, trace};
use variantly::Variantly;

use crate::analyzer::Analyzer;
use crate::roster::Roster;
use crate::types::{GameClock, PlayerId, SlotId};
use crate::{ByteCursor, DecoderOptions, ErrorKind};

pub const END_OF_STREAM: u8 = 0x00;
pub const PLAYER_LEFT: u8 = 0x17;
pub const TIME_SLICE_OLD: u8 = 0x1E;
pub const TIME_SLICE: u8 = 0x1F;
pub const CHAT_MESSAGE: u8 = 0x20;

/// Chat flag for messages shown on the loading screen, which carry no scope.
const CHAT_FLAG_STARTUP: u8 = 0x10;

/// Who a chat message was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Variantly)]
pub enum ReceiverScope {
    All,
    Allies,
    Observers,
    /// Private message to the player in this slot.
    Slot(SlotId),
}

impl ReceiverScope {
    pub fn from_code(code: u32) -> ReceiverScope {
        match code {
            0 => ReceiverScope::All,
            1 => ReceiverScope::Allies,
            2 => ReceiverScope::Observers,
            n => match u8::try_from(n - 3) {
                Ok(slot) => ReceiverScope::Slot(SlotId(slot)),
                Err(_) => {
                    debug!("receiver code {n} does not name a slot, clamping to slot 255");
                    ReceiverScope::Slot(SlotId(u8::MAX))
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub sender: PlayerId,
    pub sender_name: String,
    pub flags: u8,
    /// `None` for loading-screen messages.
    pub scope: Option<ReceiverScope>,
    /// Name of the addressed player for private messages, when the slot is known.
    pub receiver_name: Option<String>,
    pub text: String,
    pub timestamp: GameClock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LeaveReason {
    ClosedByRemote,
    ClosedByLocal,
    Unknown(u32),
}

impl LeaveReason {
    pub fn from_raw(raw: u32) -> LeaveReason {
        match raw {
            0x01 => LeaveReason::ClosedByRemote,
            0x0C => LeaveReason::ClosedByLocal,
            other => LeaveReason::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerLeave {
    pub player: PlayerId,
    pub reason: LeaveReason,
    pub result: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Kinded)]
#[kinded(derive(Serialize))]
pub enum EventPayload {
    TimeSlice {
        increment_ms: u16,
        command_blocks: u16,
    },
    /// One player's action block inside a time slice, after its actions were counted.
    Commands {
        player_id: PlayerId,
        length: u16,
        counted_actions: u32,
    },
    Chat(ChatMessage),
    PlayerLeft(PlayerLeave),
    /// A block the decoder skips without interpreting.
    Unmodeled {
        block_id: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayEvent {
    /// Game time when the event was decoded.
    pub clock: GameClock,
    pub payload: EventPayload,
}

/// Size of the blocks the decoder skips without interpreting.
fn unmodeled_len(block_id: u8) -> Option<usize> {
    match block_id {
        0x1A..=0x1C => Some(4),
        0x22 => Some(5),
        0x23 => Some(10),
        0x2F => Some(8),
        _ => None,
    }
}

/// Walks the event blocks following the game start record, updating each
/// player's action statistics and collecting the chat log.
pub struct EventStreamParser<'r, 'a> {
    roster: &'r mut Roster,
    analyzers: &'a mut [Box<dyn Analyzer>],
    strict_actions: bool,
    clock: GameClock,
    chat: Vec<ChatMessage>,
}

impl<'r, 'a> EventStreamParser<'r, 'a> {
    pub fn new(
        roster: &'r mut Roster,
        options: &DecoderOptions,
        analyzers: &'a mut [Box<dyn Analyzer>],
    ) -> Self {
        EventStreamParser {
            roster,
            analyzers,
            strict_actions: options.strict_actions,
            clock: GameClock::default(),
            chat: Vec::new(),
        }
    }

    /// Parses blocks until the end-of-stream marker and returns the chat log.
    pub fn run(mut self, cursor: &mut ByteCursor<'_>) -> Result<Vec<ChatMessage>, ErrorKind> {
        loop {
            if cursor.is_empty() {
                debug!("event stream ran to the end of the buffer without a terminator");
                break;
            }
            let offset = cursor.offset();
            let block_id = cursor.read_u8()?;
            trace!("event block {block_id:#04x} at offset {offset:#x}, clock {}", self.clock);

            match block_id {
                END_OF_STREAM => break,
                TIME_SLICE_OLD | TIME_SLICE => self.time_slice(cursor)?,
                CHAT_MESSAGE => self.chat_message(cursor)?,
                PLAYER_LEFT => self.player_left(cursor)?,
                id => match unmodeled_len(id) {
                    Some(len) => {
                        cursor.skip(len)?;
                        self.emit(EventPayload::Unmodeled { block_id: id });
                    }
                    None => return Err(ErrorKind::UnknownEventBlock { id, offset }),
                },
            }
        }

        debug!(
            "event stream finished at {} with {} chat message(s)",
            self.clock,
            self.chat.len()
        );
        Ok(self.chat)
    }

    fn emit(&mut self, payload: EventPayload) {
        let event = ReplayEvent {
            clock: self.clock,
            payload,
        };
        for analyzer in self.analyzers.iter_mut() {
            analyzer.process(&event);
        }
    }

    fn time_slice(&mut self, cursor: &mut ByteCursor<'_>) -> Result<(), ErrorKind> {
        let len = cursor.read_u16()?;
        if len < 2 {
            return Err(ErrorKind::MalformedTimeSlice(len));
        }
        let mut window = cursor.take(usize::from(len))?;
        let increment_ms = window.read_u16()?;
        self.clock.advance(increment_ms);

        let mut command_blocks = 0u16;
        while !window.is_empty() {
            let player_id = PlayerId(window.read_u8()?);
            let length = window.read_u16()?;
            let block = window.take(usize::from(length))?;

            let player = self.roster.resolve_mut(player_id)?;
            let counted_actions = player.actions.consume_block(
                player_id,
                block,
                increment_ms,
                self.strict_actions,
            )?;
            command_blocks = command_blocks.saturating_add(1);
            self.emit(EventPayload::Commands {
                player_id,
                length,
                counted_actions,
            });
        }

        self.emit(EventPayload::TimeSlice {
            increment_ms,
            command_blocks,
        });
        Ok(())
    }

    fn chat_message(&mut self, cursor: &mut ByteCursor<'_>) -> Result<(), ErrorKind> {
        let sender = PlayerId(cursor.read_u8()?);
        let len = cursor.read_u16()?;
        let mut window = cursor.take(usize::from(len))?;

        let flags = window.read_u8()?;
        let scope = if flags == CHAT_FLAG_STARTUP {
            None
        } else {
            Some(ReceiverScope::from_code(window.read_u32()?))
        };
        let text = String::from_utf8_lossy(window.read_cstring()?).into_owned();
        if !window.is_empty() {
            trace!("ignoring {} trailing byte(s) in chat block", window.remaining());
        }

        let sender_name = self.roster.resolve(sender)?.display_name().to_owned();
        let receiver_name = match scope {
            Some(ReceiverScope::Slot(slot)) => self
                .roster
                .by_slot(slot)
                .and_then(|player| player.name.clone()),
            _ => None,
        };

        let message = ChatMessage {
            sender,
            sender_name,
            flags,
            scope,
            receiver_name,
            text,
            timestamp: self.clock,
        };
        self.chat.push(message.clone());
        self.emit(EventPayload::Chat(message));
        Ok(())
    }

    fn player_left(&mut self, cursor: &mut ByteCursor<'_>) -> Result<(), ErrorKind> {
        let reason = LeaveReason::from_raw(cursor.read_u32()?);
        let player = PlayerId(cursor.read_u8()?);
        let result = cursor.read_u32()?;
        cursor.skip(4)?;

        self.roster.resolve(player)?;
        debug!("player {player} left at {}: {reason:?}, result {result:#x}", self.clock);
        self.emit(EventPayload::PlayerLeft(PlayerLeave {
            player,
            reason,
            result,
        }));
        Ok(())
    }
}
