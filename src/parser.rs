//! Resynchronizing byte-at-a-time packet parser, grounded in
//! `YDLidarX4StateMachine`: a flat state enum with one handler per variant,
//! advanced a single step at a time by [`Driver::run`](crate::Driver::run).

use crate::log::{LogLevel, log_debug, log_trace};
use crate::protocol::{self, IndexReading, ScanPacket};
use crate::queue::ByteQueue;

/// Offset of the LSN byte within a scan-packet header.
const LSN_OFFSET: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ParserState {
    Idle,
    Ready,
    Start,
    StartNeedMoreData,
    StartCheckPacket,
    StartRemovePacket,
    ScanNeedHeader,
    ScanNeedSize,
    ScanNeedData,
    ScanCheckCrc,
    ScanSendMessage,
    Stop,
    Timeout,
    End,
    Error,
}

/// Diagnostic reason the parser is sitting in [`ParserState::Error`],
/// retrievable via `Driver::last_fault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ParserFault {
    /// Neither the start-response nor a scan header was found.
    UnrecognizedStartByte,
    /// The 7-byte start-response didn't match the expected literal.
    BadStartResponse,
    /// Computed XOR didn't match the packet's CS field.
    ChecksumMismatch,
    /// The byte queue was full and could not accept a newly-received byte.
    QueueOverflow,
}

/// Byte-at-a-time resynchronizing parser. Owns its packet scratch buffer and
/// the angle/range arrays filled per dispatched packet; no heap allocation.
pub struct Parser {
    state: ParserState,
    fault: Option<ParserFault>,
    packet: [u8; protocol::MAX_PACKET_LEN],
    expected_size: usize,
    angles: [f32; 256],
    ranges: [f32; 256],
    log_level: LogLevel,
}

impl Parser {
    pub const fn new(log_level: LogLevel) -> Self {
        Self {
            state: ParserState::Idle,
            fault: None,
            packet: [0u8; protocol::MAX_PACKET_LEN],
            expected_size: 0,
            angles: [0.0; 256],
            ranges: [0.0; 256],
            log_level,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn last_fault(&self) -> Option<ParserFault> {
        self.fault
    }

    pub fn set_state_idle(&mut self) {
        self.set_state(ParserState::Idle);
    }

    pub fn set_state_stop(&mut self) {
        self.set_state(ParserState::Stop);
    }

    pub fn set_state_timeout(&mut self) {
        self.set_state(ParserState::Timeout);
    }

    pub fn set_state_error(&mut self, fault: ParserFault) {
        self.fault = Some(fault);
        self.set_state(ParserState::Error);
    }

    fn set_state(&mut self, new_state: ParserState) {
        log_debug!(
            self.log_level,
            "parser state {} -> {}",
            self.state,
            new_state
        );
        self.state = new_state;
    }

    pub fn has_error(&self) -> bool {
        self.state == ParserState::Error
    }

    pub fn has_timeout(&self) -> bool {
        self.state == ParserState::Timeout
    }

    pub fn is_scanning(&self) -> bool {
        matches!(
            self.state,
            ParserState::Ready
                | ParserState::Start
                | ParserState::StartNeedMoreData
                | ParserState::StartCheckPacket
                | ParserState::StartRemovePacket
                | ParserState::ScanNeedHeader
                | ParserState::ScanNeedSize
                | ParserState::ScanNeedData
                | ParserState::ScanCheckCrc
                | ParserState::ScanSendMessage
        )
    }

    /// Advances the state machine by at most one transition. Returns whether
    /// the state changed.
    pub fn step<const N: usize>(
        &mut self,
        queue: &ByteQueue<N>,
        on_scan: &mut dyn FnMut(ScanPacket<'_>),
        on_index: Option<&mut dyn FnMut(IndexReading)>,
    ) -> bool {
        let old_state = self.state;
        let new_state = self.handle_state(queue, on_scan, on_index);
        if new_state != old_state {
            self.set_state(new_state);
        }
        new_state != old_state
    }

    fn handle_state<const N: usize>(
        &mut self,
        queue: &ByteQueue<N>,
        on_scan: &mut dyn FnMut(ScanPacket<'_>),
        on_index: Option<&mut dyn FnMut(IndexReading)>,
    ) -> ParserState {
        match self.state {
            ParserState::Idle => {
                queue.clear();
                ParserState::Ready
            }
            ParserState::Ready => {
                if queue.is_empty() {
                    ParserState::Ready
                } else {
                    ParserState::Start
                }
            }
            ParserState::Start => self.handle_start(queue),
            ParserState::StartNeedMoreData => {
                if queue.len() < protocol::START_RESPONSE.len() {
                    ParserState::StartNeedMoreData
                } else {
                    ParserState::StartCheckPacket
                }
            }
            ParserState::StartCheckPacket => {
                if Self::is_correct_start_response(queue) {
                    ParserState::StartRemovePacket
                } else {
                    self.fault = Some(ParserFault::BadStartResponse);
                    ParserState::Error
                }
            }
            ParserState::StartRemovePacket => {
                queue.drop_front(protocol::START_RESPONSE.len());
                ParserState::ScanNeedSize
            }
            ParserState::ScanNeedHeader => self.handle_scan_need_header(queue),
            ParserState::ScanNeedSize => {
                if queue.len() <= LSN_OFFSET {
                    ParserState::ScanNeedSize
                } else {
                    let lsn = queue.peek(LSN_OFFSET);
                    self.expected_size = protocol::HEADER_LEN + 2 * (lsn as usize);
                    ParserState::ScanNeedData
                }
            }
            ParserState::ScanNeedData => {
                if queue.len() < self.expected_size {
                    ParserState::ScanNeedData
                } else {
                    ParserState::ScanCheckCrc
                }
            }
            ParserState::ScanCheckCrc => {
                queue.extract(&mut self.packet[..self.expected_size], self.expected_size);
                if Self::crc_matches(&self.packet[..self.expected_size]) {
                    ParserState::ScanSendMessage
                } else {
                    self.fault = Some(ParserFault::ChecksumMismatch);
                    ParserState::Error
                }
            }
            ParserState::ScanSendMessage => {
                self.dispatch(on_scan, on_index);
                ParserState::ScanNeedHeader
            }
            ParserState::Stop => {
                queue.clear();
                ParserState::End
            }
            ParserState::Timeout => ParserState::Timeout,
            ParserState::End => ParserState::End,
            ParserState::Error => ParserState::Error,
        }
    }

    fn handle_start<const N: usize>(&mut self, queue: &ByteQueue<N>) -> ParserState {
        if queue.peek(0) != 0xA5 {
            if queue.peek(0) == 0xAA {
                if queue.len() > 1 && queue.peek(1) == 0x55 {
                    return ParserState::ScanNeedSize;
                }
                return ParserState::Start;
            }
            self.fault = Some(ParserFault::UnrecognizedStartByte);
            return ParserState::Error;
        }
        ParserState::StartNeedMoreData
    }

    fn is_correct_start_response<const N: usize>(queue: &ByteQueue<N>) -> bool {
        for (i, &expected) in protocol::START_RESPONSE.iter().enumerate() {
            if queue.peek(i) != expected {
                return false;
            }
        }
        true
    }

    /// `ScanNeedHeader`'s resynchronization policy: command-reply frame
    /// skip, leading-zero stripping, else `Error`.
    fn handle_scan_need_header<const N: usize>(&mut self, queue: &ByteQueue<N>) -> ParserState {
        if queue.len() <= 1 {
            return ParserState::ScanNeedHeader;
        }
        if queue.peek(0) != 0xAA {
            if queue.peek(0) == 0xA5 {
                if queue.peek(1) == 0x5A {
                    // Command-reply frame (device-info/health); byte[2] is
                    // the payload length L, frame total is L+7. Need the
                    // length byte before anything else.
                    if queue.len() < 3 {
                        return ParserState::ScanNeedHeader;
                    }
                    let len_to_remove = queue.peek(2) as usize + 7;
                    if queue.len() < len_to_remove {
                        return ParserState::ScanNeedHeader;
                    }
                    queue.drop_front(len_to_remove);
                    return ParserState::ScanNeedHeader;
                }
            } else if queue.peek(0) == 0x00 {
                while !queue.is_empty() && queue.peek(0) == 0x00 {
                    queue.drop_front(1);
                }
                return ParserState::ScanNeedHeader;
            }
            self.fault = Some(ParserFault::UnrecognizedStartByte);
            return ParserState::Error;
        }
        if queue.peek(1) != 0x55 {
            self.fault = Some(ParserFault::UnrecognizedStartByte);
            return ParserState::Error;
        }
        ParserState::ScanNeedSize
    }

    fn crc_matches(packet: &[u8]) -> bool {
        let ph = u16::from_le_bytes([packet[0], packet[1]]);
        let ct = packet[2];
        let lsn = packet[3];
        let fsa = u16::from_le_bytes([packet[4], packet[5]]);
        let lsa = u16::from_le_bytes([packet[6], packet[7]]);
        let cs = u16::from_le_bytes([packet[8], packet[9]]);

        let n = lsn as usize;
        let mut samples = [0u16; 256];
        for i in 0..n {
            let off = protocol::HEADER_LEN + 2 * i;
            samples[i] = u16::from_le_bytes([packet[off], packet[off + 1]]);
        }

        cs == protocol::checksum(ph, ct, lsn, fsa, lsa, &samples[..n])
    }

    fn dispatch(
        &mut self,
        on_scan: &mut dyn FnMut(ScanPacket<'_>),
        on_index: Option<&mut dyn FnMut(IndexReading)>,
    ) {
        let packet = &self.packet;
        let ct = packet[2];
        let lsn = packet[3] as usize;
        let fsa = u16::from_le_bytes([packet[4], packet[5]]);
        let lsa = u16::from_le_bytes([packet[6], packet[7]]);

        let first_angle_deg = protocol::angle_degrees(fsa);
        let last_angle_deg = protocol::angle_degrees(lsa);

        let mut samples = [0u16; 256];
        for i in 0..lsn {
            let off = protocol::HEADER_LEN + 2 * i;
            samples[i] = u16::from_le_bytes([packet[off], packet[off + 1]]);
        }

        protocol::interpolate_and_correct(
            first_angle_deg,
            last_angle_deg,
            &samples[..lsn],
            &mut self.angles[..lsn],
            &mut self.ranges[..lsn],
        );

        log_trace!(
            self.log_level,
            "packet ct={} angles {}..{} samples={}",
            ct,
            first_angle_deg,
            last_angle_deg,
            lsn
        );

        if ct == protocol::CONTENT_TYPE_INDEX {
            if lsn == 0 {
                return;
            }
            match on_index {
                Some(on_index) => on_index(IndexReading {
                    angle_deg: self.angles[0],
                    range_mm: self.ranges[0],
                }),
                None => on_scan(ScanPacket {
                    first_angle_deg,
                    last_angle_deg,
                    angles_deg: &self.angles[..1],
                    ranges_mm: &self.ranges[..1],
                }),
            }
        } else {
            on_scan(ScanPacket {
                first_angle_deg,
                last_angle_deg,
                angles_deg: &self.angles[..lsn],
                ranges_mm: &self.ranges[..lsn],
            });
        }
    }
}
