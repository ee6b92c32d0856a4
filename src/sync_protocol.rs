// Leader/follower sync packet definitions for the broadcast channel

use crate::fmt::*;
use crate::state::Status;

/// Packet kind byte
pub mod packet_kind {
    /// Duty cycle update (dc: i16, status: i16)
    pub const DUTY: u8 = b'd';

    /// Shutdown sentinel, the follower powers off
    pub const SHUTDOWN: u8 = b'x';
}

/// Encoded packet length: kind (1) + dc (2) + status (2)
pub const PACKET_LEN: usize = 5;

/// Duty cycle field of a sync packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncDuty {
    Duty(i16),
    Shutdown,
}

/// One broadcast value. Last value wins; there is no sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncPacket {
    pub duty: SyncDuty,
    /// Raw status code (range checked by the follower)
    pub status: i16,
}

impl SyncPacket {
    pub const fn duty(duty: i16, status: Status) -> Self {
        Self {
            duty: SyncDuty::Duty(duty),
            status: status.code() as i16,
        }
    }

    pub const fn shutdown() -> Self {
        Self {
            duty: SyncDuty::Shutdown,
            status: Status::Stop.code() as i16,
        }
    }
}

/// Encode a sync packet
///
/// # Returns
/// 5-byte array: kind, dc (i16 LE), status (i16 LE)
pub fn encode_packet(packet: &SyncPacket) -> [u8; PACKET_LEN] {
    let mut data = [0u8; PACKET_LEN];

    let duty = match packet.duty {
        SyncDuty::Duty(duty) => {
            data[0] = packet_kind::DUTY;
            duty
        }
        SyncDuty::Shutdown => {
            data[0] = packet_kind::SHUTDOWN;
            0
        }
    };
    data[1..3].copy_from_slice(&duty.to_le_bytes());
    data[3..5].copy_from_slice(&packet.status.to_le_bytes());

    data
}

/// Parse a received sync packet
///
/// # Returns
/// * `Some(SyncPacket)` if parsing successful
/// * `None` if the frame is too short or of an unknown kind
pub fn parse_packet(data: &[u8]) -> Option<SyncPacket> {
    if data.len() < PACKET_LEN {
        error!("Sync packet: invalid data length {}", data.len());
        return None;
    }

    let duty = i16::from_le_bytes([data[1], data[2]]);
    let status = i16::from_le_bytes([data[3], data[4]]);

    let duty = match data[0] {
        packet_kind::DUTY => SyncDuty::Duty(duty),
        packet_kind::SHUTDOWN => SyncDuty::Shutdown,
        kind => {
            error!("Sync packet: unknown kind {:#x}", kind);
            return None;
        }
    };

    Some(SyncPacket { duty, status })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duty_packet_layout() {
        let data = encode_packet(&SyncPacket::duty(-35, Status::Go2));
        assert_eq!(data[0], b'd');
        assert_eq!(&data[1..3], &(-35i16).to_le_bytes());
        assert_eq!(&data[3..5], &[3, 0]);
        assert_eq!(parse_packet(&data), Some(SyncPacket::duty(-35, Status::Go2)));
    }

    #[test]
    fn test_shutdown_is_distinct_from_any_duty() {
        let sentinel = encode_packet(&SyncPacket::shutdown());
        assert_eq!(sentinel[0], b'x');
        for duty in [-100, 0, 100, i16::MIN, i16::MAX] {
            assert_ne!(encode_packet(&SyncPacket::duty(duty, Status::Stop)), sentinel);
        }
        assert_eq!(parse_packet(&sentinel).map(|p| p.duty), Some(SyncDuty::Shutdown));
    }

    #[test]
    fn test_out_of_range_values_survive_parsing() {
        let mut data = [0u8; PACKET_LEN];
        data[0] = b'd';
        data[1..3].copy_from_slice(&150i16.to_le_bytes());
        data[3..5].copy_from_slice(&(-5i16).to_le_bytes());

        let packet = parse_packet(&data).unwrap();
        assert_eq!(packet.duty, SyncDuty::Duty(150));
        assert_eq!(packet.status, -5);
    }

    #[test]
    fn test_rejects_malformed_frames() {
        assert_eq!(parse_packet(&[b'd', 0, 0]), None);
        assert_eq!(parse_packet(&[]), None);
        assert_eq!(parse_packet(&[b'?', 0, 0, 0, 0]), None);
    }
}
