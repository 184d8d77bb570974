/*!
 * Packet-loss attribute between two partitions
 */

use enclave_proto::PartitionConnectionInfo;

use super::PartitionError;

/// Smallest packet loss that has any effect on traffic
///
/// Connections below this are effectively unblocked, though they still
/// serialize with their exact value.
pub const MIN_PACKET_LOSS_PERCENTAGE: f32 = 0.01;

/// Fully blocked connection
pub const MAX_PACKET_LOSS_PERCENTAGE: f32 = 100.0;

/// Traffic allowed between an unordered pair of partitions
///
/// The packet loss is always a finite value in [0, 100]; every constructor
/// enforces this, so a `PartitionConnection` can be serialized without
/// further checks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartitionConnection {
    packet_loss_percentage: f32,
}

impl PartitionConnection {
    /// No packet loss
    pub const fn unblocked() -> Self {
        Self {
            packet_loss_percentage: 0.0,
        }
    }

    /// Every packet dropped
    pub const fn blocked() -> Self {
        Self {
            packet_loss_percentage: MAX_PACKET_LOSS_PERCENTAGE,
        }
    }

    /// Partial packet loss, strictly between 0 and 100 percent
    pub fn soft(packet_loss_percentage: f32) -> Result<Self, PartitionError> {
        if !packet_loss_percentage.is_finite()
            || packet_loss_percentage <= 0.0
            || packet_loss_percentage >= MAX_PACKET_LOSS_PERCENTAGE
        {
            return Err(PartitionError::InvalidSoftPacketLoss {
                value: packet_loss_percentage,
            });
        }
        Ok(Self {
            packet_loss_percentage,
        })
    }

    /// Any packet loss in [0, 100]
    pub fn with_packet_loss(packet_loss_percentage: f32) -> Result<Self, PartitionError> {
        let conn = Self {
            packet_loss_percentage,
        };
        conn.check_range()?;
        Ok(conn)
    }

    pub fn packet_loss_percentage(&self) -> f32 {
        self.packet_loss_percentage
    }

    pub fn is_blocked(&self) -> bool {
        self.packet_loss_percentage >= MAX_PACKET_LOSS_PERCENTAGE
    }

    /// True for zero loss and for loss below [`MIN_PACKET_LOSS_PERCENTAGE`]
    pub fn is_effectively_unblocked(&self) -> bool {
        self.packet_loss_percentage < MIN_PACKET_LOSS_PERCENTAGE
    }

    /// Fail unless the loss is a finite value in [0, 100]
    pub fn check_range(&self) -> Result<(), PartitionError> {
        let value = self.packet_loss_percentage;
        if value.is_finite() && (0.0..=MAX_PACKET_LOSS_PERCENTAGE).contains(&value) {
            Ok(())
        } else {
            Err(PartitionError::PacketLossOutOfRange { value })
        }
    }

    pub fn to_wire(&self) -> PartitionConnectionInfo {
        PartitionConnectionInfo {
            packet_loss_percentage: self.packet_loss_percentage,
        }
    }
}

impl TryFrom<&PartitionConnectionInfo> for PartitionConnection {
    type Error = PartitionError;

    fn try_from(info: &PartitionConnectionInfo) -> Result<Self, Self::Error> {
        Self::with_packet_loss(info.packet_loss_percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_instances() {
        assert_eq!(PartitionConnection::unblocked().packet_loss_percentage(), 0.0);
        assert!(PartitionConnection::unblocked().is_effectively_unblocked());
        assert!(PartitionConnection::blocked().is_blocked());
        assert_eq!(PartitionConnection::default(), PartitionConnection::unblocked());
    }

    #[test]
    fn test_soft_bounds() {
        assert!(PartitionConnection::soft(50.0).is_ok());
        assert!(PartitionConnection::soft(99.0).is_ok());
        assert!(PartitionConnection::soft(0.0).is_err());
        assert!(PartitionConnection::soft(100.0).is_err());
        assert!(PartitionConnection::soft(-1.0).is_err());
        assert!(PartitionConnection::soft(f32::NAN).is_err());
    }

    #[test]
    fn test_with_packet_loss_range() {
        assert!(PartitionConnection::with_packet_loss(0.0).is_ok());
        assert!(PartitionConnection::with_packet_loss(100.0).is_ok());
        assert_eq!(
            PartitionConnection::with_packet_loss(100.5),
            Err(PartitionError::PacketLossOutOfRange { value: 100.5 })
        );
        assert!(PartitionConnection::with_packet_loss(-0.1).is_err());
        assert!(PartitionConnection::with_packet_loss(f32::INFINITY).is_err());
    }

    #[test]
    fn test_below_epsilon_is_unblocked_but_distinct() {
        let tiny = PartitionConnection::soft(0.001).unwrap();
        assert!(tiny.is_effectively_unblocked());
        assert_ne!(tiny, PartitionConnection::unblocked());
        assert!(!PartitionConnection::soft(MIN_PACKET_LOSS_PERCENTAGE)
            .unwrap()
            .is_effectively_unblocked());
    }

    #[test]
    fn test_wire_interpretation_preserves_value() {
        for loss in [0.0f32, 0.01, 12.5, 33.333, 99.99, 100.0] {
            let conn = PartitionConnection::with_packet_loss(loss).unwrap();
            let back = PartitionConnection::try_from(&conn.to_wire()).unwrap();
            assert_eq!(back.packet_loss_percentage(), loss);
        }

        let bad = PartitionConnectionInfo {
            packet_loss_percentage: 150.0,
        };
        assert!(PartitionConnection::try_from(&bad).is_err());
    }
}
