/*!
 * Network partition model
 *
 * A topology is a set of partitions (disjoint groups of services), explicit
 * connection attributes for some unordered partition pairs, and one default
 * connection for every other pair. [`Topology`] validates a desired topology
 * and produces the wire-level repartition request; nothing here talks to the
 * network.
 */

mod connection;

pub use connection::{
    PartitionConnection, MAX_PACKET_LOSS_PERCENTAGE, MIN_PACKET_LOSS_PERCENTAGE,
};

use enclave_proto::{
    PartitionConnections as WirePartitionConnections, PartitionServices as WirePartitionServices,
    RepartitionArgs,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

pub type ServiceId = String;
pub type PartitionId = String;

/// Reserved ID of the partition every service starts in
pub const DEFAULT_PARTITION_ID: &str = "";

/// Desired partition membership: partition ID -> services in it
pub type PartitionServices = BTreeMap<PartitionId, BTreeSet<ServiceId>>;

/// Rejection of a desired topology, raised before anything is sent
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    #[error("Partition services map must be present (an empty map puts every service in the default partition)")]
    MissingPartitionServices,

    #[error("Default connection must be present; every repartition replaces the whole topology")]
    MissingDefaultConnection,

    #[error("Partition '{partition_id}' contains an empty service ID")]
    EmptyServiceId { partition_id: PartitionId },

    #[error("Service '{service_id}' is assigned to both partition '{first}' and partition '{second}'")]
    DuplicateServiceAssignment {
        service_id: ServiceId,
        first: PartitionId,
        second: PartitionId,
    },

    #[error("Connection references partition '{partition_id}', which is not in the partition services map")]
    UnknownPartition { partition_id: PartitionId },

    #[error("Partition '{partition_id}' cannot have a connection to itself")]
    SelfConnection { partition_id: PartitionId },

    #[error("Conflicting connections between partitions '{first}' and '{second}': {existing}% vs {requested}% packet loss")]
    ConflictingConnection {
        first: PartitionId,
        second: PartitionId,
        existing: f32,
        requested: f32,
    },

    #[error("Packet loss percentage {value} is outside [0, 100]")]
    PacketLossOutOfRange { value: f32 },

    #[error("Soft partition packet loss {value} must be strictly between 0 and 100")]
    InvalidSoftPacketLoss { value: f32 },
}

pub type Result<T> = std::result::Result<T, PartitionError>;

// ═══════════════════════════════════════════════════════════════════════
// Partition pairs
// ═══════════════════════════════════════════════════════════════════════

/// Unordered pair of distinct partitions, stored smaller ID first
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionPair {
    first: PartitionId,
    second: PartitionId,
}

impl PartitionPair {
    pub fn new(a: impl Into<PartitionId>, b: impl Into<PartitionId>) -> Result<Self> {
        let (a, b) = (a.into(), b.into());
        if a == b {
            return Err(PartitionError::SelfConnection { partition_id: a });
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn contains(&self, partition_id: &str) -> bool {
        self.first == partition_id || self.second == partition_id
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Connection matrix
// ═══════════════════════════════════════════════════════════════════════

/// Explicit connections, one entry per unordered partition pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionConnections {
    entries: BTreeMap<PartitionPair, PartitionConnection>,
}

impl PartitionConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection between `a` and `b`
    ///
    /// Re-inserting the same value for a pair (in either order) is a no-op;
    /// a different value is a conflict.
    pub fn insert(
        &mut self,
        a: impl Into<PartitionId>,
        b: impl Into<PartitionId>,
        connection: PartitionConnection,
    ) -> Result<()> {
        connection.check_range()?;
        let pair = PartitionPair::new(a, b)?;

        if let Some(existing) = self.entries.get(&pair) {
            if *existing != connection {
                return Err(PartitionError::ConflictingConnection {
                    first: pair.first,
                    second: pair.second,
                    existing: existing.packet_loss_percentage(),
                    requested: connection.packet_loss_percentage(),
                });
            }
            return Ok(());
        }

        self.entries.insert(pair, connection);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(
        mut self,
        a: impl Into<PartitionId>,
        b: impl Into<PartitionId>,
        connection: PartitionConnection,
    ) -> Result<Self> {
        self.insert(a, b, connection)?;
        Ok(self)
    }

    /// Flatten a nested `a -> (b -> connection)` map
    pub fn from_nested<I, J, A, B>(nested: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, J)>,
        J: IntoIterator<Item = (B, PartitionConnection)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut connections = Self::new();
        for (a, inner) in nested {
            for (b, connection) in inner {
                connections.insert(a.as_ref(), b.as_ref(), connection)?;
            }
        }
        Ok(connections)
    }

    /// Interpret the connections of a serialized repartition request
    pub fn from_wire(wire: &HashMap<String, WirePartitionConnections>) -> Result<Self> {
        let mut connections = Self::new();
        for (a, inner) in wire {
            for (b, info) in &inner.connection_info {
                connections.insert(a.as_str(), b.as_str(), PartitionConnection::try_from(info)?)?;
            }
        }
        Ok(connections)
    }

    /// Serialize with each pair emitted once, under its smaller partition ID
    pub fn to_wire(&self) -> HashMap<String, WirePartitionConnections> {
        let mut wire: HashMap<String, WirePartitionConnections> = HashMap::new();
        for (pair, connection) in &self.entries {
            wire.entry(pair.first.clone())
                .or_default()
                .connection_info
                .insert(pair.second.clone(), connection.to_wire());
        }
        wire
    }

    /// Connection for a pair, in either order
    pub fn get(&self, a: &str, b: &str) -> Option<PartitionConnection> {
        let pair = PartitionPair::new(a, b).ok()?;
        self.entries.get(&pair).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PartitionPair, &PartitionConnection)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Topology
// ═══════════════════════════════════════════════════════════════════════

/// A validated network topology, ready to serialize
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    partition_services: PartitionServices,
    connections: PartitionConnections,
    default_connection: PartitionConnection,
}

impl Topology {
    /// Validate a desired topology
    ///
    /// Checks run in a fixed order so the first reported error is stable:
    /// 1. partition services present
    /// 2. default connection present
    /// 3. absent connections treated as none
    /// 4. no empty service IDs
    /// 5. every service in at most one partition
    /// 6. connections only name known partitions (or the default partition)
    /// 7. every packet loss within [0, 100]
    pub fn new(
        partition_services: Option<PartitionServices>,
        connections: Option<PartitionConnections>,
        default_connection: Option<PartitionConnection>,
    ) -> Result<Self> {
        let partition_services =
            partition_services.ok_or(PartitionError::MissingPartitionServices)?;
        let default_connection =
            default_connection.ok_or(PartitionError::MissingDefaultConnection)?;
        let connections = connections.unwrap_or_default();

        let mut owner: HashMap<&str, &str> = HashMap::new();
        for (partition_id, services) in &partition_services {
            for service_id in services {
                if service_id.is_empty() {
                    return Err(PartitionError::EmptyServiceId {
                        partition_id: partition_id.clone(),
                    });
                }
                if let Some(first) = owner.insert(service_id.as_str(), partition_id.as_str()) {
                    return Err(PartitionError::DuplicateServiceAssignment {
                        service_id: service_id.clone(),
                        first: first.to_string(),
                        second: partition_id.clone(),
                    });
                }
            }
        }

        for (pair, connection) in connections.iter() {
            for partition_id in [pair.first(), pair.second()] {
                if partition_id != DEFAULT_PARTITION_ID
                    && !partition_services.contains_key(partition_id)
                {
                    return Err(PartitionError::UnknownPartition {
                        partition_id: partition_id.to_string(),
                    });
                }
            }
            connection.check_range()?;
        }
        default_connection.check_range()?;

        Ok(Self {
            partition_services,
            connections,
            default_connection,
        })
    }

    /// Validate and serialize in one step
    pub fn build(
        partition_services: Option<PartitionServices>,
        connections: Option<PartitionConnections>,
        default_connection: Option<PartitionConnection>,
    ) -> Result<RepartitionArgs> {
        Ok(Self::new(partition_services, connections, default_connection)?.to_repartition_args())
    }

    /// Interpret a serialized repartition request
    pub fn from_repartition_args(args: &RepartitionArgs) -> Result<Self> {
        let partition_services = args
            .partition_services
            .iter()
            .map(|(id, services)| {
                (
                    id.clone(),
                    services.service_id_set.keys().cloned().collect::<BTreeSet<_>>(),
                )
            })
            .collect();
        let connections = PartitionConnections::from_wire(&args.partition_connections)?;
        let default_connection = args
            .default_connection
            .as_ref()
            .map(PartitionConnection::try_from)
            .transpose()?;

        Self::new(Some(partition_services), Some(connections), default_connection)
    }

    pub fn to_repartition_args(&self) -> RepartitionArgs {
        let partition_services = self
            .partition_services
            .iter()
            .map(|(id, services)| {
                let service_id_set = services.iter().map(|s| (s.clone(), true)).collect();
                (id.clone(), WirePartitionServices { service_id_set })
            })
            .collect();

        RepartitionArgs {
            partition_services,
            partition_connections: self.connections.to_wire(),
            default_connection: Some(self.default_connection.to_wire()),
        }
    }

    pub fn partition_services(&self) -> &PartitionServices {
        &self.partition_services
    }

    pub fn connections(&self) -> &PartitionConnections {
        &self.connections
    }

    pub fn default_connection(&self) -> PartitionConnection {
        self.default_connection
    }

    /// Effective connection between two partitions
    pub fn connection_between(&self, a: &str, b: &str) -> PartitionConnection {
        if a == b {
            return PartitionConnection::unblocked();
        }
        self.connections.get(a, b).unwrap_or(self.default_connection)
    }

    /// Partition a service is assigned to, if any
    pub fn partition_of(&self, service_id: &str) -> Option<&str> {
        self.partition_services
            .iter()
            .find(|(_, services)| services.contains(service_id))
            .map(|(id, _)| id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services(entries: &[(&str, &[&str])]) -> PartitionServices {
        entries
            .iter()
            .map(|(p, svcs)| {
                (
                    p.to_string(),
                    svcs.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_pair_is_canonical() {
        let ab = PartitionPair::new("a", "b").unwrap();
        let ba = PartitionPair::new("b", "a").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.first(), "a");
        assert_eq!(ab.second(), "b");
        assert!(ab.contains("b"));
    }

    #[test]
    fn test_self_pair_rejected() {
        assert_eq!(
            PartitionPair::new("a", "a"),
            Err(PartitionError::SelfConnection {
                partition_id: "a".to_string()
            })
        );
    }

    #[test]
    fn test_insert_symmetric_conflict() {
        let mut conns = PartitionConnections::new();
        conns.insert("a", "b", PartitionConnection::blocked()).unwrap();

        // Same value, reversed order: accepted
        conns.insert("b", "a", PartitionConnection::blocked()).unwrap();
        assert_eq!(conns.len(), 1);

        // Different value: rejected
        let err = conns
            .insert("b", "a", PartitionConnection::unblocked())
            .unwrap_err();
        assert!(matches!(err, PartitionError::ConflictingConnection { .. }));
    }

    #[test]
    fn test_from_nested_flattens_both_directions() {
        let mut nested: BTreeMap<&str, BTreeMap<&str, PartitionConnection>> = BTreeMap::new();
        nested
            .entry("b")
            .or_default()
            .insert("a", PartitionConnection::soft(30.0).unwrap());
        nested
            .entry("a")
            .or_default()
            .insert("b", PartitionConnection::soft(30.0).unwrap());
        nested
            .entry("a")
            .or_default()
            .insert("c", PartitionConnection::blocked());

        let conns = PartitionConnections::from_nested(nested).unwrap();
        assert_eq!(conns.len(), 2);
        assert_eq!(conns.get("b", "a").unwrap().packet_loss_percentage(), 30.0);
    }

    #[test]
    fn test_missing_inputs_checked_in_order() {
        assert_eq!(
            Topology::build(None, None, None),
            Err(PartitionError::MissingPartitionServices)
        );
        assert_eq!(
            Topology::build(Some(PartitionServices::new()), None, None),
            Err(PartitionError::MissingDefaultConnection)
        );
    }

    #[test]
    fn test_empty_services_map_is_valid() {
        let args = Topology::build(
            Some(PartitionServices::new()),
            None,
            Some(PartitionConnection::unblocked()),
        )
        .unwrap();
        assert!(args.partition_services.is_empty());
        assert!(args.partition_connections.is_empty());
        assert_eq!(args.default_connection.unwrap().packet_loss_percentage, 0.0);
    }

    #[test]
    fn test_duplicate_assignment_names_both_partitions() {
        let err = Topology::build(
            Some(services(&[("a", &["svc1"]), ("b", &["svc1"])])),
            None,
            Some(PartitionConnection::unblocked()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PartitionError::DuplicateServiceAssignment {
                service_id: "svc1".to_string(),
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_service_id_rejected() {
        let err = Topology::build(
            Some(services(&[("a", &[""])])),
            None,
            Some(PartitionConnection::unblocked()),
        )
        .unwrap_err();
        assert!(matches!(err, PartitionError::EmptyServiceId { .. }));
    }

    #[test]
    fn test_unknown_partition_in_connection() {
        let conns = PartitionConnections::new()
            .with("a", "zzz", PartitionConnection::blocked())
            .unwrap();
        let err = Topology::build(
            Some(services(&[("a", &["svc1"])])),
            Some(conns),
            Some(PartitionConnection::unblocked()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PartitionError::UnknownPartition {
                partition_id: "zzz".to_string()
            }
        );
    }

    #[test]
    fn test_default_partition_may_be_connected_implicitly() {
        let conns = PartitionConnections::new()
            .with("a", DEFAULT_PARTITION_ID, PartitionConnection::blocked())
            .unwrap();
        let args = Topology::build(
            Some(services(&[("a", &["svc1"])])),
            Some(conns),
            Some(PartitionConnection::unblocked()),
        )
        .unwrap();

        // "" sorts before "a", so the pair is keyed by the default partition
        let inner = &args.partition_connections[""];
        assert_eq!(inner.connection_info["a"].packet_loss_percentage, 100.0);
    }

    #[test]
    fn test_serialization_contains_exactly_named_partitions() {
        let args = Topology::build(
            Some(services(&[("a", &["svc1", "svc2"]), ("b", &[]), ("c", &["svc3"])])),
            None,
            Some(PartitionConnection::soft(5.0).unwrap()),
        )
        .unwrap();

        let mut names: Vec<_> = args.partition_services.keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(args.partition_services["a"].service_id_set.len(), 2);
        assert!(args.partition_services["b"].service_id_set.is_empty());
    }

    #[test]
    fn test_round_trip_through_wire() {
        let conns = PartitionConnections::new()
            .with("b", "a", PartitionConnection::soft(12.5).unwrap())
            .unwrap();
        let topology = Topology::new(
            Some(services(&[("a", &["x"]), ("b", &["y"])])),
            Some(conns),
            Some(PartitionConnection::blocked()),
        )
        .unwrap();

        let back = Topology::from_repartition_args(&topology.to_repartition_args()).unwrap();
        assert_eq!(back, topology);
        assert_eq!(back.connection_between("a", "b").packet_loss_percentage(), 12.5);
        assert!(back.connection_between("a", "").is_blocked());
        assert_eq!(back.partition_of("y"), Some("b"));
    }

    #[test]
    fn test_wire_without_default_rejected() {
        let args = RepartitionArgs::default();
        assert_eq!(
            Topology::from_repartition_args(&args),
            Err(PartitionError::MissingDefaultConnection)
        );
    }
}
