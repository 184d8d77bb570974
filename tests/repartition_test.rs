/*!
 * Integration tests for network repartitioning through an enclave context
 *
 * Every test drives `EnclaveContext::repartition_network` against a scripted
 * transport and checks both the outcome and what reached the wire.
 */

use enclave::enclave::{PosixPathJoiner, UnsupportedArchiver};
use enclave::error::{EnclaveError, ErrorCategory};
use enclave::partition::PartitionError;
use enclave::{
    EnclaveContext, PartitionConnection, PartitionConnections, PartitionServices, TopologyConfig,
    TransportError,
};
use enclave_core_interface::testing::MockTransport;
use enclave_core_interface::StatusCode;
use enclave_proto::rpc::Repartition;
use std::collections::{BTreeMap, BTreeSet};

fn context() -> (MockTransport, EnclaveContext<MockTransport>) {
    let transport = MockTransport::new("test-enclave");
    let ctx = EnclaveContext::new(
        transport.clone(),
        PosixPathJoiner,
        UnsupportedArchiver,
        "/data",
    );
    (transport, ctx)
}

fn services(entries: &[(&str, &[&str])]) -> PartitionServices {
    entries
        .iter()
        .map(|(partition, ids)| {
            (
                partition.to_string(),
                ids.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_single_default_partition() {
    let (transport, ctx) = context();
    transport.respond::<Repartition>(());

    ctx.repartition_network(
        Some(services(&[("", &["web"])])),
        Some(PartitionConnections::new()),
        Some(PartitionConnection::unblocked()),
    )
    .await
    .unwrap();

    let sent = transport.requests::<Repartition>();
    assert_eq!(sent.len(), 1);

    let args = &sent[0];
    assert_eq!(args.partition_services.len(), 1);
    assert!(args.partition_services[""].service_id_set.contains_key("web"));
    assert!(args.partition_connections.is_empty());
    assert_eq!(
        args.default_connection.map(|c| c.packet_loss_percentage),
        Some(0.0)
    );
}

#[tokio::test]
async fn test_symmetric_pairs_collapse_to_one_entry() {
    let (transport, ctx) = context();
    transport.respond::<Repartition>(());

    let nested: BTreeMap<&str, BTreeMap<&str, PartitionConnection>> = [
        ("a", [("b", PartitionConnection::blocked())].into_iter().collect()),
        ("b", [("a", PartitionConnection::blocked())].into_iter().collect()),
    ]
    .into_iter()
    .collect();
    let connections = PartitionConnections::from_nested(nested).unwrap();
    assert_eq!(connections.len(), 1);

    ctx.repartition_network(
        Some(services(&[("a", &["web"]), ("b", &["db"])])),
        Some(connections),
        Some(PartitionConnection::unblocked()),
    )
    .await
    .unwrap();

    let args = &transport.requests::<Repartition>()[0];
    let entries: Vec<(&String, &String, f32)> = args
        .partition_connections
        .iter()
        .flat_map(|(a, inner)| {
            inner
                .connection_info
                .iter()
                .map(move |(b, info)| (a, b, info.packet_loss_percentage))
        })
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].2, 100.0);
}

#[test]
fn test_conflicting_symmetric_pairs_rejected() {
    let nested = vec![
        ("a", vec![("b", PartitionConnection::blocked())]),
        ("b", vec![("a", PartitionConnection::unblocked())]),
    ];
    let err = PartitionConnections::from_nested(nested).unwrap_err();
    assert!(matches!(err, PartitionError::ConflictingConnection { .. }));
}

#[tokio::test]
async fn test_missing_inputs_rejected_before_sending() {
    let (transport, ctx) = context();

    let err = ctx
        .repartition_network(None, None, Some(PartitionConnection::unblocked()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EnclaveError::Partition(PartitionError::MissingPartitionServices)
    ));

    let err = ctx
        .repartition_network(Some(services(&[("", &["web"])])), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EnclaveError::Partition(PartitionError::MissingDefaultConnection)
    ));
    assert_eq!(err.category(), ErrorCategory::Validation);

    assert_eq!(transport.call_count::<Repartition>(), 0);
}

#[tokio::test]
async fn test_absent_connections_mean_none() {
    let (transport, ctx) = context();
    transport.respond::<Repartition>(());

    ctx.repartition_network(
        Some(services(&[("a", &["web"]), ("b", &["db"])])),
        None,
        Some(PartitionConnection::blocked()),
    )
    .await
    .unwrap();

    let args = &transport.requests::<Repartition>()[0];
    assert!(args.partition_connections.is_empty());
    assert_eq!(
        args.default_connection.map(|c| c.packet_loss_percentage),
        Some(100.0)
    );
}

#[tokio::test]
async fn test_invalid_topologies_never_sent() {
    let (transport, ctx) = context();

    let err = ctx
        .repartition_network(
            Some(services(&[("a", &["web"]), ("b", &["web"])])),
            None,
            Some(PartitionConnection::unblocked()),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EnclaveError::Partition(PartitionError::DuplicateServiceAssignment { .. })
    ));

    let unknown = PartitionConnections::new()
        .with("a", "ghost", PartitionConnection::blocked())
        .unwrap();
    let err = ctx
        .repartition_network(
            Some(services(&[("a", &["web"])])),
            Some(unknown),
            Some(PartitionConnection::unblocked()),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EnclaveError::Partition(PartitionError::UnknownPartition { .. })
    ));

    assert_eq!(transport.call_count::<Repartition>(), 0);
}

#[tokio::test]
async fn test_empty_response_is_a_failure() {
    let (transport, ctx) = context();
    transport.respond_empty::<Repartition>();

    let err = ctx
        .repartition_network(
            Some(services(&[("", &["web"])])),
            None,
            Some(PartitionConnection::unblocked()),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EnclaveError::Transport(TransportError::EmptyResponse { .. })
    ));
    assert_eq!(err.category(), ErrorCategory::ProtocolViolation);
}

#[tokio::test]
async fn test_backend_rejection_surfaces() {
    let (transport, ctx) = context();
    transport.fail::<Repartition>(TransportError::Rejected {
        code: StatusCode::FailedPrecondition,
        message: "unknown service 'web'".to_string(),
    });

    let err = ctx
        .repartition_network(
            Some(services(&[("", &["web"])])),
            None,
            Some(PartitionConnection::unblocked()),
        )
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::BackendRejected);
    assert!(err.to_string().contains("unknown service 'web'"));
}

#[tokio::test]
async fn test_topology_file_round_trip_to_wire() {
    let toml = r#"
default_packet_loss_percentage = 0.0

[partitions]
frontend = ["web"]
backend = ["db", "cache"]

[[connections]]
between = ["backend", "frontend"]
packet_loss_percentage = 50.0
"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topology.toml");
    std::fs::write(&path, toml).unwrap();

    let (services, connections, default_connection) =
        TopologyConfig::from_file(&path).unwrap().into_parts().unwrap();

    let (transport, ctx) = context();
    transport.respond::<Repartition>(());
    ctx.repartition_network(Some(services), Some(connections), default_connection)
        .await
        .unwrap();

    let args = &transport.requests::<Repartition>()[0];
    assert_eq!(args.partition_services["backend"].service_id_set.len(), 2);
    assert_eq!(
        args.partition_connections["backend"].connection_info["frontend"].packet_loss_percentage,
        50.0
    );
}
