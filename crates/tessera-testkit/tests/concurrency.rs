//! Commit-time conflict behavior
//!
//! Writers never hold locks; contention surfaces as conflict errors at
//! commit. Two grants racing for one device must not both win.

use tessera_client::ClientCredentials;
use tessera_core::wire::{GrantStatus, ServiceRequest};
use tessera_core::{ClientId, DeviceId, ServiceId};
use tessera_testkit::{keys, Harness};

#[tokio::test]
async fn test_concurrent_grants_for_one_device_conflict() {
    let harness = Harness::bootstrap(1_700_000_000).await.unwrap();
    let fixture = keys::test_keys();
    let alice = ClientCredentials::new(
        ClientId::new("c1").unwrap(),
        &fixture.client_private_pem,
    )
    .unwrap();
    let bob = ClientCredentials::new(
        ClientId::new("c2").unwrap(),
        &fixture.second_client_private_pem,
    )
    .unwrap();
    let device = DeviceId::new("d1").unwrap();
    let service = ServiceId::new("iotservice1").unwrap();

    for creds in [&alice, &bob] {
        harness.register_and_verify(creds).await.unwrap();
        harness.ledger.advance(1);
    }
    harness
        .register_device(&device, vec!["temperature".to_string()])
        .await
        .unwrap();

    let mut tickets = Vec::new();
    for creds in [&alice, &bob] {
        let tgt = harness.obtain_tgt(&creds.client_id).await.unwrap();
        harness.register_at_tgs(&tgt).await.unwrap();
        let (ticket, _) = harness
            .obtain_service_ticket(creds, &service, &tgt)
            .await
            .unwrap();
        tickets.push(ticket);
        harness.ledger.advance(1);
    }

    let request_for = |creds: &ClientCredentials, ticket_b64: String| ServiceRequest {
        encrypted_service_ticket: ticket_b64,
        client_id: creds.client_id.clone(),
        device_id: device.clone(),
        request_type: "read".to_string(),
        encrypted_data: String::new(),
    };

    // Both transactions observe the device as active in their snapshots.
    let tx_alice = harness.ledger.tx();
    let tx_bob = harness.ledger.tx();
    let granted_alice = harness
        .isv
        .process_service_request(
            &tx_alice,
            &request_for(&alice, tickets[0].encrypted_service_ticket.clone()),
        )
        .await
        .unwrap();
    let granted_bob = harness
        .isv
        .process_service_request(
            &tx_bob,
            &request_for(&bob, tickets[1].encrypted_service_ticket.clone()),
        )
        .await
        .unwrap();
    assert_eq!(granted_alice.status, GrantStatus::Granted);
    assert_eq!(granted_bob.status, GrantStatus::Granted);

    // Only the first commit wins; the loser sees a conflict and retries
    // with fresh reads, where the device is busy.
    tx_alice.commit().unwrap();
    assert!(tx_bob.commit().is_err());

    let retry = harness.ledger.tx();
    let refused = harness
        .isv
        .process_service_request(
            &retry,
            &request_for(&bob, tickets[1].encrypted_service_ticket.clone()),
        )
        .await
        .unwrap();
    assert_eq!(refused.status, GrantStatus::DeviceUnavailable);
}
