use httpmock::prelude::*;
use site_forge::adapters::memory::{MemoryAccountStore, MemoryOrderStore};
use site_forge::adapters::pagarme::PagarmeCharges;
use site_forge::core::payments::{
    OrderStatusView, PaymentSettings, WebhookAck, WebhookEvent,
};
use site_forge::domain::model::Account;
use site_forge::{PaymentService, SiteError};

fn account(id: &str, tokens: i64) -> Account {
    Account {
        id: id.to_string(),
        name: "Dra. Silva".to_string(),
        email: "silva@example.com".to_string(),
        phone: Some("(31) 99999-8888".to_string()),
        document: Some("123.456.789-00".to_string()),
        token_balance: tokens,
        privileged: false,
    }
}

async fn service(
    server: &MockServer,
) -> PaymentService<MemoryAccountStore, MemoryOrderStore, PagarmeCharges> {
    let accounts = MemoryAccountStore::new();
    accounts.insert(account("acc_1", 0)).await;
    PaymentService::new(
        accounts,
        MemoryOrderStore::new(),
        PagarmeCharges::new(server.base_url(), "sk_test_key"),
        PaymentSettings::default(),
    )
}

fn mock_order_created(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/core/v5/orders")
            .header("Authorization", "Basic c2tfdGVzdF9rZXk6")
            .json_body_partial(
                r#"{
                    "customer": {
                        "document": "12345678900",
                        "phones": {
                            "mobile_phone": {
                                "area_code": "31",
                                "number": "999998888"
                            }
                        }
                    }
                }"#,
            );
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "id": "or_abc123",
                "status": "pending",
                "charges": [{
                    "last_transaction": {
                        "qr_code": "flat-code",
                        "qr_code_url": "https://qr.example/flat.png",
                        "qr_codes": [{
                            "qr_code": "00020126pixcopiaecola",
                            "url": "https://qr.example/full.png"
                        }]
                    }
                }]
            }));
    })
}

fn paid_event(order_id: &str) -> WebhookEvent {
    WebhookEvent::from_json(&format!(
        r#"{{"type": "order.paid", "data": {{"id": "{}"}}}}"#,
        order_id
    ))
    .unwrap()
}

#[tokio::test]
async fn test_create_charge_records_pending_order() {
    let server = MockServer::start();
    let order_mock = mock_order_created(&server);
    let service = service(&server).await;

    let ticket = service.create_charge("acc_1", 5).await.unwrap();

    order_mock.assert();
    assert_eq!(ticket.order_id, "or_abc123");
    // the nested qr_codes entry wins over the flat fields
    assert_eq!(ticket.qr_payload, "00020126pixcopiaecola");
    assert_eq!(
        ticket.qr_image_url.as_deref(),
        Some("https://qr.example/full.png")
    );

    assert_eq!(
        service.order_status("or_abc123").await.unwrap(),
        OrderStatusView::Pending
    );
    // nothing is credited until the webhook confirms payment
    assert_eq!(service.token_balance("acc_1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_purchase_below_minimum_is_rejected_without_an_order() {
    let server = MockServer::start();
    let order_mock = mock_order_created(&server);
    let service = service(&server).await;

    let err = service.create_charge("acc_1", 4).await.unwrap_err();
    assert!(matches!(err, SiteError::ValidationError { .. }));
    assert_eq!(order_mock.hits(), 0);
}

#[tokio::test]
async fn test_webhook_credits_exactly_once() {
    let server = MockServer::start();
    mock_order_created(&server);
    let service = service(&server).await;
    service.create_charge("acc_1", 5).await.unwrap();

    let ack = service.handle_webhook(&paid_event("or_abc123")).await.unwrap();
    assert_eq!(
        ack,
        WebhookAck::Credited {
            order_id: "or_abc123".to_string(),
            quantity: 5
        }
    );
    assert_eq!(service.token_balance("acc_1").await.unwrap(), 5);

    // provider retries deliveries; the duplicate must be a 2xx no-op
    let ack = service.handle_webhook(&paid_event("or_abc123")).await.unwrap();
    assert_eq!(ack, WebhookAck::Duplicate);
    assert_eq!(service.token_balance("acc_1").await.unwrap(), 5);

    assert_eq!(
        service.order_status("or_abc123").await.unwrap(),
        OrderStatusView::Paid
    );
}

#[tokio::test]
async fn test_concurrent_webhook_deliveries_credit_once() {
    let server = MockServer::start();
    mock_order_created(&server);
    let service = service(&server).await;
    service.create_charge("acc_1", 5).await.unwrap();

    let first_event = paid_event("or_abc123");
    let second_event = paid_event("or_abc123");
    let first = service.handle_webhook(&first_event);
    let second = service.handle_webhook(&second_event);
    let (first, second) = tokio::join!(first, second);

    let credited = [first.unwrap(), second.unwrap()]
        .iter()
        .filter(|ack| matches!(ack, WebhookAck::Credited { .. }))
        .count();
    assert_eq!(credited, 1);
    assert_eq!(service.token_balance("acc_1").await.unwrap(), 5);
}

#[tokio::test]
async fn test_webhook_for_unknown_order_is_acknowledged() {
    let server = MockServer::start();
    let service = service(&server).await;

    let ack = service.handle_webhook(&paid_event("or_missing")).await.unwrap();
    assert_eq!(ack, WebhookAck::UnknownOrder);
    assert_eq!(service.token_balance("acc_1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_other_event_types_are_ignored() {
    let server = MockServer::start();
    let service = service(&server).await;

    let event = WebhookEvent::from_json(
        r#"{"type": "order.payment_failed", "data": {"id": "or_abc123"}}"#,
    )
    .unwrap();
    let ack = service.handle_webhook(&event).await.unwrap();
    assert_eq!(ack, WebhookAck::Ignored);
}

#[tokio::test]
async fn test_order_status_for_unknown_order() {
    let server = MockServer::start();
    let service = service(&server).await;

    assert_eq!(
        service.order_status("or_missing").await.unwrap(),
        OrderStatusView::NotFound
    );
}

#[tokio::test]
async fn test_admin_grant_credits_immediately() {
    let server = MockServer::start();
    let service = service(&server).await;

    let balance = service.grant_tokens("acc_1", 10).await.unwrap();
    assert_eq!(balance, 10);
    assert_eq!(service.token_balance("acc_1").await.unwrap(), 10);
}

#[tokio::test]
async fn test_provider_error_creates_no_order() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/core/v5/orders");
        then.status(422).body("invalid customer");
    });
    let service = service(&server).await;

    let err = service.create_charge("acc_1", 5).await.unwrap_err();
    assert!(matches!(err, SiteError::PaymentError { .. }));
    assert_eq!(
        service.order_status("or_abc123").await.unwrap(),
        OrderStatusView::NotFound
    );
}
