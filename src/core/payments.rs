use crate::core::ledger::TokenLedger;
use crate::domain::model::{ChargeTicket, PaymentOrder};
use crate::domain::ports::{AccountStore, ChargeProvider, OrderStore, PaidTransition};
use crate::utils::error::{Result, SiteError};
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const EVENT_ORDER_PAID: &str = "order.paid";

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub min_token_quantity: i64,
    pub token_price_cents: i64,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            min_token_quantity: 5,
            token_price_cents: 400,
        }
    }
}

/// 支付供應商推送的事件。只關心事件型別與訂單編號。
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub r#type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub id: String,
}

impl WebhookEvent {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Webhook 處理結果。除了真正的處理失敗以外都要回 2xx,
/// 否則供應商會一直重送。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAck {
    Credited { order_id: String, quantity: i64 },
    Duplicate,
    UnknownOrder,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusView {
    Pending,
    Paid,
    NotFound,
}

/// 代幣購買流程:建立收款 → 記 pending 訂單 → webhook 確認入帳。
pub struct PaymentService<A: AccountStore, O: OrderStore, C: ChargeProvider> {
    ledger: TokenLedger<A>,
    orders: O,
    charges: C,
    settings: PaymentSettings,
}

impl<A: AccountStore, O: OrderStore, C: ChargeProvider> PaymentService<A, O, C> {
    pub fn new(accounts: A, orders: O, charges: C, settings: PaymentSettings) -> Self {
        Self {
            ledger: TokenLedger::new(accounts),
            orders,
            charges,
            settings,
        }
    }

    /// 建立收款。低於最低購買量直接拒絕,不會產生任何訂單。
    pub async fn create_charge(&self, account_id: &str, quantity: i64) -> Result<ChargeTicket> {
        if quantity < self.settings.min_token_quantity {
            return Err(SiteError::ValidationError {
                message: format!(
                    "Minimum purchase is {} tokens, got {}",
                    self.settings.min_token_quantity, quantity
                ),
            });
        }

        let account = self.ledger.account(account_id).await?;
        let amount_cents = quantity * self.settings.token_price_cents;

        tracing::info!(
            "📡 Creating charge for account {}: {} token(s), {} cents",
            account_id,
            quantity,
            amount_cents
        );
        let ticket = self
            .charges
            .create_charge(&account, quantity, amount_cents)
            .await?;

        self.orders
            .insert(PaymentOrder {
                order_id: ticket.order_id.clone(),
                account_id: account_id.to_string(),
                quantity,
                status: crate::domain::model::OrderStatus::Pending,
                created_at: Utc::now(),
                paid_at: None,
            })
            .await?;

        tracing::info!("📡 Pending order recorded: {}", ticket.order_id);
        Ok(ticket)
    }

    /// 處理 webhook。pending→paid 是 CAS,重複或未知的訂單都是
    /// 成功的 no-op,絕不重複入帳。
    pub async fn handle_webhook(&self, event: &WebhookEvent) -> Result<WebhookAck> {
        if event.r#type != EVENT_ORDER_PAID {
            tracing::debug!("📥 Ignoring webhook event type '{}'", event.r#type);
            return Ok(WebhookAck::Ignored);
        }

        let order_id = &event.data.id;
        match self.orders.mark_paid(order_id, Utc::now()).await? {
            PaidTransition::Transitioned {
                account_id,
                quantity,
            } => {
                self.ledger.credit(&account_id, quantity).await?;
                tracing::info!(
                    "📥 Order {} paid: credited {} token(s) to account {}",
                    order_id,
                    quantity,
                    account_id
                );
                Ok(WebhookAck::Credited {
                    order_id: order_id.clone(),
                    quantity,
                })
            }
            PaidTransition::AlreadyPaid => {
                tracing::info!("📥 Duplicate delivery for paid order {}", order_id);
                Ok(WebhookAck::Duplicate)
            }
            PaidTransition::Unknown => {
                tracing::warn!("📥 Webhook for unknown order {}", order_id);
                Ok(WebhookAck::UnknownOrder)
            }
        }
    }

    /// 客戶端輪詢的訂單狀態查詢。
    pub async fn order_status(&self, order_id: &str) -> Result<OrderStatusView> {
        Ok(match self.orders.get(order_id).await? {
            None => OrderStatusView::NotFound,
            Some(order) => match order.status {
                crate::domain::model::OrderStatus::Pending => OrderStatusView::Pending,
                crate::domain::model::OrderStatus::Paid => OrderStatusView::Paid,
            },
        })
    }

    pub async fn token_balance(&self, account_id: &str) -> Result<i64> {
        self.ledger.balance(account_id).await
    }

    /// 管理端加幣。
    pub async fn grant_tokens(&self, account_id: &str, quantity: i64) -> Result<i64> {
        self.ledger.grant(account_id, quantity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryAccountStore, MemoryOrderStore};
    use crate::domain::model::{Account, ChargeTicket};
    use async_trait::async_trait;

    struct StubCharges;

    #[async_trait]
    impl ChargeProvider for StubCharges {
        async fn create_charge(
            &self,
            _account: &Account,
            _quantity: i64,
            _amount_cents: i64,
        ) -> Result<ChargeTicket> {
            Ok(ChargeTicket {
                order_id: "or_stub_1".to_string(),
                qr_payload: "pix-code".to_string(),
                qr_image_url: Some("https://qr.example/1.png".to_string()),
            })
        }
    }

    fn account(id: &str, tokens: i64) -> Account {
        Account {
            id: id.to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            phone: Some("(31) 99999-8888".to_string()),
            document: Some("123.456.789-00".to_string()),
            token_balance: tokens,
            privileged: false,
        }
    }

    async fn service() -> PaymentService<MemoryAccountStore, MemoryOrderStore, StubCharges> {
        let accounts = MemoryAccountStore::new();
        accounts.insert(account("a1", 0)).await;
        PaymentService::new(
            accounts,
            MemoryOrderStore::new(),
            StubCharges,
            PaymentSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_charge_below_minimum_creates_no_order() {
        let service = service().await;
        let err = service.create_charge("a1", 3).await.unwrap_err();
        assert!(matches!(err, SiteError::ValidationError { .. }));
        assert_eq!(
            service.order_status("or_stub_1").await.unwrap(),
            OrderStatusView::NotFound
        );
    }

    #[tokio::test]
    async fn test_webhook_credits_exactly_once() {
        let service = service().await;
        service.create_charge("a1", 5).await.unwrap();

        let event = WebhookEvent::from_json(
            r#"{"type": "order.paid", "data": {"id": "or_stub_1"}}"#,
        )
        .unwrap();

        let first = service.handle_webhook(&event).await.unwrap();
        assert_eq!(
            first,
            WebhookAck::Credited {
                order_id: "or_stub_1".to_string(),
                quantity: 5
            }
        );
        assert_eq!(service.token_balance("a1").await.unwrap(), 5);

        let second = service.handle_webhook(&event).await.unwrap();
        assert_eq!(second, WebhookAck::Duplicate);
        assert_eq!(service.token_balance("a1").await.unwrap(), 5);
        assert_eq!(
            service.order_status("or_stub_1").await.unwrap(),
            OrderStatusView::Paid
        );
    }

    #[tokio::test]
    async fn test_webhook_unknown_order_is_acknowledged() {
        let service = service().await;
        let event = WebhookEvent::from_json(
            r#"{"type": "order.paid", "data": {"id": "or_missing"}}"#,
        )
        .unwrap();
        assert_eq!(
            service.handle_webhook(&event).await.unwrap(),
            WebhookAck::UnknownOrder
        );
    }

    #[tokio::test]
    async fn test_webhook_other_event_types_ignored() {
        let service = service().await;
        let event =
            WebhookEvent::from_json(r#"{"type": "order.created", "data": {"id": "or_x"}}"#)
                .unwrap();
        assert_eq!(
            service.handle_webhook(&event).await.unwrap(),
            WebhookAck::Ignored
        );
    }
}
