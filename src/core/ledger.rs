use crate::domain::model::Account;
use crate::domain::ports::AccountStore;
use crate::utils::error::{Result, SiteError};

/// 代幣帳本:餘額的唯一修改入口。原子性由 AccountStore 保證,
/// 這裡負責參數檢查與記錄。
pub struct TokenLedger<A: AccountStore> {
    accounts: A,
}

impl<A: AccountStore> TokenLedger<A> {
    pub fn new(accounts: A) -> Self {
        Self { accounts }
    }

    pub async fn account(&self, account_id: &str) -> Result<Account> {
        self.accounts
            .get(account_id)
            .await?
            .ok_or_else(|| SiteError::NotFoundError {
                resource: format!("Account '{}'", account_id),
            })
    }

    pub async fn balance(&self, account_id: &str) -> Result<i64> {
        Ok(self.account(account_id).await?.token_balance)
    }

    /// 扣款失敗(餘額不足)時不會有任何變動。
    pub async fn debit(&self, account_id: &str, quantity: i64) -> Result<i64> {
        ensure_positive(quantity)?;
        let balance = self.accounts.adjust_tokens(account_id, -quantity).await?;
        tracing::info!(
            "🔄 Debited {} token(s) from account {} (balance: {})",
            quantity,
            account_id,
            balance
        );
        Ok(balance)
    }

    pub async fn credit(&self, account_id: &str, quantity: i64) -> Result<i64> {
        ensure_positive(quantity)?;
        let balance = self.accounts.adjust_tokens(account_id, quantity).await?;
        tracing::info!(
            "🔄 Credited {} token(s) to account {} (balance: {})",
            quantity,
            account_id,
            balance
        );
        Ok(balance)
    }

    /// 管理端手動加幣,和購買入帳走同一條原子路徑。
    pub async fn grant(&self, account_id: &str, quantity: i64) -> Result<i64> {
        ensure_positive(quantity)?;
        let balance = self.accounts.adjust_tokens(account_id, quantity).await?;
        tracing::info!(
            "🔄 Admin grant of {} token(s) to account {} (balance: {})",
            quantity,
            account_id,
            balance
        );
        Ok(balance)
    }
}

fn ensure_positive(quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(SiteError::ValidationError {
            message: format!("Token quantity must be positive, got {}", quantity),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryAccountStore;
    use crate::domain::model::Account;

    fn account(id: &str, tokens: i64) -> Account {
        Account {
            id: id.to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            phone: None,
            document: None,
            token_balance: tokens,
            privileged: false,
        }
    }

    #[tokio::test]
    async fn test_debit_and_credit_sum_up() {
        let store = MemoryAccountStore::new();
        store.insert(account("a1", 0)).await;
        let ledger = TokenLedger::new(store);

        ledger.credit("a1", 10).await.unwrap();
        ledger.debit("a1", 3).await.unwrap();
        ledger.credit("a1", 2).await.unwrap();
        assert_eq!(ledger.balance("a1").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_debit_fails_closed_without_mutation() {
        let store = MemoryAccountStore::new();
        store.insert(account("a1", 2)).await;
        let ledger = TokenLedger::new(store);

        let err = ledger.debit("a1", 3).await.unwrap_err();
        assert!(matches!(err, SiteError::InsufficientTokensError { .. }));
        assert_eq!(ledger.balance("a1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let store = MemoryAccountStore::new();
        store.insert(account("a1", 5)).await;
        let ledger = TokenLedger::new(store);

        assert!(ledger.debit("a1", 0).await.is_err());
        assert!(ledger.credit("a1", -1).await.is_err());
        assert_eq!(ledger.balance("a1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_go_negative() {
        let store = MemoryAccountStore::new();
        store.insert(account("a1", 5)).await;
        let ledger = std::sync::Arc::new(TokenLedger::new(store));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move { ledger.debit("a1", 1).await }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 5);
        assert_eq!(ledger.balance("a1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let ledger = TokenLedger::new(MemoryAccountStore::new());
        assert!(matches!(
            ledger.balance("ghost").await.unwrap_err(),
            SiteError::NotFoundError { .. }
        ));
    }
}
