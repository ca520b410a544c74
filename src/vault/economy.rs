//! Economy operations on the active provider.

use crate::events::VaultEvent;
use crate::provider::{EconomyProvider, ProviderError, ProviderRegistry};
use crate::resilience::SubmissionHandle;
use crate::vault::Vault;

/// Direction of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Deposit,
    Withdraw,
}

impl Transfer {
    fn apply(self, provider: &dyn EconomyProvider, subject: &str, amount: f64) -> Result<bool, ProviderError> {
        match self {
            Transfer::Deposit => provider.deposit(subject, amount),
            Transfer::Withdraw => provider.withdraw(subject, amount),
        }
    }

    fn signed(self, amount: f64) -> f64 {
        match self {
            Transfer::Deposit => amount,
            Transfer::Withdraw => -amount,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Transfer::Deposit => "deposit",
            Transfer::Withdraw => "withdraw",
        }
    }
}

impl Vault {
    /// Credit `amount` to `subject`. Resolves with the new balance.
    pub fn deposit(&self, subject: &str, amount: f64) -> SubmissionHandle<f64> {
        self.transfer(Transfer::Deposit, subject, amount)
    }

    /// Debit `amount` from `subject`. Resolves with the new balance.
    pub fn withdraw(&self, subject: &str, amount: f64) -> SubmissionHandle<f64> {
        self.transfer(Transfer::Withdraw, subject, amount)
    }

    /// Balance of `subject` on the active provider; 0 on any error.
    pub async fn balance(&self, subject: &str) -> f64 {
        read_balance(self.registry(), subject).await
    }

    fn transfer(&self, kind: Transfer, subject: &str, amount: f64) -> SubmissionHandle<f64> {
        let events = self.event_bus().clone();
        let subject = subject.to_string();

        self.submit(move |provider| {
            let old_balance = provider.balance(&subject)?;
            if !kind.apply(provider, &subject, amount)? {
                return Err(ProviderError::Declined(format!(
                    "{} of {} for {}",
                    kind.as_str(),
                    amount,
                    subject
                )));
            }
            let new_balance = old_balance + kind.signed(amount);
            events.publish(VaultEvent::BalanceChanged {
                subject: subject.clone(),
                old_balance,
                new_balance,
            });
            Ok(new_balance)
        })
    }
}

/// Read a balance straight from the active provider on a blocking worker.
pub(crate) async fn read_balance(registry: &ProviderRegistry, subject: &str) -> f64 {
    let Some(entry) = registry.active() else {
        tracing::debug!(subject, "Balance requested with no active provider");
        return 0.0;
    };
    let lease = entry.lease();
    let owned = subject.to_string();

    match tokio::task::spawn_blocking(move || lease.handle.balance(&owned)).await {
        Ok(Ok(balance)) => balance,
        Ok(Err(e)) => {
            tracing::warn!(subject, error = %e, "Balance lookup failed");
            0.0
        }
        Err(e) => {
            tracing::warn!(subject, error = %e, "Balance lookup worker failed");
            0.0
        }
    }
}
