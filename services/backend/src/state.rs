use std::sync::Arc;

use crate::auth::InitDataVerifier;
use crate::clients::{Notifier, PaymentGateway};
use crate::config::Config;
use crate::repository::LedgerRepository;
use crate::services::reconciliation::ReconcilerSettings;
use crate::services::{BalanceService, BetEngine, OutcomeSource, PaymentReconciler, PayoutInitiator};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerRepository>,
    pub balances: BalanceService,
    pub bets: BetEngine,
    pub reconciler: PaymentReconciler,
    pub payouts: PayoutInitiator,
    pub verifier: InitDataVerifier,
}

impl AppState {
    pub fn new(
        config: Config,
        ledger: Arc<dyn LedgerRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        outcomes: Arc<dyn OutcomeSource>,
    ) -> Self {
        let verifier = InitDataVerifier::new(&config.telegram.bot_token, config.auth.secret_scheme);
        let reconciler = PaymentReconciler::new(
            ledger.clone(),
            gateway.clone(),
            notifier,
            ReconcilerSettings::from_config(&config),
        );
        let payouts = PayoutInitiator::new(ledger.clone(), gateway, config.provider.currency.clone());

        Self {
            balances: BalanceService::new(ledger.clone()),
            bets: BetEngine::new(ledger.clone(), outcomes),
            reconciler,
            payouts,
            verifier,
            ledger,
        }
    }
}
