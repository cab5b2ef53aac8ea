pub mod balance;
pub mod bets;
pub mod callback;
pub mod payouts;
pub mod reconciliation;

pub use balance::BalanceService;
pub use bets::{BetEngine, BetReceipt, Draw, OutcomeSource, RandomOutcomes};
pub use callback::{IgnoreReason, ProviderCallback, ReconciliationEvent};
pub use payouts::{PayoutInitiator, WithdrawalOutcome};
pub use reconciliation::{DepositRequest, PaymentReconciler, ReconciliationOutcome};
