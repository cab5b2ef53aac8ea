//! Outbound collaborators: the payment provider and the chat platform

pub mod gateway;
pub mod notifier;

pub use gateway::{ChapaGateway, InitializePayment, PaymentGateway, PayoutOrder, ProviderError};
pub use notifier::{Notifier, NotifyError, TelegramNotifier};
