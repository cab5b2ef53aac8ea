pub mod ledger_repository;
pub mod memory_ledger_repository;
pub mod redis_ledger_repository;

pub use ledger_repository::*;
pub use memory_ledger_repository::InMemoryLedgerRepository;
pub use redis_ledger_repository::RedisLedgerRepository;
