//! Transfer service for moving funds between in-memory accounts

pub mod service;
pub mod repository;
pub mod notification;
pub mod config;

pub use service::TransferService;
pub use repository::{AccountRepository, InMemoryAccountRepository};
pub use notification::{EmailNotificationService, NotificationService};
pub use config::TransferServiceConfig;
