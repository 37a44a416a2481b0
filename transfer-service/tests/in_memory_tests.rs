use std::sync::Arc;

use common::decimal::dec;
use common::error::Error;
use common::model::account::Account;
use transfer_service::{AccountRepository, InMemoryAccountRepository};

#[tokio::test]
async fn test_create_and_get_account() {
    let repo = InMemoryAccountRepository::new();

    assert_eq!(repo.account_count(), 0);

    let account = Account::with_balance("Id-123", dec!(1000));
    repo.create_account(account.clone()).await.unwrap();

    assert_eq!(repo.account_count(), 1);

    let retrieved = repo.get_account("Id-123").await.unwrap().unwrap();
    assert_eq!(retrieved.id, "Id-123");
    assert_eq!(retrieved.balance, dec!(1000));
    assert_eq!(retrieved.created_at, account.created_at);

    // Unknown ids read as absent, never as an error
    assert!(repo.get_account("Id-999").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_fails_on_duplicate_id() {
    let repo = InMemoryAccountRepository::new();

    repo.create_account(Account::new("Id-123")).await.unwrap();

    let result = repo.create_account(Account::with_balance("Id-123", dec!(5))).await;
    match result {
        Err(Error::DuplicateAccountId(msg)) => {
            assert!(msg.contains("Id-123"));
        }
        other => panic!("Expected DuplicateAccountId, got {:?}", other),
    }

    // The losing create must not have clobbered the original
    let retrieved = repo.get_account("Id-123").await.unwrap().unwrap();
    assert_eq!(retrieved.balance, dec!(0));
}

#[tokio::test]
async fn test_concurrent_creates_of_same_id_admit_exactly_one() {
    let repo = Arc::new(InMemoryAccountRepository::new());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.create_account(Account::new("Id-contended")).await
        }));
    }

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => created += 1,
            Err(Error::DuplicateAccountId(_)) => duplicates += 1,
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(repo.account_count(), 1);
}

#[tokio::test]
async fn test_set_exclusive_is_a_test_and_set() {
    let repo = InMemoryAccountRepository::new();
    repo.create_account(Account::new("Id-1")).await.unwrap();

    // First acquisition transitions free -> held
    assert!(repo.set_exclusive("Id-1", true).await.unwrap());
    // Second acquisition observes held and does not transition
    assert!(!repo.set_exclusive("Id-1", true).await.unwrap());

    // Release, then the marker can be taken again
    assert!(repo.set_exclusive("Id-1", false).await.unwrap());
    assert!(repo.set_exclusive("Id-1", true).await.unwrap());
}

#[tokio::test]
async fn test_set_exclusive_unknown_account() {
    let repo = InMemoryAccountRepository::new();

    let result = repo.set_exclusive("Id-missing", true).await;
    assert!(matches!(result, Err(Error::AccountNotFound(_))));
}

#[tokio::test]
async fn test_get_account_ignores_exclusivity() {
    let repo = InMemoryAccountRepository::new();
    repo.create_account(Account::with_balance("Id-1", dec!(10))).await.unwrap();

    assert!(repo.set_exclusive("Id-1", true).await.unwrap());

    // Reads never block on the marker
    let snapshot = repo.get_account("Id-1").await.unwrap().unwrap();
    assert_eq!(snapshot.balance, dec!(10));
}

#[tokio::test]
async fn test_update_balance() {
    let repo = InMemoryAccountRepository::new();
    repo.create_account(Account::with_balance("Id-1", dec!(100))).await.unwrap();

    repo.update_balance("Id-1", dec!(42.50)).await.unwrap();

    let snapshot = repo.get_account("Id-1").await.unwrap().unwrap();
    assert_eq!(snapshot.balance, dec!(42.50));
    assert!(snapshot.updated_at >= snapshot.created_at);

    let result = repo.update_balance("Id-missing", dec!(1)).await;
    assert!(matches!(result, Err(Error::AccountNotFound(_))));
}
