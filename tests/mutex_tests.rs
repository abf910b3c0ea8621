//! Tests for the backend-selecting `Mutex` facade.

use std::time::Duration;

use keyed_mutex::{
    DistributedMutex, FileMutex, LockError, LockHandle, MemoryStore, Mutex, MutexExt, QuorumMutex,
    SpinlockMutex, StoreLockOptions,
};
use tempfile::TempDir;

fn options() -> StoreLockOptions {
    StoreLockOptions::builder()
        .acquire_timeout(Duration::ZERO)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_file_variant() {
    let dir = TempDir::new().unwrap();
    let mutex = Mutex::file(dir.path(), "facade-file").unwrap();
    assert_eq!(mutex.backend(), "file");
    assert_eq!(mutex.key(), "facade-file");

    let value = mutex
        .synchronized(|| async { Ok::<_, std::io::Error>("ran") })
        .await
        .unwrap();
    assert_eq!(value, "ran");
}

#[cfg(unix)]
#[tokio::test]
async fn test_semaphore_variant() {
    let key = format!("facade-semaphore-{}", std::process::id());
    let mutex = Mutex::semaphore(&key).unwrap();
    assert_eq!(mutex.backend(), "semaphore");

    let handle = mutex.acquire().await.unwrap();
    handle.release().await.unwrap();
    keyed_mutex::SemaphoreMutex::unlink(&key).unwrap();
}

#[tokio::test]
async fn test_spinlock_variant() {
    let store = MemoryStore::new();
    let mutex = Mutex::spinlock("facade-spin", store.clone(), options()).unwrap();
    assert_eq!(mutex.backend(), "spinlock");

    let handle = mutex.acquire().await.unwrap();
    assert!(store.get("facade-spin").is_some());

    let contender = Mutex::spinlock("facade-spin", store.clone(), options()).unwrap();
    assert!(contender.acquire().await.err().unwrap().is_timeout());

    handle.release().await.unwrap();
    assert!(store.get("facade-spin").is_none());
}

#[tokio::test]
async fn test_quorum_variant() {
    let nodes: Vec<MemoryStore> = (0..3).map(|_| MemoryStore::new()).collect();
    let mutex = Mutex::quorum("facade-quorum", nodes.clone(), options()).unwrap();
    assert_eq!(mutex.backend(), "quorum");

    mutex
        .synchronized(|| async {
            assert!(nodes.iter().all(|node| node.get("facade-quorum").is_some()));
            Ok::<_, std::io::Error>(())
        })
        .await
        .unwrap();
    assert!(nodes.iter().all(MemoryStore::is_empty));
}

#[tokio::test]
async fn test_from_backend_mutexes() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();

    let file: Mutex<MemoryStore> = FileMutex::new(dir.path(), "from").unwrap().into();
    let spin: Mutex<MemoryStore> = SpinlockMutex::new("from", store.clone(), options())
        .unwrap()
        .into();
    let quorum: Mutex<MemoryStore> = QuorumMutex::new("from", vec![store], options())
        .unwrap()
        .into();

    assert_eq!(file.backend(), "file");
    assert_eq!(spin.backend(), "spinlock");
    assert_eq!(quorum.backend(), "quorum");
}

#[tokio::test]
async fn test_construction_errors_surface() {
    assert!(matches!(
        Mutex::spinlock("", MemoryStore::new(), options()),
        Err(LockError::InvalidKey(_))
    ));
    assert!(matches!(
        Mutex::quorum("k", Vec::<MemoryStore>::new(), options()),
        Err(LockError::Configuration(_))
    ));
}
