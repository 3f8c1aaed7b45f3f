use sessionlock::{ResourceKey, SyncManager, Timeout};
use std::thread;
use std::time::Duration;

#[test]
fn test_reacquire_does_not_block_self() {
    let manager = SyncManager::new();
    let key = ResourceKey::named("R");
    let owner = manager.create_context();
    let other = manager.create_context();

    let first = owner.acquire(&key).unwrap();
    let second = owner.acquire(&key).unwrap();
    assert_eq!(manager.acquire_count(&key), 2);
    assert_eq!(owner.held_count(), 2);

    first.dispose();
    assert_eq!(manager.holder_of(&key), Some(owner.id()));
    assert!(other.try_acquire(&key, Timeout::zero()).is_none());

    second.dispose();
    assert_eq!(manager.holder_of(&key), None);
    assert!(other.try_acquire(&key, Timeout::zero()).is_some());
}

#[test]
fn test_reentrant_try_acquire_with_zero_timeout() {
    let manager = SyncManager::new();
    let key = ResourceKey::named("R");
    let owner = manager.create_context();

    let _first = owner.acquire(&key).unwrap();
    let second = owner.try_acquire(&key, Timeout::zero());
    assert!(second.is_some());
    assert_eq!(manager.acquire_count(&key), 2);
}

#[test]
fn test_threads_of_one_context_share_the_lock() {
    let manager = SyncManager::new();
    let key = ResourceKey::named("R");
    let session = manager.create_context();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let session = session.clone();
            let key = key.clone();
            thread::spawn(move || session.try_acquire(&key, Timeout::After(Duration::from_secs(2))))
        })
        .collect();

    let scopes: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().expect("same session never waits on itself"))
        .collect();

    assert_eq!(manager.acquire_count(&key), 4);
    assert_eq!(manager.holder_of(&key), Some(session.id()));

    drop(scopes);
    assert_eq!(manager.holder_of(&key), None);
}

#[test]
fn test_sibling_waiters_join_when_their_context_wins() {
    let manager = SyncManager::new();
    let key = ResourceKey::named("R");
    let blocker = manager.create_context();
    let session = manager.create_context();

    let held = blocker.acquire(&key).unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let session = session.clone();
            let key = key.clone();
            thread::spawn(move || session.acquire(&key).map(|scope| scope.key().clone()))
        })
        .collect();

    while manager.waiting_len(&key) < 1 {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(50));
    // One queue entry no matter how many of the session's threads wait
    assert_eq!(manager.waiting_len(&key), 1);

    held.dispose();
    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), key);
    }
    // Each thread's scope was dropped on return
    assert_eq!(manager.holder_of(&key), None);
    assert_eq!(manager.waiting_len(&key), 0);
}
