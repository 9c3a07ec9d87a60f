use std::time::Duration;

use burrow_lock::{Locker, RedisLocker};
use burrow_test_infra::redis::RedisStack;

const HOLD: Duration = Duration::from_secs(3);

#[tokio::test]
#[ignore = "requires docker"]
async fn lock_excludes_until_released() {
    let redis = RedisStack::start().await.expect("start redis");
    let locker = RedisLocker::new(redis.connection().await.expect("connect redis"));

    let token = locker
        .acquire("lock:ab12cd", HOLD, Duration::ZERO)
        .await
        .unwrap()
        .expect("free lock");

    let contender = locker
        .acquire("lock:ab12cd", HOLD, Duration::from_millis(200))
        .await
        .unwrap();
    assert!(contender.is_none());

    assert!(locker.release(&token).await.unwrap());
    assert!(locker
        .acquire("lock:ab12cd", HOLD, Duration::ZERO)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn stale_token_cannot_release_new_holder() {
    let redis = RedisStack::start().await.expect("start redis");
    let locker = RedisLocker::new(redis.connection().await.expect("connect redis"));

    let stale = locker
        .acquire("lock:ab12cd", Duration::from_millis(100), Duration::ZERO)
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let current = locker
        .acquire("lock:ab12cd", HOLD, Duration::ZERO)
        .await
        .unwrap()
        .unwrap();

    assert!(!locker.release(&stale).await.unwrap());
    assert!(locker
        .acquire("lock:ab12cd", HOLD, Duration::ZERO)
        .await
        .unwrap()
        .is_none());
    assert!(locker.release(&current).await.unwrap());
}
