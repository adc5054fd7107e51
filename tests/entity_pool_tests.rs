use std::{sync::Arc, thread};

use graphbench::{
    cases::mixedload::{EntityPool, pool::MIN_POOL_FOR_DELETE},
    store::EntityHandle,
};
use rand::{SeedableRng, rngs::StdRng};

fn pool_of(n: i64) -> EntityPool {
    let pool = EntityPool::new();
    for id in 1..=n {
        pool.offer(EntityHandle::new(id));
    }
    pool
}

#[test]
fn test_fifo_order() {
    let pool = pool_of(3);
    assert_eq!(pool.poll(), Some(EntityHandle::new(1)));
    assert_eq!(pool.poll(), Some(EntityHandle::new(2)));
    pool.offer(EntityHandle::new(1));
    assert_eq!(pool.poll(), Some(EntityHandle::new(3)));
    assert_eq!(pool.poll(), Some(EntityHandle::new(1)));
    assert_eq!(pool.poll(), None);
    assert!(pool.is_empty());
}

#[test]
fn test_rotate_moves_head_to_tail() {
    let pool = pool_of(4);
    pool.rotate(2);
    assert_eq!(pool.size(), 4);
    assert_eq!(pool.poll(), Some(EntityHandle::new(3)));

    let empty = EntityPool::new();
    empty.rotate(5);
    assert!(empty.is_empty());
}

#[test]
fn test_take_sample_stays_within_bound() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..50 {
        let pool = pool_of(100);
        let sampled = pool.take_sample(&mut rng, 10).expect("sample");
        assert!((1..=10).contains(&sampled.id()));
        assert_eq!(pool.size(), 99);
    }
    assert_eq!(EntityPool::new().take_sample(&mut rng, 10), None);
}

#[test]
fn test_concurrent_offer_and_poll_lose_nothing() {
    let pool = Arc::new(pool_of(1_000));
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..500 {
                    if let Some(handle) = pool.poll() {
                        pool.rotate(3);
                        pool.offer(handle);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("join");
    }
    assert_eq!(pool.size(), 1_000);
    let mut ids: Vec<i64> = std::iter::from_fn(|| pool.poll()).map(|h| h.id()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=1_000).collect::<Vec<_>>());
}

#[test]
fn test_delete_threshold() {
    assert_eq!(MIN_POOL_FOR_DELETE, 3);
}
