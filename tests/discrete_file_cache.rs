use std::convert::Infallible;
use std::sync::Arc;

use cache_browns::store::discrete_files::DiscreteFileStore;
use cache_browns::{CacheLookupSuccess, GetOptions, JsonReadThroughCache, ManualClock, ReadThroughCache};
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000;

#[tokio::test]
async fn non_volatile_cache_serves_across_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache");

    {
        let store = DiscreteFileStore::open_non_volatile(&path).await.unwrap();
        let cache: JsonReadThroughCache = ReadThroughCache::builder(store)
            .clock(ManualClock::new(NOW))
            .build();

        let value = cache
            .get("report", || async { Ok::<_, Infallible>("expensive".to_string()) })
            .await
            .unwrap();
        cache.drain().await;
        assert_eq!(value, "expensive");
    }

    let store = DiscreteFileStore::open_non_volatile(&path).await.unwrap();
    let cache = ReadThroughCache::builder(store)
        .clock(ManualClock::new(NOW + 30))
        .build();

    let status = cache
        .get_with_status(
            "report",
            || async { Ok::<_, Infallible>("recomputed".to_string()) },
            GetOptions::new().ttl(60),
        )
        .await
        .unwrap();

    assert_eq!(status, CacheLookupSuccess::Hit("expensive".to_string()));
}

#[tokio::test]
async fn pruned_entry_is_gone_from_disk() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DiscreteFileStore::open_volatile(dir.path()).await.unwrap());
    let clock = ManualClock::new(NOW);
    let cache = ReadThroughCache::builder(store.clone())
        .clock(clock.clone())
        .build();

    cache
        .get("k", || async { Ok::<_, Infallible>(1u32) })
        .await
        .unwrap();
    cache.drain().await;
    assert_eq!(store.len().await, 1);

    clock.advance(3600);
    let value = cache
        .get_with(
            "k",
            || async { Ok::<_, Infallible>(0u32) },
            GetOptions::new().ttl(60).validate_fresh(|n: &u32| *n > 0),
        )
        .await
        .unwrap();
    cache.drain().await;

    assert_eq!(value, 0);
    assert!(store.is_empty().await);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
