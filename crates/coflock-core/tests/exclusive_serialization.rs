//! Exclusive locks serialize tasks on one cooperative scheduler
//!
//! GIVEN: a counter file and 5 tasks on a `current_thread` runtime
//! WHEN: each task opens its own descriptor, takes an exclusive lock,
//!       reads the counter, holds for 500ms, writes counter + 1
//! THEN: no update is lost, holders never overlap, and the total run
//!       takes at least 5 x 500ms

#![forbid(unsafe_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use coflock_core::{Error, LockHandle, LockOptions, Resource};
use tempfile::TempDir;
use tokio::task::JoinSet;

const NUM_TASKS: usize = 5;
const HOLD: Duration = Duration::from_millis(500);

fn fast_retry() -> LockOptions {
    LockOptions::new().with_retry_interval(Duration::from_millis(20))
}

fn read_counter(resource: &Resource) -> Result<u64, Error> {
    let mut file = resource.file();
    let mut content = String::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_string(&mut content))
        .map_err(|e| Error::io("read counter", e))?;
    content
        .trim()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("corrupt counter '{content}': {e}")))
}

fn write_counter(resource: &Resource, value: u64) -> Result<(), Error> {
    let mut file = resource.file();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.set_len(0))
        .and_then(|()| file.write_all(value.to_string().as_bytes()))
        .map_err(|e| Error::io("write counter", e))
}

fn seeded_counter(dir: &Path) -> PathBuf {
    let path = dir.join("counter.txt");
    std::fs::write(&path, "0").expect("seed counter");
    path
}

struct Occupancy {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Occupancy {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn increment(path: PathBuf, occupancy: Arc<Occupancy>) -> Result<u64, Error> {
    let resource = Resource::open_read_write(&path)?;
    let mut lock = LockHandle::exclusive(&resource).with_options(fast_retry());

    lock.with_lock(|| async {
        occupancy.enter();
        let seen = read_counter(&resource)?;
        tokio::time::sleep(HOLD).await;
        write_counter(&resource, seen + 1)?;
        occupancy.leave();
        Ok::<_, Error>(seen)
    })
    .await
}

#[tokio::test]
async fn test_exclusive_holders_are_serialized() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = seeded_counter(temp_dir.path());
    let occupancy = Occupancy::new();

    let start = Instant::now();
    let mut join_set = JoinSet::new();
    for _ in 0..NUM_TASKS {
        join_set.spawn(increment(path.clone(), Arc::clone(&occupancy)));
    }

    let mut seen = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        seen.push(joined.expect("task panicked").expect("increment failed"));
    }
    let elapsed = start.elapsed();

    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3, 4], "each holder saw a distinct value");

    let final_value = read_counter(&Resource::open_read_only(&path).expect("reopen"))
        .expect("final counter");
    assert_eq!(final_value, NUM_TASKS as u64, "no lost updates");

    assert_eq!(occupancy.peak.load(Ordering::SeqCst), 1, "holders overlapped");
    assert!(
        elapsed >= HOLD * NUM_TASKS as u32,
        "finished in {elapsed:?}, faster than serialized execution"
    );
}

#[tokio::test]
async fn test_release_lets_same_handle_reacquire_immediately() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = seeded_counter(temp_dir.path());
    let resource = Resource::open_read_write(&path).expect("open");
    let mut lock = LockHandle::exclusive(&resource);

    lock.acquire().await.expect("acquire");
    lock.release().expect("release");

    // Default retry interval is one second; an immediate success proves
    // the first release left nothing behind.
    let started = Instant::now();
    lock.acquire().await.expect("reacquire");
    assert!(started.elapsed() < Duration::from_millis(500));
    lock.release().expect("release again");
}

#[tokio::test]
async fn test_waiter_acquires_after_holder_releases() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = seeded_counter(temp_dir.path());
    let holder_resource = Resource::open_read_write(&path).expect("open holder");
    let mut holder = LockHandle::exclusive(&holder_resource);
    holder.acquire().await.expect("holder acquire");

    let waiter_path = path.clone();
    let waiter = tokio::spawn(async move {
        let resource = Resource::open_read_write(&waiter_path)?;
        let mut lock = LockHandle::exclusive(&resource).with_options(fast_retry());
        let started = Instant::now();
        lock.acquire().await?;
        let waited = started.elapsed();
        lock.release()?;
        Ok::<_, Error>(waited)
    });

    // The waiter runs on the same thread: it only makes progress because
    // its contended acquire yields.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished());
    holder.release().expect("holder release");

    let waited = waiter.await.expect("waiter panicked").expect("waiter failed");
    assert!(waited >= Duration::from_millis(150), "waited only {waited:?}");
}

#[tokio::test]
async fn test_guard_released_when_body_panics() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = seeded_counter(temp_dir.path());

    // Kept open outside the task so the descriptor outlives the panic and
    // only the guard can have released the lock.
    let resource = Arc::new(Resource::open_read_write(&path).expect("open"));
    let task_resource = Arc::clone(&resource);
    let outcome = tokio::spawn(async move {
        let mut lock = LockHandle::exclusive(&task_resource);
        let _guard = lock.lock().await.expect("lock");
        panic!("body failed while holding the lock");
    })
    .await;
    assert!(outcome.is_err_and(|e| e.is_panic()));

    let other = Resource::open_read_write(&path).expect("open second descriptor");
    let mut lock = LockHandle::exclusive(&other);
    assert!(lock.try_acquire().expect("probe"), "lock leaked past panic");
    lock.release().expect("release");
    drop(resource);
}
