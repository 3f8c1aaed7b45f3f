use crate::cli::Command;
use rand::Rng;
use sessionlock::utils::{parse_duration, parse_timeout};
use sessionlock::{ResourceKey, Result, SyncError, SyncManager, SyncScope, Timeout};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

struct Config {
    sessions: u32,
    rounds: u32,
    hold_micros: u64,
    timeout: Option<Timeout>,
    depth: u32,
}

/// Per-key occupancy counters shared by every worker.
struct Tally {
    keys: Vec<ResourceKey>,
    occupancy: Vec<AtomicUsize>,
    max_holders: Vec<AtomicUsize>,
    acquired: AtomicU64,
    timed_out: AtomicU64,
}

impl Tally {
    fn new(keys: u32) -> Self {
        Self {
            keys: (0..keys)
                .map(|i| ResourceKey::named(format!("key-{}", i)))
                .collect(),
            occupancy: (0..keys).map(|_| AtomicUsize::new(0)).collect(),
            max_holders: (0..keys).map(|_| AtomicUsize::new(0)).collect(),
            acquired: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
        }
    }

    fn enter(&self, k: usize) {
        let holders = self.occupancy[k].fetch_add(1, Ordering::SeqCst) + 1;
        self.max_holders[k].fetch_max(holders, Ordering::SeqCst);
    }

    fn leave(&self, k: usize) {
        self.occupancy[k].fetch_sub(1, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        for (key, max) in self.keys.iter().zip(&self.max_holders) {
            let holders = max.load(Ordering::SeqCst);
            if holders > 1 {
                return Err(SyncError::ExclusionViolated {
                    key: key.to_string(),
                    holders,
                });
            }
        }
        Ok(())
    }
}

pub fn execute_stress(cmd: Command, quiet: bool) -> Result<()> {
    let Command::Stress {
        sessions,
        keys,
        rounds,
        hold,
        timeout,
        depth,
    } = cmd
    else {
        return Err(SyncError::Other(
            "Internal error: expected Stress command".to_string(),
        ));
    };

    let hold_micros = u64::try_from(parse_duration(&hold)?.as_micros()).map_err(|_| {
        SyncError::InvalidArgument(format!("--hold '{}' is too long to sleep for", hold))
    })?;

    let config = Config {
        sessions,
        rounds,
        hold_micros,
        timeout: timeout.as_deref().map(parse_timeout).transpose()?,
        depth,
    };

    let manager = SyncManager::new();
    let tally = Tally::new(keys);
    let start = Instant::now();

    let (manager, tally, config) = (&manager, &tally, &config);
    let results: Vec<Result<()>> = thread::scope(|s| {
        let workers: Vec<_> = (0..config.sessions)
            .map(|_| s.spawn(move || run_worker(manager, tally, config)))
            .collect();

        workers
            .into_iter()
            .map(|w| {
                w.join()
                    .unwrap_or_else(|_| Err(SyncError::Other("stress worker panicked".to_string())))
            })
            .collect()
    });

    for result in results {
        result?;
    }
    tally.check()?;

    if !quiet {
        let max = tally
            .max_holders
            .iter()
            .map(|m| m.load(Ordering::SeqCst))
            .max()
            .unwrap_or(0);
        println!("sessions:    {}", config.sessions);
        println!("acquired:    {}", tally.acquired.load(Ordering::SeqCst));
        println!("timed out:   {}", tally.timed_out.load(Ordering::SeqCst));
        println!("max holders: {}", max);
        println!("elapsed:     {:?}", start.elapsed());
    }

    Ok(())
}

fn run_worker(manager: &SyncManager, tally: &Tally, config: &Config) -> Result<()> {
    let context = manager.create_context();
    let mut rng = rand::thread_rng();

    for _ in 0..config.rounds {
        let k = rng.gen_range(0..tally.keys.len());
        let key = &tally.keys[k];

        let first = match config.timeout {
            None => context.acquire(key)?,
            Some(timeout) => match context.try_acquire(key, timeout) {
                Some(scope) => scope,
                None => {
                    tally.timed_out.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            },
        };

        let mut scopes: Vec<SyncScope> = vec![first];
        for _ in 1..config.depth {
            scopes.push(context.acquire(key)?);
        }

        tally.enter(k);
        tally.acquired.fetch_add(1, Ordering::Relaxed);
        thread::sleep(Duration::from_micros(rng.gen_range(0..=config.hold_micros)));
        tally.leave(k);

        while let Some(scope) = scopes.pop() {
            scope.dispose();
        }
    }

    debug!("Worker {} finished", context.id());
    context.dispose();
    Ok(())
}
