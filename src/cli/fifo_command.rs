use crate::cli::Command;
use parking_lot::Mutex;
use sessionlock::utils::parse_duration;
use sessionlock::{ResourceKey, Result, SyncError, SyncManager};
use std::thread;
use std::time::Duration;

pub fn execute_fifo(cmd: Command, quiet: bool) -> Result<()> {
    let Command::Fifo { waiters, hold } = cmd else {
        return Err(SyncError::Other(
            "Internal error: expected Fifo command".to_string(),
        ));
    };
    let hold = parse_duration(&hold)?;
    let waiters = waiters as usize;

    let manager = SyncManager::new();
    let key = ResourceKey::named("fifo");
    let order = Mutex::new(Vec::with_capacity(waiters));

    let holder = manager.acquire(&key)?;

    let results: Vec<Result<()>> = thread::scope(|s| {
        let mut handles = Vec::with_capacity(waiters);
        for i in 0..waiters {
            let context = manager.create_context();
            let (key_ref, order_ref) = (&key, &order);
            handles.push(s.spawn(move || -> Result<()> {
                let scope = context.acquire(key_ref)?;
                order_ref.lock().push(i);
                thread::sleep(hold);
                scope.dispose();
                Ok(())
            }));

            // Enqueue one at a time so arrival order is known.
            while manager.waiting_len(&key) < i + 1 {
                thread::sleep(Duration::from_millis(1));
            }
        }

        holder.dispose();

        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(SyncError::Other("fifo waiter panicked".to_string())))
            })
            .collect()
    });

    for result in results {
        result?;
    }

    let expected: Vec<usize> = (0..waiters).collect();
    let actual = order.into_inner();

    if !quiet {
        let rendered: Vec<String> = actual.iter().map(|i| i.to_string()).collect();
        println!("acquisition order: {}", rendered.join(" "));
    }

    if actual != expected {
        return Err(SyncError::FairnessViolated { expected, actual });
    }
    Ok(())
}
