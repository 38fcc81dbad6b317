use fanout_pool::{
    coordinator::Coordinator,
    handle::task,
    Config, WorkerPool,
};
use std::time::Instant;
use tokio::runtime::Builder;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rt = Builder::new_multi_thread().enable_all().build().unwrap();

    rt.block_on(async {
        let now = Instant::now();

        let pool = WorkerPool::<u64>::new(Config {
            concurrency: 64,
            retry_attempts: 3,
            retry_wait_seconds: 1,
            retry_backoff: true,
            retry_jitter: true,
            name: "demo-fanout".into(),
        })
        .unwrap();

        let (handle, results) = pool.start();
        let coord = Coordinator::spawn(results, 1_000, |batch: Vec<u64>| {
            println!("flushed batch of {}", batch.len());
        });

        for i in 0..10_000u64 {
            handle
                .submit(task(move || async move {
                    // имитация внешнего вызова
                    tokio::time::sleep(Duration::from_micros(100)).await;
                    Ok(i)
                }))
                .await
                .unwrap();
            coord.mark_sent();
        }

        let report = coord.wait().await;
        handle.stop().await;

        println!(
            "elapsed: {:?} received={} status={:?}",
            now.elapsed(),
            report.received,
            report.status()
        );
    });
}
