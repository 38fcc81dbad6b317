use super::{
    errors::{PoolError, TaskError},
    handle::{PoolHandle, Task},
    model::PoolCounters,
    result::TaskResult,
    retry::retry,
};
use std::{
    fmt,
    marker::PhantomData,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use futures::FutureExt;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, Notify, Semaphore},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Сентинел: использовать всю доступную аппаратную параллельность
pub const ALL_CPUS: i32 = -1;

/// Конфигурация пула воркеров
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub concurrency: i32,
    pub retry_attempts: i32,
    pub retry_wait_seconds: u64,
    pub retry_backoff: bool,
    pub retry_jitter: bool,
    /// Диагностическая метка; пустая заменяется случайным id
    #[serde(skip)]
    pub name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: ALL_CPUS,
            retry_attempts: 0,
            retry_wait_seconds: 1,
            retry_backoff: false,
            retry_jitter: false,
            name: String::new(),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "concurrency={} retry_attempts={} retry_wait_seconds={} retry_backoff={} retry_jitter={}",
            self.concurrency,
            self.retry_attempts,
            self.retry_wait_seconds,
            self.retry_backoff,
            self.retry_jitter
        )
    }
}

/// Пул с ограниченной параллельностью: задачи читаются из канала
/// подачи, выполняются с ретраями и публикуют ровно один
/// [`TaskResult`] в канал завершений.
pub struct WorkerPool<T> {
    cfg: Config,
    concurrency: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Валидирует конфигурацию. Ошибки конфигурации всплывают
    /// здесь, синхронно, а не внутри пайплайна.
    pub fn new(mut cfg: Config) -> Result<Self, PoolError> {
        let concurrency = match cfg.concurrency {
            ALL_CPUS => num_cpus::get(),
            c if c <= 0 => return Err(PoolError::InvalidConcurrency(c)),
            c => c as usize,
        };
        if cfg.name.is_empty() {
            cfg.name = short_id(10);
        }

        tracing::info!(pool = %cfg.name, "configured worker pool: {}", cfg);

        Ok(Self {
            cfg,
            concurrency,
            _marker: PhantomData,
        })
    }

    /// Запускает цикл диспетчеризации. Возвращает хэндл подачи
    /// и канал завершений; канал отдается вызывающему целиком,
    /// drain-рутина — его забота.
    pub fn start(self) -> (PoolHandle<T>, mpsc::Receiver<TaskResult<T>>) {
        let (task_tx, task_rx) = mpsc::channel::<Task<T>>(self.concurrency);
        let (out_tx, out_rx) = mpsc::channel::<TaskResult<T>>(self.concurrency);

        let cancel = CancellationToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let drained = Arc::new(Notify::new());
        let counters = Arc::new(PoolCounters::default());

        let dispatcher = Dispatcher {
            cfg: self.cfg,
            out_tx,
            sem: Arc::new(Semaphore::new(self.concurrency)),
            cancel: cancel.clone(),
            in_flight: in_flight.clone(),
            drained: drained.clone(),
            counters: counters.clone(),
        };
        tokio::spawn(dispatcher.run(task_rx));

        let handle = PoolHandle {
            tasks: task_tx,
            cancel,
            in_flight,
            drained,
            counters,
        };
        (handle, out_rx)
    }
}

struct Dispatcher<T> {
    cfg: Config,
    out_tx: mpsc::Sender<TaskResult<T>>,
    sem: Arc<Semaphore>,
    cancel: CancellationToken,
    in_flight: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    counters: Arc<PoolCounters>,
}

impl<T: Send + 'static> Dispatcher<T> {
    async fn run(self, mut tasks: mpsc::Receiver<Task<T>>) {
        tracing::info!(worker = %self.cfg.name, "starting worker");

        loop {
            let task = tokio::select! {
                _ = self.cancel.cancelled() => break,
                t = tasks.recv() => match t {
                    Some(t) => t,
                    None => break,
                },
            };

            // слот параллельности; семафор не закрывается,
            // пока жив диспетчер
            let permit = match self.sem.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };

            self.in_flight.fetch_add(1, Ordering::AcqRel);
            self.counters.dispatched.fetch_add(1, Ordering::Relaxed);

            let cfg = self.cfg.clone();
            let out_tx = self.out_tx.clone();
            let in_flight = self.in_flight.clone();
            let drained = self.drained.clone();
            let counters = self.counters.clone();

            tokio::spawn(async move {
                let result = run_task(task, &cfg).await;

                match &result {
                    Ok(_) => counters.completed.fetch_add(1, Ordering::Relaxed),
                    Err(_) => counters.failed.fetch_add(1, Ordering::Relaxed),
                };

                // получатель мог уйти раньше; потеря результата тут —
                // ответственность вызывающего (stop до полного drain)
                let _ = out_tx.send(result).await;

                drop(permit);
                if in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                    drained.notify_waiters();
                }
            });
        }

        tracing::info!(worker = %self.cfg.name, "exiting worker");
    }
}

/// Выполняет задачу с ретраями и перехватом паники на границе.
/// Паника конвертируется в ошибку и никогда не роняет диспетчер.
async fn run_task<T>(task: Task<T>, cfg: &Config) -> TaskResult<T> {
    let wait = Duration::from_secs(cfg.retry_wait_seconds);
    let attempts = cfg.retry_attempts;

    let run = async move {
        let mut task = task;
        if attempts > 0 {
            retry(
                attempts,
                cfg.retry_backoff,
                cfg.retry_jitter,
                wait,
                || task(),
            )
            .await
        } else {
            task().await
        }
    };

    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(result) => result,
        Err(panic_info) => Err(TaskError::Panic(format!("{:?}", panic_info))),
    }
}

fn short_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
