use super::{
    errors::PoolError,
    model::{PoolCounters, PoolMetrics},
    result::TaskResult,
};
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

/// Будущее одной попытки задачи
pub type TaskFuture<T> = Pin<Box<dyn Future<Output = TaskResult<T>> + Send>>;

/// Задача: замыкание без аргументов, вызывается заново на каждую попытку.
/// Пул не инспектирует тип результата.
pub type Task<T> = Box<dyn FnMut() -> TaskFuture<T> + Send>;

/// Оборачивает async-замыкание в [`Task`]
pub fn task<T, F, Fut>(mut f: F) -> Task<T>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = TaskResult<T>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// Хэндл запущенного пула: сторона подачи задач и остановки
pub struct PoolHandle<T> {
    pub(crate) tasks: mpsc::Sender<Task<T>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) in_flight: Arc<AtomicUsize>,
    pub(crate) drained: Arc<Notify>,
    pub(crate) counters: Arc<PoolCounters>,
}

impl<T> PoolHandle<T> {
    /// Отправляет задачу в пул. Блокируется на back-pressure
    /// ограниченного канала подачи.
    pub async fn submit(&self, task: Task<T>) -> Result<(), PoolError> {
        self.tasks.send(task).await.map_err(|_| PoolError::Closed)
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.counters
            .snapshot(self.in_flight.load(Ordering::Acquire))
    }

    /// Останавливает пул: новые задачи не принимаются, ожидаются
    /// все запущенные задачи, затем оба канала закрываются дропом.
    /// Потребление `self` исключает повторный вызов.
    pub async fn stop(self) {
        self.cancel.cancel();
        drop(self.tasks);

        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // регистрируемся до проверки счетчика, иначе можно
            // пропустить notify_waiters последней задачи
            notified.as_mut().enable();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }
    }
}
