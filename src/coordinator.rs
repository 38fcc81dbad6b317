use super::{
    errors::TaskError,
    result::TaskResult,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Итоговый статус партии
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    CompletedWithErrors,
}

/// Итог drain-рутины по одной партии
#[derive(Debug, Default, Clone)]
pub struct DrainReport {
    pub received: u64,
    pub succeeded: u64,
    pub transient_failures: u64,
    pub stop_failures: u64,
    pub panics: u64,
    /// Сохраненные ошибки для агрегированного отчета
    pub errors: Vec<TaskError>,
}

impl DrainReport {
    pub fn failed(&self) -> u64 {
        self.transient_failures + self.stop_failures + self.panics
    }

    /// Частичные отказы не прерывают партию: она завершается
    /// со статусом "с ошибками" и сохраненной сводкой
    pub fn status(&self) -> BatchStatus {
        if self.failed() == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::CompletedWithErrors
        }
    }
}

/// Координатор завершения: rendezvous sent/received поверх
/// канала завершений пула.
///
/// Протокол вызывающего:
/// 1. `spawn` запускает drain-рутину;
/// 2. фидер шлет задачи в пул и зовет `mark_sent` на каждую
///    (подача может быть постраничной, вперемешку с выполнением);
/// 3. `wait` фиксирует итоговый `sent` и ждет `received == sent`;
/// 4. только после этого — `stop()` пула и финализация.
pub struct Coordinator {
    sent: Arc<AtomicU64>,
    received: Arc<AtomicU64>,
    final_tx: watch::Sender<Option<u64>>,
    drain: JoinHandle<DrainReport>,
}

impl Coordinator {
    /// Запускает drain-рутину: подсчет исходов по видам, накопление
    /// успешных значений и flush через `on_batch` каждые `batch_size`
    /// результатов плюс финальный неполный батч.
    pub fn spawn<T, F>(
        mut results: mpsc::Receiver<TaskResult<T>>,
        batch_size: usize,
        mut on_batch: F,
    ) -> Self
    where
        T: Send + 'static,
        F: FnMut(Vec<T>) + Send + 'static,
    {
        let batch_size = batch_size.max(1);
        let received = Arc::new(AtomicU64::new(0));
        let received_drain = received.clone();
        let (final_tx, mut final_rx) = watch::channel(None::<u64>);

        let drain = tokio::spawn(async move {
            let mut report = DrainReport::default();
            let mut batch: Vec<T> = Vec::new();

            loop {
                let sent_final = *final_rx.borrow();
                if let Some(total) = sent_final {
                    if report.received >= total {
                        break;
                    }
                }

                tokio::select! {
                    changed = final_rx.changed() => {
                        if changed.is_err() {
                            // координатор дропнут без wait(); отчет
                            // никто не прочитает
                            break;
                        }
                    }
                    res = results.recv() => match res {
                        Some(result) => {
                            report.received += 1;
                            received_drain.fetch_add(1, Ordering::Release);

                            match result {
                                Ok(value) => {
                                    report.succeeded += 1;
                                    batch.push(value);
                                    if batch.len() >= batch_size {
                                        tracing::debug!(size = batch.len(), "flushing batch");
                                        on_batch(std::mem::take(&mut batch));
                                    }
                                }
                                Err(err) => {
                                    match err {
                                        TaskError::Transient(_) => report.transient_failures += 1,
                                        TaskError::Stop(_) => report.stop_failures += 1,
                                        TaskError::Panic(_) => report.panics += 1,
                                    }
                                    report.errors.push(err);
                                }
                            }
                        }
                        // пул остановлен до завершения drain
                        None => break,
                    },
                }
            }

            if !batch.is_empty() {
                tracing::debug!(size = batch.len(), "flushing final batch");
                on_batch(std::mem::take(&mut batch));
            }
            report
        });

        Self {
            sent: Arc::new(AtomicU64::new(0)),
            received,
            final_tx,
            drain,
        }
    }

    /// Инкремент счетчика отправленных; зовется фидером на каждую задачу
    pub fn mark_sent(&self) {
        self.sent.fetch_add(1, Ordering::AcqRel);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Acquire)
    }

    /// Фидер объявляет подачу завершенной: итоговый `sent`
    /// публикуется drain-рутине, дальше она закрывается сама,
    /// как только догонит счетчик. Без busy-poll.
    pub fn finish(&self) {
        let total = self.sent.load(Ordering::Acquire);
        let _ = self.final_tx.send(Some(total));
    }

    /// Ждет, пока все отправленные задачи доставят результат,
    /// и возвращает итоговый отчет.
    pub async fn wait(self) -> DrainReport {
        self.finish();
        self.drain.await.unwrap_or_default()
    }
}
