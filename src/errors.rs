use thiserror::Error;

/// Ошибка выполнения задачи после полного цикла ретраев
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Временная ошибка, задача будет повторена пока есть попытки
    #[error("{0}")]
    Transient(String),
    /// Не повторять: оставшиеся попытки пропускаются
    #[error("{0}")]
    Stop(String),
    /// Паника, перехваченная на границе задачи
    #[error("task panicked: {0}")]
    Panic(String),
}

impl TaskError {
    pub fn transient(msg: impl Into<String>) -> Self {
        TaskError::Transient(msg.into())
    }

    pub fn stop(msg: impl Into<String>) -> Self {
        TaskError::Stop(msg.into())
    }

    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(self, TaskError::Stop(_))
    }
}

/// Ошибки конфигурации и жизненного цикла пула
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("invalid concurrency: {0}")]
    InvalidConcurrency(i32),
    #[error("pool is stopped")]
    Closed,
}
