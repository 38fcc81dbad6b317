//! Ограниченный worker pool с ретраями для асинхронного fan-out
//!
//! # Features
//! - Ограниченная параллельность через семафор
//! - Ретраи с экспоненциальным backoff и jitter
//! - Stop-ошибки для явного отказа от повторов
//! - Graceful shutdown с ожиданием in-flight задач
//! - Перехват паник на границе задачи
//! - Coordinator для детерминированного завершения партии

pub mod coordinator;
pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod result;
pub mod retry;

pub use pool::{Config, WorkerPool, ALL_CPUS};
