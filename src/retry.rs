use super::{
    errors::TaskError,
    result::TaskResult,
};
use std::future::Future;
use rand::Rng;
use tokio::time::Duration;

/// Верхняя граница задержки между попытками: рост backoff
/// не должен уходить в бесконечность на длинных сериях.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Повторяет операцию с опциональным backoff и jitter.
///
/// - успех возвращается сразу;
/// - `TaskError::Stop` возвращается сразу, не тратя попытки;
/// - иначе попытки декрементируются, между попытками сон `delay`
///   (при `backoff` задержка удваивается, при `jitter` добавляется
///   случайная добавка в `[0, delay/2)`);
/// - когда попытки исчерпаны, возвращается последняя ошибка.
///
/// `attempts <= 0` на входе выполняет операцию ровно один раз без сна.
pub async fn retry<T, F, Fut>(
    attempts: i32,
    backoff: bool,
    jitter: bool,
    initial_delay: Duration,
    mut f: F,
) -> TaskResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TaskResult<T>>,
{
    let mut left = attempts;
    let mut delay = initial_delay.min(MAX_RETRY_DELAY);

    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(err @ TaskError::Stop(_)) => return Err(err),
            Err(err) => {
                left -= 1;
                if left <= 0 {
                    return Err(err);
                }

                tracing::debug!(attempts_left = left, error = %err, "retrying task");
                tokio::time::sleep(with_jitter(delay, jitter)).await;

                if backoff {
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                }
            }
        }
    }
}

fn with_jitter(delay: Duration, jitter: bool) -> Duration {
    if !jitter || delay.is_zero() {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..delay.as_nanos() as u64);
    delay + Duration::from_nanos(extra / 2)
}
