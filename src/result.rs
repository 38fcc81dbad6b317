use super::errors::TaskError;

/// Результат одной задачи: значение либо ошибка.
/// Создается один раз на полный цикл ретраев и доставляется
/// ровно один раз в канал завершений.
pub type TaskResult<T> = Result<T, TaskError>;
