//! Ошибки библиотеки бенчмарка

use thiserror::Error;

/// Результат операций библиотеки
pub type Result<T> = std::result::Result<T, BenchError>;

/// Ошибки, прерывающие прогон бенчмарка
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BenchError {
    /// Размер матрицы вне допустимого диапазона
    #[error("Invalid matrix size {size}: expected 1..={max}")]
    InvalidSize {
        /// Запрошенный размер
        size: usize,
        /// Верхняя граница
        max: usize,
    },

    /// Матрицы одного вызова имеют разный размер
    #[error("Dimension mismatch: expected {expected}x{expected}, got {actual}x{actual}")]
    DimensionMismatch {
        /// Размер первой матрицы
        expected: usize,
        /// Размер несовпавшей матрицы
        actual: usize,
    },

    /// Длина буфера не равна size * size
    #[error("Data length {actual} does not match matrix dimensions (expected {expected})")]
    DataLength {
        /// Ожидаемое число элементов
        expected: usize,
        /// Фактическое число элементов
        actual: usize,
    },

    /// Некорректный ввод пользователя
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Не удалось создать пул потоков
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}
