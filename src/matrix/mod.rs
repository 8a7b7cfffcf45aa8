//! Модуль для работы с матрицами
//!
//! Предоставляет:
//! - Типы матриц
//! - Генерацию входных данных и сверку результатов
//! - Ядра бенчмарка, общие для параллельного и последовательного проходов

mod types;
pub mod operations;
pub mod kernels;

pub use types::{Matrix, MatrixType};
pub use operations::{approx_eq, compare_results, initialize_matrices, Comparison};
pub use kernels::LuFactors;
