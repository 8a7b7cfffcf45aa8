//! Операции над матрицами: генерация входных данных и сверка результатов

use super::types::{Matrix, MatrixType};
use crate::error::{BenchError, Result};
use rand::Rng;
use serde::Serialize;

/// Относительная погрешность при сверке параллельного и последовательного проходов
pub const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Инициализирует пару матриц заданного типа и размера
///
/// Для `MatrixType::Random` элементы это целые из `[0, max_value)`, как в
/// исходном генераторе; при `max_value <= 1` все элементы равны нулю.
pub fn initialize_matrices<R: Rng>(
    matrix_type: MatrixType,
    size: usize,
    max_value: u32,
    rng: &mut R,
) -> Result<(Matrix, Matrix)> {
    let matrix_elements = size.checked_mul(size).ok_or_else(|| {
        BenchError::InvalidInput(format!("matrix size {size}x{size} overflows usize"))
    })?;
    let (a, b) = match matrix_type {
        MatrixType::OnesAndTwos => (vec![1.0f64; matrix_elements], vec![2.0f64; matrix_elements]),
        MatrixType::ThreesAndFours => {
            (vec![3.0f64; matrix_elements], vec![4.0f64; matrix_elements])
        }
        MatrixType::Random => {
            let upper = max_value.max(1);
            let mut next = || f64::from(rng.gen_range(0..upper));
            let a: Vec<f64> = (0..matrix_elements).map(|_| next()).collect();
            let b: Vec<f64> = (0..matrix_elements).map(|_| next()).collect();
            (a, b)
        }
    };

    Ok((Matrix::from_vec(size, a)?, Matrix::from_vec(size, b)?))
}

/// Итог поэлементной сверки двух матриц
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    /// Максимальная абсолютная разница
    pub max_diff: f64,
    /// Количество элементов за пределами допуска
    pub diff_count: usize,
}

impl Comparison {
    /// Результаты совпадают в пределах допуска
    pub fn agrees(&self) -> bool {
        self.diff_count == 0
    }
}

/// Значения равны с точностью до порядка суммирования
pub fn approx_eq(left: f64, right: f64) -> bool {
    let scale = left.abs().max(right.abs()).max(1.0);
    (left - right).abs() <= RELATIVE_TOLERANCE * scale
}

/// Сравнивает результаты параллельного и последовательного проходов
pub fn compare_results(left: &Matrix, right: &Matrix) -> Comparison {
    let mut max_diff = 0.0f64;
    let mut diff_count = 0;

    if left.size() != right.size() {
        return Comparison {
            max_diff: f64::INFINITY,
            diff_count: left.size().max(right.size()).pow(2),
        };
    }

    for (&l, &r) in left.as_slice().iter().zip(right.as_slice()) {
        let diff = (l - r).abs();
        max_diff = max_diff.max(diff);
        if !approx_eq(l, r) {
            diff_count += 1;
        }
    }

    Comparison {
        max_diff,
        diff_count,
    }
}
