//! Типы матриц и связанные структуры

use crate::error::{BenchError, Result};
use ndarray::Array2;
use serde::Serialize;
use std::ops::{Index, IndexMut};

/// Способ заполнения входных матриц
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatrixType {
    /// Матрицы заполненные 1 и 2
    OnesAndTwos,
    /// Матрицы заполненные 3 и 4
    ThreesAndFours,
    /// Случайные целые из [0, max_value)
    Random,
}

/// Квадратная матрица `size x size` с построчным хранением
///
/// Длина буфера проверяется один раз при создании, дальше индексация
/// опирается на `size * size == data.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    size: usize,
    data: Vec<f64>,
}

/// Число элементов `size x size`, `None` при переполнении `usize`
fn cell_count(size: usize) -> Option<usize> {
    size.checked_mul(size)
}

impl Matrix {
    /// Нулевая матрица
    ///
    /// # Panics
    ///
    /// Паникует, если `size * size` не помещается в `usize`. Размер из
    /// внешнего ввода нужно проверять заранее (`bench::validate_size`).
    pub fn zeros(size: usize) -> Self {
        let Some(len) = cell_count(size) else {
            panic!("matrix size {size}x{size} overflows usize");
        };
        Self {
            size,
            data: vec![0.0; len],
        }
    }

    /// Как `zeros`, но с ошибкой вместо паники при переполнении
    pub fn try_zeros(size: usize) -> Result<Self> {
        let len = cell_count(size).ok_or_else(|| {
            BenchError::InvalidInput(format!("matrix size {size}x{size} overflows usize"))
        })?;
        Ok(Self {
            size,
            data: vec![0.0; len],
        })
    }

    /// Единичная матрица
    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size);
        for i in 0..size {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Создает матрицу из построчного буфера
    pub fn from_vec(size: usize, data: Vec<f64>) -> Result<Self> {
        let expected = cell_count(size).ok_or_else(|| {
            BenchError::InvalidInput(format!("matrix size {size}x{size} overflows usize"))
        })?;
        if data.len() != expected {
            return Err(BenchError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    /// Создает матрицу из списка строк
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for row in rows {
            let row = row.as_ref();
            if row.len() != size {
                return Err(BenchError::DimensionMismatch {
                    expected: size,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { size, data })
    }

    /// Длина стороны
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Строка `i`
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    /// Элемент или `None` за пределами матрицы
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.size && col < self.size {
            Some(self.data[row * self.size + col])
        } else {
            None
        }
    }

    /// Проверяет, что `other` того же размера
    pub fn ensure_same_size(&self, other: &Matrix) -> Result<()> {
        if self.size != other.size {
            return Err(BenchError::DimensionMismatch {
                expected: self.size,
                actual: other.size,
            });
        }
        Ok(())
    }

    /// Диагональ матрицы
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.size).map(|i| self[(i, i)]).collect()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.size + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.size + col]
    }
}

impl From<&Matrix> for Array2<f64> {
    fn from(m: &Matrix) -> Self {
        // Длина буфера согласована с формой при создании Matrix
        Array2::from_shape_fn((m.size, m.size), |(i, j)| m[(i, j)])
    }
}

impl TryFrom<Array2<f64>> for Matrix {
    type Error = BenchError;

    fn try_from(array: Array2<f64>) -> Result<Self> {
        let (rows, cols) = array.dim();
        if rows != cols {
            return Err(BenchError::DimensionMismatch {
                expected: rows,
                actual: cols,
            });
        }
        Matrix::from_vec(rows, array.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_invalid_length() {
        let err = Matrix::from_vec(2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            BenchError::DataLength {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_oversized_matrix_rejected() {
        let size = 1usize << (usize::BITS / 2);
        assert!(matches!(Matrix::try_zeros(size), Err(BenchError::InvalidInput(_))));
        assert!(matches!(
            Matrix::from_vec(size, Vec::new()),
            Err(BenchError::InvalidInput(_))
        ));
        assert_eq!(Matrix::try_zeros(3).unwrap(), Matrix::zeros(3));
    }

    #[test]
    #[should_panic(expected = "overflows usize")]
    fn test_zeros_panics_on_overflow() {
        let _ = Matrix::zeros(usize::MAX);
    }

    #[test]
    fn test_from_rows_row_major() {
        let m = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m[(1, 0)], 3.0);
        assert_eq!(m.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(Matrix::from_rows(&rows).is_err());
    }

    #[test]
    fn test_identity() {
        let m = Matrix::identity(3);
        assert_eq!(m.diagonal(), vec![1.0, 1.0, 1.0]);
        assert_eq!(m.as_slice().iter().sum::<f64>(), 3.0);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let m = Matrix::zeros(2);
        assert_eq!(m.get(1, 1), Some(0.0));
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    fn test_ensure_same_size() {
        assert!(Matrix::zeros(3).ensure_same_size(&Matrix::zeros(3)).is_ok());
        assert_eq!(
            Matrix::zeros(3).ensure_same_size(&Matrix::zeros(2)),
            Err(BenchError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_ndarray_conversion() {
        let m = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let array: Array2<f64> = (&m).into();
        assert_eq!(array[[1, 0]], 3.0);
        assert_eq!(Matrix::try_from(array).unwrap(), m);
    }

    #[test]
    fn test_ndarray_non_square_rejected() {
        let array = Array2::<f64>::zeros((2, 3));
        assert!(Matrix::try_from(array).is_err());
    }
}
