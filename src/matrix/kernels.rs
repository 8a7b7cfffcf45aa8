//! Ядра матричных операций
//!
//! Каждое ядро существует в одном экземпляре и параметризовано стратегией
//! исполнения: параллельный и последовательный проходы выполняют один и тот
//! же код и отличаются только обходом независимых итераций.
//!
//! Функции `*_into` пишут в буфер вызывающего и не выделяют память, поэтому
//! замер времени покрывает только вычисления.

use super::types::Matrix;
use crate::error::Result;
use crate::exec::{Execution, Serial};

fn check_operands(a: &Matrix, b: &Matrix, out: &Matrix) -> Result<()> {
    a.ensure_same_size(b)?;
    a.ensure_same_size(out)
}

fn elementwise<E, F>(exec: &E, a: &Matrix, b: &Matrix, out: &mut Matrix, op: F)
where
    E: Execution,
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    let n = a.size();
    if n == 0 {
        return;
    }
    exec.for_each_row(out.as_mut_slice(), n, |i, row| {
        for ((c, &x), &y) in row.iter_mut().zip(a.row(i)).zip(b.row(i)) {
            *c = op(x, y);
        }
    });
}

/// C = A + B
pub fn add_into<E: Execution>(exec: &E, a: &Matrix, b: &Matrix, out: &mut Matrix) -> Result<()> {
    check_operands(a, b, out)?;
    elementwise(exec, a, b, out, |x, y| x + y);
    Ok(())
}

/// C = A - B
pub fn subtract_into<E: Execution>(
    exec: &E,
    a: &Matrix,
    b: &Matrix,
    out: &mut Matrix,
) -> Result<()> {
    check_operands(a, b, out)?;
    elementwise(exec, a, b, out, |x, y| x - y);
    Ok(())
}

fn multiply_unchecked<E: Execution>(exec: &E, a: &Matrix, b: &Matrix, out: &mut Matrix) {
    let n = a.size();
    if n == 0 {
        return;
    }
    // Каждая ячейка C пишется ровно одним рабочим
    exec.for_each_row(out.as_mut_slice(), n, |i, row| {
        let a_row = a.row(i);
        for (j, cell) in row.iter_mut().enumerate() {
            let mut sum = 0.0f64;
            for (k, &x) in a_row.iter().enumerate() {
                sum += x * b[(k, j)];
            }
            *cell = sum;
        }
    });
}

/// C = A × B
pub fn multiply_into<E: Execution>(
    exec: &E,
    a: &Matrix,
    b: &Matrix,
    out: &mut Matrix,
) -> Result<()> {
    check_operands(a, b, out)?;
    multiply_unchecked(exec, a, b, out);
    Ok(())
}

/// Сумма ячеек A и B, разбиение по строкам
pub fn sum_rows<E: Execution>(exec: &E, a: &Matrix, b: &Matrix) -> Result<f64> {
    a.ensure_same_size(b)?;
    Ok(exec.sum(a.size(), |i| {
        a.row(i)
            .iter()
            .zip(b.row(i))
            .map(|(&x, &y)| x + y)
            .sum::<f64>()
    }))
}

/// Сумма ячеек A и B, разбиение по столбцам
pub fn sum_columns<E: Execution>(exec: &E, a: &Matrix, b: &Matrix) -> Result<f64> {
    a.ensure_same_size(b)?;
    let n = a.size();
    Ok(exec.sum(n, |j| (0..n).map(|i| a[(i, j)] + b[(i, j)]).sum::<f64>()))
}

/// Поэлементная сумма с выделением результата
pub fn add<E: Execution>(exec: &E, a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let mut out = Matrix::zeros(a.size());
    add_into(exec, a, b, &mut out)?;
    Ok(out)
}

/// Поэлементная разность с выделением результата
pub fn subtract<E: Execution>(exec: &E, a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let mut out = Matrix::zeros(a.size());
    subtract_into(exec, a, b, &mut out)?;
    Ok(out)
}

/// Матричное произведение с выделением результата
pub fn multiply<E: Execution>(exec: &E, a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let mut out = Matrix::zeros(a.size());
    multiply_into(exec, a, b, &mut out)?;
    Ok(out)
}

/// Результат LU-разложения без выбора ведущего элемента
///
/// `lower` нижняя унитреугольная, `upper` верхняя треугольная.
/// Если на шаге `i` элемент `upper[i][i]` оказался нулем, столбец `i`
/// матрицы `lower` ниже диагонали заполняется нулями, а `i` попадает в
/// `zero_pivots`. Ошибка в этом случае не возвращается.
///
/// Ячейки вне треугольников не пишутся ни одним шагом, поэтому остаются
/// нулями из `zeros`.
#[derive(Debug, Clone, PartialEq)]
pub struct LuFactors {
    lower: Matrix,
    upper: Matrix,
    zero_pivots: Vec<usize>,
}

impl LuFactors {
    /// Пустые буферы под разложение матрицы `size x size`
    pub fn zeros(size: usize) -> Self {
        Self {
            lower: Matrix::zeros(size),
            upper: Matrix::zeros(size),
            zero_pivots: Vec::new(),
        }
    }

    pub fn lower(&self) -> &Matrix {
        &self.lower
    }

    pub fn upper(&self) -> &Matrix {
        &self.upper
    }

    /// Шаги, на которых диагональ U была ровно нулем
    pub fn zero_pivots(&self) -> &[usize] {
        &self.zero_pivots
    }

    /// Нулевых ведущих элементов не встретилось, L·U восстанавливает A
    pub fn is_reliable(&self) -> bool {
        self.zero_pivots.is_empty()
    }

    /// Произведение L·U
    pub fn reconstruct(&self) -> Matrix {
        let mut out = Matrix::zeros(self.lower.size());
        multiply_unchecked(&Serial, &self.lower, &self.upper, &mut out);
        out
    }
}

fn lu_unchecked<E: Execution>(exec: &E, a: &Matrix, factors: &mut LuFactors) {
    let n = a.size();
    factors.zero_pivots.clear();

    // Внешний цикл последовательный: шаг i читает строки U и столбцы L,
    // записанные на предыдущих шагах
    for i in 0..n {
        // U[i][k] для k in i..n, k независимы друг от друга
        {
            let l_row = factors.lower.row(i);
            let (done, rest) = factors.upper.as_mut_slice().split_at_mut(i * n);
            let done: &[f64] = done;
            exec.for_each_cell(&mut rest[i..n], |offset, cell| {
                let k = i + offset;
                let sum: f64 = (0..i).map(|j| l_row[j] * done[j * n + k]).sum();
                *cell = a[(i, k)] - sum;
            });
        }

        // Барьер: U[i][i] закончен до начала второго цикла
        let pivot = factors.upper[(i, i)];
        if pivot == 0.0 {
            factors.zero_pivots.push(i);
        }

        // L[k][i] для k in i..n, каждая строка L пишется одним рабочим
        {
            let upper = &factors.upper;
            let tail = &mut factors.lower.as_mut_slice()[i * n..];
            exec.for_each_row(tail, n, |offset, l_row| {
                let k = i + offset;
                if k == i {
                    l_row[i] = 1.0;
                    return;
                }
                if pivot == 0.0 {
                    l_row[i] = 0.0;
                    return;
                }
                let sum: f64 = (0..i).map(|j| l_row[j] * upper[(j, i)]).sum();
                l_row[i] = (a[(k, i)] - sum) / pivot;
            });
        }
    }
}

/// LU-разложение по Дулиттлу в буферы вызывающего
///
/// `factors` можно переиспользовать между вызовами одного размера.
pub fn lu_factorize_into<E: Execution>(exec: &E, a: &Matrix, factors: &mut LuFactors) -> Result<()> {
    a.ensure_same_size(&factors.lower)?;
    lu_unchecked(exec, a, factors);
    Ok(())
}

/// LU-разложение по Дулиттлу
pub fn lu_factorize<E: Execution>(exec: &E, a: &Matrix) -> LuFactors {
    let mut factors = LuFactors::zeros(a.size());
    lu_unchecked(exec, a, &mut factors);
    factors
}
