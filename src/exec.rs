//! Стратегии исполнения ядер
//!
//! Каждое ядро написано один раз и получает стратегию как параметр:
//! - `Serial` обходит индексы по порядку в текущем потоке
//! - `Parallel` раздаёт их рабочим потокам собственного пула rayon
//!
//! Любой вызов метода стратегии является fork-join областью: управление
//! возвращается только после завершения всех итераций.

use crate::error::{BenchError, Result};
use log::info;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Число рабочих потоков по умолчанию
pub const DEFAULT_THREADS: usize = 8;

/// Способ обхода независимых итераций
pub trait Execution: Sync {
    /// Короткое имя для логов
    fn name(&self) -> &'static str;

    /// Вызывает `f(row_index, row)` для каждой строки ширины `width`
    fn for_each_row<F>(&self, data: &mut [f64], width: usize, f: F)
    where
        F: Fn(usize, &mut [f64]) + Sync + Send;

    /// Вызывает `f(index, cell)` для каждого элемента среза
    fn for_each_cell<F>(&self, data: &mut [f64], f: F)
    where
        F: Fn(usize, &mut f64) + Sync + Send;

    /// Сумма `f(i)` по `0..len`
    ///
    /// Частичные суммы принадлежат отдельным рабочим и объединяются
    /// редукцией, общего изменяемого аккумулятора нет.
    fn sum<F>(&self, len: usize, f: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync + Send;
}

/// Последовательное исполнение в вызывающем потоке
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

impl Execution for Serial {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn for_each_row<F>(&self, data: &mut [f64], width: usize, f: F)
    where
        F: Fn(usize, &mut [f64]) + Sync + Send,
    {
        debug_assert!(width > 0);
        data.chunks_mut(width)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
    }

    fn for_each_cell<F>(&self, data: &mut [f64], f: F)
    where
        F: Fn(usize, &mut f64) + Sync + Send,
    {
        data.iter_mut().enumerate().for_each(|(i, cell)| f(i, cell));
    }

    fn sum<F>(&self, len: usize, f: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync + Send,
    {
        (0..len).map(f).sum()
    }
}

/// Параллельное исполнение на выделенном пуле потоков
pub struct Parallel {
    pool: ThreadPool,
}

impl Parallel {
    /// Создает пул из `threads` потоков, 0 означает число логических CPU
    pub fn new(threads: usize) -> Result<Self> {
        let threads = if threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_THREADS)
        } else {
            threads
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("matrix-bench-{}", i))
            .build()
            .map_err(|e| BenchError::ThreadPool(e.to_string()))?;

        info!("Пул потоков создан: {} рабочих", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Фактическое число рабочих потоков
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl std::fmt::Debug for Parallel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parallel")
            .field("threads", &self.threads())
            .finish()
    }
}

impl Execution for Parallel {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn for_each_row<F>(&self, data: &mut [f64], width: usize, f: F)
    where
        F: Fn(usize, &mut [f64]) + Sync + Send,
    {
        debug_assert!(width > 0);
        self.pool.install(|| {
            data.par_chunks_mut(width)
                .enumerate()
                .for_each(|(i, row)| f(i, row))
        });
    }

    fn for_each_cell<F>(&self, data: &mut [f64], f: F)
    where
        F: Fn(usize, &mut f64) + Sync + Send,
    {
        self.pool.install(|| {
            data.par_iter_mut()
                .enumerate()
                .for_each(|(i, cell)| f(i, cell))
        });
    }

    fn sum<F>(&self, len: usize, f: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync + Send,
    {
        self.pool
            .install(|| (0..len).into_par_iter().map(&f).sum::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_rows<E: Execution>(exec: &E) -> Vec<f64> {
        let mut data = vec![0.0; 12];
        exec.for_each_row(&mut data, 4, |i, row| {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (i * 10 + j) as f64;
            }
        });
        data
    }

    #[test]
    fn test_rows_serial_and_parallel_agree() {
        let parallel = Parallel::new(4).unwrap();
        assert_eq!(fill_rows(&Serial), fill_rows(&parallel));
        assert_eq!(fill_rows(&Serial)[4..8], [10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_for_each_cell_indices() {
        let parallel = Parallel::new(3).unwrap();
        let mut data = vec![0.0; 100];
        parallel.for_each_cell(&mut data, |i, cell| *cell = i as f64 * 2.0);
        assert!(data.iter().enumerate().all(|(i, &v)| v == i as f64 * 2.0));
    }

    #[test]
    fn test_sum_matches_serial() {
        let parallel = Parallel::new(8).unwrap();
        let f = |i: usize| (i % 50) as f64;
        assert_eq!(Serial.sum(10_000, f), parallel.sum(10_000, f));
    }

    #[test]
    fn test_sum_empty_range() {
        assert_eq!(Serial.sum(0, |_| 1.0), 0.0);
    }

    #[test]
    fn test_thread_count() {
        assert_eq!(Parallel::new(2).unwrap().threads(), 2);
        assert!(Parallel::new(0).unwrap().threads() >= 1);
    }
}
