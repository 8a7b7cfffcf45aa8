//! Прогон набора ядер: параллельный и последовательный проход каждого ядра,
//! сверка результатов и отчет

use crate::error::{BenchError, Result};
use crate::exec::{Execution, Parallel, Serial, DEFAULT_THREADS};
use crate::matrix::kernels::{self, LuFactors};
use crate::matrix::{approx_eq, compare_results, initialize_matrices, Matrix, MatrixType};
use crate::utils::{measure_time, Timing};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use prettytable::{row, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::time::Duration;

/// Наибольший допустимый размер матрицы
pub const MAX_SIZE: usize = 4096;

/// Верхняя граница случайных значений по умолчанию
pub const DEFAULT_MAX_VALUE: u32 = 50;

/// Размеры для `--sweep`
pub const DEFAULT_SWEEP_SIZES: [usize; 6] = [100, 200, 400, 600, 800, 1000];

/// Параметры одного прогона
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchConfig {
    /// Длина стороны матриц
    pub size: usize,
    /// Число рабочих потоков, 0 означает число логических CPU
    pub threads: usize,
    /// Зерно генератора, при `None` берется из энтропии ОС
    pub seed: Option<u64>,
    /// Способ заполнения входных матриц
    pub fill: MatrixType,
    /// Верхняя (исключенная) граница случайных значений
    pub max_value: u32,
    /// Сверять параллельный и последовательный результаты
    pub verify: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            size: 100,
            threads: DEFAULT_THREADS,
            seed: None,
            fill: MatrixType::Random,
            max_value: DEFAULT_MAX_VALUE,
            verify: true,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<()> {
        validate_size(self.size)
    }
}

/// Проверяет размер матрицы
pub fn validate_size(size: usize) -> Result<()> {
    if size == 0 || size > MAX_SIZE {
        return Err(BenchError::InvalidSize {
            size,
            max: MAX_SIZE,
        });
    }
    Ok(())
}

/// Разбирает размер, введенный пользователем
pub fn parse_size(input: &str) -> Result<usize> {
    let trimmed = input.trim();
    let size: i64 = trimmed
        .parse()
        .map_err(|_| BenchError::InvalidInput(format!("not a number: {:?}", trimmed)))?;
    let size = usize::try_from(size)
        .map_err(|_| BenchError::InvalidInput(format!("size must be positive, got {}", size)))?;
    validate_size(size)?;
    Ok(size)
}

/// Ядра в каноническом порядке прогона
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    Addition,
    Subtraction,
    Product,
    SumRow,
    SumColumn,
    LuFactorization,
}

impl Kernel {
    pub const ALL: [Kernel; 6] = [
        Kernel::Addition,
        Kernel::Subtraction,
        Kernel::Product,
        Kernel::SumRow,
        Kernel::SumColumn,
        Kernel::LuFactorization,
    ];

    /// Название строки отчета
    pub fn label(&self) -> &'static str {
        match self {
            Kernel::Addition => "Matrix Addition",
            Kernel::Subtraction => "Matrix Subtraction",
            Kernel::Product => "Matrix Product",
            Kernel::SumRow => "Sum Row",
            Kernel::SumColumn => "Sum Column",
            Kernel::LuFactorization => "LU Factorization",
        }
    }
}

/// Входные матрицы прогона, одинаковые для всех ядер
#[derive(Debug, Clone, PartialEq)]
pub struct BenchInputs {
    a: Matrix,
    b: Matrix,
}

impl BenchInputs {
    /// Проверяет размеры до запуска любого ядра
    pub fn new(a: Matrix, b: Matrix) -> Result<Self> {
        a.ensure_same_size(&b)?;
        validate_size(a.size())?;
        Ok(Self { a, b })
    }

    /// Генерирует входные данные по конфигурации
    pub fn generate(config: &BenchConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (a, b) = initialize_matrices(config.fill, config.size, config.max_value, &mut rng)?;
        Ok(Self { a, b })
    }

    pub fn a(&self) -> &Matrix {
        &self.a
    }

    pub fn b(&self) -> &Matrix {
        &self.b
    }

    pub fn size(&self) -> usize {
        self.a.size()
    }
}

/// Результат одного прохода ядра
#[derive(Debug, Clone, PartialEq)]
pub enum KernelOutput {
    Matrix(Matrix),
    Scalar(f64),
    Factors(LuFactors),
}

impl KernelOutput {
    /// Совпадение результатов двух проходов в пределах допуска
    pub fn agrees_with(&self, other: &KernelOutput) -> bool {
        match (self, other) {
            (KernelOutput::Matrix(l), KernelOutput::Matrix(r)) => compare_results(l, r).agrees(),
            (KernelOutput::Scalar(l), KernelOutput::Scalar(r)) => approx_eq(*l, *r),
            (KernelOutput::Factors(l), KernelOutput::Factors(r)) => {
                l.zero_pivots() == r.zero_pivots()
                    && compare_results(l.lower(), r.lower()).agrees()
                    && compare_results(l.upper(), r.upper()).agrees()
            }
            _ => false,
        }
    }
}

/// Строка отчета по одному ядру
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelRecord {
    pub kernel: Kernel,
    pub timing: Timing,
    /// Итог редукции для ядер суммирования
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Шаги LU с нулевым ведущим элементом
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zero_pivots: Vec<usize>,
    /// Итог сверки, `None` если сверка выключена
    pub agree: Option<bool>,
}

impl KernelRecord {
    fn check_label(&self) -> &'static str {
        match (self.agree, self.zero_pivots.is_empty()) {
            (Some(false), _) => "MISMATCH",
            (_, false) => "zero pivot",
            (Some(true), true) => "ok",
            (None, true) => "-",
        }
    }
}

/// Отчет о полном прогоне
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchReport {
    pub config: BenchConfig,
    pub size: usize,
    pub threads: usize,
    pub records: Vec<KernelRecord>,
}

impl BenchReport {
    /// Все проходы совпали (или сверка выключена)
    pub fn all_agree(&self) -> bool {
        self.records.iter().all(|r| r.agree != Some(false))
    }

    /// Таблица для вывода в консоль
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["Operation", "Parallel (s)", "Serial (s)", "Speedup", "Check"]);
        for record in &self.records {
            let speedup = record
                .timing
                .speedup()
                .map(|s| format!("{:.2}x", s))
                .unwrap_or_else(|| "-".to_string());
            table.add_row(row![
                record.kernel.label(),
                format!("{:.6}", record.timing.parallel_secs),
                format!("{:.6}", record.timing.serial_secs),
                speedup,
                record.check_label()
            ]);
        }
        table
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Отчеты серии прогонов одним JSON-массивом
pub fn reports_to_json(reports: &[BenchReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

/// Исполнитель набора ядер
#[derive(Debug)]
pub struct Benchmark {
    parallel: Parallel,
    config: BenchConfig,
}

impl Benchmark {
    /// Проверяет конфигурацию и создает пул потоков
    pub fn new(config: &BenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parallel: Parallel::new(config.threads)?,
            config: config.clone(),
        })
    }

    pub fn threads(&self) -> usize {
        self.parallel.threads()
    }

    /// Прогоняет все ядра по очереди на одних и тех же входных данных
    pub fn run(&self, inputs: &BenchInputs, progress: &ProgressBar) -> Result<BenchReport> {
        progress.set_length(Kernel::ALL.len() as u64);
        let report = self.run_suite(inputs, progress)?;
        progress.finish_and_clear();
        Ok(report)
    }

    /// Серия прогонов по списку размеров, по одному отчету на размер
    ///
    /// Все размеры проверяются до первого прогона. Для каждого размера
    /// генерируются свои входные данные, пул потоков общий.
    pub fn sweep(&self, sizes: &[usize], progress: &ProgressBar) -> Result<Vec<BenchReport>> {
        if sizes.is_empty() {
            return Err(BenchError::InvalidInput("empty size list".to_string()));
        }
        for &size in sizes {
            validate_size(size)?;
        }
        progress.set_length((sizes.len() * Kernel::ALL.len()) as u64);

        let mut reports = Vec::with_capacity(sizes.len());
        for &size in sizes {
            let config = BenchConfig {
                size,
                ..self.config.clone()
            };
            debug!("Генерация входных данных {}x{}", size, size);
            let inputs = BenchInputs::generate(&config)?;
            reports.push(self.run_suite(&inputs, progress)?);
        }
        progress.finish_and_clear();
        Ok(reports)
    }

    fn run_suite(&self, inputs: &BenchInputs, progress: &ProgressBar) -> Result<BenchReport> {
        info!(
            "Запуск набора ядер: {}x{}, потоков: {}",
            inputs.size(),
            inputs.size(),
            self.threads()
        );

        let mut records = Vec::with_capacity(Kernel::ALL.len());
        for kernel in Kernel::ALL {
            progress.set_message(format!("{} ({}x{})", kernel.label(), inputs.size(), inputs.size()));
            records.push(self.run_kernel(kernel, inputs)?);
            progress.inc(1);
        }

        info!("Набор ядер завершен");
        Ok(BenchReport {
            config: BenchConfig {
                size: inputs.size(),
                ..self.config.clone()
            },
            size: inputs.size(),
            threads: self.threads(),
            records,
        })
    }

    /// Параллельный, затем последовательный проход одного ядра
    ///
    /// Проходы пишут в разные буферы.
    pub fn run_kernel(&self, kernel: Kernel, inputs: &BenchInputs) -> Result<KernelRecord> {
        let (parallel_out, parallel_time) = execute(kernel, &self.parallel, inputs)?;
        let (serial_out, serial_time) = execute(kernel, &Serial, inputs)?;
        let timing = Timing::new(parallel_time, serial_time);
        debug!(
            "{}: parallel {:.6}s, serial {:.6}s",
            kernel.label(),
            timing.parallel_secs,
            timing.serial_secs
        );

        let agree = if self.config.verify {
            let agree = parallel_out.agrees_with(&serial_out);
            if !agree {
                warn!("{}: результаты проходов расходятся", kernel.label());
            }
            Some(agree)
        } else {
            None
        };

        let total = match &parallel_out {
            KernelOutput::Scalar(total) => Some(*total),
            _ => None,
        };

        let zero_pivots = match &serial_out {
            KernelOutput::Factors(factors) => factors.zero_pivots().to_vec(),
            _ => Vec::new(),
        };
        if !zero_pivots.is_empty() {
            warn!(
                "{}: нулевой ведущий элемент на шагах {:?}, разложение ненадежно",
                kernel.label(),
                zero_pivots
            );
        }

        Ok(KernelRecord {
            kernel,
            timing,
            total,
            zero_pivots,
            agree,
        })
    }
}

type MatrixKernel<E> = fn(&E, &Matrix, &Matrix, &mut Matrix) -> Result<()>;

fn matrix_pass<E: Execution>(
    exec: &E,
    inputs: &BenchInputs,
    op: MatrixKernel<E>,
) -> Result<(KernelOutput, Duration)> {
    let mut out = Matrix::zeros(inputs.size());
    let (result, elapsed) = measure_time(|| op(exec, &inputs.a, &inputs.b, &mut out));
    result?;
    Ok((KernelOutput::Matrix(out), elapsed))
}

/// Один замеренный проход ядра
///
/// Буфер результата выделяется до начала замера.
pub fn execute<E: Execution>(
    kernel: Kernel,
    exec: &E,
    inputs: &BenchInputs,
) -> Result<(KernelOutput, Duration)> {
    let (a, b) = (&inputs.a, &inputs.b);
    match kernel {
        Kernel::Addition => matrix_pass(exec, inputs, kernels::add_into::<E>),
        Kernel::Subtraction => matrix_pass(exec, inputs, kernels::subtract_into::<E>),
        Kernel::Product => matrix_pass(exec, inputs, kernels::multiply_into::<E>),
        Kernel::SumRow => {
            let (total, elapsed) = measure_time(|| kernels::sum_rows(exec, a, b));
            Ok((KernelOutput::Scalar(total?), elapsed))
        }
        Kernel::SumColumn => {
            let (total, elapsed) = measure_time(|| kernels::sum_columns(exec, a, b));
            Ok((KernelOutput::Scalar(total?), elapsed))
        }
        Kernel::LuFactorization => {
            let mut factors = LuFactors::zeros(inputs.size());
            let (result, elapsed) =
                measure_time(|| kernels::lu_factorize_into(exec, a, &mut factors));
            result?;
            Ok((KernelOutput::Factors(factors), elapsed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> BenchConfig {
        BenchConfig {
            size: 12,
            threads: 4,
            seed: Some(1),
            ..BenchConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.threads, 8);
        assert_eq!(config.max_value, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_size_bounds() {
        assert!(validate_size(1).is_ok());
        assert!(validate_size(MAX_SIZE).is_ok());
        assert_eq!(
            validate_size(0),
            Err(BenchError::InvalidSize {
                size: 0,
                max: MAX_SIZE
            })
        );
        assert!(validate_size(MAX_SIZE + 1).is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size(" 64\n"), Ok(64));
        assert!(matches!(parse_size("abc"), Err(BenchError::InvalidInput(_))));
        assert!(matches!(parse_size("-3"), Err(BenchError::InvalidInput(_))));
        assert!(matches!(parse_size("0"), Err(BenchError::InvalidSize { .. })));
    }

    #[test]
    fn test_inputs_reject_mismatch() {
        let err = BenchInputs::new(Matrix::zeros(2), Matrix::zeros(3)).unwrap_err();
        assert_eq!(
            err,
            BenchError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_kernel_order_and_labels() {
        let labels: Vec<_> = Kernel::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(labels[0], "Matrix Addition");
        assert_eq!(labels[5], "LU Factorization");
    }

    #[test]
    fn test_run_produces_six_records() {
        let config = small_config();
        let inputs = BenchInputs::generate(&config).unwrap();
        let bench = Benchmark::new(&config).unwrap();
        let report = bench.run(&inputs, &ProgressBar::hidden()).unwrap();

        assert_eq!(report.records.len(), 6);
        assert_eq!(report.threads, 4);
        assert!(report.all_agree());
        for record in &report.records {
            assert!(record.timing.parallel_secs >= 0.0);
            assert!(record.timing.serial_secs >= 0.0);
        }
    }

    #[test]
    fn test_sum_records_carry_total() {
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
        let inputs = BenchInputs::new(a, b).unwrap();
        let bench = Benchmark::new(&BenchConfig {
            size: 2,
            threads: 2,
            ..BenchConfig::default()
        })
        .unwrap();

        let row = bench.run_kernel(Kernel::SumRow, &inputs).unwrap();
        let column = bench.run_kernel(Kernel::SumColumn, &inputs).unwrap();
        assert_eq!(row.total, Some(36.0));
        assert_eq!(column.total, Some(36.0));
        assert_eq!(row.agree, Some(true));
    }

    #[test]
    fn test_constant_fill_reports_zero_pivot() {
        let config = BenchConfig {
            fill: MatrixType::OnesAndTwos,
            ..small_config()
        };
        let inputs = BenchInputs::generate(&config).unwrap();
        let bench = Benchmark::new(&config).unwrap();
        let record = bench.run_kernel(Kernel::LuFactorization, &inputs).unwrap();
        assert_eq!(record.zero_pivots, (1..12).collect::<Vec<_>>());
        assert_eq!(record.check_label(), "zero pivot");
    }

    #[test]
    fn test_verification_disabled() {
        let config = BenchConfig {
            verify: false,
            ..small_config()
        };
        let inputs = BenchInputs::generate(&config).unwrap();
        let bench = Benchmark::new(&config).unwrap();
        let record = bench.run_kernel(Kernel::Addition, &inputs).unwrap();
        assert_eq!(record.agree, None);
        assert_eq!(record.check_label(), "-");
    }

    #[test]
    fn test_outputs_of_different_kinds_disagree() {
        let matrix = KernelOutput::Matrix(Matrix::zeros(1));
        assert!(!matrix.agrees_with(&KernelOutput::Scalar(0.0)));
    }

    #[test]
    fn test_report_table_and_json() {
        let config = small_config();
        let inputs = BenchInputs::generate(&config).unwrap();
        let report = Benchmark::new(&config)
            .unwrap()
            .run(&inputs, &ProgressBar::hidden())
            .unwrap();

        let table = report.to_table();
        assert_eq!(table.len(), 7);
        let rendered = table.to_string();
        assert!(rendered.contains("Matrix Product"));
        assert!(rendered.contains("Parallel (s)"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["size"], 12);
        assert_eq!(json["config"]["fill"], "random");
        assert_eq!(json["records"][2]["kernel"], "product");
        assert_eq!(json["records"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_sweep_one_report_per_size() {
        let bench = Benchmark::new(&small_config()).unwrap();
        let reports = bench.sweep(&[3, 5], &ProgressBar::hidden()).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].size, 5);
        assert_eq!(reports[1].config.size, 5);

        let json: serde_json::Value = serde_json::from_str(&reports_to_json(&reports).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["size"], 3);
    }

    #[test]
    fn test_sweep_rejects_bad_size_before_running() {
        let bench = Benchmark::new(&small_config()).unwrap();
        let progress = ProgressBar::hidden();
        assert!(matches!(
            bench.sweep(&[4, 0], &progress),
            Err(BenchError::InvalidSize { size: 0, .. })
        ));
        assert_eq!(progress.position(), 0);
        assert!(matches!(bench.sweep(&[], &progress), Err(BenchError::InvalidInput(_))));
    }
}
