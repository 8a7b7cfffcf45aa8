//! Сравнение параллельного и последовательного исполнения матричных ядер
//!
//! Набор из шести ядер (сложение, вычитание, произведение, суммирование по
//! строкам и по столбцам, LU-разложение) прогоняется дважды на одних и тех
//! же данных: на пуле потоков rayon и в одном потоке.

pub mod bench;
pub mod error;
pub mod exec;
pub mod matrix;
pub mod utils;

// Реэкспорт основных типов для удобства
pub use bench::{BenchConfig, BenchInputs, BenchReport, Benchmark, Kernel, KernelRecord};
pub use error::{BenchError, Result};
pub use exec::{Execution, Parallel, Serial};
pub use matrix::{LuFactors, Matrix, MatrixType};
pub use utils::{measure_time, Timing};
