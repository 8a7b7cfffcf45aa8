//! Вспомогательные функции и утилиты

use serde::Serialize;
use std::time::{Duration, Instant};

/// Измеряет время выполнения функции
///
/// Использует монотонные часы `Instant`, поэтому перевод системного
/// времени не влияет на результат.
pub fn measure_time<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();
    (result, duration)
}

/// Пара замеров одного ядра: параллельный и последовательный проход
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timing {
    /// Время параллельного прохода, секунды
    pub parallel_secs: f64,
    /// Время последовательного прохода, секунды
    pub serial_secs: f64,
}

impl Timing {
    pub fn new(parallel: Duration, serial: Duration) -> Self {
        Self {
            parallel_secs: parallel.as_secs_f64(),
            serial_secs: serial.as_secs_f64(),
        }
    }

    /// Ускорение параллельного прохода относительно последовательного
    pub fn speedup(&self) -> Option<f64> {
        if self.parallel_secs > 0.0 {
            Some(self.serial_secs / self.parallel_secs)
        } else {
            None
        }
    }
}
