//! Бенчмарк матричных ядер: параллельно против последовательно

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use matrix_bench::bench::{parse_size, reports_to_json, DEFAULT_MAX_VALUE, DEFAULT_SWEEP_SIZES};
use matrix_bench::exec::DEFAULT_THREADS;
use matrix_bench::{BenchConfig, BenchInputs, BenchReport, Benchmark, MatrixType};
use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(name = "matrix_bench")]
#[command(about = "Parallel vs serial timing of dense matrix kernels")]
#[command(version)]
struct Cli {
    /// Matrix side length; prompted on stdin when omitted
    #[arg(short = 'n', long, allow_hyphen_values = true)]
    size: Option<String>,

    /// Comma-separated sizes run one after another, e.g. 100,200,400
    #[arg(long, value_delimiter = ',', conflicts_with = "size", allow_hyphen_values = true)]
    sizes: Vec<String>,

    /// Run over sizes 100,200,400,600,800,1000
    #[arg(long, conflicts_with_all = ["size", "sizes"])]
    sweep: bool,

    /// Worker threads (0 = all logical CPUs)
    #[arg(short, long, default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Random seed for reproducible inputs
    #[arg(long)]
    seed: Option<u64>,

    /// How input matrices are filled
    #[arg(long, value_enum, default_value = "random")]
    fill: MatrixType,

    /// Exclusive upper bound of random values
    #[arg(long, default_value_t = DEFAULT_MAX_VALUE)]
    max_value: u32,

    /// Skip comparing parallel and serial results
    #[arg(long)]
    no_verify: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Запрашивает размер матрицы у пользователя
fn prompt_size() -> Result<String> {
    print!("Введите размер матрицы nxn: ");
    io::stdout().flush().context("Не удалось вывести приглашение")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Не удалось прочитать размер матрицы")?;
    Ok(line)
}

fn progress_bar(hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .context("Некорректный шаблон прогресса")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn print_report(report: &BenchReport) {
    report.to_table().printstd();
    if !report.all_agree() {
        println!("\nРезультаты параллельного и последовательного проходов различаются");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let sizes: Vec<usize> = if cli.sweep {
        DEFAULT_SWEEP_SIZES.to_vec()
    } else {
        cli.sizes
            .iter()
            .map(|raw| parse_size(raw))
            .collect::<matrix_bench::Result<_>>()
            .context("Некорректный список размеров")?
    };

    let size = match sizes.first() {
        Some(&first) => first,
        None => {
            let raw_size = match cli.size {
                Some(size) => size,
                None => prompt_size()?,
            };
            parse_size(&raw_size).context("Некорректный размер матрицы")?
        }
    };

    let config = BenchConfig {
        size,
        threads: cli.threads,
        seed: cli.seed,
        fill: cli.fill,
        max_value: cli.max_value,
        verify: !cli.no_verify,
    };

    let benchmark = Benchmark::new(&config).context("Не удалось подготовить бенчмарк")?;
    let pb = progress_bar(cli.json || cli.no_progress)?;

    if !sizes.is_empty() {
        if !cli.json {
            println!("\nСерия размеров: {:?}", sizes);
        }
        let reports = benchmark.sweep(&sizes, &pb)?;
        if cli.json {
            println!("{}", reports_to_json(&reports).context("Не удалось сериализовать отчеты")?);
        } else {
            for report in &reports {
                println!("\nМатрицы {}x{}", report.size, report.size);
                print_report(report);
            }
        }
        return Ok(());
    }

    if !cli.json {
        println!("\nГенерация матриц {}x{}...", size, size);
    }
    let inputs = BenchInputs::generate(&config)?;
    info!("Входные данные готовы: {:?}, потоков: {}", config.fill, benchmark.threads());

    let report = benchmark.run(&inputs, &pb)?;

    if cli.json {
        println!("{}", report.to_json().context("Не удалось сериализовать отчет")?);
    } else {
        println!();
        print_report(&report);
    }

    Ok(())
}
