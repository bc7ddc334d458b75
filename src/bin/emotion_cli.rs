use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speech_emotion::config::{AppConfig, DEFAULT_CONFIG_PATH};
use speech_emotion::dataset::run_labeling;
use speech_emotion::http::{resolve_bind_addr, serve};
use speech_emotion::store::RetryPolicy;
use speech_emotion::{
    init_logging, EmotionModel, InferenceService, PredictionLog, SqlitePredictionLog, Trainer,
};

#[derive(Parser, Debug)]
#[command(
    name = "emotion_cli",
    about = "Label RAVDESS clips, train the emotion forest and serve predictions"
)]
struct Cli {
    /// JSON configuration file (missing or invalid files fall back to defaults)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Unpack the archive and write the filepath,emotion CSV
    Label {
        #[arg(long)]
        archive: Option<PathBuf>,
        #[arg(long)]
        extract_dir: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Extract features, balance, fit the forest and save the model
    Train {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        trees: Option<usize>,
    },
    /// Classify one clip offline (nothing is recorded)
    Predict {
        file: PathBuf,
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Run the HTTP prediction service until Ctrl-C
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the prediction log as JSON
    History {
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from_file(&cli.config);

    match cli.command {
        Commands::Label {
            archive,
            extract_dir,
            csv,
        } => {
            override_path(&mut config.paths.archive, archive);
            override_path(&mut config.paths.extract_dir, extract_dir);
            override_path(&mut config.paths.labels_csv, csv);
            run_label(&config)
        }
        Commands::Train { csv, model, trees } => {
            override_path(&mut config.paths.labels_csv, csv);
            override_path(&mut config.paths.model, model);
            if let Some(trees) = trees {
                config.training.n_trees = trees;
            }
            run_train(config)
        }
        Commands::Predict { file, model } => {
            override_path(&mut config.paths.model, model);
            run_predict(&config, &file)
        }
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                config.server.bind_addr = addr;
            }
            run_serve(&config)
        }
        Commands::History { database } => {
            override_path(&mut config.paths.database, database);
            run_history(&config)
        }
    }
}

fn override_path(slot: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn run_label(config: &AppConfig) -> Result<()> {
    let paths = &config.paths;
    let report = run_labeling(&paths.archive, &paths.extract_dir, &paths.labels_csv)
        .with_context(|| format!("labeling {}", paths.archive.display()))?;

    println!(
        "Labeled {} files ({} skipped) -> {}",
        report.labeled(),
        report.skipped,
        paths.labels_csv.display()
    );
    Ok(())
}

fn run_train(config: AppConfig) -> Result<()> {
    let report = Trainer::new(config).run().context("training emotion model")?;

    for (emotion, count) in &report.counts_after_balancing {
        let before = report
            .counts_before_balancing
            .get(emotion)
            .copied()
            .unwrap_or(0);
        println!("  {:<10} {:>5} -> {:>5}", emotion.as_str(), before, count);
    }
    println!(
        "Trained on {} rows, evaluated on {} rows",
        report.train_rows, report.test_rows
    );
    println!("{}", report.accuracy_line());
    println!("Model saved to {}", report.model_path.display());
    Ok(())
}

fn run_predict(config: &AppConfig, file: &Path) -> Result<()> {
    let model = EmotionModel::load(&config.paths.model)
        .with_context(|| format!("loading model {}", config.paths.model.display()))?;
    // Throwaway log: offline predictions are never recorded
    let log = SqlitePredictionLog::in_memory().context("opening scratch prediction log")?;
    let service = InferenceService::new(
        Arc::new(model),
        Arc::new(log),
        std::env::temp_dir(),
        RetryPolicy::default(),
    );

    let emotion = service
        .predict_file(file)
        .with_context(|| format!("classifying {}", file.display()))?;
    println!("{}", emotion);
    Ok(())
}

fn run_serve(config: &AppConfig) -> Result<()> {
    let addr = resolve_bind_addr(config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime for the prediction service")?;

    runtime.block_on(serve(config, addr))
}

fn run_history(config: &AppConfig) -> Result<()> {
    let log = SqlitePredictionLog::open(&config.paths.database)
        .with_context(|| format!("opening {}", config.paths.database.display()))?;
    let records = log.all()?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
