use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use ocrr_engine::{
    config, logging, pipeline, preview, shutdown, Coordinator, EngineConfig, EngineContext,
    SqliteStore, TaskStore, WebhookNotifier,
};
use ocrr_ocr::{OcrEngine, QrDetector, TesseractEngine};

#[derive(Parser)]
#[command(name = "ocrr", version, about = "Identity document redaction engine")]
struct Cli {
    /// Config file (defaults to $OCRR_CONFIG, then ./ocrr.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start discovery and the worker pool
    Run,
    /// OCR, classify and extract one image, printing the verdict as JSON
    Inspect { image: PathBuf },
    /// Paint the boxes of a coordinates file onto an image
    Mask {
        image: PathBuf,
        coordinates: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Register the status callback of a client
    SeedWebhook { client_id: String, url: String },
    /// Write the default configuration
    InitConfig { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::InitConfig { path } => init_config(&path),
        Command::Run => run(load_config(config_path)?),
        Command::Inspect { image } => inspect(&load_config(config_path)?, &image),
        Command::Mask {
            image,
            coordinates,
            output,
        } => {
            load_config(config_path)?;
            let painted = preview::mask_file(&image, &coordinates, &output)
                .with_context(|| format!("cannot mask {}", image.display()))?;
            println!("{} box(es) painted to {}", painted, output.display());
            Ok(())
        }
        Command::SeedWebhook { client_id, url } => {
            let store = open_store(&load_config(config_path)?)?;
            store
                .set_webhook(&client_id, &url)
                .context("cannot register webhook")?;
            println!("webhook for {} set to {}", client_id, url);
            Ok(())
        }
    }
}

/// Loads the config and installs logging.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = EngineConfig::load(explicit).with_context(|| {
        format!(
            "cannot load config {}",
            config::resolve_path(explicit).display()
        )
    })?;
    logging::init_logger(&config.log_path, &config.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ocrr configured");
    Ok(config)
}

fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    EngineConfig::default()
        .save(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    println!("default config written to {}", path.display());
    Ok(())
}

fn open_store(config: &EngineConfig) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(&config.database_path)
        .with_context(|| format!("cannot open store {}", config.database_path.display()))
}

fn ocr_engine(config: &EngineConfig) -> anyhow::Result<Arc<dyn OcrEngine>> {
    let engine = TesseractEngine::new(config.tesseract.clone()).context("tesseract is not usable")?;
    Ok(Arc::new(engine))
}

fn qr_detector(config: &EngineConfig) -> Arc<dyn QrDetector> {
    Arc::from(config.qr_detector.build())
}

fn run(config: EngineConfig) -> anyhow::Result<()> {
    let store: Arc<dyn TaskStore> = Arc::new(open_store(&config)?);
    let ocr = ocr_engine(&config)?;
    let qr = qr_detector(&config);
    let notifier = Arc::new(WebhookNotifier::new(store.clone()));
    let coordinator = Coordinator::new(EngineContext::new(config, store, ocr, qr, notifier));

    log::info!("[Main] starting with {} worker(s)", coordinator.context().config.worker_count);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start runtime")?;

    runtime.block_on(async {
        let (trigger, shutdown) = shutdown::channel();
        shutdown::trigger_on_ctrl_c(trigger);
        coordinator.run(shutdown).await
    })?;
    log::info!("[Main] stopped");
    Ok(())
}

fn inspect(config: &EngineConfig, image: &Path) -> anyhow::Result<()> {
    let ocr = ocr_engine(config)?;
    let qr = qr_detector(config);

    // normalisation rewrites the file, so work on a copy
    fs::create_dir_all(&config.workspace_path)?;
    let name = image
        .file_name()
        .context("image path has no file name")?;
    let copy = config
        .workspace_path
        .join(format!("inspect+{}", name.to_string_lossy()));
    fs::copy(image, &copy).with_context(|| format!("cannot read {}", image.display()))?;

    let result = pipeline::analyze(
        ocr.as_ref(),
        qr.as_ref(),
        &copy,
        config.classification_policy,
        config.redaction_level,
        None,
    );
    if let Err(e) = fs::remove_file(&copy) {
        log::warn!("[Main] cannot remove {}: {}", copy.display(), e);
    }
    let analysis = result.context("analysis failed")?;

    let report = serde_json::json!({
        "engine": ocr.name(),
        "analysis": analysis,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
