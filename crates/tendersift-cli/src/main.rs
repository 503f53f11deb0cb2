use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use tendersift_core::{
    config_file, CategoryTag, MatchOptions, PageClassifier, ParameterPageMatcher, PdfBackend,
    RulebookCache,
};
use tendersift_llm::client::{extract_batch, BatchItem, GeminiClient, LlmConfig};
use tendersift_llm::prompt::build_prompt;
use tendersift_pdf::MupdfBackend;
use tendersift_reporting::{build_report, export_report, ExportFormat};

mod output;

use output::ColorMode;

/// Tender Document Analyzer - Extract structured parameters from tender PDFs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a tender PDF and extract the configured parameters
    Analyze {
        /// Path to the tender PDF
        pdf_path: PathBuf,

        /// Path to the parameters JSON list
        #[arg(short, long)]
        parameters: PathBuf,

        /// Path to the keyword rulebook JSON
        #[arg(long)]
        rulebook: Option<PathBuf>,

        /// Directory for exported reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Maximum matched pages per parameter
        #[arg(long)]
        top_k: Option<usize>,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,

        /// Gemini API key
        #[arg(long)]
        api_key: Option<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Classify and match only; skip the extraction model
        #[arg(long)]
        dry_run: bool,
    },

    /// List the category tags and parameters the engine recognizes
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Show => {
            show();
            Ok(())
        }
        Command::Analyze {
            pdf_path,
            parameters,
            rulebook,
            output_dir,
            top_k,
            model,
            api_key,
            no_color,
            dry_run,
        } => {
            analyze(
                pdf_path, parameters, rulebook, output_dir, top_k, model, api_key, no_color,
                dry_run,
            )
            .await
        }
    }
}

fn show() {
    println!("Category tags:");
    for tag in CategoryTag::ALL {
        println!("  {tag}");
    }
    println!("\nParameters:");
    for parameter in tendersift_core::Parameter::ALL {
        println!("  {parameter}");
    }
}

#[allow(clippy::too_many_arguments)]
async fn analyze(
    pdf_path: PathBuf,
    parameters_path: PathBuf,
    rulebook: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    top_k: Option<usize>,
    model: Option<String>,
    api_key: Option<String>,
    no_color: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let file_config = config_file::load_config();

    let rulebook_path = rulebook
        .or_else(|| {
            file_config
                .paths
                .as_ref()
                .and_then(|p| p.rulebook_path.clone())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("config/keywords_config.json"));

    let output_dir = output_dir
        .or_else(|| {
            file_config
                .paths
                .as_ref()
                .and_then(|p| p.output_directory.clone())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("output"));

    let top_k = top_k
        .or_else(|| {
            file_config
                .extraction
                .as_ref()
                .and_then(|e| e.max_pages_per_parameter)
        })
        .unwrap_or(3);

    let max_tokens_per_page = file_config
        .extraction
        .as_ref()
        .and_then(|e| e.max_tokens_per_page)
        .unwrap_or(4000);

    let api_key = api_key.or_else(|| std::env::var("GEMINI_API_KEY").ok());

    let color = ColorMode(!no_color);
    let mut stdout: Box<dyn Write> = Box::new(std::io::stdout());

    if !pdf_path.exists() {
        anyhow::bail!("PDF file not found: {}", pdf_path.display());
    }

    // Rulebook is validated eagerly, before any page is touched.
    let cache = RulebookCache::new(&rulebook_path);
    let rulebook = cache.get()?;

    // Extract and classify pages
    let backend = MupdfBackend::new();
    let mut pages = backend.extract_pages(&pdf_path)?;
    writeln!(
        stdout,
        "Extracted {} pages from {}\n",
        pages.len(),
        pdf_path.display()
    )?;

    let classifier = PageClassifier::new(&rulebook);
    classifier.classify_all(&mut pages);
    output::print_tag_summary(&mut stdout, &pages, color)?;

    // Match parameters to pages
    let parameter_list = tendersift_core::load_parameters(&parameters_path)?;
    let matcher = ParameterPageMatcher::new(&rulebook, MatchOptions { top_k });
    let matches = matcher.match_all(&parameter_list, &pages);
    output::print_match_plan(&mut stdout, &matches, color)?;

    if dry_run {
        writeln!(stdout, "Dry run: skipping extraction.")?;
        return Ok(());
    }

    let api_key = api_key.ok_or_else(|| {
        anyhow::anyhow!("no API key: pass --api-key or set GEMINI_API_KEY")
    })?;

    // Build prompts; an empty match builds none and reports "not found"
    // without an API call.
    let max_chars = max_tokens_per_page * top_k * 4;
    let items: Vec<BatchItem> = matches
        .iter()
        .map(|m| BatchItem {
            parameter: m.parameter,
            request: build_prompt(m, max_chars),
        })
        .collect();

    let mut llm_config = LlmConfig::new(api_key);
    if let Some(model) = model.or_else(|| std::env::var("GEMINI_MODEL").ok()).or_else(|| {
        file_config
            .llm
            .as_ref()
            .and_then(|l| l.model_name.clone())
    }) {
        llm_config.model = model;
    }
    if let Some(retries) = file_config.llm.as_ref().and_then(|l| l.retry_attempts) {
        llm_config.retry_attempts = retries;
    }
    if let Some(secs) = file_config.llm.as_ref().and_then(|l| l.timeout_secs) {
        llm_config.timeout = Duration::from_secs(secs);
    }
    let retry_attempts = llm_config.retry_attempts;
    let client = GeminiClient::new(llm_config);

    // Set up Ctrl+C handler
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let progress_writer: Arc<Mutex<Box<dyn Write + Send>>> =
        Arc::new(Mutex::new(Box::new(std::io::stdout())));
    let progress_cb = {
        let pw = Arc::clone(&progress_writer);
        move |event: tendersift_llm::ProgressEvent| {
            if let Ok(mut w) = pw.lock() {
                let _ = output::print_progress(&mut *w, &event, color);
                let _ = w.flush();
            }
        }
    };

    let extractions = extract_batch(&client, items, retry_attempts, progress_cb, &cancel).await;

    // Assemble and export the report
    let report = build_report(&extractions);
    writeln!(stdout)?;
    output::print_report(&mut stdout, &report, color)?;

    for format in [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Text] {
        let path = output_dir.join(format!("tender_analysis_results.{}", format.extension()));
        export_report(&report, format, &path)?;
        writeln!(stdout, "Saved: {}", path.display())?;
    }

    Ok(())
}
