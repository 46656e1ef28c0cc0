//! smartreader - 为 HTML 文档添加仿生阅读强调

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{ArgAction, Parser};

use smartreader::env::generate_env_docs;
use smartreader::{
    JsonFileStore, KeyValueStore, MemoryStore, Message, Page, ReaderConfig, ReaderResult,
    Response, SmartReader,
};

#[derive(Parser)]
#[command(name = "smartreader")]
#[command(version, about = "Bionic reading emphasis for HTML documents", long_about = None)]
#[command(after_help = "EXAMPLES:
    smartreader page.html -o out.html          Emphasise word prefixes
    smartreader --strip out.html               Remove emphasis markers
    cat page.html | smartreader - --stats      Read from stdin, print stats")]
struct Cli {
    /// Input HTML file, `-` for stdin
    #[arg(value_name = "INPUT", required_unless_present = "env_docs")]
    input: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Document charset
    #[arg(short, long, default_value = "utf-8")]
    encoding: String,

    /// JSON file holding the enabled flag, stats and language settings
    #[arg(short, long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Remove emphasis markers instead of adding them
    #[arg(long)]
    strip: bool,

    /// Control message (JSON) handled after the document is loaded; repeatable
    #[arg(short, long = "message", value_name = "JSON")]
    messages: Vec<String>,

    /// Print the stats record to stderr
    #[arg(long)]
    stats: bool,

    /// Print supported environment variables and exit
    #[arg(long)]
    env_docs: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    init_tracing(cli.verbose);

    if cli.env_docs {
        print!("{}", generate_env_docs());
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match &cli.state {
            Some(path) => run(&cli, JsonFileStore::new(path)).await,
            None => run(&cli, MemoryStore::new()).await,
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run<S: KeyValueStore>(cli: &Cli, store: S) -> ReaderResult<()> {
    let config = match &cli.config {
        Some(path) => ReaderConfig::load(path)?,
        None => {
            let mut config = ReaderConfig::default();
            config.apply_env_overrides();
            config.validate();
            config
        }
    };

    let data = read_input(cli.input.as_deref().unwrap_or("-"))?;
    let page = Rc::new(Page::from_bytes(&data, &cli.encoding)?);
    let reader = SmartReader::new(page.clone(), config, store);

    if cli.strip {
        let removed = reader.strip();
        tracing::info!("移除了 {} 个强调标记", removed);
    } else if let Some(summary) = reader.on_load().await {
        tracing::info!(
            "处理了 {} 个元素，耗时 {:.2} ms",
            summary.processed,
            summary.elapsed_ms
        );
    }

    for raw in &cli.messages {
        let message = Message::from_json(raw)?;
        let response = reader.handle_message(message).await;
        eprintln!("{}", response.to_json()?);
    }

    if cli.stats {
        eprintln!("{}", Response::Stats(reader.stats()).to_json()?);
    }

    let html = page.serialize(&cli.encoding)?;
    match &cli.output {
        Some(path) => fs::write(path, html)?,
        None => io::stdout().write_all(&html)?,
    }
    Ok(())
}

fn read_input(input: &str) -> ReaderResult<Vec<u8>> {
    if input == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        Ok(data)
    } else {
        Ok(fs::read(input)?)
    }
}
