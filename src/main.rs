use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use studyadmin::{
    api::ApiClient,
    cli::{Cli, Commands},
    commands::{study_table, table_for, EntityCommands, EntityOp},
    config::Config,
    dashboard::run_dashboard,
    import::import_workbook,
    live::{spawn_push_reader, LiveUpdateListener},
    models::{Acronym, Backup, DatabaseRelease, EntityKind, Package, TextElement, User},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "studyadmin=info");
    }

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    let config = Config::from_env()?;
    init_logging(&config, matches!(command, Commands::Tui));
    config.validate()?;

    let result = match command {
        Commands::Tui => run_dashboard(config).await,
        Commands::Import { file } => import(&config, file).await,
        Commands::Listen { url } => listen(config, url).await,
        other => match other.entity_op() {
            Some((kind, op)) => run_entity(&config, kind, op).await,
            None => Ok(()),
        },
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

/// Log to stderr and the log file; the dashboard logs to the file only
fn init_logging(config: &Config, file_only: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let directory = config
        .log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = config
        .log_file
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("studyadmin.log"));
    let file_appender = tracing_appender::rolling::never(directory, file_name);

    let stderr_layer = (!file_only).then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_filter(EnvFilter::from_default_env())
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();
}

async fn run_entity(config: &Config, kind: EntityKind, op: EntityOp) -> Result<()> {
    let client = ApiClient::new(config)?;
    let confirm = move |label: &str| ask(&format!("Delete {} '{}'? [y/N] ", kind.noun(), label));

    let output = match kind {
        EntityKind::Study => EntityCommands::new(study_table(&client)).run(op, confirm).await?,
        EntityKind::DatabaseRelease => {
            EntityCommands::new(table_for::<DatabaseRelease>(&client)).run(op, confirm).await?
        }
        EntityKind::Package => EntityCommands::new(table_for::<Package>(&client)).run(op, confirm).await?,
        EntityKind::TextElement => {
            EntityCommands::new(table_for::<TextElement>(&client)).run(op, confirm).await?
        }
        EntityKind::Acronym => EntityCommands::new(table_for::<Acronym>(&client)).run(op, confirm).await?,
        EntityKind::Backup => EntityCommands::new(table_for::<Backup>(&client)).run(op, confirm).await?,
        EntityKind::User => EntityCommands::new(table_for::<User>(&client)).run(op, confirm).await?,
    };

    println!("{}", output);
    Ok(())
}

/// Ask a yes/no question on stdin; anything but y/yes is a no
fn ask(question: &str) -> bool {
    print!("{}", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

async fn import(config: &Config, file: PathBuf) -> Result<()> {
    let client = ApiClient::new(config)?;
    info!("Importing packages from {}", file.display());

    let summary = import_workbook(Arc::new(client.resource::<Package>()), file).await?;
    println!("{}", summary);
    for message in &summary.error_messages {
        println!("  {}", message);
    }
    Ok(())
}

async fn listen(mut config: Config, url: Option<String>) -> Result<()> {
    if let Some(url) = url {
        config.push_url = url;
        config.validate()?;
    }

    let (mut rx, reader) = spawn_push_reader(&config);
    let mut listener = LiveUpdateListener::new();
    println!("Listening on {} (Ctrl-C to stop)", config.push_url);

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(text) => {
                    if let Some(action) = listener.handle(&text) {
                        println!("{}", action);
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    reader.abort();
    info!(
        "Push listener stopped after {} messages ({} ignored)",
        listener.received(),
        listener.ignored()
    );
    Ok(())
}
