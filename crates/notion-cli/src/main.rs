use clap::{ArgAction, Parser, Subcommand};
use notion_table::{
    Document, FetchReport, NotionClient, NotionConfig, Record, StopReason, Table,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "notion-cli")]
#[command(about = "Read Notion databases and pages as typed tables")]
struct Cli {
    /// Integration token; defaults to NOTION_API_TOKEN.
    #[arg(long, global = true)]
    token: Option<String>,
    #[arg(long, global = true)]
    api_version: Option<String>,
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query every row of a database.
    Query(QueryArgs),
    /// Retrieve a single page's properties.
    Page(PageArgs),
    /// Print the text of a block's children.
    Blocks(BlocksArgs),
    DeleteBlocks(DeleteBlocksArgs),
    RenameDatabase(RenameDatabaseArgs),
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    #[arg(long)]
    database_id: String,
    #[arg(long)]
    max_pages: Option<usize>,
    /// Exit with an error when pagination stopped before the last page.
    #[arg(long, action = ArgAction::SetTrue)]
    require_complete: bool,
}

#[derive(clap::Args, Debug)]
struct PageArgs {
    #[arg(long)]
    page_id: String,
}

#[derive(clap::Args, Debug)]
struct BlocksArgs {
    #[arg(long)]
    block_id: String,
}

#[derive(clap::Args, Debug)]
struct DeleteBlocksArgs {
    #[arg(long = "block-id", required = true)]
    block_ids: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct RenameDatabaseArgs {
    #[arg(long)]
    database_id: String,
    #[arg(long)]
    title: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = build_config(&cli);
    if config.bearer_token.is_empty() {
        eprintln!("error: no token; pass --token or set NOTION_API_TOKEN");
        return ExitCode::from(1);
    }
    tracing::debug!(
        base_url = %config.base_url,
        api_version = %config.api_version,
        "notion client configured"
    );
    let client = NotionClient::from_config(config);

    let result = match cli.command {
        Commands::Query(args) => query_command(&client, args, cli.json).await,
        Commands::Page(args) => page_command(&client, args, cli.json).await,
        Commands::Blocks(args) => blocks_command(&client, args, cli.json).await,
        Commands::DeleteBlocks(args) => delete_blocks_command(&client, args).await,
        Commands::RenameDatabase(args) => rename_database_command(&client, args).await,
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_config(cli: &Cli) -> NotionConfig {
    let mut config = NotionConfig::from_env();
    if let Some(token) = cli.token.as_deref() {
        config.bearer_token = token.to_string();
    }
    if let Some(api_version) = cli.api_version.as_deref() {
        config.api_version = api_version.to_string();
    }
    if let Some(base_url) = cli.base_url.as_deref() {
        config.base_url = base_url.to_string();
    }
    config
}

type Client = NotionClient<notion_table::ReqwestTransport>;

async fn query_command(client: &Client, args: QueryArgs, json: bool) -> Result<ExitCode, String> {
    let client = match args.max_pages {
        Some(limit) => client.clone().with_max_pages(limit),
        None => client.clone(),
    };
    let report = client
        .query_database_report(&args.database_id)
        .await
        .map_err(|e| e.to_string())?;

    if json {
        print_json(&report.table)?;
    } else {
        print!("{}", render_table(&report.table));
    }
    eprintln!("{}", report_summary(&report));

    if args.require_complete && !report.is_complete() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

async fn page_command(client: &Client, args: PageArgs, json: bool) -> Result<ExitCode, String> {
    let record = client
        .retrieve_page(&args.page_id)
        .await
        .map_err(|e| e.to_string())?;
    if json {
        print_json(&record)?;
    } else {
        print!("{}", render_record(&record));
    }
    Ok(ExitCode::SUCCESS)
}

async fn blocks_command(client: &Client, args: BlocksArgs, json: bool) -> Result<ExitCode, String> {
    let document: Document = client
        .block_children(&args.block_id)
        .await
        .map_err(|e| e.to_string())?;
    if json {
        print_json(&document)?;
    } else {
        print!("{}", document.render());
    }
    Ok(ExitCode::SUCCESS)
}

async fn delete_blocks_command(client: &Client, args: DeleteBlocksArgs) -> Result<ExitCode, String> {
    client
        .delete_blocks(&args.block_ids)
        .await
        .map_err(|e| e.to_string())?;
    println!("deleted: {}", args.block_ids.len());
    Ok(ExitCode::SUCCESS)
}

async fn rename_database_command(
    client: &Client,
    args: RenameDatabaseArgs,
) -> Result<ExitCode, String> {
    client
        .change_database_title(&args.database_id, &args.title)
        .await
        .map_err(|e| e.to_string())?;
    println!("renamed: {}", args.database_id);
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn render_record(record: &Record) -> String {
    let mut out = String::new();
    for cell in &record.cells {
        let kind = cell
            .kind
            .as_ref()
            .map(|kind| kind.as_str())
            .unwrap_or("untyped");
        out.push_str(&format!("{} ({}) = {}\n", cell.name, kind, cell.value));
    }
    out
}

fn render_table(table: &Table) -> String {
    let mut out = String::new();
    for (index, record) in table.iter().enumerate() {
        out.push_str(&format!("{index} ------------- {}\n", record.id));
        out.push_str(&render_record(record));
    }
    out
}

fn report_summary(report: &FetchReport) -> String {
    let status = match &report.stopped_by {
        StopReason::Exhausted => "complete".to_string(),
        StopReason::PageFailed(error) => format!("partial ({error})"),
        StopReason::Cancelled => "partial (cancelled)".to_string(),
        StopReason::PageLimit => "partial (page limit)".to_string(),
    };
    format!(
        "records: {} pages: {} status: {status}",
        report.table.len(),
        report.pages
    )
}
