//! 多公司销售订单增量同步任务
//!
//! 按公司列表顺序执行：
//! - 打开公司数据文件连接
//! - 增量抽取最近一天修改的销售订单
//! - 写入 PostgreSQL 并标记公司 ID
//! - 单个公司失败不影响后续公司

mod loader;
mod probe;
mod runner;
mod source;
mod state;
mod table_sync;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use common::config::AppConfig;
use common::logging::init_tracing;
use runner::BatchRunner;
use state::AppState;
use tracing::info;

const SERVICE_NAME: &str = "order-sync";

#[derive(Parser)]
#[command(name = "order-sync")]
#[command(about = "Incremental multi-company sales order sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the incremental sales order batch (default)
    Run,
    /// Open each company source and run a probe query
    TestConnection(TestConnectionArgs),
    /// Write the table catalog of one company to a file
    ListTables(ListTablesArgs),
    /// Copy every listed table of one company into Postgres
    SyncTables(SyncTablesArgs),
}

#[derive(Args)]
struct TestConnectionArgs {
    /// Only check this company id
    #[arg(short, long)]
    company: Option<String>,
}

#[derive(Args)]
struct ListTablesArgs {
    /// Company id to read the catalog from
    #[arg(short, long)]
    company: String,

    /// Output file (defaults to TABLE_LIST_FILE)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SyncTablesArgs {
    /// Company id to copy tables from
    #[arg(short, long)]
    company: String,

    /// Table list file (defaults to TABLE_LIST_FILE)
    #[arg(short, long)]
    tables: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（含 .env）
    let config = AppConfig::load_with_service(SERVICE_NAME)?;

    // 初始化日志追踪
    init_tracing();
    info!(
        service = SERVICE_NAME,
        driver = %config.source.driver,
        target = %config.target.redacted_url(),
        "Configuration loaded"
    );

    let state = AppState::new(config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_batch(&state).await?,
        Commands::TestConnection(args) => {
            let companies = match args.company {
                Some(id) => vec![state.company(&id)?],
                None => state.companies()?,
            };
            let failures = probe::test_connections(state.connector.as_ref(), &companies).await;
            if failures > 0 {
                anyhow::bail!("{} of {} connections failed", failures, companies.len());
            }
        }
        Commands::ListTables(args) => {
            let company = state.company(&args.company)?;
            let output = args
                .output
                .unwrap_or_else(|| state.config.table_list_file.clone());
            table_sync::list_tables(state.connector.as_ref(), &company, &output).await?;
        }
        Commands::SyncTables(args) => {
            let company = state.company(&args.company)?;
            let list_path = args
                .tables
                .unwrap_or_else(|| state.config.table_list_file.clone());
            let tables = table_sync::read_table_list(&list_path)?;
            let loader = state.loader()?;
            let summary = table_sync::sync_tables(
                state.connector.as_ref(),
                loader.as_ref(),
                &company,
                &tables,
            )
            .await?;
            if summary.failed > 0 {
                tracing::warn!(
                    failed = summary.failed,
                    succeeded = summary.succeeded,
                    "Some tables were not synced"
                );
            }
        }
    }

    Ok(())
}

/// Runs the incremental order batch over the configured company list.
async fn run_batch(state: &AppState) -> anyhow::Result<()> {
    let companies = state.companies()?;
    let extract_sql =
        BatchRunner::extract_statement(&state.config.extract, state.connector.dialect())?;
    let loader = state.loader()?;

    BatchRunner::new(state.connector.clone(), loader, extract_sql)
        .run(&companies)
        .await;
    Ok(())
}
