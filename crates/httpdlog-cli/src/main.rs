//! httpdlog - query Apache access logs with SQL.
//!
//! Registers the `read_httpd_log` and `read_httpd_conf` table functions on a
//! DataFusion session and runs queries against them.

use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, Subcommand};
use datafusion::prelude::SessionContext;
use httpdlog_format::{arrow_schema, output_columns, CompiledFormat};
use httpdlog_table::{register_httpdlog_functions, ScanConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "httpdlog")]
#[command(about = "Query Apache HTTPD access logs with SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Rows per output batch.
    #[arg(long, global = true)]
    batch_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a SQL query; use read_httpd_log(...) and read_httpd_conf(...) as
    /// tables.
    Query {
        /// The SQL statement to run.
        sql: String,
    },

    /// List the log-format definitions in an Apache config file.
    Conf {
        /// Path or glob of config files.
        path: String,
    },

    /// Show the schema a LogFormat string produces.
    Schema {
        /// The LogFormat string to compile.
        format_str: String,

        /// Include the raw-mode diagnostic columns.
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "httpdlog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "command failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ScanConfig::default();
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }

    match cli.command {
        Commands::Query { sql } => {
            let ctx = SessionContext::new();
            register_httpdlog_functions(&ctx, config);
            let batches = ctx.sql(&sql).await?.collect().await?;
            println!("{}", pretty_format_batches(&batches)?);
        }
        Commands::Conf { path } => {
            let ctx = SessionContext::new();
            register_httpdlog_functions(&ctx, config);
            let sql = format!(
                "SELECT log_type, format_type, nickname, format_string, config_file, line_number \
                 FROM read_httpd_conf('{}')",
                path.replace('\'', "''")
            );
            let batches = ctx.sql(&sql).await?.collect().await?;
            println!("{}", pretty_format_batches(&batches)?);
        }
        Commands::Schema { format_str, raw } => {
            let format = CompiledFormat::compile(&format_str)?;
            let columns = output_columns(&format, raw);
            let schema = arrow_schema(&columns);
            for field in schema.fields() {
                println!("{}: {}", field.name(), field.data_type());
            }
        }
    }

    Ok(())
}
