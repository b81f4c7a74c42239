//! tablegate CLI - schema-driven table access for SQL Server.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tablegate::{
    Config, GatewayError, OrderDirection, PageRequest, TableGateway,
};
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "tablegate")]
#[command(about = "Schema-driven table access for SQL Server")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List base tables in the configured schema
    Tables,

    /// Show introspected metadata for one table, or the whole schema
    Schema {
        /// Table name; omit to dump every table
        table: Option<String>,
    },

    /// Read one page of rows from a table
    Rows {
        /// Table name
        table: String,

        /// 1-based page number
        #[arg(long)]
        page: Option<u32>,

        /// Rows per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Column to order by
        #[arg(long)]
        order_by: Option<String>,

        /// Sort descending instead of ascending
        #[arg(long)]
        desc: bool,

        /// Raw SQL filter fragment (trusted input only)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Insert one row from a JSON object payload
    Insert {
        /// Table name
        table: String,

        /// JSON object mapping column names to values
        json: String,
    },

    /// Update rows matched by a raw where condition
    Update {
        /// Table name
        table: String,

        /// JSON object mapping column names to values
        json: String,

        /// Raw SQL boolean condition (trusted input only)
        #[arg(long = "where")]
        where_condition: String,
    },

    /// Delete rows matched by a raw where condition
    Delete {
        /// Table name
        table: String,

        /// Raw SQL boolean condition (trusted input only)
        #[arg(long = "where")]
        where_condition: String,
    },

    /// Test database connectivity
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), GatewayError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| GatewayError::Config(e.to_string()))?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let default_page_size = config.gateway.default_page_size;
    let gateway = TableGateway::new(config);

    match cli.command {
        Commands::Tables => {
            let tables = gateway.list_tables().await?;
            print_json(&tables, cli.pretty)?;
        }

        Commands::Schema { table } => match table {
            Some(name) => {
                let meta = gateway.table_metadata(&name).await?;
                print_json(&meta, cli.pretty)?;
            }
            None => {
                let tables = gateway.schema_metadata().await?;
                print_json(&tables, cli.pretty)?;
            }
        },

        Commands::Rows {
            table,
            page,
            page_size,
            order_by,
            desc,
            filter,
        } => {
            let mut request = PageRequest::new(page, page_size, default_page_size)?;
            if let Some(column) = order_by {
                let direction = if desc {
                    OrderDirection::Desc
                } else {
                    OrderDirection::Asc
                };
                request = request.order_by(column, direction);
            }
            if let Some(f) = filter {
                request = request.filter(f);
            }

            let result = gateway.get_table_data(&table, &request).await;
            print_json(&result, cli.pretty)?;
        }

        Commands::Insert { table, json } => {
            let data = parse_payload(&json)?;
            let affected = gateway.insert_record(&table, &data).await?;
            println!("Inserted {} row(s)", affected);
        }

        Commands::Update {
            table,
            json,
            where_condition,
        } => {
            let data = parse_payload(&json)?;
            let affected = gateway
                .update_record(&table, &data, &where_condition)
                .await?;
            println!("Updated {} row(s)", affected);
        }

        Commands::Delete {
            table,
            where_condition,
        } => {
            let affected = gateway.delete_record(&table, &where_condition).await?;
            println!("Deleted {} row(s)", affected);
        }

        Commands::HealthCheck => {
            gateway.ping().await?;
            println!("Database connection OK");
        }
    }

    Ok(())
}

fn parse_payload(json: &str) -> Result<serde_json::Map<String, serde_json::Value>, GatewayError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(GatewayError::Validation(
            "payload must be a JSON object mapping column names to values".to_string(),
        )),
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), GatewayError> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
