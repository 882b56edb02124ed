//! `stockkeeper` command-line front end.
//!
//! Each subcommand maps onto one core operation. Sales run the low-stock alert
//! after commit using the log-only notifier.

use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use sea_orm::DatabaseConnection;
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use stockkeeper::{
    config::{self, Settings, database, settings::DEFAULT_SETTINGS_PATH},
    core::{
        alert::LowStockAlert, catalog, export, ledger, period::DateRange, principal, report,
        stock,
    },
    errors::{Error, Result},
    notifier::LogNotifier,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stockkeeper")]
#[command(about = "Inventory ledger for a beverage shop")]
#[command(version)]
struct Cli {
    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,

    /// Database connection URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage principals
    #[command(subcommand)]
    Principal(PrincipalCommand),

    /// Manage catalog items
    #[command(subcommand)]
    Item(ItemCommand),

    /// Add stock to an item, creating it if needed
    Restock {
        /// Item name
        name: String,
        /// Units to add
        quantity: i64,
        /// Unit price used when the item is new
        #[arg(long)]
        price: f64,
        /// E-mail of the principal recording the movement
        #[arg(long)]
        principal: String,
    },

    /// Sell units of an item
    Sell {
        /// Item id
        item_id: i64,
        /// Units to sell
        #[arg(long, default_value_t = 1)]
        units: i64,
        /// E-mail of the principal recording the movement
        #[arg(long)]
        principal: String,
    },

    /// Sales per item and principal
    Summary(RangeArgs),

    /// Units sold per active item
    Stats(RangeArgs),

    /// Write a CSV export
    Export {
        /// What to export
        #[command(subcommand)]
        kind: ExportKind,
    },

    /// Compare stored quantities with the ledger
    Reconcile,
}

#[derive(Subcommand)]
enum PrincipalCommand {
    /// Register a principal
    Add {
        /// E-mail address
        email: String,
    },
}

#[derive(Subcommand)]
enum ItemCommand {
    /// Create an item with zero stock
    Add {
        /// Item name
        name: String,
        /// Unit price
        #[arg(long)]
        price: f64,
    },
    /// List items
    List {
        /// Include disabled items
        #[arg(long)]
        all: bool,
    },
    /// Change an item's price
    Price {
        /// Item id
        item_id: i64,
        /// New unit price
        price: f64,
    },
    /// Set or clear an item's image reference
    Image {
        /// Item id
        item_id: i64,
        /// Image reference; omit to clear
        reference: Option<String>,
    },
    /// Show an item in listings
    Enable {
        /// Item id
        item_id: i64,
    },
    /// Hide an item from listings
    Disable {
        /// Item id
        item_id: i64,
    },
}

#[derive(Subcommand)]
enum ExportKind {
    /// Sales with unit price and total
    Sales(RangeArgs),
    /// Sales and restocks
    Movements(RangeArgs),
}

#[derive(Args)]
struct RangeArgs {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    from: Option<String>,
    /// Last day (inclusive), YYYY-MM-DD
    #[arg(long)]
    to: Option<String>,
}

impl RangeArgs {
    fn resolve(&self, settings: &Settings) -> Result<DateRange> {
        DateRange::from_query(
            self.from.as_deref(),
            self.to.as_deref(),
            chrono::Utc::now(),
            settings.report_window_days,
        )
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenv().ok();
    let cli = Cli::parse();

    let settings = config::load_settings(&cli.config)
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;

    let database_url = cli.database_url.clone().unwrap_or_else(database::get_database_url);
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to {}: {}", database_url, e))?;
    database::create_tables(&db).await?;
    info!("Database ready at {}", database_url);

    run(cli.command, &db, &settings).await
}

async fn run(command: Commands, db: &DatabaseConnection, settings: &Settings) -> Result<ExitCode> {
    match command {
        Commands::Principal(PrincipalCommand::Add { email }) => {
            let principal = principal::register_principal(db, &email).await?;
            println!("Registered {} (id {})", principal.email, principal.id);
        }
        Commands::Item(command) => run_item(command, db, settings).await?,
        Commands::Restock {
            name,
            quantity,
            price,
            principal,
        } => {
            let principal = principal_by_email(db, &principal).await?;
            let item = stock::apply_restock(db, &name, quantity, price, principal.id).await?;
            println!("{}: {} on hand", item.name, item.quantity);
        }
        Commands::Sell {
            item_id,
            units,
            principal,
        } => {
            let principal = principal_by_email(db, &principal).await?;
            let alert = LowStockAlert::from_settings(Arc::new(LogNotifier), settings);
            let sale = stock::sell_and_alert(db, &alert, item_id, principal.id, units).await?;
            println!("Sold {} x {}, {} left", units, sale.item.name, sale.new_quantity());
        }
        Commands::Summary(range) => {
            let summary = report::sales_summary(db, range.resolve(settings)?).await?;
            println!(
                "Sales {} to {}",
                summary.range.first_day(),
                summary.range.last_day()
            );
            for line in &summary.per_item {
                println!(
                    "  {:<24} {:<28} {:>6}",
                    line.item_name, line.principal_email, line.total_units
                );
            }
            println!("Total units: {}", summary.total_units);
            if let Some(top) = &summary.top_item_by_units {
                println!("Top item: {top}");
            }
        }
        Commands::Stats(range) => {
            for row in report::item_sales_totals(db, range.resolve(settings)?).await? {
                println!("  {:<24} {:>6}", row.item_name, row.units);
            }
        }
        Commands::Export { kind } => {
            let rendered = match kind {
                ExportKind::Sales(range) => {
                    export::export_sales(db, range.resolve(settings)?, &settings.currency_symbol)
                        .await?
                }
                ExportKind::Movements(range) => {
                    export::export_movements(db, range.resolve(settings)?).await?
                }
            };
            let path = export::write_export(&settings.export_dir, &rendered)?;
            println!("Wrote {} rows to {}", rendered.rows, path.display());
        }
        Commands::Reconcile => {
            let mismatches = ledger::reconcile(db).await?;
            if !mismatches.is_empty() {
                for m in &mismatches {
                    println!(
                        "{} (id {}): stored {}, ledger {}",
                        m.item_name, m.item_id, m.stored, m.derived
                    );
                }
                return Ok(ExitCode::FAILURE);
            }
            println!("All quantities match the ledger");
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_item(command: ItemCommand, db: &DatabaseConnection, settings: &Settings) -> Result<()> {
    let item = match command {
        ItemCommand::Add { name, price } => catalog::create_item(db, &name, price).await?,
        ItemCommand::List { all } => {
            let items = if all {
                catalog::list_all_items(db).await?
            } else {
                catalog::list_active_items(db).await?
            };
            for item in &items {
                println!(
                    "{:>4}  {:<24} {:>10} {:>6}  {}{}",
                    item.id,
                    item.name,
                    report::format_money(&settings.currency_symbol, item.price),
                    item.quantity,
                    catalog::image_reference_or_default(item, &settings.default_image_reference),
                    if item.is_active { "" } else { "  (disabled)" }
                );
            }
            return Ok(());
        }
        ItemCommand::Price { item_id, price } => catalog::update_price(db, item_id, price).await?,
        ItemCommand::Image { item_id, reference } => {
            catalog::set_image_reference(db, item_id, reference).await?
        }
        ItemCommand::Enable { item_id } => catalog::set_active(db, item_id, true).await?,
        ItemCommand::Disable { item_id } => catalog::set_active(db, item_id, false).await?,
    };
    println!(
        "{} (id {}): {} at {}",
        item.name,
        item.id,
        if item.is_active { "active" } else { "disabled" },
        report::format_money(&settings.currency_symbol, item.price)
    );
    Ok(())
}

async fn principal_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<stockkeeper::entities::principal::Model> {
    principal::get_principal_by_email(db, email)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "principal",
            key: email.to_string(),
        })
}
