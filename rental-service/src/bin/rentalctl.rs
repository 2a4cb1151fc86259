use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rental_client::{
    db::{self, dashboard_queries::Bucket, ReadQuery, SortDirection},
    domain::{BillEdit, BillStatus, BillingCycle, Money, NewBill, NewInstallation, NewUnit, NewUtility, UnitType, UtilityStatus, UtilityType},
};
use rental_service::{
    config::AppConfig,
    controllers::{BillController, UnitController, UtilityController},
    dashboard::{DashboardService, DateRange},
    import, observability,
};
use serde::Serialize;
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, DATE_FORMAT).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[derive(Parser, Debug)]
#[command(name = "rentalctl")]
#[command(about = "Manage rental units, utilities and their bills")]
struct Cli {
    /// Database URL; overrides the config file and RENTAL_DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the tables if they do not exist yet
    InitDb,
    #[command(subcommand)]
    Units(UnitCommand),
    #[command(subcommand)]
    Utilities(UtilityCommand),
    #[command(subcommand)]
    Bills(BillCommand),
    /// Print the home dashboard
    Dashboard {
        /// this_month, last_month, last_3_months, last_6_months, last_12_months, year_to_date
        #[arg(long, default_value = "this_month")]
        range: DateRange,
        /// month, quarter or year
        #[arg(long, default_value = "month")]
        bucket: Bucket,
        /// Custom range start (inclusive); overrides --range together with --end
        #[arg(long, value_parser = parse_date, requires = "end")]
        start: Option<Date>,
        /// Custom range end (exclusive)
        #[arg(long, value_parser = parse_date, requires = "start")]
        end: Option<Date>,
        #[arg(long, value_parser = parse_date)]
        today: Option<Date>,
    },
    /// Flag unpaid bills past their due date as overdue
    MarkOverdue {
        #[arg(long, value_parser = parse_date)]
        today: Option<Date>,
    },
    /// Import bills from a .csv or .ndjson file
    Import { file: PathBuf },
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    page_size: Option<u32>,
    #[arg(long)]
    sort: Option<String>,
    /// Sort descending
    #[arg(long)]
    desc: bool,
    #[arg(long)]
    search: Option<String>,
}

impl ListArgs {
    fn read_query(self, default_page_size: u32) -> ReadQuery {
        let mut query = ReadQuery::new()
            .page(self.page)
            .page_size(self.page_size.unwrap_or(default_page_size));
        if let Some(column) = self.sort {
            let direction = if self.desc { SortDirection::Desc } else { SortDirection::Asc };
            query = query.sort_by(column, direction);
        }
        if let Some(term) = self.search {
            query = query.search(term);
        }
        query
    }
}

#[derive(Args, Debug)]
struct UnitArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    address: String,
    #[arg(long, default_value = "apartment")]
    unit_type: UnitType,
}

impl From<UnitArgs> for NewUnit {
    fn from(a: UnitArgs) -> Self {
        NewUnit {
            name: a.name,
            address: a.address,
            unit_type: a.unit_type,
        }
    }
}

#[derive(Subcommand, Debug)]
enum UnitCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        unit_type: Option<UnitType>,
    },
    Add(UnitArgs),
    Show { id: i64 },
    Edit {
        id: i64,
        #[command(flatten)]
        unit: UnitArgs,
    },
    /// Delete a unit together with its installations and bills
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct UtilityArgs {
    #[arg(long = "type")]
    utility_type: UtilityType,
    #[arg(long)]
    provider: String,
    #[arg(long, default_value = "active")]
    status: UtilityStatus,
    #[arg(long, default_value = "monthly")]
    billing_cycle: BillingCycle,
}

impl From<UtilityArgs> for NewUtility {
    fn from(a: UtilityArgs) -> Self {
        NewUtility {
            utility_type: a.utility_type,
            provider: a.provider,
            status: a.status,
            billing_cycle: a.billing_cycle,
        }
    }
}

#[derive(Subcommand, Debug)]
enum UtilityCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        utility_type: Option<UtilityType>,
        #[arg(long)]
        status: Option<UtilityStatus>,
    },
    Add {
        #[command(flatten)]
        utility: UtilityArgs,
        /// Unit to install on; repeat for a shared utility
        #[arg(long = "unit", required = true)]
        units: Vec<i64>,
        /// Unit the cost is attributed to; required with several units
        #[arg(long)]
        main_unit: Option<i64>,
        /// Installation date, defaults to today
        #[arg(long, value_parser = parse_date)]
        installed: Option<Date>,
    },
    Show { id: i64 },
    Edit {
        id: i64,
        #[command(flatten)]
        utility: UtilityArgs,
    },
    Delete { id: i64 },
    Install {
        utility_id: i64,
        unit_id: i64,
        #[arg(long, value_parser = parse_date)]
        installed: Option<Date>,
    },
    Uninstall { utility_id: i64, unit_id: i64 },
    SetMain { utility_id: i64, unit_id: i64 },
}

#[derive(Args, Debug)]
struct BillArgs {
    #[arg(long)]
    unit: i64,
    #[arg(long)]
    utility: i64,
    #[arg(long)]
    amount: Money,
    #[arg(long, value_parser = parse_date)]
    start: Date,
    #[arg(long, value_parser = parse_date)]
    end: Date,
    #[arg(long, value_parser = parse_date)]
    due: Date,
    /// New bills default to unpaid; edits keep the stored status
    #[arg(long)]
    status: Option<BillStatus>,
}

impl From<BillArgs> for BillEdit {
    fn from(a: BillArgs) -> Self {
        BillEdit {
            unit_id: a.unit,
            utility_id: a.utility,
            total_amount: a.amount,
            billing_period_start: a.start,
            billing_period_end: a.end,
            due_date: a.due,
            status: a.status,
        }
    }
}

impl From<BillArgs> for NewBill {
    fn from(a: BillArgs) -> Self {
        BillEdit::from(a).into_new_bill(BillStatus::default())
    }
}

#[derive(Subcommand, Debug)]
enum BillCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        unit_id: Option<i64>,
        #[arg(long)]
        utility_id: Option<i64>,
        #[arg(long)]
        status: Option<BillStatus>,
    },
    Add(BillArgs),
    Show { id: i64 },
    Edit {
        id: i64,
        #[command(flatten)]
        bill: BillArgs,
    },
    Delete { id: i64 },
    /// Mark a bill as paid
    Pay { id: i64 },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn today_or(date: Option<Date>) -> Date {
    date.unwrap_or_else(|| OffsetDateTime::now_utc().date())
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_cli_tracing();

    let cli = Cli::parse();
    let mut cfg = AppConfig::load()?;
    if let Some(url) = cli.database_url {
        cfg.database.url = url;
    }

    let pool = db::connect(&cfg.database.url, cfg.database.max_connections).await?;
    db::apply_schema(&pool).await?;
    let page_size = cfg.dashboard.default_page_size;

    match cli.command {
        Commands::InitDb => println!("database ready at {}", cfg.database.url),
        Commands::Units(cmd) => {
            let units = UnitController::new(pool.clone());
            match cmd {
                UnitCommand::List { list, unit_type } => {
                    let mut query = list.read_query(page_size);
                    if let Some(t) = unit_type {
                        query = query.filter("unit_type", t.to_string());
                    }
                    print_json(&units.list_units(&query).await?)?;
                }
                UnitCommand::Add(args) => print_json(&units.add_unit(args.into()).await?)?,
                UnitCommand::Show { id } => print_json(&units.get_unit(id).await?)?,
                UnitCommand::Edit { id, unit } => print_json(&units.edit_unit(id, unit.into()).await?)?,
                UnitCommand::Delete { id } => {
                    units.delete_unit(id).await?;
                    println!("deleted unit {id}");
                }
            }
        }
        Commands::Utilities(cmd) => {
            let utilities = UtilityController::new(pool.clone());
            match cmd {
                UtilityCommand::List {
                    list,
                    utility_type,
                    status,
                } => {
                    let mut query = list.read_query(page_size);
                    if let Some(t) = utility_type {
                        query = query.filter("utility_type", t.to_string());
                    }
                    if let Some(s) = status {
                        query = query.filter("status", s.to_string());
                    }
                    print_json(&utilities.list_utilities(&query).await?)?;
                }
                UtilityCommand::Add {
                    utility,
                    units,
                    main_unit,
                    installed,
                } => {
                    let installation_date = today_or(installed);
                    let installations = units
                        .into_iter()
                        .map(|unit_id| NewInstallation {
                            unit_id,
                            installation_date,
                        })
                        .collect();
                    print_json(&utilities.add_utility(utility.into(), installations, main_unit).await?)?;
                }
                UtilityCommand::Show { id } => print_json(&utilities.get_utility(id).await?)?,
                UtilityCommand::Edit { id, utility } => {
                    print_json(&utilities.edit_utility(id, utility.into()).await?)?
                }
                UtilityCommand::Delete { id } => {
                    utilities.delete_utility(id).await?;
                    println!("deleted utility {id}");
                }
                UtilityCommand::Install {
                    utility_id,
                    unit_id,
                    installed,
                } => {
                    let installation = NewInstallation {
                        unit_id,
                        installation_date: today_or(installed),
                    };
                    print_json(&utilities.install(utility_id, installation).await?)?;
                }
                UtilityCommand::Uninstall { utility_id, unit_id } => {
                    utilities.uninstall(utility_id, unit_id).await?;
                    println!("removed utility {utility_id} from unit {unit_id}");
                }
                UtilityCommand::SetMain { utility_id, unit_id } => {
                    utilities.set_main_unit(utility_id, unit_id).await?;
                    print_json(&utilities.get_utility(utility_id).await?)?;
                }
            }
        }
        Commands::Bills(cmd) => {
            let bills = BillController::new(pool.clone());
            match cmd {
                BillCommand::List {
                    list,
                    unit_id,
                    utility_id,
                    status,
                } => {
                    let mut query = list.read_query(page_size);
                    if let Some(id) = unit_id {
                        query = query.filter("unit_id", id);
                    }
                    if let Some(id) = utility_id {
                        query = query.filter("utility_id", id);
                    }
                    if let Some(s) = status {
                        query = query.filter("status", s.to_string());
                    }
                    print_json(&bills.list_bills(&query).await?)?;
                }
                BillCommand::Add(args) => print_json(&bills.add_bill(args.into()).await?)?,
                BillCommand::Show { id } => print_json(&bills.get_bill(id).await?)?,
                BillCommand::Edit { id, bill } => print_json(&bills.edit_bill(id, bill.into()).await?)?,
                BillCommand::Delete { id } => {
                    bills.delete_bill(id).await?;
                    println!("deleted bill {id}");
                }
                BillCommand::Pay { id } => print_json(&bills.set_status(id, BillStatus::Paid).await?)?,
            }
        }
        Commands::Dashboard {
            range,
            bucket,
            start,
            end,
            today,
        } => {
            let range = match (start, end) {
                (Some(start), Some(end)) => DateRange::Custom { start, end },
                _ => range,
            };
            let service = DashboardService::new(pool.clone(), cfg.dashboard.upcoming_horizon_days);
            print_json(&service.home(today_or(today), range, bucket).await?)?;
        }
        Commands::MarkOverdue { today } => {
            let marked = BillController::new(pool.clone()).mark_overdue(today_or(today)).await?;
            println!("marked {marked} bill(s) overdue");
        }
        Commands::Import { file } => {
            let bills = BillController::new(pool.clone());
            let report = import::import_file(&file, bills, &cfg.import).await?;
            print_json(&report)?;
            if report.imported == 0 && !report.rejected.is_empty() {
                bail!("no bills imported; {} row(s) rejected", report.rejected.len());
            }
        }
    }

    pool.close().await;
    Ok(())
}
