use rental_client::{
    db::{
        self, bill_queries, dashboard_queries,
        dashboard_queries::Bucket,
        installed_utility_queries as installs,
        table::{ReadQuery, SortDirection, TableGateway},
    },
    domain::{
        Bill, BillStatus, BillingCycle, Money, NewBill, NewInstallation, NewUnit, NewUtility, Unit, UnitType,
        Utility, UtilityStatus, UtilityType,
    },
    DbError,
};
use sqlx::SqlitePool;
use time::macros::date;

async fn memory_pool() -> SqlitePool {
    let pool = db::connect("sqlite::memory:", 4).await.unwrap();
    db::apply_schema(&pool).await.unwrap();
    pool
}

fn new_unit(name: &str, address: &str) -> NewUnit {
    NewUnit {
        name: name.to_string(),
        address: address.to_string(),
        unit_type: UnitType::Apartment,
    }
}

fn new_utility(utility_type: UtilityType, provider: &str) -> NewUtility {
    NewUtility {
        utility_type,
        provider: provider.to_string(),
        status: UtilityStatus::Active,
        billing_cycle: BillingCycle::Monthly,
    }
}

fn march_bill(unit_id: i64, utility_id: i64, cents: i64) -> NewBill {
    NewBill {
        unit_id,
        utility_id,
        total_amount: Money::from_cents(cents),
        billing_period_start: date!(2024 - 03 - 01),
        billing_period_end: date!(2024 - 03 - 31),
        due_date: date!(2024 - 04 - 15),
        status: BillStatus::Unpaid,
    }
}

async fn install(pool: &SqlitePool, unit_id: i64, utility_id: i64, is_main: bool) {
    installs::insert_installation(
        pool,
        utility_id,
        &NewInstallation {
            unit_id,
            installation_date: date!(2023 - 01 - 01),
        },
        is_main,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn schema_is_idempotent() {
    let pool = memory_pool().await;
    db::apply_schema(&pool).await.unwrap();
}

#[tokio::test]
async fn gateway_crud_round_trip() {
    let pool = memory_pool().await;
    let units = TableGateway::<Unit>::new(pool.clone());

    let created = units.create(&new_unit("Unit 1A", "12 Oak St")).await.unwrap();
    assert_eq!(created.name, "Unit 1A");
    assert_eq!(units.get(created.id).await.unwrap(), created);

    let mut edit = new_unit("Unit 1A", "14 Oak St");
    edit.unit_type = UnitType::Condo;
    let updated = units.update(created.id, &edit).await.unwrap();
    assert_eq!(updated.address, "14 Oak St");
    assert_eq!(updated.unit_type, UnitType::Condo);

    units.delete(created.id).await.unwrap();
    assert!(units.find(created.id).await.unwrap().is_none());
    assert!(matches!(
        units.delete(created.id).await,
        Err(DbError::NotFound { table: "unit", .. })
    ));
    assert!(matches!(
        units.update(created.id, &edit).await,
        Err(DbError::NotFound { .. })
    ));
}

#[tokio::test]
async fn read_paginates_sorts_and_searches() {
    let pool = memory_pool().await;
    let units = TableGateway::<Unit>::new(pool.clone());
    for (name, address) in [
        ("Birch 1", "1 Birch Rd"),
        ("Oak 1", "1 Oak St"),
        ("Oak 2", "2 Oak St"),
        ("Oak 3", "3 Oak St"),
        ("Pine 100%", "9 Pine Ave"),
    ] {
        units.create(&new_unit(name, address)).await.unwrap();
    }

    let first = units
        .read(&ReadQuery::new().search("oak").page_size(2).sort_by("name", SortDirection::Desc))
        .await
        .unwrap();
    assert_eq!(first.total_items, 3);
    assert_eq!(first.total_pages(), 2);
    let names: Vec<_> = first.items.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["Oak 3", "Oak 2"]);

    let second = units
        .read(&ReadQuery::new().search("oak").page_size(2).page(2).sort_by("name", SortDirection::Desc))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].name, "Oak 1");

    // `%` is matched literally, not as a wildcard.
    let literal = units.read(&ReadQuery::new().search("100%")).await.unwrap();
    assert_eq!(literal.total_items, 1);
    let none = units.read(&ReadQuery::new().search("1%1")).await.unwrap();
    assert_eq!(none.total_items, 0);

    let err = units
        .read(&ReadQuery::new().sort_by("password", SortDirection::Asc))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownColumn { .. }));
}

#[tokio::test]
async fn bill_constraints_are_enforced_by_schema() {
    let pool = memory_pool().await;
    let unit = TableGateway::<Unit>::new(pool.clone())
        .create(&new_unit("A", "1 Main St"))
        .await
        .unwrap();
    let utility = TableGateway::<Utility>::new(pool.clone())
        .create(&new_utility(UtilityType::Water, "City Water"))
        .await
        .unwrap();
    let bills = TableGateway::<Bill>::new(pool.clone());

    // No installation yet: the composite foreign key rejects the bill.
    assert!(bills.create(&march_bill(unit.id, utility.id, 100)).await.is_err());

    install(&pool, unit.id, utility.id, true).await;
    bills.create(&march_bill(unit.id, utility.id, 100)).await.unwrap();

    let mut inverted = march_bill(unit.id, utility.id, 100);
    inverted.billing_period_end = inverted.billing_period_start;
    assert!(bills.create(&inverted).await.is_err());

    let mut early_due = march_bill(unit.id, utility.id, 100);
    early_due.due_date = date!(2024 - 03 - 31);
    assert!(bills.create(&early_due).await.is_err());

    assert!(bills.create(&march_bill(unit.id, utility.id, -1)).await.is_err());
    assert!(bills
        .create(&march_bill(unit.id, utility.id, 10_000_000_000))
        .await
        .is_err());
}

#[tokio::test]
async fn deleting_a_unit_cascades_to_installations_and_bills() {
    let pool = memory_pool().await;
    let units = TableGateway::<Unit>::new(pool.clone());
    let unit = units.create(&new_unit("A", "1 Main St")).await.unwrap();
    let utility = TableGateway::<Utility>::new(pool.clone())
        .create(&new_utility(UtilityType::Gas, "GasCo"))
        .await
        .unwrap();
    install(&pool, unit.id, utility.id, true).await;
    let bills = TableGateway::<Bill>::new(pool.clone());
    let bill = bills.create(&march_bill(unit.id, utility.id, 4200)).await.unwrap();

    units.delete(unit.id).await.unwrap();

    assert!(bills.find(bill.id).await.unwrap().is_none());
    assert!(installs::installations_for_utility(&pool, utility.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_one_main_unit_per_utility() {
    let pool = memory_pool().await;
    let units = TableGateway::<Unit>::new(pool.clone());
    let a = units.create(&new_unit("A", "1 Main St")).await.unwrap();
    let b = units.create(&new_unit("B", "1 Main St")).await.unwrap();
    let utility = TableGateway::<Utility>::new(pool.clone())
        .create(&new_utility(UtilityType::Internet, "FiberNet"))
        .await
        .unwrap();

    install(&pool, a.id, utility.id, true).await;
    let second_main = installs::insert_installation(
        &pool,
        utility.id,
        &NewInstallation {
            unit_id: b.id,
            installation_date: date!(2023 - 06 - 01),
        },
        true,
    )
    .await;
    assert!(second_main.is_err());

    install(&pool, b.id, utility.id, false).await;
    let mut tx = pool.begin().await.unwrap();
    installs::set_main_unit(&mut tx, utility.id, b.id).await.unwrap();
    tx.commit().await.unwrap();

    let rows = installs::installations_for_utility(&pool, utility.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].unit_id, b.id);
    assert!(rows[0].is_main);
    assert!(!rows[1].is_main);

    let for_unit = installs::utilities_for_unit(&pool, a.id).await.unwrap();
    assert_eq!(for_unit.len(), 1);
    assert!(for_unit[0].is_shared());
    assert!(!for_unit[0].is_main);
}

#[tokio::test]
async fn dashboard_queries_bucket_and_filter_by_range() {
    let pool = memory_pool().await;
    let units = TableGateway::<Unit>::new(pool.clone());
    let a = units.create(&new_unit("A", "1 Main St")).await.unwrap();
    let b = units.create(&new_unit("B", "2 Main St")).await.unwrap();
    let utilities = TableGateway::<Utility>::new(pool.clone());
    let power = utilities.create(&new_utility(UtilityType::Electricity, "PowerCo")).await.unwrap();
    let water = utilities.create(&new_utility(UtilityType::Water, "City Water")).await.unwrap();
    install(&pool, a.id, power.id, true).await;
    install(&pool, a.id, water.id, true).await;
    install(&pool, b.id, power.id, false).await;

    let bills = TableGateway::<Bill>::new(pool.clone());
    bills.create(&march_bill(a.id, power.id, 10_000)).await.unwrap();
    bills.create(&march_bill(a.id, water.id, 2_500)).await.unwrap();
    let mut april = march_bill(a.id, power.id, 12_000);
    april.billing_period_start = date!(2024 - 04 - 01);
    april.billing_period_end = date!(2024 - 04 - 30);
    april.due_date = date!(2024 - 05 - 15);
    april.status = BillStatus::Paid;
    bills.create(&april).await.unwrap();

    let monthly = dashboard_queries::spending_by_period(
        &pool,
        date!(2024 - 01 - 01),
        date!(2025 - 01 - 01),
        Bucket::Month,
        None,
    )
    .await
    .unwrap();
    assert_eq!(monthly.len(), 3);
    assert_eq!(monthly[0].period, "2024-03");
    assert_eq!(monthly[0].utility_type, UtilityType::Electricity);
    assert_eq!(monthly[0].total, Money::from_cents(10_000));
    assert_eq!(monthly[2].period, "2024-04");

    let quarterly = dashboard_queries::spending_by_period(
        &pool,
        date!(2024 - 01 - 01),
        date!(2025 - 01 - 01),
        Bucket::Quarter,
        Some(a.id),
    )
    .await
    .unwrap();
    let periods: Vec<_> = quarterly.iter().map(|p| p.period.as_str()).collect();
    assert_eq!(periods, ["2024-Q1", "2024-Q1", "2024-Q2"]);

    // End of range is exclusive.
    let march_only = dashboard_queries::spending_by_period(
        &pool,
        date!(2024 - 03 - 01),
        date!(2024 - 04 - 01),
        Bucket::Year,
        None,
    )
    .await
    .unwrap();
    let total: i64 = march_only.iter().map(|p| p.total.cents()).sum();
    assert_eq!(total, 12_500);

    let per_unit = dashboard_queries::spending_by_unit(&pool, date!(2024 - 01 - 01), date!(2025 - 01 - 01))
        .await
        .unwrap();
    assert_eq!(per_unit.len(), 2);
    assert_eq!(per_unit[0].unit_name, "A");
    assert_eq!(per_unit[0].total, Money::from_cents(24_500));
    assert_eq!(per_unit[1].bill_count, 0);

    let statuses = dashboard_queries::status_breakdown(&pool, date!(2024 - 01 - 01), date!(2025 - 01 - 01))
        .await
        .unwrap();
    assert_eq!(statuses.len(), 2);

    let counts = dashboard_queries::summary_counts(&pool).await.unwrap();
    assert_eq!(counts.units, 2);
    assert_eq!(counts.utilities, 2);
    assert_eq!(counts.shared_utilities, 1);
    assert_eq!(counts.open_bills, 2);
    assert_eq!(counts.outstanding, Money::from_cents(12_500));
}

#[tokio::test]
async fn upcoming_overdue_and_mark_overdue() {
    let pool = memory_pool().await;
    let unit = TableGateway::<Unit>::new(pool.clone())
        .create(&new_unit("A", "1 Main St"))
        .await
        .unwrap();
    let utility = TableGateway::<Utility>::new(pool.clone())
        .create(&new_utility(UtilityType::Trash, "Haulers"))
        .await
        .unwrap();
    install(&pool, unit.id, utility.id, true).await;
    let bills = TableGateway::<Bill>::new(pool.clone());
    let due_apr_15 = bills.create(&march_bill(unit.id, utility.id, 3_000)).await.unwrap();

    let upcoming = dashboard_queries::upcoming_bills(&pool, date!(2024 - 04 - 01), 10).await.unwrap();
    assert!(upcoming.is_empty());
    let upcoming = dashboard_queries::upcoming_bills(&pool, date!(2024 - 04 - 01), 30).await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].unit_name, "A");
    assert_eq!(upcoming[0].provider, "Haulers");

    let today = date!(2024 - 04 - 20);
    assert_eq!(dashboard_queries::overdue_bills(&pool, today).await.unwrap().len(), 1);
    assert_eq!(dashboard_queries::mark_overdue(&pool, today).await.unwrap(), 1);
    assert_eq!(dashboard_queries::mark_overdue(&pool, today).await.unwrap(), 0);

    let detail = bill_queries::bill_detail(&pool, due_apr_15.id).await.unwrap();
    assert_eq!(detail.status, BillStatus::Overdue);

    bill_queries::set_status(&pool, due_apr_15.id, BillStatus::Paid).await.unwrap();
    assert!(dashboard_queries::overdue_bills(&pool, today).await.unwrap().is_empty());
    assert!(matches!(
        bill_queries::bill_detail(&pool, 999).await,
        Err(DbError::NotFound { .. })
    ));
}
