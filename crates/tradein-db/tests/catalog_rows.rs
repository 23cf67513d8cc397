//! Database-backed tests for device option rows and catalog seeding.
//! Each test gets a fresh database from `#[sqlx::test]`.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tradein_core::{
    empty_category_rows, CatalogFile, DeductionRow, DeviceType, OptionCategory, OptionId,
    OptionSeed,
};
use tradein_db::{
    create_device, create_option, delete_option, device_category_rows, save_device_deductions,
    seed_options, NewDevice, NewOption,
};

async fn fault_option(pool: &PgPool, label: &str) -> OptionId {
    let row = create_option(
        pool,
        &NewOption {
            category: OptionCategory::Fault,
            label,
            header: None,
            condition: None,
            device_type: None,
            deduction_percentage: Decimal::ZERO,
            image_url: None,
        },
    )
    .await
    .unwrap();
    OptionId(row.id)
}

fn device<'a>(model_name: &'a str) -> NewDevice<'a> {
    NewDevice {
        vendor: "Apple",
        device_type: DeviceType::Iphone,
        model_name,
        max_price: Decimal::new(1000, 0),
        colors: &[],
        storage_sizes: &[],
        memory_sizes: &[],
        payment_options: &[],
        image_url: None,
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn device_rows_keep_insertion_order(pool: PgPool) {
    let first = fault_option(&pool, "Face ID").await;
    let second = fault_option(&pool, "Speaker").await;

    let mut rows = empty_category_rows();
    rows.insert(
        OptionCategory::Fault,
        vec![DeductionRow::zeroed(second), DeductionRow::zeroed(first)],
    );
    let created = create_device(&pool, &device("iPhone 13"), &rows)
        .await
        .unwrap();

    let stored = device_category_rows(&pool, created.id).await.unwrap();
    let ids: Vec<OptionId> = stored[&OptionCategory::Fault]
        .iter()
        .map(|row| row.option_id)
        .collect();
    assert_eq!(ids, vec![second, first]);
    assert!(stored[&OptionCategory::FrontScreen].is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn save_device_deductions_skips_unattached_rows(pool: PgPool) {
    let attached = fault_option(&pool, "Face ID").await;
    let unattached = fault_option(&pool, "Speaker").await;

    let mut rows = empty_category_rows();
    rows.insert(OptionCategory::Fault, vec![DeductionRow::zeroed(attached)]);
    let created = create_device(&pool, &device("iPhone 14"), &rows)
        .await
        .unwrap();

    let mut update = empty_category_rows();
    update.insert(
        OptionCategory::Fault,
        vec![
            DeductionRow {
                option_id: attached,
                deduction_percentage: Decimal::new(15, 0),
            },
            DeductionRow {
                option_id: unattached,
                deduction_percentage: Decimal::new(40, 0),
            },
        ],
    );
    let written = save_device_deductions(&pool, created.id, &update)
        .await
        .unwrap();
    assert_eq!(written, 1);

    let stored = device_category_rows(&pool, created.id).await.unwrap();
    assert_eq!(stored[&OptionCategory::Fault].len(), 1);
    assert_eq!(
        stored[&OptionCategory::Fault][0].deduction_percentage,
        Decimal::new(15, 0)
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_an_option_removes_device_rows(pool: PgPool) {
    let option = fault_option(&pool, "Face ID").await;
    let mut rows = empty_category_rows();
    rows.insert(OptionCategory::Fault, vec![DeductionRow::zeroed(option)]);
    let created = create_device(&pool, &device("iPhone 15"), &rows)
        .await
        .unwrap();

    assert!(delete_option(&pool, OptionCategory::Fault, option.0)
        .await
        .unwrap());

    let stored = device_category_rows(&pool, created.id).await.unwrap();
    assert!(stored[&OptionCategory::Fault].is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_options_is_idempotent(pool: PgPool) {
    let mut catalog = CatalogFile::default();
    catalog.options.insert(
        OptionCategory::BatteryHealth,
        vec![OptionSeed {
            label: "Below 80%".to_string(),
            header: Some("Battery".to_string()),
            condition: None,
            device_type: None,
            deduction_percentage: Decimal::new(10, 0),
            image_url: None,
        }],
    );

    assert_eq!(seed_options(&pool, &catalog).await.unwrap(), 1);
    assert_eq!(seed_options(&pool, &catalog).await.unwrap(), 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM condition_options")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn seeded_label_is_trimmed_and_matches_api_label(pool: PgPool) {
    fault_option(&pool, "Bent").await;

    let mut catalog = CatalogFile::default();
    catalog.options.insert(
        OptionCategory::Fault,
        vec![OptionSeed {
            label: "  Bent ".to_string(),
            header: None,
            condition: None,
            device_type: None,
            deduction_percentage: Decimal::new(25, 0),
            image_url: None,
        }],
    );
    assert_eq!(seed_options(&pool, &catalog).await.unwrap(), 1);

    let rows: Vec<(String, Decimal)> = sqlx::query_as(
        "SELECT label, deduction_percentage FROM condition_options WHERE category = 'fault'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(rows, vec![("Bent".to_string(), Decimal::new(25, 0))]);
}
