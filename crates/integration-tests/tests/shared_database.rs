//! Storefront and admin migrations applied to a single database.
//!
//! Uses the storefront connection string for both sets, so with only
//! `DATABASE_URL` set this is the deployment where both sides share one
//! database.
//!
//! Run with: `cargo test -p storekeep-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use storekeep_integration_tests::storefront_pool;

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_both_migration_sets_share_one_database() {
    let pool = storefront_pool().await.unwrap();

    storekeep_admin::db::migrator().run(&pool).await.unwrap();
    // Re-running either set after the other is a no-op.
    storekeep_storefront::db::migrator().run(&pool).await.unwrap();
    storekeep_admin::db::migrator().run(&pool).await.unwrap();

    let tables: i64 = sqlx::query_scalar(
        r"
        SELECT COUNT(*) FROM information_schema.tables
        WHERE (table_schema, table_name) IN (('storefront', 'address'), ('admin', 'voucher'))
        ",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(tables, 2);
}

#[test]
fn test_migration_versions_do_not_overlap() {
    let storefront = storekeep_storefront::db::migrator();
    let admin = storekeep_admin::db::migrator();
    assert!(storefront.ignore_missing);
    assert!(admin.ignore_missing);

    for migration in admin.iter() {
        assert!(
            storefront.iter().all(|m| m.version != migration.version),
            "version {} is used by both sets",
            migration.version
        );
    }
}
