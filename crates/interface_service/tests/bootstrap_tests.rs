//! End-to-end wiring tests against PostgreSQL (need Docker)

use core_kernel::{AdapterHealth, OfficeId};
use domain_claims::ClaimStatus;
use infra_db::run_migrations;
use interface_service::{all_healthy, ServiceConfig, ServiceContext};
use sqlx::postgres::PgPoolOptions;
use test_utils::{FileFixtures, NewClaimBuilder, NewClaimItemBuilder, UserFixtures};

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_assembled_service_runs_a_claim_to_submission() {
    let db = test_utils::create_isolated_test_database().await.unwrap();
    let storage_root = std::env::temp_dir().join(format!("warranty-service-{}", uuid::Uuid::new_v4()));

    let config = ServiceConfig {
        database_url: db.config.connection_url(),
        storage_root: storage_root.clone(),
        storage_base_url: "https://files.example.com/claims".to_string(),
        ..ServiceConfig::default()
    };
    let service = ServiceContext::bootstrap(&config).await.unwrap();

    let report = service.health_report().await;
    assert_eq!(report.len(), 3);
    assert!(all_healthy(&report), "{:?}", report);
    assert!(report.iter().all(|r| r.status == AdapterHealth::Healthy));

    let office = OfficeId::new();
    let staff = UserFixtures::staff(office);
    let technician = UserFixtures::technician(office);
    service.users.upsert(&staff).await.unwrap();
    service.users.upsert(&technician).await.unwrap();

    let workflow = &service.workflow;
    let claim = workflow
        .create_claim(NewClaimBuilder::new(staff.id, technician.id).build())
        .await
        .unwrap();
    workflow
        .create_item(claim.id, NewClaimItemBuilder::new().build())
        .await
        .unwrap();
    workflow
        .create_attachment(claim.id, FileFixtures::upload(FileFixtures::jpeg()))
        .await
        .unwrap();

    let submitted = workflow.submit(claim.id, staff.id).await.unwrap();
    assert_eq!(submitted.status, ClaimStatus::Submitted);

    let _ = std::fs::remove_dir_all(storage_root);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_migrations_apply_to_an_empty_database() {
    let db = test_utils::create_isolated_test_database().await.unwrap();
    let fresh = format!("warranty_fresh_{}", uuid::Uuid::new_v4().simple());
    sqlx::query(&format!("CREATE DATABASE {}", fresh))
        .execute(db.pool())
        .await
        .unwrap();

    let mut url = db.config.clone();
    url.database = fresh;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url.connection_url())
        .await
        .unwrap();

    run_migrations(&pool).await.unwrap();

    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public' AND table_name LIKE 'claim%'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(tables, 4);
}
