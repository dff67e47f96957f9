//! PostgreSQL adapter tests
//!
//! These run the claim workflow against a real PostgreSQL started with
//! testcontainers. They need a Docker daemon and are ignored by default:
//!
//! ```text
//! cargo test -p infra_db -- --ignored
//! ```

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{ClaimId, OfficeId, UserId};
use domain_claims::mock::MockFileStorage;
use domain_claims::{
    ClaimPolicy, ClaimRepository, ClaimStatus, ClaimWorkflow, Collaborators, ErrorKind,
    SignatureSniffer, UnitOfWork, User, UserDirectory, UserRole,
};
use infra_db::{
    claim_stores, IsolationLevel, PgUnitOfWork, PostgresClaimRepository, PostgresUserDirectory,
};
use test_utils::{
    assert_error_kind, assert_total_matches, create_isolated_test_database, FileFixtures,
    NewClaimBuilder, NewClaimItemBuilder, TestDatabase, UserFixtures,
};

struct PgHarness {
    db: TestDatabase,
    storage: Arc<MockFileStorage>,
    workflow: ClaimWorkflow<PgUnitOfWork>,
    staff: User,
    technician: User,
}

impl PgHarness {
    async fn new() -> Self {
        Self::with_policy(ClaimPolicy::default()).await
    }

    async fn with_policy(policy: ClaimPolicy) -> Self {
        let db = create_isolated_test_database()
            .await
            .expect("Failed to start PostgreSQL");
        let pool = db.pool().clone();

        let users = PostgresUserDirectory::new(pool.clone());
        let office_id = OfficeId::new();
        let staff = UserFixtures::staff(office_id);
        let technician = UserFixtures::technician(office_id);
        users.upsert(&staff).await.expect("seed staff");
        users.upsert(&technician).await.expect("seed technician");

        let storage = Arc::new(MockFileStorage::new());
        let collaborators = Collaborators {
            users: Arc::new(users),
            storage: storage.clone(),
            sniffer: Arc::new(SignatureSniffer),
        };

        let uow = PgUnitOfWork::new(pool.clone()).with_isolation(IsolationLevel::Serializable);
        let workflow = ClaimWorkflow::new(
            Arc::new(uow),
            claim_stores(&pool),
            collaborators,
            policy,
        );

        Self {
            db,
            storage,
            workflow,
            staff,
            technician,
        }
    }

    async fn draft_claim(&self) -> ClaimId {
        self.workflow
            .create_claim(NewClaimBuilder::new(self.staff.id, self.technician.id).build())
            .await
            .expect("create claim")
            .id
    }
}

mod user_directory {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_get_user_round_trips_role_and_office() {
        let harness = PgHarness::new().await;
        let users = PostgresUserDirectory::new(harness.db.pool().clone());

        let found = users.get_user(harness.technician.id).await.unwrap();
        assert_eq!(found, harness.technician);
        assert_eq!(found.role, UserRole::ScTechnician);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_unknown_user_is_not_found() {
        let harness = PgHarness::new().await;
        let users = PostgresUserDirectory::new(harness.db.pool().clone());

        let error = users.get_user(UserId::new()).await.unwrap_err();
        assert!(error.is_not_found());
    }
}

mod claim_lifecycle {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_full_lifecycle_persists_status_total_and_history() {
        let harness = PgHarness::new().await;
        let claim_id = harness.draft_claim().await;

        let first = harness
            .workflow
            .create_item(claim_id, NewClaimItemBuilder::new().with_cost(dec!(120.50)).build())
            .await
            .unwrap();
        let second = harness
            .workflow
            .create_item(claim_id, NewClaimItemBuilder::new().with_cost(dec!(79.50)).build())
            .await
            .unwrap();
        harness
            .workflow
            .create_attachment(claim_id, FileFixtures::upload(FileFixtures::png()))
            .await
            .unwrap();

        let claim = harness.workflow.get_claim(claim_id).await.unwrap();
        assert_eq!(claim.total_cost, dec!(200));
        let items = harness.workflow.list_items(claim_id).await.unwrap();
        assert_total_matches(&claim, &items);

        harness.workflow.submit(claim_id, harness.staff.id).await.unwrap();
        harness
            .workflow
            .update_status(claim_id, ClaimStatus::Reviewing, harness.staff.id)
            .await
            .unwrap();
        harness.workflow.approve_item(first.id).await.unwrap();
        harness.workflow.reject_item(second.id).await.unwrap();

        let done = harness.workflow.complete(claim_id, harness.staff.id).await.unwrap();
        assert_eq!(done.status, ClaimStatus::PartiallyApproved);

        let statuses: Vec<ClaimStatus> = harness
            .workflow
            .history(claim_id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                ClaimStatus::Draft,
                ClaimStatus::Submitted,
                ClaimStatus::Reviewing,
                ClaimStatus::PartiallyApproved,
            ]
        );
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_hard_delete_cascades_and_removes_files() {
        let harness = PgHarness::new().await;
        let claim_id = harness.draft_claim().await;
        harness
            .workflow
            .create_item(claim_id, NewClaimItemBuilder::new().build())
            .await
            .unwrap();
        let attachment = harness
            .workflow
            .create_attachment(claim_id, FileFixtures::upload(FileFixtures::pdf()))
            .await
            .unwrap();

        harness.workflow.hard_delete_claim(claim_id).await.unwrap();

        assert_error_kind(harness.workflow.get_claim(claim_id).await, ErrorKind::NotFound);
        assert!(harness.workflow.list_items(claim_id).await.unwrap().is_empty());
        assert!(harness.workflow.history(claim_id).await.unwrap().is_empty());
        assert!(!harness.storage.contains(&attachment.url).await);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM claim_items")
            .fetch_one(harness.db.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_soft_delete_hides_rows_but_keeps_them() {
        let harness = PgHarness::new().await;
        let claim_id = harness.draft_claim().await;
        harness
            .workflow
            .create_item(claim_id, NewClaimItemBuilder::new().build())
            .await
            .unwrap();
        harness
            .workflow
            .update_status(claim_id, ClaimStatus::Cancelled, harness.staff.id)
            .await
            .unwrap();

        harness.workflow.soft_delete_claim(claim_id).await.unwrap();

        assert_error_kind(harness.workflow.get_claim(claim_id).await, ErrorKind::NotFound);
        let marked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM claim_items WHERE claim_id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(uuid_of(claim_id))
        .fetch_one(harness.db.pool())
        .await
        .unwrap();
        assert_eq!(marked, 1);
    }

    fn uuid_of(id: ClaimId) -> uuid::Uuid {
        id.into()
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_stale_version_is_a_conflict() {
        let harness = PgHarness::new().await;
        let claim_id = harness.draft_claim().await;
        let pool = harness.db.pool().clone();
        let repo = PostgresClaimRepository::new(pool.clone());
        let uow = PgUnitOfWork::new(pool);

        let stale = repo.get(claim_id).await.unwrap().unwrap();
        harness
            .workflow
            .update_claim(claim_id, "Coolant leak under the battery tray".to_string())
            .await
            .unwrap();

        let mut tx = uow.begin().await.unwrap();
        let error = repo.update(&mut tx, &stale).await.unwrap_err();
        uow.rollback(tx).await.unwrap();

        assert!(error.is_conflict());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_concurrent_creates_cannot_exceed_workload_limit() {
        let harness = PgHarness::with_policy(ClaimPolicy {
            max_claims_per_technician: 2,
            ..ClaimPolicy::default()
        })
        .await;
        harness.draft_claim().await;

        let new_claim = || NewClaimBuilder::new(harness.staff.id, harness.technician.id).build();
        let (first, second) = tokio::join!(
            harness.workflow.create_claim(new_claim()),
            harness.workflow.create_claim(new_claim()),
        );

        let refused: Vec<_> = [first, second]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        assert_eq!(refused.len(), 1, "exactly one create must lose the race");
        assert!(matches!(
            refused[0].kind(),
            ErrorKind::Conflict | ErrorKind::Capacity
        ));

        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM claims WHERE technician_id = $1 AND deleted_at IS NULL",
        )
        .bind(uuid::Uuid::from(harness.technician.id))
        .fetch_one(harness.db.pool())
        .await
        .unwrap();
        assert_eq!(open, 2);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_rolled_back_transaction_leaves_no_rows() {
        let harness = PgHarness::new().await;
        let pool = harness.db.pool().clone();
        let repo = PostgresClaimRepository::new(pool.clone());
        let uow = PgUnitOfWork::new(pool);

        let claim = domain_claims::Claim::draft(
            NewClaimBuilder::new(harness.staff.id, harness.technician.id).build(),
        );
        let mut tx = uow.begin().await.unwrap();
        repo.insert(&mut tx, &claim).await.unwrap();
        uow.rollback(tx).await.unwrap();

        assert!(repo.get(claim.id).await.unwrap().is_none());
    }
}
