//! In-Memory Workflow Harness
//!
//! Wires a [`ClaimWorkflow`] to the in-memory adapters of `domain_claims`
//! with one office, one staff member and one technician already registered.

use std::sync::Arc;
use std::time::Duration;

use core_kernel::{OfficeId, UserId};
use domain_claims::mock::{MockFileStorage, MockStore, MockUnitOfWork, MockUserDirectory};
use domain_claims::{
    Claim, ClaimAttachment, ClaimItem, ClaimPolicy, ClaimRepository, ClaimStatus, ClaimWorkflow,
    Collaborators, NewClaim, SignatureSniffer, UnitOfWork, UserRole,
};
use rust_decimal::Decimal;

use crate::builders::{NewClaimBuilder, NewClaimItemBuilder};
use crate::fixtures::{FileFixtures, UserFixtures};

pub struct MockHarness {
    pub store: MockStore,
    pub users: Arc<MockUserDirectory>,
    pub storage: Arc<MockFileStorage>,
    pub workflow: ClaimWorkflow<MockUnitOfWork>,
    pub office_id: OfficeId,
    pub staff_id: UserId,
    pub technician_id: UserId,
    pub reviewer_id: UserId,
}

#[derive(Default)]
pub struct MockHarnessBuilder {
    policy: ClaimPolicy,
    deadline: Option<Duration>,
    user_latency: Option<Duration>,
}

impl MockHarnessBuilder {
    pub fn with_policy(mut self, policy: ClaimPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Slows down every user lookup
    pub fn with_user_latency(mut self, latency: Duration) -> Self {
        self.user_latency = Some(latency);
        self
    }

    pub async fn build(self) -> MockHarness {
        let store = MockStore::new();
        let users = match self.user_latency {
            Some(latency) => MockUserDirectory::new().with_latency(latency),
            None => MockUserDirectory::new(),
        };
        let users = Arc::new(users);
        let storage = Arc::new(MockFileStorage::new());

        let office_id = OfficeId::new_v7();
        let staff = UserFixtures::staff(office_id);
        let technician = UserFixtures::technician(office_id);
        let reviewer = UserFixtures::reviewer();
        let (staff_id, technician_id, reviewer_id) = (staff.id, technician.id, reviewer.id);
        users.add(staff).await;
        users.add(technician).await;
        users.add(reviewer).await;

        let collaborators = Collaborators {
            users: users.clone(),
            storage: storage.clone(),
            sniffer: Arc::new(SignatureSniffer::new()),
        };
        let mut workflow = ClaimWorkflow::new(store.uow.clone(), store.stores(), collaborators, self.policy);
        if let Some(deadline) = self.deadline {
            workflow = workflow.with_deadline(deadline);
        }

        MockHarness {
            store,
            users,
            storage,
            workflow,
            office_id,
            staff_id,
            technician_id,
            reviewer_id,
        }
    }
}

impl MockHarness {
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    pub fn builder() -> MockHarnessBuilder {
        MockHarnessBuilder::default()
    }

    /// Registers another user and returns their id
    pub async fn add_user(&self, role: UserRole, office_id: OfficeId) -> UserId {
        let user = UserFixtures::with_role(role, office_id);
        let id = user.id;
        self.users.add(user).await;
        id
    }

    /// Claim input for the harness staff member and technician
    pub fn new_claim(&self) -> NewClaim {
        NewClaimBuilder::new(self.staff_id, self.technician_id).build()
    }

    pub async fn draft_claim(&self) -> Claim {
        self.workflow
            .create_claim(self.new_claim())
            .await
            .expect("draft claim should be created")
    }

    pub async fn add_item(&self, claim_id: core_kernel::ClaimId, cost: Decimal) -> ClaimItem {
        self.workflow
            .create_item(claim_id, NewClaimItemBuilder::new().with_cost(cost).build())
            .await
            .expect("item should be created")
    }

    pub async fn add_attachment(&self, claim_id: core_kernel::ClaimId) -> ClaimAttachment {
        self.workflow
            .create_attachment(claim_id, FileFixtures::upload(FileFixtures::png()))
            .await
            .expect("attachment should be stored")
    }

    /// Draft claim with one item per cost and one photo, submitted
    pub async fn submitted_claim(&self, costs: &[Decimal]) -> (Claim, Vec<ClaimItem>) {
        let claim = self.draft_claim().await;
        let mut items = Vec::with_capacity(costs.len());
        for cost in costs {
            items.push(self.add_item(claim.id, *cost).await);
        }
        self.add_attachment(claim.id).await;
        let claim = self
            .workflow
            .submit(claim.id, self.staff_id)
            .await
            .expect("claim should be submitted");
        (claim, items)
    }

    /// Submitted claim moved on to manufacturer review
    pub async fn reviewing_claim(&self, costs: &[Decimal]) -> (Claim, Vec<ClaimItem>) {
        let (claim, items) = self.submitted_claim(costs).await;
        let claim = self
            .workflow
            .update_status(claim.id, ClaimStatus::Reviewing, self.reviewer_id)
            .await
            .expect("claim should move to review");
        (claim, items)
    }

    /// Writes a claim with the given status straight into the store
    pub async fn seed_claim(&self, status: ClaimStatus) -> Claim {
        let mut claim = Claim::draft(self.new_claim());
        claim.status = status;

        let mut tx = self.store.uow.begin().await.expect("begin");
        self.store
            .claims
            .insert(&mut tx, &claim)
            .await
            .expect("seed claim");
        self.store.uow.commit(tx).await.expect("commit");
        claim
    }
}
