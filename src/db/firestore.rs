// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides operations for:
//! - Users (points balance)
//! - Challenge sessions (one `ACTIVE` per user)
//! - Vouchers (read-only catalog)
//! - User vouchers (ownership records)

use crate::db::{collections, ChallengeStore, ChangeSet, UserMutation, UserState, Write};
use crate::error::AppError;
use crate::models::{ChallengeSession, SessionStatus, User, UserVoucher, Voucher};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreResult, FirestoreTransaction};

/// Attempts before a contended user transaction is reported as failed.
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Why a single transaction attempt did not commit.
enum AttemptError {
    /// Lost a race with another transaction; safe to run again.
    Contended(FirestoreError),
    Failed(AppError),
}

impl AttemptError {
    fn from_firestore(context: &str, e: FirestoreError) -> Self {
        match &e {
            FirestoreError::DatabaseError(db_err) if db_err.retry_possible => Self::Contended(e),
            _ => Self::Failed(AppError::Database(format!("{}: {}", context, e))),
        }
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. All operations return a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Catalog Maintenance ────────────────────────────────────

    /// Create or replace a catalog voucher.
    pub async fn upsert_voucher(&self, voucher: &Voucher) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::VOUCHERS)
            .document_id(voucher.voucher_id.to_string())
            .object(voucher)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create or replace a user record.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user.user_id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ChallengeStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Session Operations ──────────────────────────────────────

    async fn get_active_session(
        &self,
        user_id: u64,
    ) -> Result<Option<ChallengeSession>, AppError> {
        query_active_session(self.get_client()?, user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<ChallengeSession>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGE_SESSIONS)
            .obj()
            .one(session_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Voucher Operations ──────────────────────────────────────

    async fn get_voucher(&self, voucher_id: u64) -> Result<Option<Voucher>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VOUCHERS)
            .obj()
            .one(&voucher_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_vouchers(&self) -> Result<Vec<Voucher>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::VOUCHERS)
            .order_by([("voucher_id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_user_vouchers(&self, user_id: u64) -> Result<Vec<UserVoucher>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_VOUCHERS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id)]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Commit ───────────────────────────────────────────

    /// Apply a change set in a single Firestore transaction.
    ///
    /// Either every write lands or none does; a failed commit is reported
    /// as a database error and the transaction is discarded.
    async fn commit(&self, changes: ChangeSet) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        if let Err(e) = add_writes(client, &changes, &mut transaction) {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(writes = changes.len(), "Change set committed");
        Ok(())
    }

    /// Read-check-write for one user inside a Firestore transaction.
    ///
    /// The user document and the active-session query are read in the
    /// transaction, and the user document is always part of the writes, so
    /// two transactions for the same user cannot both commit. The loser is
    /// aborted by Firestore and run again against fresh data.
    async fn transact(
        &self,
        user_id: u64,
        mutation: &mut UserMutation<'_>,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut attempt = 1;
        loop {
            match attempt_transaction(client, user_id, mutation).await {
                Ok(writes) => {
                    tracing::debug!(user_id, writes, attempt, "User transaction committed");
                    return Ok(());
                }
                Err(AttemptError::Contended(e)) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::warn!(
                        user_id,
                        attempt,
                        error = %e,
                        "User transaction contended, retrying"
                    );
                    attempt += 1;
                }
                Err(AttemptError::Contended(e)) => {
                    return Err(AppError::Database(format!(
                        "Transaction abandoned after {} attempts: {}",
                        attempt, e
                    )));
                }
                Err(AttemptError::Failed(e)) => return Err(e),
            }
        }
    }
}

// ─── Transaction Helpers ─────────────────────────────────────────

async fn query_active_session(
    client: &firestore::FirestoreDb,
    user_id: u64,
) -> FirestoreResult<Option<ChallengeSession>> {
    let sessions: Vec<ChallengeSession> = client
        .fluent()
        .select()
        .from(collections::CHALLENGE_SESSIONS)
        .filter(move |q| {
            q.for_all([
                q.field("user_id").eq(user_id),
                q.field("status").eq(SessionStatus::Active.as_str()),
            ])
        })
        .limit(1)
        .obj()
        .query()
        .await?;

    Ok(sessions.into_iter().next())
}

async fn read_user_state(reader: &firestore::FirestoreDb, user_id: u64) -> FirestoreResult<UserState> {
    let user: Option<User> = reader
        .fluent()
        .select()
        .by_id_in(collections::USERS)
        .obj()
        .one(&user_id.to_string())
        .await?;
    let active_session = query_active_session(reader, user_id).await?;

    Ok(UserState {
        user: user.unwrap_or_else(|| User::new(user_id)),
        active_session,
    })
}

/// One begin/read/check/commit pass. Returns the number of writes applied.
async fn attempt_transaction(
    client: &firestore::FirestoreDb,
    user_id: u64,
    mutation: &mut UserMutation<'_>,
) -> Result<usize, AttemptError> {
    let mut transaction = client
        .begin_transaction()
        .await
        .map_err(|e| AttemptError::from_firestore("Failed to begin transaction", e))?;

    // Reads through this handle are part of the transaction.
    let reader = client.clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
        transaction.transaction_id().clone(),
    ));

    let state = match read_user_state(&reader, user_id).await {
        Ok(state) => state,
        Err(e) => {
            let _ = transaction.rollback().await;
            return Err(AttemptError::from_firestore(
                "Failed to read user state in transaction",
                e,
            ));
        }
    };
    let user = state.user.clone();

    let mut changes = match mutation(state) {
        Ok(changes) => changes,
        Err(e) => {
            let _ = transaction.rollback().await;
            return Err(AttemptError::Failed(e));
        }
    };

    if changes.is_empty() {
        let _ = transaction.rollback().await;
        return Ok(0);
    }
    if !changes.writes_user() {
        changes = changes.put_user(user);
    }

    if let Err(e) = add_writes(client, &changes, &mut transaction) {
        let _ = transaction.rollback().await;
        return Err(AttemptError::Failed(e));
    }

    transaction
        .commit()
        .await
        .map_err(|e| AttemptError::from_firestore("Transaction commit failed", e))?;

    Ok(changes.len())
}

fn add_writes(
    client: &firestore::FirestoreDb,
    changes: &ChangeSet,
    transaction: &mut FirestoreTransaction<'_>,
) -> Result<(), AppError> {
    for write in changes.writes() {
        let added = match write {
            Write::PutUser(user) => client
                .fluent()
                .update()
                .in_col(collections::USERS)
                .document_id(user.user_id.to_string())
                .object(user)
                .add_to_transaction(transaction)
                .map(|_| ()),
            Write::PutSession(session) => client
                .fluent()
                .update()
                .in_col(collections::CHALLENGE_SESSIONS)
                .document_id(&session.session_id)
                .object(session)
                .add_to_transaction(transaction)
                .map(|_| ()),
            Write::DeleteSession(session_id) => client
                .fluent()
                .delete()
                .from(collections::CHALLENGE_SESSIONS)
                .document_id(session_id)
                .add_to_transaction(transaction)
                .map(|_| ()),
            Write::PutUserVoucher(record) => client
                .fluent()
                .update()
                .in_col(collections::USER_VOUCHERS)
                .document_id(&record.transaction_id)
                .object(record)
                .add_to_transaction(transaction)
                .map(|_| ()),
        };

        added.map_err(|e| {
            AppError::Database(format!("Failed to add write to transaction: {}", e))
        })?;
    }

    Ok(())
}
