use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::{
    engine::local::{Db, Mem},
    Surreal,
};

use crate::models::checkout::CheckoutPayload;
use crate::models::program::PurchasedProgram;
use crate::services::programs::refresh_expiration_flags;

/// One purchased program as stored, keyed by the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProgramDocument {
    record_key: String,
    user_id: String,
    line_index: usize,
    program: PurchasedProgram,
}

fn record_key(user_id: &str, timestamp: i64, line_index: usize, program_id: &str) -> String {
    format!("{}-{}-{}-{}", user_id, timestamp, line_index, program_id)
}

#[derive(Clone)]
pub struct DatabaseService {
    db: Surreal<Db>,
}

impl DatabaseService {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = if database_url.starts_with("memory://") {
            Surreal::new::<Mem>(()).await?
        } else {
            return Err(anyhow!("Unsupported database URL: {}", database_url));
        };

        db.use_ns("retreat_booking").use_db("main").await?;

        let service = Self { db };
        service.initialize_schema().await?;

        Ok(service)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.db
            .query(
                "
            DEFINE TABLE programs SCHEMALESS;
            DEFINE INDEX programs_by_user ON programs COLUMNS user_id;
        ",
            )
            .await?
            .check()?;

        log::info!("Database schema initialized successfully");
        Ok(())
    }

    /// Writes every line of a paid checkout as a purchased program.
    ///
    /// Records are keyed by user, purchase instant, line position and line
    /// id, so replaying the same payload overwrites instead of duplicating.
    pub async fn record_purchase(&self, payload: &CheckoutPayload) -> Result<Vec<PurchasedProgram>> {
        let mut recorded = Vec::with_capacity(payload.expanded_cart_data.len());

        for (line_index, line) in payload.expanded_cart_data.iter().enumerate() {
            let program = PurchasedProgram::from_checkout_item(line)?;
            let document = ProgramDocument {
                record_key: record_key(&payload.user_id, payload.timestamp, line_index, &program.id),
                user_id: payload.user_id.clone(),
                line_index,
                program: program.clone(),
            };
            self.write_document(&document).await?;

            recorded.push(program);
        }

        log::info!(
            "Recorded {} programs for user {}",
            recorded.len(),
            payload.user_id
        );
        Ok(recorded)
    }

    async fn write_document(&self, document: &ProgramDocument) -> Result<()> {
        self.db
            .query("UPDATE type::thing('programs', $key) CONTENT $document")
            .bind(("key", document.record_key.clone()))
            .bind(("document", document.clone()))
            .await?
            .check()?;
        Ok(())
    }

    /// All programs a user owns, oldest purchase first.
    pub async fn list_programs(&self, user_id: &str) -> Result<Vec<PurchasedProgram>> {
        let documents = self.list_documents(user_id).await?;
        Ok(documents.into_iter().map(|doc| doc.program).collect())
    }

    async fn list_documents(&self, user_id: &str) -> Result<Vec<ProgramDocument>> {
        let mut documents: Vec<ProgramDocument> = self
            .db
            .query("SELECT record_key, user_id, line_index, program FROM programs WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await?
            .take(0)?;

        documents.sort_by(|a, b| {
            a.program
                .purchase_date
                .cmp(&b.program.purchase_date)
                .then(a.line_index.cmp(&b.line_index))
        });

        Ok(documents)
    }

    /// Refreshes the cached `isExpired` flags for a user and persists the
    /// ones that changed. Programs are never deleted.
    pub async fn mark_expired(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<PurchasedProgram>> {
        let mut documents = self.list_documents(user_id).await?;
        let mut changed = 0;

        // Program ids repeat across renewals; write back by record key
        for document in documents.iter_mut() {
            if refresh_expiration_flags(std::slice::from_mut(&mut document.program), now).is_empty() {
                continue;
            }
            self.db
                .query("UPDATE type::thing('programs', $key) SET program.isExpired = $flag")
                .bind(("key", document.record_key.clone()))
                .bind(("flag", document.program.is_expired))
                .await?
                .check()?;
            changed += 1;
        }

        if changed > 0 {
            log::info!(
                "Refreshed expiration flag on {} programs for user {}",
                changed,
                user_id
            );
        }
        Ok(documents.into_iter().map(|doc| doc.program).collect())
    }

    pub async fn health_check(&self) -> Result<()> {
        self.db.query("INFO FOR DB").await?.check()?;
        Ok(())
    }
}
