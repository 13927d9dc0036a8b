use crate::error::{DatabaseError, DatabaseErrorExt};
use fxhash::{FxHashMap, FxHashSet};
use sha2::{Digest, Sha256};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

const BOOTSTRAP_SLICE: &str = "database";

/// A versioned `SurrealQL` script shipped by a feature slice.
///
/// Scripts must not manage transactions themselves: the runner wraps each one,
/// together with its ledger entry, in a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub slice: &'static str,
    pub version: &'static str,
    pub script: &'static str,
}

impl Migration {
    #[must_use]
    pub const fn new(slice: &'static str, version: &'static str, script: &'static str) -> Self {
        Self { slice, version, script }
    }

    /// Hex-encoded SHA-256 of the script text.
    #[must_use]
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.script.as_bytes()))
    }

    fn key(&self) -> String {
        format!("{}:{}", self.slice, self.version)
    }

    fn to_applied(self) -> AppliedMigration {
        AppliedMigration {
            slice: self.slice.to_owned(),
            version: self.version.to_owned(),
            checksum: self.checksum(),
        }
    }
}

/// Ledger bootstrap; always the first migration to run.
pub(crate) const fn bootstrap() -> Migration {
    Migration::new(BOOTSTRAP_SLICE, "0000-bootstrap", include_str!("../migrations/0000-bootstrap.surql"))
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub applied: Vec<AppliedMigration>,
    pub skipped: Vec<AppliedMigration>,
}

#[derive(Debug, Clone, PartialEq, Eq, SurrealValue)]
pub struct AppliedMigration {
    pub slice: String,
    pub version: String,
    pub checksum: String,
}

#[derive(Debug)]
pub(crate) struct MigrationRunner<'a> {
    db: &'a Surreal<Any>,
}

impl<'a> MigrationRunner<'a> {
    #[must_use]
    pub(crate) const fn new(db: &'a Surreal<Any>) -> Self {
        Self { db }
    }

    pub(crate) async fn run(&self, migrations: &[Migration]) -> Result<MigrationReport, DatabaseError> {
        let plan = plan(migrations)?;
        let applied_migrations = self.get_migrations_map().await?;
        let mut report = MigrationReport::default();

        for migration in plan {
            if let Some(applied) = applied_migrations.get(&migration.key()) {
                ensure_checksum_match(&migration, &applied.checksum)?;
                report.skipped.push(migration.to_applied());
                continue;
            }

            self.apply_migration(&migration).await?;
            report.applied.push(migration.to_applied());
        }

        Ok(report)
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), DatabaseError> {
        let query = format!(
            "BEGIN TRANSACTION;
            {}
            fn::confirm_migration($slice, $version, $checksum);
            COMMIT TRANSACTION;",
            migration.script,
        );

        self.db
            .query(query)
            .bind(("slice", migration.slice))
            .bind(("version", migration.version))
            .bind(("checksum", migration.checksum()))
            .await
            .context(format!("SQL execution failed at {}", migration.key()))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("Migration statement failed at {}", migration.key()))?;

        Ok(())
    }

    async fn is_system_ready(&self) -> Result<bool, DatabaseError> {
        let mut response = self
            .db
            .query("RETURN (INFO FOR DB).tables.migration != NONE")
            .await
            .context("Checking if the migration ledger exists")?;

        let is_ready = response.take::<Option<bool>>(0)?.unwrap_or_default();
        Ok(is_ready)
    }

    async fn get_migrations_map(
        &self,
    ) -> Result<FxHashMap<String, AppliedMigration>, DatabaseError> {
        if !self.is_system_ready().await? {
            return Ok(FxHashMap::default());
        }

        let entries = self
            .db
            .query("SELECT slice, version, checksum FROM migration")
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(0)
            .context("Parsing migrations map")?;

        Ok(entries
            .into_iter()
            .map(|entry| (format!("{}:{}", entry.slice, entry.version), entry))
            .collect())
    }
}

/// Bootstrap first, then slice migrations in the given order.
fn plan(migrations: &[Migration]) -> Result<Vec<Migration>, DatabaseError> {
    let mut seen = FxHashSet::default();
    let mut ordered = Vec::with_capacity(migrations.len() + 1);

    for migration in std::iter::once(bootstrap()).chain(migrations.iter().copied()) {
        validate_script(&migration)?;
        if !seen.insert(migration.key()) {
            return Err(DatabaseError::Migration {
                message: format!("Duplicate migration {}", migration.key()).into(),
                context: None,
            });
        }
        ordered.push(migration);
    }

    Ok(ordered)
}

fn validate_script(migration: &Migration) -> Result<(), DatabaseError> {
    let script = migration.script.to_lowercase();
    if script.contains("begin transaction") || script.contains("commit transaction") {
        return Err(DatabaseError::Migration {
            message: format!("Manual transaction control prohibited in {}", migration.key()).into(),
            context: Some("The migration runner handles transactions".into()),
        });
    }
    Ok(())
}

fn ensure_checksum_match(migration: &Migration, existing: &str) -> Result<(), DatabaseError> {
    let current = migration.checksum();
    if existing != current {
        return Err(DatabaseError::Migration {
            message: format!(
                "Checksum mismatch for {} (applied {existing}, found {current})",
                migration.key()
            )
            .into(),
            context: Some("Migration already applied with different checksum".into()),
        });
    }
    Ok(())
}
