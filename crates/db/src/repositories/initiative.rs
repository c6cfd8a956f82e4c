use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use opexflow_core::domain::initiative::{
    BudgetType, CapexAssessment, DisciplineRef, Initiative, InitiativeId, InitiativeStatus,
    MocAssessment, Priority, SiteRef,
};
use opexflow_core::domain::transaction::{TransactionId, WorkflowTransaction};

use super::{InitiativeRepository, RepositoryError};
use crate::repositories::transaction_log::insert_transaction;
use crate::DbPool;

pub struct SqlInitiativeRepository {
    pool: DbPool,
}

impl SqlInitiativeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "initiative_id, title, description, category, site_code, site_name,
    discipline_code, discipline_name, proposer, priority, budget_type, estimated_savings,
    proposal_date, expected_closure_date, status, current_stage, initiative_lead,
    moc_required, moc_number, capex_required, capex_details, version, created_at, updated_at";

fn decode<T>(value: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    value.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("{field}: {e}")))
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|e| RepositoryError::Decode(format!("{field}: {e}")))
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_stage(value: i64) -> Result<u8, RepositoryError> {
    u8::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("current_stage out of range: {value}")))
}

fn row_to_initiative(row: &sqlx::sqlite::SqliteRow) -> Result<Initiative, RepositoryError> {
    let initiative_id: String = decode(row.try_get("initiative_id"))?;
    let title: String = decode(row.try_get("title"))?;
    let description: String = decode(row.try_get("description"))?;
    let category: String = decode(row.try_get("category"))?;
    let site_code: Option<String> = decode(row.try_get("site_code"))?;
    let site_name: Option<String> = decode(row.try_get("site_name"))?;
    let discipline_code: String = decode(row.try_get("discipline_code"))?;
    let discipline_name: String = decode(row.try_get("discipline_name"))?;
    let proposer: String = decode(row.try_get("proposer"))?;
    let priority: String = decode(row.try_get("priority"))?;
    let budget_type: String = decode(row.try_get("budget_type"))?;
    let estimated_savings: String = decode(row.try_get("estimated_savings"))?;
    let proposal_date: String = decode(row.try_get("proposal_date"))?;
    let expected_closure_date: String = decode(row.try_get("expected_closure_date"))?;
    let status: String = decode(row.try_get("status"))?;
    let current_stage: i64 = decode(row.try_get("current_stage"))?;
    let initiative_lead: Option<String> = decode(row.try_get("initiative_lead"))?;
    let moc_required: Option<bool> = decode(row.try_get("moc_required"))?;
    let moc_number: Option<String> = decode(row.try_get("moc_number"))?;
    let capex_required: Option<bool> = decode(row.try_get("capex_required"))?;
    let capex_details: Option<String> = decode(row.try_get("capex_details"))?;
    let version: i64 = decode(row.try_get("version"))?;
    let created_at: String = decode(row.try_get("created_at"))?;
    let updated_at: String = decode(row.try_get("updated_at"))?;

    let site = site_code.map(|code| SiteRef { code, name: site_name.unwrap_or_default() });

    Ok(Initiative {
        id: InitiativeId(initiative_id),
        title,
        description,
        category,
        site,
        discipline: DisciplineRef { code: discipline_code, name: discipline_name },
        proposer,
        priority: Priority::from_str(&priority).map_err(RepositoryError::Decode)?,
        budget_type: BudgetType::from_str(&budget_type).map_err(RepositoryError::Decode)?,
        estimated_savings: parse_decimal("estimated_savings", &estimated_savings)?,
        proposal_date: parse_date("proposal_date", &proposal_date)?,
        expected_closure_date: parse_date("expected_closure_date", &expected_closure_date)?,
        status: InitiativeStatus::from_str(&status).unwrap_or(InitiativeStatus::Proposed),
        current_stage: parse_stage(current_stage)?,
        initiative_lead,
        moc: moc_required.map(|required| MocAssessment { required, number: moc_number }),
        capex: capex_required.map(|required| CapexAssessment { required, details: capex_details }),
        version,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

#[async_trait]
impl InitiativeRepository for SqlInitiativeRepository {
    async fn find_by_id(&self, id: &InitiativeId) -> Result<Option<Initiative>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM initiatives WHERE initiative_id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_initiative(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, initiative: &Initiative) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO initiatives (initiative_id, title, description, category, site_code,
                 site_name, discipline_code, discipline_name, proposer, priority, budget_type,
                 estimated_savings, proposal_date, expected_closure_date, status, current_stage,
                 initiative_lead, moc_required, moc_number, capex_required, capex_details,
                 version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&initiative.id.0)
        .bind(&initiative.title)
        .bind(&initiative.description)
        .bind(&initiative.category)
        .bind(initiative.site.as_ref().map(|site| site.code.as_str()))
        .bind(initiative.site.as_ref().map(|site| site.name.as_str()))
        .bind(&initiative.discipline.code)
        .bind(&initiative.discipline.name)
        .bind(&initiative.proposer)
        .bind(initiative.priority.as_str())
        .bind(initiative.budget_type.as_str())
        .bind(initiative.estimated_savings.to_string())
        .bind(initiative.proposal_date.format("%Y-%m-%d").to_string())
        .bind(initiative.expected_closure_date.format("%Y-%m-%d").to_string())
        .bind(initiative.status.as_str())
        .bind(i64::from(initiative.current_stage))
        .bind(&initiative.initiative_lead)
        .bind(initiative.moc.as_ref().map(|moc| moc.required))
        .bind(initiative.moc.as_ref().and_then(|moc| moc.number.as_deref()))
        .bind(initiative.capex.as_ref().map(|capex| capex.required))
        .bind(initiative.capex.as_ref().and_then(|capex| capex.details.as_deref()))
        .bind(initiative.version)
        .bind(initiative.created_at.to_rfc3339())
        .bind(initiative.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Initiative>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM initiatives ORDER BY created_at DESC, initiative_id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_initiative).collect::<Result<Vec<_>, _>>()
    }

    async fn count_for_site_in_year(
        &self,
        site_code: &str,
        year: i32,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM initiatives
             WHERE site_code = ? AND CAST(strftime('%Y', proposal_date) AS INTEGER) = ?",
        )
        .bind(site_code)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_for_site_discipline_in_year(
        &self,
        site_code: &str,
        discipline_code: &str,
        year: i32,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM initiatives
             WHERE site_code = ? AND discipline_code = ?
               AND CAST(strftime('%Y', proposal_date) AS INTEGER) = ?",
        )
        .bind(site_code)
        .bind(discipline_code)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn commit_transition(
        &self,
        initiative: &Initiative,
        expected_version: i64,
        transaction: &WorkflowTransaction,
    ) -> Result<TransactionId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE initiatives
             SET status = ?, current_stage = ?, initiative_lead = ?, moc_required = ?,
                 moc_number = ?, capex_required = ?, capex_details = ?, version = ?,
                 updated_at = ?
             WHERE initiative_id = ? AND version = ?",
        )
        .bind(initiative.status.as_str())
        .bind(i64::from(initiative.current_stage))
        .bind(&initiative.initiative_lead)
        .bind(initiative.moc.as_ref().map(|moc| moc.required))
        .bind(initiative.moc.as_ref().and_then(|moc| moc.number.as_deref()))
        .bind(initiative.capex.as_ref().map(|capex| capex.required))
        .bind(initiative.capex.as_ref().and_then(|capex| capex.details.as_deref()))
        .bind(initiative.version)
        .bind(initiative.updated_at.to_rfc3339())
        .bind(&initiative.id.0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::VersionConflict(initiative.id.0.clone()));
        }

        let transaction_id = insert_transaction(&mut tx, transaction).await?;
        tx.commit().await?;
        Ok(transaction_id)
    }
}
