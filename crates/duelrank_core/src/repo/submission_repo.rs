//! Submission repository contract and SQLite implementation.
//!
//! # Invariants
//! - `create_submission` always stores `BASELINE_RATING`.
//! - Ranked reads order by `rating DESC, created_at DESC, uuid ASC`.
//! - Disqualified rows are hidden from listings unless the caller asks for
//!   them explicitly.

use super::{ensure_ledger_ready, parse_uuid, placeholders, RepoError, RepoResult};
use crate::model::{
    CategoryId, ModelError, NewSubmission, Qualification, Submission, SubmissionId, VoterId,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const SUBMISSION_COLUMNS: &str =
    "uuid, owner_id, category_id, rating, qualification, created_at, graded_by, graded_at";

/// Filters for plain submission listings (newest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionQuery {
    pub owner: Option<VoterId>,
    pub category: Option<CategoryId>,
    pub qualification: Option<Qualification>,
    pub include_disqualified: bool,
}

/// Filters for ranked reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankQuery {
    pub qualification: Option<Qualification>,
    pub category: Option<CategoryId>,
    pub include_disqualified: bool,
    /// Row cap; applies per category when `per_category` is set.
    pub limit: u32,
    pub per_category: bool,
}

/// Submission with its 1-based position inside its ranking group.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSubmission {
    pub rank: u32,
    pub submission: Submission,
}

/// Storage contract for submissions.
pub trait SubmissionRepository {
    /// Inserts an uploaded submission at the baseline rating.
    fn create_submission(&self, new: &NewSubmission) -> RepoResult<Submission>;
    fn get_submission(&self, id: SubmissionId) -> RepoResult<Option<Submission>>;
    /// Loads every existing row among `ids`; missing ids are skipped.
    fn get_submissions(&self, ids: &[SubmissionId]) -> RepoResult<Vec<Submission>>;
    fn list_submissions(&self, query: &SubmissionQuery) -> RepoResult<Vec<Submission>>;
    /// Non-disqualified submissions not owned by `voter`, grouped by
    /// category in a stable order.
    fn list_pairing_candidates(&self, voter: &VoterId) -> RepoResult<Vec<Submission>>;
    fn list_ranked(&self, query: &RankQuery) -> RepoResult<Vec<RankedSubmission>>;
    /// Changes review state and stamps who graded it and when. Never
    /// touches the rating.
    fn set_qualification(
        &self,
        id: SubmissionId,
        qualification: Qualification,
        grader: &VoterId,
        graded_at: i64,
    ) -> RepoResult<()>;
}

/// SQLite-backed submission repository.
pub struct SqliteSubmissionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubmissionRepository<'conn> {
    /// Creates a repository after checking the connection schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_ledger_ready(conn)?;
        Ok(Self { conn })
    }

    /// Skips the schema check; for connections/transactions already vetted.
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Overwrites one derived rating.
    ///
    /// Reserved for vote recording and replay.
    pub(crate) fn write_rating(&self, id: SubmissionId, rating: f64) -> RepoResult<()> {
        if !rating.is_finite() {
            return Err(ModelError::NonFiniteRating(rating).into());
        }
        let changed = self.conn.execute(
            "UPDATE submissions SET rating = ?2 WHERE uuid = ?1;",
            params![id.to_string(), rating],
        )?;
        if changed == 0 {
            return Err(RepoError::SubmissionNotFound(id));
        }
        Ok(())
    }

    /// Removes one row. Votes referencing it must already be gone.
    pub(crate) fn delete_submission(&self, id: SubmissionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM submissions WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::SubmissionNotFound(id));
        }
        Ok(())
    }

    fn query_submissions(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Submission>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_submission_row(row)?);
        }
        Ok(items)
    }
}

impl SubmissionRepository for SqliteSubmissionRepository<'_> {
    fn create_submission(&self, new: &NewSubmission) -> RepoResult<Submission> {
        let submission = new.clone().into_submission();
        self.conn.execute(
            "INSERT INTO submissions (
                uuid,
                owner_id,
                category_id,
                rating,
                qualification,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                submission.id.to_string(),
                submission.owner.as_str(),
                submission.category,
                submission.rating,
                qualification_to_db(submission.qualification),
                submission.created_at,
            ],
        )?;
        Ok(submission)
    }

    fn get_submission(&self, id: SubmissionId) -> RepoResult<Option<Submission>> {
        let mut items = self.query_submissions(
            &format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE uuid = ?;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(items.pop())
    }

    fn get_submissions(&self, ids: &[SubmissionId]) -> RepoResult<Vec<Submission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS}
             FROM submissions
             WHERE uuid IN ({})
             ORDER BY uuid ASC;",
            placeholders(ids.len())
        );
        let bind_values = ids.iter().map(|id| Value::Text(id.to_string())).collect();
        self.query_submissions(&sql, bind_values)
    }

    fn list_submissions(&self, query: &SubmissionQuery) -> RepoResult<Vec<Submission>> {
        let mut sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(owner) = query.owner.as_ref() {
            sql.push_str(" AND owner_id = ?");
            bind_values.push(Value::Text(owner.as_str().to_string()));
        }
        if let Some(category) = query.category {
            sql.push_str(" AND category_id = ?");
            bind_values.push(Value::Integer(category));
        }
        push_qualification_filter(
            &mut sql,
            &mut bind_values,
            query.qualification,
            query.include_disqualified,
        );
        sql.push_str(" ORDER BY created_at DESC, uuid ASC;");

        self.query_submissions(&sql, bind_values)
    }

    fn list_pairing_candidates(&self, voter: &VoterId) -> RepoResult<Vec<Submission>> {
        self.query_submissions(
            &format!(
                "SELECT {SUBMISSION_COLUMNS}
                 FROM submissions
                 WHERE owner_id <> ?
                   AND qualification <> 'disqualified'
                 ORDER BY category_id ASC, uuid ASC;"
            ),
            vec![Value::Text(voter.as_str().to_string())],
        )
    }

    fn list_ranked(&self, query: &RankQuery) -> RepoResult<Vec<RankedSubmission>> {
        let mut filter = String::from("WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(category) = query.category {
            filter.push_str(" AND category_id = ?");
            bind_values.push(Value::Integer(category));
        }
        push_qualification_filter(
            &mut filter,
            &mut bind_values,
            query.qualification,
            query.include_disqualified,
        );

        let partition = if query.per_category {
            "PARTITION BY category_id "
        } else {
            ""
        };
        let outer_order = if query.per_category {
            "category_id ASC, row_rank ASC"
        } else {
            "row_rank ASC"
        };
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS}, row_rank
             FROM (
                SELECT
                    {SUBMISSION_COLUMNS},
                    ROW_NUMBER() OVER (
                        {partition}ORDER BY rating DESC, created_at DESC, uuid ASC
                    ) AS row_rank
                FROM submissions
                {filter}
             )
             WHERE row_rank <= ?
             ORDER BY {outer_order};"
        );
        bind_values.push(Value::Integer(i64::from(query.limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let rank: i64 = row.get("row_rank")?;
            let rank = u32::try_from(rank)
                .map_err(|_| RepoError::InvalidData(format!("invalid rank `{rank}`")))?;
            items.push(RankedSubmission {
                rank,
                submission: parse_submission_row(row)?,
            });
        }
        Ok(items)
    }

    fn set_qualification(
        &self,
        id: SubmissionId,
        qualification: Qualification,
        grader: &VoterId,
        graded_at: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE submissions
             SET qualification = ?2,
                 graded_by = ?3,
                 graded_at = ?4
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                qualification_to_db(qualification),
                grader.as_str(),
                graded_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::SubmissionNotFound(id));
        }
        Ok(())
    }
}

fn push_qualification_filter(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    qualification: Option<Qualification>,
    include_disqualified: bool,
) {
    match qualification {
        Some(state) => {
            sql.push_str(" AND qualification = ?");
            bind_values.push(Value::Text(qualification_to_db(state).to_string()));
        }
        None if !include_disqualified => sql.push_str(" AND qualification <> 'disqualified'"),
        None => {}
    }
}

fn parse_submission_row(row: &Row<'_>) -> RepoResult<Submission> {
    let uuid_text: String = row.get("uuid")?;
    let owner_text: String = row.get("owner_id")?;
    let owner = VoterId::parse(&owner_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid owner `{owner_text}` in submissions.owner_id"))
    })?;
    let qualification_text: String = row.get("qualification")?;
    let qualification = parse_qualification(&qualification_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid qualification `{qualification_text}` in submissions.qualification"
        ))
    })?;

    let graded_by = row
        .get::<_, Option<String>>("graded_by")?
        .map(|value| {
            VoterId::parse(&value).map_err(|_| {
                RepoError::InvalidData(format!("invalid grader `{value}` in submissions.graded_by"))
            })
        })
        .transpose()?;

    let submission = Submission {
        id: parse_uuid(&uuid_text, "submissions.uuid")?,
        owner,
        category: row.get("category_id")?,
        rating: row.get("rating")?,
        qualification,
        created_at: row.get("created_at")?,
        graded_by,
        graded_at: row.get("graded_at")?,
    };
    submission.validate()?;
    Ok(submission)
}

fn qualification_to_db(qualification: Qualification) -> &'static str {
    match qualification {
        Qualification::Pending => "pending",
        Qualification::Approved => "approved",
        Qualification::Disqualified => "disqualified",
    }
}

fn parse_qualification(value: &str) -> Option<Qualification> {
    match value {
        "pending" => Some(Qualification::Pending),
        "approved" => Some(Qualification::Approved),
        "disqualified" => Some(Qualification::Disqualified),
        _ => None,
    }
}
