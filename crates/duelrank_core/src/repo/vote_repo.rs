//! Vote ledger repository contract and SQLite implementation.
//!
//! # Invariants
//! - Votes are never updated in place.
//! - Replay reads come back in `cast_at ASC, id ASC` order.
//! - Appends and deletions are crate-private.

use super::{ensure_ledger_ready, parse_uuid, placeholders, RepoError, RepoResult};
use crate::model::{NewVote, SubmissionId, Vote, VoteId, VoterId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const VOTE_SELECT_SQL: &str = "SELECT id, voter_id, winner_uuid, loser_uuid, cast_at FROM votes";

/// Storage contract for the vote ledger.
pub trait VoteRepository {
    fn get_vote(&self, id: VoteId) -> RepoResult<Option<Vote>>;
    /// Returns this voter's vote on the pair in either orientation.
    fn find_vote_for_pair(
        &self,
        voter: &VoterId,
        a: SubmissionId,
        b: SubmissionId,
    ) -> RepoResult<Option<Vote>>;
    fn list_votes_by_voter(&self, voter: &VoterId) -> RepoResult<Vec<Vote>>;
    fn list_votes_for_submission(&self, id: SubmissionId) -> RepoResult<Vec<Vote>>;
    fn count_votes_for_submission(&self, id: SubmissionId) -> RepoResult<u64>;
    /// Votes referencing any of `targets`, minus `excluded`, in replay order.
    fn list_votes_touching(
        &self,
        targets: &[SubmissionId],
        excluded: &[VoteId],
    ) -> RepoResult<Vec<Vote>>;
}

/// SQLite-backed vote ledger.
pub struct SqliteVoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVoteRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_ledger_ready(conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Appends one decision and returns the stored row.
    pub(crate) fn insert_vote(&self, vote: &NewVote) -> RepoResult<Vote> {
        self.conn.execute(
            "INSERT INTO votes (voter_id, winner_uuid, loser_uuid, cast_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                vote.voter.as_str(),
                vote.winner.to_string(),
                vote.loser.to_string(),
                vote.cast_at,
            ],
        )?;
        Ok(Vote {
            id: self.conn.last_insert_rowid(),
            voter: vote.voter.clone(),
            winner: vote.winner,
            loser: vote.loser,
            cast_at: vote.cast_at,
        })
    }

    /// Deletes the given rows and returns how many existed.
    pub(crate) fn delete_votes(&self, ids: &[VoteId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!("DELETE FROM votes WHERE id IN ({});", placeholders(ids.len()));
        let deleted = self.conn.execute(&sql, params_from_iter(ids.iter()))?;
        Ok(deleted)
    }

    fn query_votes(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Vote>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut votes = Vec::new();
        while let Some(row) = rows.next()? {
            votes.push(parse_vote_row(row)?);
        }
        Ok(votes)
    }
}

impl VoteRepository for SqliteVoteRepository<'_> {
    fn get_vote(&self, id: VoteId) -> RepoResult<Option<Vote>> {
        let mut votes = self.query_votes(
            &format!("{VOTE_SELECT_SQL} WHERE id = ?;"),
            vec![Value::Integer(id)],
        )?;
        Ok(votes.pop())
    }

    fn find_vote_for_pair(
        &self,
        voter: &VoterId,
        a: SubmissionId,
        b: SubmissionId,
    ) -> RepoResult<Option<Vote>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VOTE_SELECT_SQL}
             WHERE voter_id = ?1
               AND (
                 (winner_uuid = ?2 AND loser_uuid = ?3)
                 OR (winner_uuid = ?3 AND loser_uuid = ?2)
               )
             ORDER BY id ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![voter.as_str(), a.to_string(), b.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_vote_row(row)?));
        }
        Ok(None)
    }

    fn list_votes_by_voter(&self, voter: &VoterId) -> RepoResult<Vec<Vote>> {
        self.query_votes(
            &format!("{VOTE_SELECT_SQL} WHERE voter_id = ? ORDER BY cast_at ASC, id ASC;"),
            vec![Value::Text(voter.as_str().to_string())],
        )
    }

    fn list_votes_for_submission(&self, id: SubmissionId) -> RepoResult<Vec<Vote>> {
        self.list_votes_touching(&[id], &[])
    }

    fn count_votes_for_submission(&self, id: SubmissionId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM votes WHERE winner_uuid = ?1 OR loser_uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }

    fn list_votes_touching(
        &self,
        targets: &[SubmissionId],
        excluded: &[VoteId],
    ) -> RepoResult<Vec<Vote>> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let target_list = placeholders(targets.len());
        let mut sql = format!(
            "{VOTE_SELECT_SQL}
             WHERE (winner_uuid IN ({target_list}) OR loser_uuid IN ({target_list}))"
        );
        let target_values: Vec<Value> = targets
            .iter()
            .map(|id| Value::Text(id.to_string()))
            .collect();
        let mut bind_values = target_values.clone();
        bind_values.extend(target_values);

        if !excluded.is_empty() {
            sql.push_str(&format!(" AND id NOT IN ({})", placeholders(excluded.len())));
            bind_values.extend(excluded.iter().map(|id| Value::Integer(*id)));
        }
        sql.push_str(" ORDER BY cast_at ASC, id ASC;");

        self.query_votes(&sql, bind_values)
    }
}

fn parse_vote_row(row: &Row<'_>) -> RepoResult<Vote> {
    let voter_text: String = row.get("voter_id")?;
    let voter = VoterId::parse(&voter_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid voter `{voter_text}` in votes.voter_id"))
    })?;
    let winner_text: String = row.get("winner_uuid")?;
    let loser_text: String = row.get("loser_uuid")?;

    Ok(Vote {
        id: row.get("id")?,
        voter,
        winner: parse_uuid(&winner_text, "votes.winner_uuid")?,
        loser: parse_uuid(&loser_text, "votes.loser_uuid")?,
        cast_at: row.get("cast_at")?,
    })
}
