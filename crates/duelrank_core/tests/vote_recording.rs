use duelrank_core::db::{open_db, open_db_in_memory};
use duelrank_core::rating::apply_win;
use duelrank_core::{
    EngineError, InvalidArgument, MissingRef, NewSubmission, Qualification,
    SqliteSubmissionRepository, SqliteVoteRepository, Submission, SubmissionId,
    SubmissionRepository, VoteOutcome, VoteRecorder, VoteRepository, VoterId,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

#[test]
fn first_vote_moves_both_ratings_by_sixteen() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);

    let outcome = VoteRecorder::new(&conn)
        .record_vote_at(&voter("x@example.com"), a.id, b.id, 100)
        .unwrap();

    match outcome {
        VoteOutcome::Recorded {
            winner_rating,
            loser_rating,
            ..
        } => {
            assert_eq!(winner_rating, 1016.0);
            assert_eq!(loser_rating, 984.0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(rating(&conn, a.id), 1016.0);
    assert_eq!(rating(&conn, b.id), 984.0);

    let vote = SqliteVoteRepository::try_new(&conn)
        .unwrap()
        .get_vote(outcome.vote_id())
        .unwrap()
        .unwrap();
    assert_eq!(vote.winner, a.id);
    assert_eq!(vote.loser, b.id);
    assert_eq!(vote.cast_at, 100);
    assert_eq!(vote.voter.as_str(), "x@example.com");
}

#[test]
fn repeated_vote_is_absorbed_in_either_orientation() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);
    let recorder = VoteRecorder::new(&conn);
    let judge = voter("x@example.com");

    let first = recorder.record_vote_at(&judge, a.id, b.id, 1).unwrap();
    let same = recorder.record_vote_at(&judge, a.id, b.id, 2).unwrap();
    let flipped = recorder.record_vote_at(&judge, b.id, a.id, 3).unwrap();

    assert!(first.is_new());
    assert_eq!(
        same,
        VoteOutcome::AlreadyRecorded {
            vote_id: first.vote_id()
        }
    );
    assert_eq!(flipped.vote_id(), first.vote_id());
    assert!(!flipped.is_new());
    assert_eq!(rating(&conn, a.id), 1016.0);
    assert_eq!(rating(&conn, b.id), 984.0);
    assert_eq!(vote_count(&conn), 1);
}

#[test]
fn voter_identity_is_normalized_for_duplicates() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);
    let recorder = VoteRecorder::new(&conn);

    recorder
        .record_vote_at(&voter("X@Example.com"), a.id, b.id, 1)
        .unwrap();
    let again = recorder
        .record_vote_at(&voter("  x@example.com "), b.id, a.id, 2)
        .unwrap();

    assert!(!again.is_new());
    assert_eq!(vote_count(&conn), 1);
}

#[test]
fn different_voters_may_judge_the_same_pair() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);
    let recorder = VoteRecorder::new(&conn);

    recorder
        .record_vote_at(&voter("x@example.com"), a.id, b.id, 1)
        .unwrap();
    let second = recorder
        .record_vote_at(&voter("y@example.com"), b.id, a.id, 2)
        .unwrap();

    let expected = apply_win(984.0, 1016.0);
    assert!(second.is_new());
    assert_eq!(rating(&conn, b.id), expected.winner);
    assert_eq!(rating(&conn, a.id), expected.loser);
    assert_eq!(vote_count(&conn), 2);
}

#[test]
fn votes_are_counted_per_submission() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);
    let c = submit(&conn, "c@example.com", 1);
    let recorder = VoteRecorder::new(&conn);
    recorder
        .record_vote_at(&voter("x@example.com"), a.id, b.id, 1)
        .unwrap();
    recorder
        .record_vote_at(&voter("x@example.com"), c.id, a.id, 2)
        .unwrap();

    let votes = SqliteVoteRepository::try_new(&conn).unwrap();
    assert_eq!(votes.count_votes_for_submission(a.id).unwrap(), 2);
    assert_eq!(votes.count_votes_for_submission(b.id).unwrap(), 1);
    assert_eq!(votes.count_votes_for_submission(Uuid::new_v4()).unwrap(), 0);
    assert_eq!(votes.list_votes_for_submission(c.id).unwrap().len(), 1);
}

#[test]
fn missing_submission_is_not_found_and_changes_nothing() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let ghost = Uuid::new_v4();

    let err = VoteRecorder::new(&conn)
        .record_vote_at(&voter("x@example.com"), a.id, ghost, 1)
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::NotFound(MissingRef::Submission(id)) if id == ghost
    ));
    assert_eq!(rating(&conn, a.id), 1000.0);
    assert_eq!(vote_count(&conn), 0);
}

#[test]
fn self_comparison_is_invalid() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);

    let err = VoteRecorder::new(&conn)
        .record_vote_at(&voter("x@example.com"), a.id, a.id, 1)
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::InvalidArgument(InvalidArgument::SelfComparison(id)) if id == a.id
    ));
    assert_eq!(vote_count(&conn), 0);
}

#[test]
fn cross_category_pair_is_invalid() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 2);

    let err = VoteRecorder::new(&conn)
        .record_vote_at(&voter("x@example.com"), a.id, b.id, 1)
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::InvalidArgument(InvalidArgument::CrossCategory { .. })
    ));
    assert_eq!(rating(&conn, a.id), 1000.0);
    assert_eq!(rating(&conn, b.id), 1000.0);
}

#[test]
fn disqualified_side_is_invalid() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);
    SqliteSubmissionRepository::try_new(&conn)
        .unwrap()
        .set_qualification(
            b.id,
            Qualification::Disqualified,
            &voter("grader@example.com"),
            1,
        )
        .unwrap();

    let err = VoteRecorder::new(&conn)
        .record_vote_at(&voter("x@example.com"), a.id, b.id, 1)
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::InvalidArgument(InvalidArgument::Disqualified(id)) if id == b.id
    ));
    assert_eq!(vote_count(&conn), 0);
}

#[test]
fn own_submission_is_invalid() {
    let conn = setup();
    let a = submit(&conn, "x@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);

    let err = VoteRecorder::new(&conn)
        .record_vote_at(&voter("x@example.com"), b.id, a.id, 1)
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::InvalidArgument(InvalidArgument::OwnSubmission(id)) if id == a.id
    ));
}

#[test]
fn wall_clock_votes_are_stamped() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);

    let outcome = VoteRecorder::new(&conn)
        .record_vote(&voter("x@example.com"), a.id, b.id)
        .unwrap();

    let vote = SqliteVoteRepository::try_new(&conn)
        .unwrap()
        .get_vote(outcome.vote_id())
        .unwrap()
        .unwrap();
    assert!(vote.cast_at > 0);
}

#[test]
fn concurrent_votes_on_one_pair_apply_both_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let conn = open_db(&path).unwrap();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);

    let outcomes = race(&path, 2, move |index| {
        (voter(&format!("judge{index}@example.com")), a.id, b.id)
    });

    assert!(outcomes.iter().all(VoteOutcome::is_new));
    let first = apply_win(1000.0, 1000.0);
    let second = apply_win(first.winner, first.loser);
    assert_eq!(rating(&conn, a.id), second.winner);
    assert_eq!(rating(&conn, b.id), second.loser);
    assert_eq!(vote_count(&conn), 2);
}

#[test]
fn concurrent_duplicates_record_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let conn = open_db(&path).unwrap();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);

    let outcomes = race(&path, 4, move |index| {
        let (winner, loser) = if index % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
        (voter("x@example.com"), winner, loser)
    });

    assert_eq!(outcomes.iter().filter(|o| o.is_new()).count(), 1);
    let recorded = outcomes[0].vote_id();
    assert!(outcomes.iter().all(|o| o.vote_id() == recorded));
    assert_eq!(vote_count(&conn), 1);
    assert_eq!(rating(&conn, a.id) + rating(&conn, b.id), 2000.0);
}

/// Runs `threads` recorders against the same database file at once.
fn race<F>(path: &Path, threads: usize, request: F) -> Vec<VoteOutcome>
where
    F: Fn(usize) -> (VoterId, SubmissionId, SubmissionId) + Send + Sync + 'static,
{
    let request = Arc::new(request);
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|index| {
            let path = path.to_path_buf();
            let request = Arc::clone(&request);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let (judge, winner, loser) = request(index);
                barrier.wait();
                VoteRecorder::new(&conn)
                    .record_vote_at(&judge, winner, loser, index as i64)
                    .unwrap()
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
}

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn voter(raw: &str) -> VoterId {
    VoterId::parse(raw).unwrap()
}

fn submit(conn: &Connection, owner: &str, category: i64) -> Submission {
    SqliteSubmissionRepository::try_new(conn)
        .unwrap()
        .create_submission(&NewSubmission::new(voter(owner), category))
        .unwrap()
}

fn rating(conn: &Connection, id: SubmissionId) -> f64 {
    SqliteSubmissionRepository::try_new(conn)
        .unwrap()
        .get_submission(id)
        .unwrap()
        .unwrap()
        .rating
}

fn vote_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM votes;", [], |row| row.get(0))
        .unwrap()
}
