use duelrank_core::db::open_db_in_memory;
use duelrank_core::{
    NewSubmission, PairSelector, Qualification, SqliteSubmissionRepository,
    SqliteVoteRepository, Submission, SubmissionRepository, UnorderedPair, VoteRecorder,
    VoterId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;
use std::collections::HashMap;

#[test]
fn empty_store_offers_nothing() {
    let conn = setup();
    let judge = voter("x@example.com");

    let selector = selector(&conn);
    assert!(selector.request_pair(&judge).unwrap().is_none());
    assert!(!selector.can_vote(&judge).unwrap());
    assert_eq!(selector.eligible_pair_count(&judge).unwrap(), 0);
}

#[test]
fn pair_never_crosses_categories() {
    let conn = setup();
    let judge = voter("x@example.com");
    submit(&conn, "a@example.com", 1);
    submit(&conn, "b@example.com", 2);

    let selector = selector(&conn);
    assert!(selector.request_pair(&judge).unwrap().is_none());

    let c = submit(&conn, "c@example.com", 2);
    let mut rng = StdRng::seed_from_u64(3);
    let pair = selector
        .request_pair_with_rng(&judge, &mut rng)
        .unwrap()
        .unwrap();
    assert_eq!(pair.category(), 2);
    assert_eq!(pair.first.category, pair.second.category);
    assert!(pair.first.id == c.id || pair.second.id == c.id);
}

#[test]
fn own_and_disqualified_submissions_are_never_offered() {
    let conn = setup();
    let judge = voter("x@example.com");
    let own = submit(&conn, "x@example.com", 1);
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);
    let banned = submit(&conn, "c@example.com", 1);
    SqliteSubmissionRepository::try_new(&conn)
        .unwrap()
        .set_qualification(
            banned.id,
            Qualification::Disqualified,
            &voter("grader@example.com"),
            1,
        )
        .unwrap();

    let selector = selector(&conn);
    assert_eq!(selector.eligible_pair_count(&judge).unwrap(), 1);

    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..50 {
        let pair = selector
            .request_pair_with_rng(&judge, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(pair.key(), UnorderedPair::new(a.id, b.id));
        for side in [&pair.first, &pair.second] {
            assert_ne!(side.id, own.id);
            assert_ne!(side.id, banned.id);
        }
    }
}

#[test]
fn judged_pairs_are_not_offered_again() {
    let conn = setup();
    let judge = voter("x@example.com");
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);
    let c = submit(&conn, "c@example.com", 1);
    let selector = selector(&conn);
    assert_eq!(selector.eligible_pair_count(&judge).unwrap(), 3);

    VoteRecorder::new(&conn)
        .record_vote_at(&judge, b.id, a.id, 1)
        .unwrap();

    assert_eq!(selector.eligible_pair_count(&judge).unwrap(), 2);
    let judged = UnorderedPair::new(a.id, b.id);
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..100 {
        let pair = selector
            .request_pair_with_rng(&judge, &mut rng)
            .unwrap()
            .unwrap();
        assert_ne!(pair.key(), judged);
        assert!(pair.first.id == c.id || pair.second.id == c.id);
    }
}

#[test]
fn other_voters_votes_do_not_hide_pairs() {
    let conn = setup();
    let a = submit(&conn, "a@example.com", 1);
    let b = submit(&conn, "b@example.com", 1);

    VoteRecorder::new(&conn)
        .record_vote_at(&voter("y@example.com"), a.id, b.id, 1)
        .unwrap();

    let selector = selector(&conn);
    assert!(selector.can_vote(&voter("x@example.com")).unwrap());
    assert!(!selector.can_vote(&voter("y@example.com")).unwrap());
}

#[test]
fn selection_is_uniform_across_categories_of_different_sizes() {
    let conn = setup();
    let judge = voter("x@example.com");
    // Category 1 holds 3 pairs, category 2 holds 1: each of the 4 pairs
    // must come up a quarter of the time.
    for owner in ["a", "b", "c"] {
        submit(&conn, &format!("{owner}@example.com"), 1);
    }
    for owner in ["d", "e"] {
        submit(&conn, &format!("{owner}@example.com"), 2);
    }

    let selector = selector(&conn);
    let mut rng = StdRng::seed_from_u64(2024);
    let mut counts: HashMap<UnorderedPair, u32> = HashMap::new();
    for _ in 0..8000 {
        let pair = selector
            .request_pair_with_rng(&judge, &mut rng)
            .unwrap()
            .unwrap();
        *counts.entry(pair.key()).or_default() += 1;
    }

    assert_eq!(counts.len(), 4);
    for count in counts.values() {
        assert!((1800..=2200).contains(count), "skewed count {count}");
    }
}

#[test]
fn selection_stays_uniform_after_most_pairs_are_judged() {
    let conn = setup();
    let judge = voter("x@example.com");
    let members: Vec<Submission> = (0..6)
        .map(|index| submit(&conn, &format!("owner{index}@example.com"), 1))
        .collect();

    // Judge every pair except three.
    let keep = [(0, 5), (1, 3), (2, 4)];
    let recorder = VoteRecorder::new(&conn);
    let mut cast_at = 0;
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            if keep.contains(&(i, j)) {
                continue;
            }
            cast_at += 1;
            recorder
                .record_vote_at(&judge, members[i].id, members[j].id, cast_at)
                .unwrap();
        }
    }

    let selector = selector(&conn);
    assert_eq!(selector.eligible_pair_count(&judge).unwrap(), 3);
    let mut rng = StdRng::seed_from_u64(77);
    let mut counts: HashMap<UnorderedPair, u32> = HashMap::new();
    for _ in 0..6000 {
        let pair = selector
            .request_pair_with_rng(&judge, &mut rng)
            .unwrap()
            .unwrap();
        *counts.entry(pair.key()).or_default() += 1;
    }

    assert_eq!(counts.len(), 3);
    for (i, j) in keep {
        let count = counts[&UnorderedPair::new(members[i].id, members[j].id)];
        assert!((1800..=2200).contains(&count), "skewed count {count}");
    }
}

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn selector(
    conn: &Connection,
) -> PairSelector<SqliteSubmissionRepository<'_>, SqliteVoteRepository<'_>> {
    PairSelector::new(
        SqliteSubmissionRepository::try_new(conn).unwrap(),
        SqliteVoteRepository::try_new(conn).unwrap(),
    )
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
