//! Edge case tests for concurrency, store failures and tally limits
//!
//! Covers:
//! - Concurrent submissions by one voter and by many voters
//! - Registration races
//! - Half-applied and rejected ballot inserts
//! - Paginated tally over large vote sets, page failures and budgets
//! - Role gating on every administrative operation

use std::sync::Arc;
use std::time::Duration;
use student_vote::{
    ElectionContext, Error, Result,
    config::ElectionConfig,
    election::{BallotSession, Selection},
    store::{BallotStore, FlagCache, MemoryFlags, MemoryStore, StoreFault},
    types::{Candidate, CandidateId, Category, CategoryId, Identity, VoteEntry, Voter},
    validation_error,
};
use uuid::Uuid;

const ADMIN: &str = "registrar";

async fn seed_catalog(ctx: &ElectionContext) -> Result<(CategoryId, Vec<CandidateId>)> {
    let admin = Identity::admin(ADMIN);
    let category = ctx
        .create_category(&admin, Category::new("President", "", 1))
        .await?;
    let mut candidates = Vec::new();
    for name in ["Alice", "Bob", "Carol"] {
        let candidate = ctx
            .create_candidate(&admin, Candidate::new(name, category.id, "SHS 3"))
            .await?;
        candidates.push(candidate.id);
    }
    Ok((category.id, candidates))
}

/// Write `count` single-category ballots straight into the store
async fn bulk_votes(
    store: &MemoryStore,
    category: CategoryId,
    candidates: &[CandidateId],
    count: usize,
) -> Result<()> {
    for i in 0..count {
        let student_id = format!("B{i:05}");
        store
            .insert_voter(Voter::new(&student_id, format!("Bulk {i}")))
            .await?;
        let candidate = candidates[i % candidates.len()];
        store
            .insert_ballot(vec![VoteEntry::new(&student_id, category, candidate)])
            .await?;
    }
    Ok(())
}

fn config_with(page_size: usize, max_pages: usize, timeout_seconds: u64) -> ElectionConfig {
    ElectionConfig {
        tally_page_size: page_size,
        tally_max_pages: max_pages,
        tally_timeout_seconds: timeout_seconds,
        ..ElectionConfig::for_testing()
    }
}

// =============================================================================
// CONCURRENT SUBMISSION TESTS
// =============================================================================

#[tokio::test]
async fn test_concurrent_submissions_by_one_voter() -> Result<()> {
    println!("🏁 Testing concurrent submissions by one voter...");
    let ctx = Arc::new(ElectionContext::for_testing()?);
    let (category, candidates) = seed_catalog(&ctx).await?;
    let student = ctx.register_voter("S1", "Ama").await?;

    let mut handles = Vec::new();
    for i in 0..10 {
        let ctx = ctx.clone();
        let student = student.clone();
        let pick = candidates[i % candidates.len()];
        let handle = tokio::spawn(async move {
            let mut ballot = BallotSession::new("S1");
            ballot.select_candidate(category, pick);
            ctx.submit_ballot(&student, &mut ballot).await
        });
        handles.push(handle);
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle
            .await
            .map_err(|e| validation_error!("Task failed: {}", e))?
        {
            Ok(_) => accepted += 1,
            Err(Error::AlreadyVoted { .. }) => rejected += 1,
            Err(other) => return Err(other),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(rejected, 9);
    assert_eq!(ctx.store().vote_row_count()?, 1);
    println!("✅ Exactly one ballot recorded, {} rejected", rejected);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_submissions_by_many_voters() -> Result<()> {
    let ctx = Arc::new(ElectionContext::for_testing()?);
    let (category, candidates) = seed_catalog(&ctx).await?;

    let mut handles = Vec::new();
    for i in 0..50 {
        let ctx = ctx.clone();
        let pick = candidates[i % candidates.len()];
        handles.push(tokio::spawn(async move {
            let student = ctx.register_voter(&format!("S{i}"), &format!("Student {i}")).await?;
            let mut ballot = ctx.start_ballot(&student).await?;
            ballot.select_candidate(category, pick);
            ctx.submit_ballot(&student, &mut ballot).await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| validation_error!("Task failed: {}", e))??;
    }

    let tally = ctx.compute_tally(&Identity::admin(ADMIN)).await?;
    assert_eq!(tally.total_voters, 50);
    assert_eq!(tally.total_entries, 50);
    assert_eq!(tally.votes_for(candidates[0]), 17);
    assert_eq!(tally.votes_for(candidates[1]), 17);
    assert_eq!(tally.votes_for(candidates[2]), 16);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_registration_of_one_student() -> Result<()> {
    let ctx = Arc::new(ElectionContext::for_testing()?);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            ctx.register_voter("S1", "Ama").await
        }));
    }
    for handle in handles {
        let identity = handle
            .await
            .map_err(|e| validation_error!("Task failed: {}", e))??;
        assert_eq!(identity, Identity::student("S1"));
    }

    let voter = ctx.store().find_voter("S1").await?.expect("registered");
    assert_eq!(voter.class_level, "Unknown");
    assert!(!voter.has_voted);

    Ok(())
}

// =============================================================================
// STORE FAILURE TESTS
// =============================================================================

#[tokio::test]
async fn test_rejected_insert_leaves_voter_able_to_retry() -> Result<()> {
    let ctx = ElectionContext::for_testing()?;
    let (category, candidates) = seed_catalog(&ctx).await?;
    let student = ctx.register_voter("S1", "Ama").await?;

    ctx.store().inject_fault(StoreFault::RejectBallotInsert)?;

    let mut ballot = ctx.start_ballot(&student).await?;
    ballot.select_candidate(category, candidates[0]);
    let err = ctx
        .submit_ballot(&student, &mut ballot)
        .await
        .expect_err("insert should fail");
    assert!(err.is_retriable());
    assert!(!ballot.is_submitted());
    assert!(ctx.voter_status(&student).await?.can_vote());

    // Same session retries with its selection intact
    ctx.submit_ballot(&student, &mut ballot).await?;
    assert!(ballot.is_submitted());

    Ok(())
}

#[tokio::test]
async fn test_partial_insert_is_reported() -> Result<()> {
    println!("🚨 Testing half-applied ballot detection...");
    let ctx = ElectionContext::for_testing()?;
    let admin = Identity::admin(ADMIN);
    let mut selection = Selection::new();
    for (order, name) in ["President", "Secretary", "Treasurer"].iter().enumerate() {
        let category = ctx
            .create_category(&admin, Category::new(*name, "", order as i32))
            .await?;
        let candidate = ctx
            .create_candidate(&admin, Candidate::new(format!("{name} hopeful"), category.id, "SHS 2"))
            .await?;
        selection.insert(category.id, candidate.id);
    }
    let student = ctx.register_voter("S1", "Ama").await?;
    ctx.store()
        .inject_fault(StoreFault::PartialBallotInsert { landed: 2 })?;

    let mut ballot = ctx.start_ballot(&student).await?;
    for (category, candidate) in &selection {
        ballot.select_candidate(*category, *candidate);
    }

    match ctx.submit_ballot(&student, &mut ballot).await {
        Err(Error::PartialBallot {
            student_id,
            landed,
            expected,
        }) => {
            assert_eq!(student_id, "S1");
            assert_eq!(landed, 2);
            assert_eq!(expected, 3);
        }
        other => panic!("Expected partial ballot, got {other:?}"),
    }
    assert!(!ctx.flags().voted_hint("S1")?);
    println!("✅ Partial ballot surfaced, device marker untouched");

    // Half-written rows never reach the tally
    let tally = ctx.compute_tally(&admin).await?;
    assert_eq!(tally.total_entries, 0);
    assert_eq!(tally.total_voters, 0);

    // The voter is told they may vote, and a retry of the same ballot works
    assert!(ctx.voter_status(&student).await?.can_vote());
    assert!(!ballot.is_submitted());
    let receipt = ctx.submit_ballot(&student, &mut ballot).await?;
    assert_eq!(receipt.entries.len(), 3);

    let tally = ctx.compute_tally(&admin).await?;
    assert_eq!(tally.total_entries, 3);
    assert_eq!(tally.total_voters, 1);
    println!("✅ Retry after partial ballot recorded a complete ballot");

    Ok(())
}

// =============================================================================
// TALLY PAGINATION TESTS
// =============================================================================

#[tokio::test]
async fn test_paginated_tally_matches_single_read() -> Result<()> {
    println!("📄 Testing tally across page boundaries...");
    let store = Arc::new(MemoryStore::new());
    let flags: Arc<dyn FlagCache> = Arc::new(MemoryFlags::new());
    let paged = ElectionContext::new(store.clone(), flags.clone(), config_with(1000, 100, 30))?;
    let single = ElectionContext::new(store.clone(), flags, config_with(10_000, 100, 30))?;
    let admin = Identity::admin(ADMIN);

    let (category, candidates) = seed_catalog(&paged).await?;
    bulk_votes(&store, category, &candidates, 2500).await?;

    let paged_tally = paged.compute_tally(&admin).await?;
    let single_tally = single.compute_tally(&admin).await?;

    assert_eq!(paged_tally.total_entries, 2500);
    assert_eq!(paged_tally.total_voters, 2500);
    assert_eq!(paged_tally.per_candidate, single_tally.per_candidate);
    assert_eq!(paged_tally.total_voters, single_tally.total_voters);
    // 1000 + 1000 + 500 + the terminating empty page
    assert_eq!(paged_tally.pages_read, 4);
    assert_eq!(single_tally.pages_read, 2);
    println!(
        "✅ {} rows over {} pages match a single read",
        paged_tally.total_entries, paged_tally.pages_read
    );

    Ok(())
}

#[tokio::test]
async fn test_exact_page_multiple() -> Result<()> {
    let ctx = ElectionContext::in_memory(config_with(10, 100, 30))?;
    let (category, candidates) = seed_catalog(&ctx).await?;
    bulk_votes(ctx.store(), category, &candidates, 30).await?;

    let tally = ctx.compute_tally(&Identity::admin(ADMIN)).await?;
    assert_eq!(tally.total_entries, 30);
    assert_eq!(tally.pages_read, 4);

    Ok(())
}

#[tokio::test]
async fn test_failed_page_aborts_tally() -> Result<()> {
    let ctx = ElectionContext::in_memory(config_with(1000, 100, 30))?;
    let (category, candidates) = seed_catalog(&ctx).await?;
    bulk_votes(ctx.store(), category, &candidates, 2500).await?;
    ctx.store()
        .inject_fault(StoreFault::VotePageFailure { offset: 1000 })?;

    let admin = Identity::admin(ADMIN);
    let err = ctx
        .compute_tally(&admin)
        .await
        .expect_err("page failure should abort");
    assert!(matches!(err, Error::Store { .. }));
    assert!(err.is_retriable());

    // No partial report either
    assert!(ctx.results(&admin).await.is_err());

    ctx.store().clear_faults()?;
    assert_eq!(ctx.compute_tally(&admin).await?.total_entries, 2500);

    Ok(())
}

#[tokio::test]
async fn test_page_budget_exhaustion() -> Result<()> {
    let ctx = ElectionContext::in_memory(config_with(10, 3, 30))?;
    let (category, candidates) = seed_catalog(&ctx).await?;
    bulk_votes(ctx.store(), category, &candidates, 50).await?;

    match ctx.compute_tally(&Identity::admin(ADMIN)).await {
        Err(Error::TallyIncomplete { pages_read, .. }) => assert_eq!(pages_read, 3),
        other => panic!("Expected incomplete tally, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_tally_time_budget() -> Result<()> {
    println!("⏱️ Testing tally time budget...");
    let ctx = ElectionContext::in_memory(config_with(10, 100, 1))?;
    let (category, candidates) = seed_catalog(&ctx).await?;
    bulk_votes(ctx.store(), category, &candidates, 20).await?;
    ctx.store().inject_fault(StoreFault::SlowVotePages {
        delay: Duration::from_millis(600),
    })?;

    let err = ctx
        .compute_tally(&Identity::admin(ADMIN))
        .await
        .expect_err("tally should time out");
    assert!(matches!(err, Error::TallyIncomplete { .. }));
    assert!(err.is_retriable());
    println!("✅ Slow tally reported incomplete");

    Ok(())
}

#[tokio::test]
async fn test_invalid_config_is_refused() {
    assert!(ElectionContext::in_memory(config_with(0, 100, 30)).is_err());
    assert!(ElectionContext::in_memory(config_with(10, 0, 30)).is_err());
    assert!(ElectionContext::in_memory(config_with(10, 100, 0)).is_err());
}

// =============================================================================
// ROLE AND IDENTITY TESTS
// =============================================================================

#[tokio::test]
async fn test_students_are_refused_admin_operations() -> Result<()> {
    let ctx = ElectionContext::for_testing()?;
    let (category, candidates) = seed_catalog(&ctx).await?;
    let student = ctx.register_voter("S1", "Ama").await?;
    let archive_id = Uuid::new_v4();

    let outcomes = vec![
        ctx.create_category(&student, Category::new("X", "", 9)).await.err(),
        ctx.delete_category(&student, category).await.err(),
        ctx.delete_candidate(&student, candidates[0]).await.err(),
        ctx.compute_tally(&student).await.err(),
        ctx.results(&student).await.err(),
        ctx.dashboard(&student).await.err(),
        ctx.archive_results(&student, "Sneaky").await.err(),
        ctx.list_archives(&student).await.err(),
        ctx.get_archive(&student, archive_id).await.err(),
        ctx.delete_archive(&student, archive_id).await.err(),
        ctx.reset_votes(&student, "RESET ALL VOTES").await.err(),
    ];
    for outcome in outcomes {
        assert!(matches!(outcome, Some(Error::Unauthorized { .. })));
    }

    // Nothing changed
    assert_eq!(ctx.catalog().await?.candidate_count(), 3);

    Ok(())
}

#[tokio::test]
async fn test_sign_in_checks_name() -> Result<()> {
    let ctx = ElectionContext::for_testing()?;
    ctx.register_voter("S1", "Ama Mensah").await?;

    let wrong = ctx.register_voter("S1", "Kofi Boateng").await;
    match wrong {
        Err(Error::Unauthorized { message }) => {
            assert!(message.contains("Invalid student ID or name"));
        }
        other => panic!("Expected unauthorized, got {other:?}"),
    }

    // Surrounding whitespace is ignored
    assert!(ctx.register_voter("  S1 ", " Ama Mensah ").await.is_ok());

    for (id, name) in [("", "Ama"), ("S2", "   "), ("  ", "")] {
        assert!(matches!(
            ctx.register_voter(id, name).await,
            Err(Error::Validation { .. })
        ));
    }

    Ok(())
}

#[tokio::test]
async fn test_unknown_archive_and_voter() -> Result<()> {
    let ctx = ElectionContext::for_testing()?;
    let admin = Identity::admin(ADMIN);

    let missing = ctx.get_archive(&admin, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(Error::NotFound { .. })));

    let ghost = Identity::student("S404");
    assert!(matches!(
        ctx.start_ballot(&ghost).await,
        Err(Error::NotFound { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_empty_catalog_cannot_be_voted() -> Result<()> {
    let ctx = ElectionContext::for_testing()?;
    let student = ctx.register_voter("S1", "Ama").await?;
    let mut ballot = ctx.start_ballot(&student).await?;

    let result = ctx.submit_ballot(&student, &mut ballot).await;
    assert!(matches!(result, Err(Error::Validation { .. })));
    assert!(!ballot.is_complete(&ctx.catalog().await?));

    Ok(())
}
