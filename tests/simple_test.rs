//! Simple test to verify compilation and basic functionality

use student_vote::{
    ElectionContext, Result,
    config::{Config, RESET_CONFIRMATION_PHRASE},
    election::percentage,
    integrity::IntegrityUtils,
    types::{Candidate, Category, Identity},
};

#[tokio::test]
async fn test_basic_compilation() -> Result<()> {
    println!("🔧 Testing basic compilation and functionality...");

    // Test configuration
    let config = Config::for_testing()?;
    assert!(config.election.tally_page_size > 0);
    assert_eq!(config.election.reset_phrase, RESET_CONFIRMATION_PHRASE);
    println!("✅ Configuration works");

    // Test percentage rounding
    assert_eq!(percentage(1, 3), 33);
    assert_eq!(percentage(2, 3), 67);
    assert_eq!(percentage(1, 2), 50);
    assert_eq!(percentage(0, 0), 0);
    println!("✅ Percentage rounding works");

    // Test integrity helpers
    let hash = IntegrityUtils::hash(b"ballot");
    let hex = IntegrityUtils::hash_to_hex(&hash);
    assert_eq!(IntegrityUtils::hex_to_hash(&hex)?, hash);
    println!("✅ Integrity helpers work");

    // Test a minimal election
    let ctx = ElectionContext::in_memory(config.election)?;
    let admin = Identity::admin("registrar");
    let president = ctx
        .create_category(&admin, Category::new("President", "Leads the council", 1))
        .await?;
    let alice = ctx
        .create_candidate(&admin, Candidate::new("Alice", president.id, "SHS 3"))
        .await?;

    let student = ctx.register_voter("S1", "Ama").await?;
    let mut ballot = ctx.start_ballot(&student).await?;
    ballot.select_candidate(president.id, alice.id);
    let receipt = ctx.submit_ballot(&student, &mut ballot).await?;
    assert_eq!(receipt.entries.len(), 1);
    println!("✅ Ballot submission works");

    let report = ctx.results(&admin).await?;
    assert_eq!(report.total_voters, 1);
    assert_eq!(report.categories[0].candidates[0].percentage, 100);
    println!("✅ Tally works");

    println!("🎉 All basic functionality verified!");
    Ok(())
}

#[test]
fn test_reset_phrase_gate_blocking() {
    let ctx = tokio_test::assert_ok!(ElectionContext::for_testing());
    let admin = Identity::admin("registrar");

    tokio_test::assert_err!(tokio_test::block_on(
        ctx.reset_votes(&admin, "reset all votes")
    ));
    let report = tokio_test::assert_ok!(tokio_test::block_on(
        ctx.reset_votes(&admin, RESET_CONFIRMATION_PHRASE)
    ));
    assert_eq!(report.votes_removed, 0);
}

#[test]
fn test_logging_config_drives_init() -> Result<()> {
    let config = Config::for_testing()?;
    student_vote::init_with(&config.logging)?;

    // The global subscriber can only be installed once
    assert!(student_vote::init_with(&config.logging).is_err());
    Ok(())
}
