//! End-to-end integration tests for the chain harness
//!
//! These tests drive the real `mock_node` binary through the full stack:
//! 1. Resetting the node into a per-test log
//! 2. Creating accounts and deploying the fixture contracts
//! 3. Executing transactions and reading state back from the node

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use chain_harness::accounts::AuthorityMember;
use chain_harness::chain::{Asset, Authority, KeyPair, Name, PermissionLevel, SYSTEM_ACCOUNT};
use chain_harness::common::config::Config;
use chain_harness::scenario::run_scenario;
use chain_harness::{Error, Scenario};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Configuration pointing at the mock node and the fixture contracts
///
/// A block lag of two makes the executor poll before every inclusion.
fn test_config() -> Config {
    let mut config = Config::default();
    config.node.path = PathBuf::from(env!("CARGO_BIN_EXE_mock_node"));
    config.node.args = vec!["--block-lag".to_string(), "2".to_string()];
    config.contracts.dir = fixtures_dir().join("contracts");
    config.timeouts.inclusion_secs = 10;
    config
}

/// A scenario whose node has been reset into a log inside a scratch directory
async fn started(test_name: &str) -> (TempDir, Scenario) {
    chain_harness::common::logging::init_test();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut ctx = Scenario::new(test_config()).expect("Failed to create scenario");
    ctx.reset(dir.path().join(format!("{}.log", test_name)))
        .await
        .expect("Failed to reset node");
    (dir, ctx)
}

fn asset(s: &str) -> Asset {
    s.parse().expect("Invalid asset literal")
}

#[tokio::test]
async fn test_health_check() {
    let (_dir, mut ctx) = started("health").await;
    let info = ctx.health_check().await.unwrap();
    assert!(info.server_version.starts_with("mock-node/"));
    assert!(info.head_block_num >= 1);
    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_burnpool_end_to_end() {
    let (_dir, mut ctx) = started("burnpool").await;
    ctx.scenario(
        "
        Pool and token contracts exist before the MUSDT pair is registered.
        Deposits accumulate in the pair; FFT sent with a symbol memo is burnt.
        ",
    );

    let master = ctx.new_master_account().await.unwrap();
    let oooo = ctx.new_account(&master, "oooo").await.unwrap();
    let admin = ctx.new_account(&master, "admin").await.unwrap();

    let token = ctx.setup_token(None).await.unwrap();
    token.create(&mut ctx, &admin, "1000000000.0000 ENTU").await.unwrap();
    token.issue(&mut ctx, &admin, "1000000.0000 ENTU", "").await.unwrap();
    token.create(&mut ctx, &admin, "1000000000.0000 FFT").await.unwrap();
    token.issue(&mut ctx, &admin, "1000.0000 FFT", "").await.unwrap();

    let mtoken = ctx.setup_token(Some("amax.mtoken")).await.unwrap();
    mtoken.create(&mut ctx, &admin, "1000000000.000000 MUSDT").await.unwrap();
    mtoken.issue(&mut ctx, &admin, "1000.000000 MUSDT", "").await.unwrap();

    let pool = ctx.setup_burnpool(None).await.unwrap();
    pool.set_sym_pair(&mut ctx, "6,MUSDT", &mtoken, "1.0000 FFT")
        .await
        .unwrap();

    ctx.comment("Five deposits of MUSDT");
    for quantity in [
        "6.000000 MUSDT",
        "7.000000 MUSDT",
        "8.000000 MUSDT",
        "9.000000 MUSDT",
        "20.000000 MUSDT",
    ] {
        ctx.transfer(&admin, &pool, quantity, "deposit").await.unwrap();
    }

    let pairs = pool.sym_pairs(&mut ctx).await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["code"], "musdt");
    assert_eq!(pairs[0]["token_quant"], "50.000000 MUSDT");
    assert_eq!(
        ctx.get_balance(&pool, "MUSDT").await.unwrap(),
        asset("50.000000 MUSDT")
    );
    assert_eq!(
        ctx.get_balance(&admin, "MUSDT").await.unwrap(),
        asset("950.000000 MUSDT")
    );

    ctx.comment("Burn FFT against the MUSDT pair");
    let receipt = ctx.transfer(&admin, &pool, "2.0000 FFT", "6,MUSDT").await.unwrap();
    assert_eq!(receipt.actions, vec!["amax.token::transfer".to_string()]);
    assert!(receipt.console.iter().any(|l| l.contains("burn 2.0000 FFT")));

    assert_eq!(ctx.get_balance(&oooo, "FFT").await.unwrap(), asset("2.0000 FFT"));
    assert_eq!(ctx.get_balance(&pool, "FFT").await.unwrap(), asset("0.0000 FFT"));
    assert_eq!(ctx.get_balance(&admin, "FFT").await.unwrap(), asset("998.0000 FFT"));

    let scope = pool.account().to_string();
    let burns = ctx.read_table(pool.account(), &scope, "burns").await.unwrap();
    assert_eq!(burns.len(), 1);
    assert_eq!(burns[0]["quantity"], "2.0000 FFT");
    assert_eq!(burns[0]["from"], "admin");

    let line = ctx
        .log()
        .unwrap()
        .wait_for("burn 2.0000 FFT", Duration::from_secs(5))
        .await
        .unwrap();
    assert!(line.contains("from admin"));

    ctx.stop().await.unwrap();
}

/// Funded factory accounts deposit into the MUSDT pair and burn 8-decimal FFT
#[tokio::test]
async fn test_burnpool_with_factory_accounts() {
    let (_dir, mut ctx) = started("burnpool_factory").await;
    ctx.scenario(
        "
        Create a contract from template, then build and deploy it.
        ",
    );

    let pool = ctx.setup_burnpool(None).await.unwrap();
    assert_eq!(pool.account().as_str(), "entu.burnpool");

    let master = ctx.new_master_account().await.unwrap();
    let oooo = ctx.new_account(&master, "oooo").await.unwrap();
    let token = ctx.setup_token(None).await.unwrap();
    let mtoken = ctx.setup_token(Some("amax.mtoken")).await.unwrap();
    let admin = ctx.new_account(&master, "admin").await.unwrap();

    token.create(&mut ctx, &admin, "1000000000.0000 ENTU").await.unwrap();
    token.issue(&mut ctx, &admin, "800000000.0000 ENTU", "").await.unwrap();
    assert_eq!(
        ctx.get_balance(&admin, "ENTU").await.unwrap(),
        asset("800000000.0000 ENTU")
    );

    token.create(&mut ctx, &admin, "10000000000.00000000 FFT").await.unwrap();
    token.issue(&mut ctx, &admin, "100000.00000000 FFT", "").await.unwrap();
    mtoken.create(&mut ctx, &admin, "1000000000.000000 MUSDT").await.unwrap();
    mtoken.issue(&mut ctx, &admin, "100000.000000 MUSDT", "").await.unwrap();

    pool.set_sym_pair(&mut ctx, "6,MUSDT", &mtoken, "100000.0000 ENTU")
        .await
        .unwrap();

    let p1 = ctx.new_factory_account(&master).await.unwrap();
    ctx.transfer(&admin, &p1, "20000.000000 MUSDT", "").await.unwrap();
    let s1 = ctx.new_factory_account(&master).await.unwrap();
    ctx.transfer(&admin, &s1, "20000.00000000 FFT", "").await.unwrap();
    ctx.comment("finished");

    for quantity in [
        "6.000000 MUSDT",
        "8.000000 MUSDT",
        "10.000000 MUSDT",
        "12.000000 MUSDT",
        "14.000000 MUSDT",
    ] {
        ctx.transfer(&p1, &pool, quantity, "dddddd").await.unwrap();
    }

    let pairs = pool.sym_pairs(&mut ctx).await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["token_quant"], "50.000000 MUSDT");
    assert_eq!(
        ctx.get_balance(&p1, "MUSDT").await.unwrap(),
        asset("19950.000000 MUSDT")
    );

    ctx.transfer(&s1, &pool, "1000.00000000 FFT", "6,MUSDT").await.unwrap();
    ctx.transfer(&s1, &pool, "2000.00000000 FFT", "6,MUSDT").await.unwrap();

    assert_eq!(
        ctx.get_balance(&s1, "FFT").await.unwrap(),
        asset("17000.00000000 FFT")
    );
    assert_eq!(
        ctx.get_balance(&oooo, "FFT").await.unwrap(),
        asset("3000.00000000 FFT")
    );
    assert_eq!(
        ctx.get_balance(&admin, "ENTU").await.unwrap(),
        asset("800000000.0000 ENTU")
    );

    let scope = pool.account().to_string();
    let burns = ctx.read_table(pool.account(), &scope, "burns").await.unwrap();
    assert_eq!(burns.len(), 2);
    assert_eq!(burns[0]["from"], s1.name.as_str());
    assert_eq!(burns[1]["quantity"], "2000.00000000 FFT");

    ctx.log()
        .unwrap()
        .wait_for("burn 2000.00000000 FFT", Duration::from_secs(5))
        .await
        .unwrap();

    ctx.stop().await.unwrap();
}

/// Tables larger than one page are read completely and in key order
#[tokio::test]
async fn test_read_table_follows_pages() {
    let (_dir, mut ctx) = started("paging").await;
    let master = ctx.new_master_account().await.unwrap();
    let token = ctx.setup_token(None).await.unwrap();

    for symbol in ["AAA", "BBB", "CCC"] {
        token
            .create(&mut ctx, &master, &format!("1000.0000 {}", symbol))
            .await
            .unwrap();
        token
            .issue(&mut ctx, &master, &format!("1.0000 {}", symbol), "")
            .await
            .unwrap();
    }

    let scope = master.name.to_string();
    let table = Name::new("accounts").unwrap();
    let all = ctx.read_table(token.account(), &scope, "accounts").await.unwrap();
    assert_eq!(all.len(), 3);

    for page_limit in [1, 2, 3] {
        let paged = chain_harness::inspect::read_table_paged(
            ctx.client().unwrap(),
            token.account(),
            &scope,
            &table,
            page_limit,
        )
        .await
        .unwrap();
        assert_eq!(paged, all, "page limit {}", page_limit);
    }
    let balances: Vec<&str> = all.iter().filter_map(|r| r["balance"].as_str()).collect();
    assert_eq!(balances, vec!["1.0000 AAA", "1.0000 BBB", "1.0000 CCC"]);

    ctx.stop().await.unwrap();
}

/// A node that dies is reported as crashed, and a reset brings up a fresh one
#[cfg(unix)]
#[tokio::test]
async fn test_crashed_node_is_reported_and_reset_recovers() {
    let (dir, mut ctx) = started("crash").await;
    ctx.new_master_account().await.unwrap();
    assert_eq!(ctx.registry().accounts().count(), 2);

    let pid = ctx.client().unwrap().pid().expect("node has a pid");
    // SAFETY: pid is the live child spawned for this test
    unsafe {
        libc::kill(pid as i32, libc::SIGKILL);
    }

    let mut crashed = false;
    for _ in 0..100 {
        if matches!(ctx.client(), Err(Error::NodeCrashed)) {
            crashed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(crashed, "killed node was not reported as crashed");
    assert!(matches!(ctx.health_check().await, Err(Error::NodeCrashed)));

    ctx.reset(dir.path().join("crash-2.log")).await.unwrap();
    ctx.health_check().await.unwrap();
    assert!(ctx.registry().accounts().all(|a| a.name == SYSTEM_ACCOUNT));

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_setsympair_requires_existing_token() {
    let (_dir, mut ctx) = started("sympair_order").await;
    let pool = ctx.setup_burnpool(None).await.unwrap();

    // No token contract holds MUSDT yet
    let err = pool
        .set_sym_pair(&mut ctx, "6,MUSDT", &Name::new("amax.mtoken").unwrap(), "1.0000 FFT")
        .await
        .unwrap_err();
    assert!(err.is_rejection(), "unexpected error: {}", err);

    let mtoken = ctx.setup_token(Some("amax.mtoken")).await.unwrap();
    let master = ctx.new_master_account().await.unwrap();
    mtoken.create(&mut ctx, &master, "1000.000000 MUSDT").await.unwrap();

    let err = pool
        .set_sym_pair(&mut ctx, "4,MUSDT", &mtoken, "1.0000 FFT")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("symbol precision mismatch"));

    pool.set_sym_pair(&mut ctx, "6,MUSDT", &mtoken, "1.0000 FFT")
        .await
        .unwrap();
    pool.open_sym_pair(&mut ctx, "musdt", false).await.unwrap();

    // A disabled pair refuses burns
    mtoken.issue(&mut ctx, &master, "10.000000 MUSDT", "").await.unwrap();
    let err = ctx
        .transfer(&master, &pool, "1.000000 MUSDT", "6,MUSDT")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("sympair is disabled"));
    assert_eq!(
        ctx.get_balance(&master, "MUSDT").await.unwrap(),
        asset("10.000000 MUSDT")
    );

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_create_then_issue_credits_issuer() {
    let (_dir, mut ctx) = started("issue").await;
    let master = ctx.new_master_account().await.unwrap();
    let token = ctx.setup_token(None).await.unwrap();

    token.create(&mut ctx, &master, "1000000.0000 ENTU").await.unwrap();
    assert_eq!(ctx.get_balance(&master, "ENTU").await.unwrap(), asset("0.0000 ENTU"));

    token.issue(&mut ctx, &master, "250.5000 ENTU", "first").await.unwrap();
    assert_eq!(
        ctx.get_balance(&master, "ENTU").await.unwrap(),
        asset("250.5000 ENTU")
    );
    assert_eq!(
        ctx.registry()
            .get(&master.name)
            .unwrap()
            .cached_balance(&"ENTU".parse().unwrap()),
        Some(&asset("250.5000 ENTU"))
    );

    // Precision must match the created symbol
    let err = token
        .issue(&mut ctx, &master, "1.00 ENTU", "")
        .await
        .unwrap_err();
    assert!(err.is_rejection());
    assert!(err.to_string().contains("symbol precision mismatch"));

    let err = token
        .issue(&mut ctx, &master, "999999.0000 ENTU", "")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("quantity exceeds available supply"));

    assert_eq!(
        ctx.get_balance(&master, "ENTU").await.unwrap(),
        asset("250.5000 ENTU")
    );

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_transfer_moves_exact_amount_and_rejects_overdraw() {
    let (_dir, mut ctx) = started("transfer").await;
    let master = ctx.new_master_account().await.unwrap();
    let alice = ctx.new_account(&master, "alice").await.unwrap();
    let bob = ctx.new_account(&master, "bob").await.unwrap();
    let token = ctx.setup_token(None).await.unwrap();
    token.create(&mut ctx, &alice, "1000.0000 ENTU").await.unwrap();
    token.issue(&mut ctx, &alice, "10.0000 ENTU", "").await.unwrap();

    ctx.on(&alice).transfer(&bob, "4.0000 ENTU", "rent").await.unwrap();
    assert_eq!(ctx.on(&alice).balance("ENTU").await.unwrap(), asset("6.0000 ENTU"));
    assert_eq!(ctx.on(&bob).balance("ENTU").await.unwrap(), asset("4.0000 ENTU"));

    let err = ctx
        .transfer(&alice, &bob, "6.0001 ENTU", "")
        .await
        .unwrap_err();
    assert!(err.is_rejection());
    assert!(err.to_string().contains("overdrawn balance"));
    assert_eq!(ctx.get_balance(&alice, "ENTU").await.unwrap(), asset("6.0000 ENTU"));
    assert_eq!(ctx.get_balance(&bob, "ENTU").await.unwrap(), asset("4.0000 ENTU"));

    let err = ctx.transfer(&alice, &alice, "1.0000 ENTU", "").await.unwrap_err();
    assert!(err.to_string().contains("cannot transfer to self"));

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_fresh_accounts_hold_nothing() {
    let (_dir, mut ctx) = started("fresh").await;
    let master = ctx.new_master_account().await.unwrap();
    let fresh = ctx.new_factory_account(&master).await.unwrap();
    let token = ctx.setup_token(None).await.unwrap();
    token.create(&mut ctx, &master, "1000.000 ENTU").await.unwrap();

    assert_eq!(ctx.get_balance(&fresh, "ENTU").await.unwrap(), asset("0.000 ENTU"));
    // A symbol no contract knows reads as zero too
    let nothing = ctx.get_balance(&fresh, "NONE").await.unwrap();
    assert!(nothing.is_zero());

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_confirmed_order_matches_issue_order() {
    let (_dir, mut ctx) = started("order").await;
    let master = ctx.new_master_account().await.unwrap();
    let bob = ctx.new_account(&master, "bob").await.unwrap();
    let token = ctx.setup_token(None).await.unwrap();
    token.create(&mut ctx, &master, "1000.0000 ENTU").await.unwrap();
    token.issue(&mut ctx, &master, "100.0000 ENTU", "").await.unwrap();

    let before = ctx.history().len();
    for memo in ["one", "two", "three", "four"] {
        ctx.transfer(&master, &bob, "1.0000 ENTU", memo).await.unwrap();
    }

    let receipts = &ctx.history()[before..];
    assert_eq!(receipts.len(), 4);
    for pair in receipts.windows(2) {
        assert!(pair[0].global_sequence < pair[1].global_sequence);
        assert!(pair[0].block_num <= pair[1].block_num);
    }
    for (receipt, memo) in receipts.iter().zip(["one", "two", "three", "four"]) {
        assert!(receipt.console.iter().any(|l| l.contains(&format!("memo '{}'", memo))));
    }

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_reset_isolates_test_cases() {
    let dir = tempfile::tempdir().unwrap();
    let first_log = dir.path().join("first.log");
    let second_log = dir.path().join("second.log");

    let mut ctx = Scenario::new(test_config()).unwrap();
    ctx.reset(&first_log).await.unwrap();
    let master = ctx.new_master_account().await.unwrap();
    let token = ctx.setup_token(None).await.unwrap();
    token.create(&mut ctx, &master, "1000.0000 ENTU").await.unwrap();
    token.issue(&mut ctx, &master, "5.0000 ENTU", "").await.unwrap();
    assert!(!ctx.history().is_empty());

    ctx.reset(&second_log).await.unwrap();
    assert!(ctx.history().is_empty());
    assert!(matches!(
        ctx.account(&master.name),
        Err(Error::UnknownAccount(_))
    ));
    let token_account = Name::new("amax.token").unwrap();
    assert!(ctx.registry().get(&token_account).is_err());
    let balance = ctx
        .get_balance_on(&token_account, &master.name, "ENTU")
        .await
        .unwrap();
    assert!(balance.is_zero());

    // The master name is free again on the fresh chain
    let again = ctx.new_master_account().await.unwrap();
    assert_eq!(again.name, master.name);

    ctx.stop().await.unwrap();

    let first = std::fs::read_to_string(&first_log).unwrap();
    let second = std::fs::read_to_string(&second_log).unwrap();
    assert!(first.contains("ENTU"));
    assert!(!second.contains("ENTU"));
}

#[tokio::test]
async fn test_duplicate_account_rejected() {
    let (_dir, mut ctx) = started("duplicate").await;
    let master = ctx.new_master_account().await.unwrap();
    ctx.new_account(&master, "admin").await.unwrap();

    let err = ctx.new_account(&master, "admin").await.unwrap_err();
    assert!(matches!(err, Error::DuplicateAccount(_)));

    // The node enforces it as well
    let key = KeyPair::generate().public();
    let err = ctx
        .push_raw_action(
            &Name::new(SYSTEM_ACCOUNT).unwrap(),
            "newaccount",
            json!({
                "creator": master.name,
                "name": "admin",
                "owner": Authority::from_key(key),
                "active": Authority::from_key(key),
            }),
            &[master.active()],
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already taken"));

    // Factory names never collide
    let a = ctx.new_factory_account(&master).await.unwrap();
    let b = ctx.new_factory_account(&master).await.unwrap();
    assert_ne!(a.name, b.name);
    assert!(a.name.as_str().starts_with("tst"));

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_delegated_permission_signs_for_account() {
    let (_dir, mut ctx) = started("delegation").await;
    let master = ctx.new_master_account().await.unwrap();
    let admin = ctx.new_account(&master, "admin").await.unwrap();
    let operator = ctx.new_account(&master, "operator").await.unwrap();

    let authority = Authority {
        threshold: 1,
        keys: Vec::new(),
        accounts: Vec::new(),
    }
    .with_account(operator.active(), 1);
    let admin = ctx
        .update_auth(&admin, "ops", Some("active"), authority)
        .await
        .unwrap();
    assert!(admin.permission("ops").is_some());

    let ops = PermissionLevel::new(admin.name.clone(), Name::new("ops").unwrap());
    assert!(ctx.authorizes(&ops, &AuthorityMember::Account(operator.active())));
    // Parent permissions reach down: master@owner satisfies operator@active
    assert!(ctx.authorizes(&ops, &AuthorityMember::Account(master.owner())));
    let stranger = KeyPair::generate().public();
    assert!(!ctx.authorizes(&ops, &AuthorityMember::Key(stranger)));

    let hello = ctx.build(fixtures_dir().join("contracts").join("hello")).await.unwrap();
    let target = ctx.new_factory_account(&master).await.unwrap();
    let contract = ctx.deploy(&hello, &target).await.unwrap();
    assert_eq!(contract.code_hash, hello.artifact.code_hash);

    // The node agrees with the handle
    let info = ctx.account_info(&target).await.unwrap();
    assert_eq!(info.code_hash.as_deref(), Some(hello.artifact.code_hash.as_str()));
    let abi = ctx.deployed_abi(&target).await.unwrap().unwrap();
    assert!(abi.has_action("hi"));
    assert!(ctx.deployed_abi(&master).await.unwrap().is_none());
    let admin_info = ctx.account_info(&admin).await.unwrap();
    assert!(admin_info.permissions.iter().any(|p| p.name == "ops"));

    let receipt = ctx
        .push_action(&contract, "hi", json!({ "user": admin.name }), &[ops])
        .await
        .unwrap();
    assert!(receipt.console.iter().any(|l| l.contains("hi executed")));

    let err = ctx
        .push_action(&contract, "bye", json!({}), &[admin.active()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownAction { .. }));

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_deploy_without_authority_fails() {
    let (_dir, mut ctx) = started("deploy_auth").await;
    let master = ctx.new_master_account().await.unwrap();
    let target = ctx.new_account(&master, "locked").await.unwrap();

    // Hand both permissions to a key the wallet does not hold
    let foreign = KeyPair::generate().public();
    ctx.update_auth(&target, "active", Some("owner"), Authority::from_key(foreign))
        .await
        .unwrap();
    let target = ctx
        .update_auth(&target, "owner", None, Authority::from_key(foreign))
        .await
        .unwrap();

    let hello = ctx.build(fixtures_dir().join("contracts").join("hello")).await.unwrap();
    let err = ctx.deploy(&hello, &target).await.unwrap_err();
    match err {
        Error::Deploy { account, reason } => {
            assert_eq!(account, "locked");
            assert!(reason.contains("does not have signatures"), "reason: {}", reason);
        }
        other => panic!("expected deploy error, got {}", other),
    }

    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_yaml_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixtures_dir().join("burnpool.yaml");

    let result = run_scenario(&path, &test_config(), dir.path(), true)
        .await
        .unwrap();
    assert!(result.passed, "scenario failed: {:?}", result.error);
    assert_eq!(result.steps_run, result.steps_total);
    assert!(result.log_path.starts_with(dir.path()));
    assert!(result.log_path.exists());
}

#[tokio::test]
async fn test_yaml_scenario_reports_failing_step() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failing.yaml");
    std::fs::write(
        &path,
        r#"
name: failing
steps:
  - action: new_master_account
    as: master
  - action: assert_balance
    account: master
    symbol: ENTU
    equals: "1.0000 ENTU"
  - action: comment
    text: never reached
"#,
    )
    .unwrap();

    let result = run_scenario(&path, &test_config(), dir.path(), false)
        .await
        .unwrap();
    assert!(!result.passed);
    assert_eq!(result.steps_run, 2);
    assert_eq!(result.steps_total, 3);
    assert!(result.error.unwrap().contains("expected 1.0000 ENTU"));
}

#[test]
fn test_cli_build_prints_actions() {
    let output = Command::new(env!("CARGO_BIN_EXE_chain-harness"))
        .arg("build")
        .arg(fixtures_dir().join("contracts").join("amax.token"))
        .env("XDG_CONFIG_HOME", fixtures_dir().join("no-config"))
        .env("HOME", fixtures_dir().join("no-config"))
        .output()
        .expect("Failed to run chain-harness");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("amax.token"));
    assert!(stdout.contains("create, issue, retire, transfer"));
    assert!(stdout.contains("code hash"));
}
