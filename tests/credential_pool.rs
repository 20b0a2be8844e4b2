use github_star_charts::error::StarChartsError;
use github_star_charts::metrics::InMemoryMetrics;
use github_star_charts::pool::CredentialPool;
use std::collections::HashMap;
use std::sync::Arc;

const TOKEN_A: &str = "ghp_TokenA";
const TOKEN_B: &str = "ghp_TokenB";
const TOKEN_C: &str = "ghp_TokenC";
const TOKEN_D: &str = "ghp_TokenD";

fn new_pool(tokens: &[&str]) -> Arc<CredentialPool> {
    Arc::new(CredentialPool::new(
        tokens.iter().copied(),
        Arc::new(InMemoryMetrics::new()),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_picks_are_fair() {
    let pool = new_pool(&[TOKEN_A, TOKEN_B, TOKEN_C, TOKEN_D]);

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                pool.pick()
                    .expect("pick should not fail")
                    .expect("pool is not empty")
                    .expose_secret()
                    .to_string()
            })
        })
        .collect();

    let mut counts: HashMap<String, i64> = HashMap::new();
    for pick in futures::future::join_all(handles).await {
        *counts.entry(pick.expect("task panicked")).or_default() += 1;
    }

    for token in [TOKEN_A, TOKEN_B, TOKEN_C, TOKEN_D] {
        let n = counts.get(token).copied().unwrap_or(0);
        assert!((23..=27).contains(&n), "{} picked {} times", token, n);
    }
    assert_eq!(counts.values().sum::<i64>(), 100);
    assert_eq!(counts.len(), 4);
}

#[test]
fn test_each_token_once_per_rotation() {
    let tokens = [TOKEN_A, TOKEN_B, TOKEN_C, TOKEN_D];
    let pool = new_pool(&tokens);

    for round in 0..3 {
        for expected in tokens {
            let pick = pool.pick().unwrap().unwrap();
            assert_eq!(pick.expose_secret(), expected, "round {}", round);
        }
    }
}

#[test]
fn test_no_tokens() {
    let pool = new_pool(&[]);
    let pick = pool.pick();
    assert!(matches!(pick, Ok(None)));
}

#[test]
fn test_no_valid_tokens() {
    let pool = new_pool(&[TOKEN_A, TOKEN_B]);
    for _ in 0..2 {
        let pick = pool.pick().unwrap().expect("should pick a token");
        pool.invalidate(pick);
    }

    let result = pool.pick();
    assert!(matches!(result, Err(StarChartsError::CredentialExhausted(_))));
    assert_eq!(pool.valid_count(), 0);
}

#[test]
fn test_invalidated_token_never_comes_back() {
    let pool = new_pool(&[TOKEN_A, TOKEN_B, TOKEN_C]);
    let b = pool.pick().and_then(|_| pool.pick()).unwrap().unwrap();
    assert_eq!(b.expose_secret(), TOKEN_B);
    pool.invalidate(b);

    let picks: Vec<String> = (0..10)
        .map(|_| pool.pick().unwrap().unwrap().expose_secret().to_string())
        .collect();
    assert!(picks.iter().all(|p| p != TOKEN_B));
    assert!(picks.iter().any(|p| p == TOKEN_A));
    assert!(picks.iter().any(|p| p == TOKEN_C));
}
