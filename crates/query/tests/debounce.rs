#![forbid(unsafe_code)]

use rollcall_query::SearchDebouncer;
use std::time::Duration;

const WINDOW: Duration = Duration::from_millis(300);

#[tokio::test(start_paused = true)]
async fn burst_emits_only_the_final_value() {
    let (debouncer, mut settled) = SearchDebouncer::spawn(WINDOW);
    debouncer.input("s");
    debouncer.input("sm");
    debouncer.input("smi");
    debouncer.input("smith");
    assert_eq!(settled.recv().await.as_deref(), Some("smith"));
    // Nothing else is pending.
    let extra = tokio::time::timeout(Duration::from_secs(1), settled.recv()).await;
    assert!(extra.is_err());
}

#[tokio::test(start_paused = true)]
async fn keystroke_inside_window_replaces_pending_emission() {
    let (debouncer, mut settled) = SearchDebouncer::spawn(WINDOW);
    debouncer.input("jo");
    // Let part of the quiet period pass, then type again.
    tokio::time::sleep(Duration::from_millis(200)).await;
    debouncer.input("jones");
    assert_eq!(settled.recv().await.as_deref(), Some("jones"));
    let extra = tokio::time::timeout(Duration::from_secs(1), settled.recv()).await;
    assert!(extra.is_err());
}

#[tokio::test(start_paused = true)]
async fn same_settled_value_is_not_emitted_twice() {
    let (debouncer, mut settled) = SearchDebouncer::spawn(WINDOW);
    debouncer.input("smith");
    assert_eq!(settled.recv().await.as_deref(), Some("smith"));
    // A burst that lands back on the already settled text stays quiet.
    debouncer.input("smit");
    debouncer.input("smith");
    let extra = tokio::time::timeout(Duration::from_secs(1), settled.recv()).await;
    assert!(extra.is_err());
}

#[tokio::test(start_paused = true)]
async fn separate_bursts_each_settle() {
    let (debouncer, mut settled) = SearchDebouncer::spawn(WINDOW);
    debouncer.input("a");
    assert_eq!(settled.recv().await.as_deref(), Some("a"));
    debouncer.input("ab");
    assert_eq!(settled.recv().await.as_deref(), Some("ab"));
}
