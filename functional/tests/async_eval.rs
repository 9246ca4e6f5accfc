mod common;

use fibre_functional::{
  FunctionalMap, Lifespan, MetaParamLookup, TokioExecutor, WaitMode, Writable, WriteEntry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn tokio_map() -> FunctionalMap<i32, String> {
  FunctionalMap::builder()
    .wait_mode(WaitMode::NonBlocking)
    .executor(Arc::new(TokioExecutor::new()))
    .build()
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completions_can_be_awaited() {
  common::init_tracing();
  let map = tokio_map();

  map
    .write_only()
    .eval(1, |view| view.set("one".to_string(), [Writable::from(Lifespan(1000))]))
    .await;

  let (value, lifespan) = map
    .read_only()
    .eval(1, |view| (view.find(), view.find_meta_param::<Lifespan>()))
    .await;
  assert_eq!(value.as_deref().map(String::as_str), Some("one"));
  assert_eq!(lifespan, Some(Lifespan(1000)));
}

#[tokio::test]
async fn blocking_and_non_blocking_agree() {
  let map = tokio_map();
  let rw = map.read_write();
  rw.eval(7, |view| view.set("seven".to_string(), [])).await;

  let blocking = rw.with_params(&[WaitMode::Blocking.into()]);
  let eager = blocking.eval(7, |view| view.find());
  assert!(eager.is_done());
  let lazy = rw.eval(7, |view| view.find()).await;
  assert_eq!(eager.await, lazy);
}

#[tokio::test]
async fn mapped_completion_transforms_the_result() {
  let map = tokio_map();
  map
    .write_only()
    .eval_with(3, "three".to_string(), |value, view| view.set(value, []))
    .await;

  let len = map
    .read_only()
    .eval(3, |view| view.find())
    .map(|value| value.map_or(0, |v| v.len()))
    .await;
  assert_eq!(len, 5);
}

#[tokio::test]
async fn many_concurrent_writes_all_land() {
  let map = tokio_map();
  let wo = map.write_only();
  let completions: Vec<_> = (0..64)
    .map(|i| wo.eval(i, move |view| view.set(format!("v{}", i), [])))
    .collect();
  futures_util::future::join_all(completions).await;

  assert_eq!(map.len(), 64);
  let sum = map.read_only().reduce(0, |pair, acc| acc + pair.key().copied().unwrap_or(0)).unwrap().await;
  assert_eq!(sum, (0..64).sum::<i32>());
}

#[tokio::test]
async fn listeners_fire_before_the_completion_resolves() {
  let map = tokio_map();
  let rw = map.read_write();
  let (tx, mut rx) = mpsc::unbounded_channel();
  let _handle = rw.listeners().on_create(move |view| {
    let _ = tx.send(*view.key());
  });

  rw.eval(11, |view| view.set("eleven".to_string(), [])).await;
  assert_eq!(rx.try_recv().ok(), Some(11));
}

#[tokio::test]
async fn pending_completion_reports_not_done() {
  let map = tokio_map();
  let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
  let completion = map.read_only().eval(1, move |view| {
    release_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    view.find()
  });

  let completion = match completion.try_take() {
    Ok(_) => panic!("the callback cannot finish before it is released"),
    Err(pending) => pending,
  };
  assert!(!completion.is_done());
  release_tx.send(()).unwrap();
  assert_eq!(completion.await, None);
}
