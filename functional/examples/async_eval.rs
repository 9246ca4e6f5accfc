use fibre_functional::{FunctionalMap, TokioExecutor, WaitMode, WriteEntry};
use std::sync::Arc;

#[tokio::main]
async fn main() {
  // Callbacks run on Tokio's blocking pool; completions are awaited.
  let map = FunctionalMap::<u32, String>::builder()
    .wait_mode(WaitMode::NonBlocking)
    .executor(Arc::new(TokioExecutor::new()))
    .build()
    .expect("Failed to build map");

  let write_only = map.write_only();
  let writes: Vec<_> = (0..10)
    .map(|i| write_only.eval(i, move |view| view.set(format!("value-{}", i), [])))
    .collect();
  futures_util::future::join_all(writes).await;
  println!("Wrote {} entries concurrently.", map.len());

  let value = map.read_only().eval(7, |view| view.find()).await;
  println!("Key 7 holds {:?}", value);

  let total_len = map
    .read_only()
    .with_params(&[fibre_functional::StreamMode::VALUES.into()])
    .reduce(0usize, |pair, acc| acc + pair.value().map_or(0, |v| v.len()))
    .expect("values stream mode is never empty")
    .await;
  println!("Total length of all values: {}", total_len);
}
