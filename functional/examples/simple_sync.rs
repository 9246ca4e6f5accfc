use fibre_functional::{FunctionalMap, Lifespan, MetaParamLookup, WaitMode, Writable, WriteEntry};

fn main() {
  // A map whose façades compute every result on the calling thread.
  let map = FunctionalMap::<String, u64>::builder()
    .wait_mode(WaitMode::Blocking)
    .build()
    .expect("Failed to build map");

  let write_only = map.write_only();
  let read_only = map.read_only();
  let read_write = map.read_write();

  println!("Writing ('apples', 3) with a lifespan of 60s.");
  write_only
    .eval("apples".to_string(), |view| {
      view.set(3, [Writable::from(Lifespan(60_000))])
    })
    .wait();

  let (value, lifespan) = read_only
    .eval("apples".to_string(), |view| {
      (view.find(), view.find_meta_param::<Lifespan>())
    })
    .wait();
  println!("Found apples: {:?} (lifespan: {:?})", value, lifespan);

  // Read-modify-write in one callback; returns the previous value.
  let previous = read_write
    .eval("apples".to_string(), |view| {
      let previous = view.find();
      let next = previous.as_deref().copied().unwrap_or_default() + 1;
      view.set(next, []);
      previous
    })
    .wait();
  println!("Incremented apples, previous value was {:?}", previous);

  match read_only.eval("pears".to_string(), |view| view.get()).wait() {
    Ok(value) => println!("Found pears: {}", value),
    Err(e) => println!("Pears lookup failed as expected: {}", e),
  }

  write_only.eval("apples".to_string(), |view| view.remove()).wait();
  println!("\nMap size after removal: {}", map.len());
  println!("Map metrics: {:#?}", map.metrics());
}
