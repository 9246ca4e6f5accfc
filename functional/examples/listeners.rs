use fibre_functional::{FunctionalMap, ReadEntryView, ReadWriteListener, WaitMode, WriteEntry};

// A listener that prints every transition it is told about.
struct Printer;

impl ReadWriteListener<i32, String> for Printer {
  fn on_create(&self, created: &ReadEntryView<i32, String>) {
    println!("[Listener] created {} = {:?}", created.key(), created.find());
  }

  fn on_modify(&self, before: &ReadEntryView<i32, String>, after: &ReadEntryView<i32, String>) {
    println!(
      "[Listener] modified {}: {:?} -> {:?}",
      after.key(),
      before.find(),
      after.find()
    );
  }

  fn on_remove(&self, removed: &ReadEntryView<i32, String>) {
    println!("[Listener] removed {} (was {:?})", removed.key(), removed.find());
  }
}

fn main() {
  println!("--- Functional Map with Listeners ---");

  let map = FunctionalMap::<i32, String>::builder()
    .wait_mode(WaitMode::Blocking)
    .build()
    .expect("Failed to build map");

  let read_write = map.read_write();
  let printer = read_write.listeners().add(Printer);
  let writes = map
    .write_only()
    .listeners()
    .on_write(|written: &ReadEntryView<i32, String>| {
      println!("[Write listener] {} is now {:?}", written.key(), written.find());
    });

  read_write.eval(1, |view| view.set("one".to_string(), [])).wait();
  read_write.eval(1, |view| view.set("uno".to_string(), [])).wait();
  read_write.eval(1, |view| view.remove()).wait();

  // Write-only mutations cannot tell creates from modifies.
  let write_only = map.write_only();
  write_only.eval(2, |view| view.set("two".to_string(), [])).wait();
  write_only.eval(2, |view| view.remove()).wait();

  println!("\nClosing the listener handles.");
  printer.close();
  writes.close();

  read_write.eval(3, |view| view.set("three".to_string(), [])).wait();
  println!(
    "No events for key 3. Notifications delivered: {}",
    map.metrics().listener_notifications
  );
}
