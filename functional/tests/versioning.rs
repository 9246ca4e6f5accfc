mod common;

use common::{blocking_map, maps};

use fibre_functional::{
  EntryVersion, EntryVersionParam, MetaParamLookup, ReadEntryView, Writable, WriteEntry,
};
use std::sync::{Arc, Barrier};
use std::thread;

fn version(v: u64) -> EntryVersionParam {
  EntryVersionParam(EntryVersion::Numeric(v))
}

fn has_version(expected: EntryVersionParam) -> impl FnOnce(&ReadEntryView<i32, String>) -> bool {
  move |current| current.find_meta_param::<EntryVersionParam>() == Some(expected)
}

#[test]
fn replace_succeeds_only_when_version_matches() {
  for map in maps() {
    let rw = map.read_write();
    rw.eval(1, |view| view.set("v100".to_string(), [Writable::from(version(100))]))
      .wait();

    // Stale expectation: nothing changes.
    let replaced = rw
      .eval(1, |view| view.set_if(has_version(version(900)), "v900".to_string(), [Writable::from(version(901))]))
      .wait();
    assert!(!replaced);

    // Matching expectation: the value and the version move forward.
    let replaced = rw
      .eval(1, |view| view.set_if(has_version(version(100)), "v200".to_string(), [Writable::from(version(200))]))
      .wait();
    assert!(replaced);

    let (value, current) = map
      .read_only()
      .eval(1, |view| (view.get(), view.find_meta_param::<EntryVersionParam>()))
      .wait();
    assert_eq!(value.unwrap().as_str(), "v200");
    assert_eq!(current, Some(version(200)));

    // The old version no longer matches.
    let replaced = rw
      .eval(1, |view| view.set_if(has_version(version(100)), "again".to_string(), []))
      .wait();
    assert!(!replaced);
  }
}

#[test]
fn conditional_write_on_absent_key() {
  let map = blocking_map();
  let rw = map.read_write();

  let created = rw
    .eval(1, |view| {
      view.set_if(|current| !current.is_present(), "first".to_string(), [Writable::from(version(1))])
    })
    .wait();
  assert!(created);

  let created_again = rw
    .eval(1, |view| view.set_if(|current| !current.is_present(), "second".to_string(), []))
    .wait();
  assert!(!created_again);
  assert_eq!(rw.eval(1, |view| view.get()).wait().unwrap().as_str(), "first");
}

#[test]
fn versions_compare_numerically() {
  assert!(EntryVersion::Numeric(100) < EntryVersion::Numeric(200));
  assert_eq!(EntryVersion::Numeric(7).to_string(), "v7");
}

#[test]
fn concurrent_version_bumps_never_lose_an_update() {
  const THREADS: usize = 4;
  const BUMPS: u64 = 50;

  let map = blocking_map();
  map
    .read_write()
    .eval(1, |view| view.set("0".to_string(), [Writable::from(version(0))]))
    .wait();

  let barrier = Arc::new(Barrier::new(THREADS));
  let workers: Vec<_> = (0..THREADS)
    .map(|_| {
      let rw = map.read_write();
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        barrier.wait();
        let mut done = 0;
        while done < BUMPS {
          let bumped = rw
            .eval(1, |view| {
              let current = match view.find_meta_param::<EntryVersionParam>() {
                Some(EntryVersionParam(EntryVersion::Numeric(v))) => v,
                None => return false,
              };
              let next = current + 1;
              view.set_if(
                has_version(version(current)),
                next.to_string(),
                [Writable::from(version(next))],
              )
            })
            .wait();
          if bumped {
            done += 1;
          }
        }
      })
    })
    .collect();
  for worker in workers {
    worker.join().unwrap();
  }

  let expected = THREADS as u64 * BUMPS;
  let (value, current) = map
    .read_only()
    .eval(1, |view| (view.get(), view.find_meta_param::<EntryVersionParam>()))
    .wait();
  assert_eq!(value.unwrap().as_str(), expected.to_string());
  assert_eq!(current, Some(version(expected)));
  assert_eq!(map.metrics().modifies, expected);
}
