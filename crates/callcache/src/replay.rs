//! Replay of recorded call histories.
//!
//! A [`Replay`] is a snapshot of one operation's counter and history logs.
//! Rendered, it reads:
//!
//! ```text
//! Cache.store was called 2 times:
//! Cache.store(*('foo',)) -> 0b6e1f0c-...
//! Cache.store(*('bar',)) -> 5d2a7c44-...
//! ```
//!
//! The header counts recorded inputs, not the counter: the two drift apart
//! when a counted call failed or its history could not be written.

use std::fmt;
use std::io;

use callcache_store::{KeyValueStore, StoreError};
use serde::Serialize;

use crate::error::Result;
use crate::instrument::OperationName;

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayEntry {
    /// Argument tuple as logged, e.g. `('foo',)`.
    pub inputs: String,
    /// Result as logged.
    pub output: String,
}

/// Recorded history of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replay {
    name: String,
    calls: i64,
    recorded: usize,
    entries: Vec<ReplayEntry>,
}

impl Replay {
    /// Read the counter and both history logs of `name` from `store`.
    ///
    /// Read-only; loading twice without intervening calls yields equal
    /// snapshots. Logs of unequal length are paired up to the shorter one.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, name: &OperationName) -> Result<Self> {
        let calls = match store.get(name.counter_key()) {
            Ok(Some(raw)) => parse_counter(&raw).unwrap_or_else(|| {
                tracing::warn!(operation = %name, "counter is not an integer, treating as absent");
                0
            }),
            Ok(None) => 0,
            Err(StoreError::WrongType { .. }) => {
                tracing::warn!(operation = %name, "counter key holds a list, treating as absent");
                0
            }
            Err(e) => return Err(e.into()),
        };

        let inputs = store.range(&name.inputs_key(), 0, -1)?;
        let outputs = store.range(&name.outputs_key(), 0, -1)?;

        if inputs.len() != outputs.len() {
            tracing::debug!(
                operation = %name,
                inputs = inputs.len(),
                outputs = outputs.len(),
                "history logs differ in length"
            );
        }

        let entries = inputs
            .iter()
            .zip(outputs.iter())
            .map(|(i, o)| ReplayEntry {
                inputs: String::from_utf8_lossy(i).into_owned(),
                output: String::from_utf8_lossy(o).into_owned(),
            })
            .collect();

        Ok(Self {
            name: name.as_str().to_owned(),
            calls,
            recorded: inputs.len(),
            entries,
        })
    }

    /// Qualified operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the call counter.
    ///
    /// 0 if never counted, or if the counter key holds something other
    /// than an integer. The rendered history does not depend on it.
    pub fn calls(&self) -> i64 {
        self.calls
    }

    /// Number of entries in the inputs log.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    pub fn entries(&self) -> &[ReplayEntry] {
        &self.entries
    }

    /// `<name> was called <n> times:`
    pub fn header(&self) -> String {
        format!("{} was called {} times:", self.name, self.recorded)
    }

    /// Header followed by one line per recorded call, formatted on demand.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.header()).chain(
            self.entries
                .iter()
                .map(move |e| format!("{}(*{}) -> {}", self.name, e.inputs, e.output)),
        )
    }

    /// Write every line to `w`, newline-terminated.
    pub fn write_to<W: io::Write>(&self, mut w: W) -> io::Result<()> {
        for line in self.lines() {
            writeln!(w, "{}", line)?;
        }
        Ok(())
    }
}

fn parse_counter(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}

impl fmt::Display for Replay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callcache_store::MemoryStore;

    fn name() -> OperationName {
        OperationName::from_static("Thing.run")
    }

    #[test]
    fn test_empty_history() {
        let store = MemoryStore::new();
        let replay = Replay::load(&store, &name()).unwrap();

        assert_eq!(replay.calls(), 0);
        assert_eq!(replay.recorded(), 0);
        assert_eq!(
            replay.lines().collect::<Vec<_>>(),
            vec!["Thing.run was called 0 times:"]
        );
    }

    #[test]
    fn test_lines() {
        let store = MemoryStore::new();
        store.incr("Thing.run").unwrap();
        store.incr("Thing.run").unwrap();
        store.append("Thing.run:inputs", b"(1,)").unwrap();
        store.append("Thing.run:outputs", b"one").unwrap();
        store.append("Thing.run:inputs", b"('x', 2)").unwrap();
        store.append("Thing.run:outputs", b"two").unwrap();

        let replay = Replay::load(&store, &name()).unwrap();
        assert_eq!(replay.calls(), 2);
        assert_eq!(
            replay.lines().collect::<Vec<_>>(),
            vec![
                "Thing.run was called 2 times:",
                "Thing.run(*(1,)) -> one",
                "Thing.run(*('x', 2)) -> two",
            ]
        );
    }

    #[test]
    fn test_header_counts_inputs_not_counter() {
        let store = MemoryStore::new();
        for _ in 0..5 {
            store.incr("Thing.run").unwrap();
        }
        store.append("Thing.run:inputs", b"(1,)").unwrap();
        store.append("Thing.run:outputs", b"a").unwrap();
        // Inputs appended, outputs never made it.
        store.append("Thing.run:inputs", b"(2,)").unwrap();

        let replay = Replay::load(&store, &name()).unwrap();
        assert_eq!(replay.calls(), 5);
        assert_eq!(replay.header(), "Thing.run was called 2 times:");
        assert_eq!(replay.entries().len(), 1);
        assert_eq!(replay.lines().count(), 2);
    }

    #[test]
    fn test_write_to_and_display_agree() {
        let store = MemoryStore::new();
        store.append("Thing.run:inputs", b"()").unwrap();
        store.append("Thing.run:outputs", b"done").unwrap();

        let replay = Replay::load(&store, &name()).unwrap();
        let mut buf = Vec::new();
        replay.write_to(&mut buf).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), replay.to_string());
        assert_eq!(replay.to_string(), "Thing.run was called 1 times:\nThing.run(*()) -> done\n");
    }

    #[test]
    fn test_load_is_read_only() {
        let store = MemoryStore::new();
        store.incr("Thing.run").unwrap();
        store.append("Thing.run:inputs", b"(1,)").unwrap();
        store.append("Thing.run:outputs", b"x").unwrap();

        let first = Replay::load(&store, &name()).unwrap();
        let second = Replay::load(&store, &name()).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_serializes_to_json() {
        let store = MemoryStore::new();
        store.incr("Thing.run").unwrap();
        store.append("Thing.run:inputs", b"(1,)").unwrap();
        store.append("Thing.run:outputs", b"x").unwrap();

        let replay = Replay::load(&store, &name()).unwrap();
        let json = serde_json::to_value(&replay).unwrap();
        assert_eq!(json["name"], "Thing.run");
        assert_eq!(json["calls"], 1);
        assert_eq!(json["entries"][0]["inputs"], "(1,)");
    }

    #[test]
    fn test_corrupt_counter_still_renders_history() {
        let store = MemoryStore::new();
        store
            .set("Thing.run", &callcache_store::StoredValue::from("lots"))
            .unwrap();
        store.append("Thing.run:inputs", b"(1,)").unwrap();
        store.append("Thing.run:outputs", b"one").unwrap();

        let replay = Replay::load(&store, &name()).unwrap();
        assert_eq!(replay.calls(), 0);
        assert_eq!(
            replay.lines().collect::<Vec<_>>(),
            vec!["Thing.run was called 1 times:", "Thing.run(*(1,)) -> one"]
        );
    }

    #[test]
    fn test_counter_holding_a_list_is_ignored() {
        let store = MemoryStore::new();
        store.append("Thing.run", b"oops").unwrap();
        store.append("Thing.run:inputs", b"()").unwrap();
        store.append("Thing.run:outputs", b"done").unwrap();

        let replay = Replay::load(&store, &name()).unwrap();
        assert_eq!(replay.calls(), 0);
        assert_eq!(replay.header(), "Thing.run was called 1 times:");
    }
}
