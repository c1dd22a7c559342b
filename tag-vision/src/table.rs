//! Shared real-time data store seen by the coprocessor.
//!
//! The robot controller and the coprocessor exchange values through named
//! fields. The core only needs two capabilities from the store: writing
//! scalar outputs ([`TableSink`]) and being told when a watched field changes
//! ([`TableSubscriber`]). [`InMemoryTable`] provides both in-process.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::utils::lock;

/// Value held by a table field.
#[derive(Clone, Debug, PartialEq)]
pub enum TableValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for TableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableValue::Boolean(b) => write!(f, "{}", b),
            TableValue::Integer(i) => write!(f, "{}", i),
            TableValue::Double(d) => write!(f, "{}", d),
            TableValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for TableValue {
    fn from(value: bool) -> Self {
        TableValue::Boolean(value)
    }
}

impl From<i64> for TableValue {
    fn from(value: i64) -> Self {
        TableValue::Integer(value)
    }
}

impl From<f64> for TableValue {
    fn from(value: f64) -> Self {
        TableValue::Double(value)
    }
}

impl From<&str> for TableValue {
    fn from(value: &str) -> Self {
        TableValue::String(value.to_string())
    }
}

impl From<String> for TableValue {
    fn from(value: String) -> Self {
        TableValue::String(value)
    }
}

/// Callback invoked with the new value of a watched field.
pub type Listener = Box<dyn Fn(&TableValue) + Send + Sync>;

/// Write side of the store.
pub trait TableSink: Send + Sync {
    /// Establish the value seen before the first `set`. Never overwrites an existing value.
    fn set_default(&self, key: &str, value: TableValue);
    fn set(&self, key: &str, value: TableValue);
}

/// Change notifications for one field.
pub trait TableSubscriber: Send + Sync {
    /// Register `listener` for `key`.
    ///
    /// The current value, if any, is delivered immediately, then every later
    /// change in the order it was written. Deliveries for one table never overlap.
    fn subscribe(&self, key: &str, listener: Listener);
}

#[derive(Default)]
struct Listeners {
    by_key: HashMap<String, Vec<Arc<dyn Fn(&TableValue) + Send + Sync>>>,
}

/// Thread-safe in-process table.
///
/// Listeners run on the writer's thread after the value is stored. A listener
/// must not write back into the same table.
#[derive(Default)]
pub struct InMemoryTable {
    values: Mutex<HashMap<String, TableValue>>,
    listeners: Mutex<Listeners>,
    dispatch: Mutex<()>,
}

impl InMemoryTable {
    pub fn new() -> InMemoryTable {
        InMemoryTable::default()
    }

    pub fn get(&self, key: &str) -> Option<TableValue> {
        lock(&self.values).get(key).cloned()
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(TableValue::Integer(i)) => Some(i),
            _ => None,
        }
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(TableValue::Double(d)) => Some(d),
            _ => None,
        }
    }

    fn notify(&self, key: &str, value: &TableValue) {
        let listeners = lock(&self.listeners)
            .by_key
            .get(key)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener(value);
        }
    }
}

impl TableSink for InMemoryTable {
    fn set_default(&self, key: &str, value: TableValue) {
        let _dispatch = lock(&self.dispatch);
        let inserted = {
            let mut values = lock(&self.values);
            if values.contains_key(key) {
                false
            } else {
                values.insert(key.to_string(), value.clone());
                true
            }
        };
        if inserted {
            self.notify(key, &value);
        }
    }

    fn set(&self, key: &str, value: TableValue) {
        let _dispatch = lock(&self.dispatch);
        lock(&self.values).insert(key.to_string(), value.clone());
        self.notify(key, &value);
    }
}

impl TableSubscriber for InMemoryTable {
    fn subscribe(&self, key: &str, listener: Listener) {
        let _dispatch = lock(&self.dispatch);
        let listener: Arc<dyn Fn(&TableValue) + Send + Sync> = Arc::from(listener);
        lock(&self.listeners)
            .by_key
            .entry(key.to_string())
            .or_default()
            .push(Arc::clone(&listener));
        if let Some(current) = self.get(key) {
            listener(&current);
        }
    }
}
