use chatbus_schema::TITLE_DEFAULT;
use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};

/// One property slot. `value` stays `None` until the first read or write, so a
/// property explicitly set to `""` is distinguishable from one never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    default: &'static str,
    value: Option<String>,
}

impl PropertyEntry {
    pub fn new(default: &'static str) -> Self {
        Self {
            default,
            value: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    pub fn get_or_init(&mut self) -> &str {
        let default = self.default;
        self.value.get_or_insert_with(|| default.to_owned())
    }

    /// Store `value`, returning the previous one if the slot was initialized.
    pub fn replace(&mut self, value: String) -> Option<String> {
        self.value.replace(value)
    }
}

pub(crate) type Entries = HashMap<&'static str, PropertyEntry>;

/// Holds the current values of the object's string properties.
///
/// Access goes through an async mutex so that a writer can keep the store locked
/// while it announces the change.
pub struct PropertyStore {
    entries: Mutex<Entries>,
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new(&[("Title", TITLE_DEFAULT)])
    }
}

impl PropertyStore {
    pub fn new(defaults: &[(&'static str, &'static str)]) -> Self {
        let entries = defaults
            .iter()
            .map(|&(name, default)| (name, PropertyEntry::new(default)))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub async fn read(&self, name: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        entries
            .get_mut(name)
            .map(|entry| entry.get_or_init().to_owned())
    }

    pub async fn is_initialized(&self, name: &str) -> Option<bool> {
        let entries = self.entries.lock().await;
        entries.get(name).map(PropertyEntry::is_initialized)
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().await
    }
}
