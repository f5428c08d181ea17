use crate::CoreError;
use chatbus_schema::validate_object_path;
use std::collections::{BTreeMap, BTreeSet};

/// Proof of one registration. Not `Clone`: each registration is released once.
#[derive(Debug, PartialEq, Eq)]
pub struct RegistrationHandle {
    id: u64,
    path: String,
}

impl RegistrationHandle {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Objects exported on one connection, keyed by object path.
pub struct ObjectRegistry<T> {
    next_id: u64,
    objects: BTreeMap<String, (u64, T)>,
}

impl<T> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            objects: BTreeMap::new(),
        }
    }
}

impl<T> ObjectRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: &str, object: T) -> Result<RegistrationHandle, CoreError> {
        validate_object_path(path)?;
        if self.objects.contains_key(path) {
            return Err(CoreError::AlreadyRegistered(path.to_owned()));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(path.to_owned(), (id, object));
        Ok(RegistrationHandle {
            id,
            path: path.to_owned(),
        })
    }

    pub fn unregister(&mut self, handle: RegistrationHandle) -> Result<T, CoreError> {
        let current = self.objects.get(&handle.path).map(|(id, _)| *id);
        if current != Some(handle.id) {
            return Err(CoreError::NotRegistered(handle.path));
        }
        self.objects
            .remove(&handle.path)
            .map(|(_, object)| object)
            .ok_or(CoreError::NotRegistered(handle.path))
    }

    pub fn get(&self, path: &str) -> Option<&T> {
        self.objects.get(path).map(|(_, object)| object)
    }

    /// Names of the nodes directly below `path` that lead to registered objects.
    pub fn child_nodes(&self, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_owned()
        } else {
            format!("{path}/")
        };
        let children: BTreeSet<&str> = self
            .objects
            .keys()
            .filter_map(|p| p.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|child| !child.is_empty())
            .collect();
        children.into_iter().map(str::to_owned).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
