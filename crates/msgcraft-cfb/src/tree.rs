use std::cmp::Ordering;

/// A node of the logical directory tree handed to [`crate::write`].
pub enum Node {
    /// A sub-storage (directory).
    Storage(Storage),
    /// A stream (file) with its full contents already in memory.
    Stream {
        /// CFB directory-entry name, e.g. `"__properties_version1.0"`.
        name: String,
        /// Raw stream bytes.
        data: Vec<u8>,
    },
}

/// A storage (directory) in the logical tree that [`crate::write`] serializes
/// into an MS-CFB container.
///
/// The root storage's own `name` is never written out; MS-CFB always names
/// the root directory entry `"Root Entry"`.
pub struct Storage {
    pub(crate) name: String,
    pub(crate) children: Vec<Node>,
}

impl Storage {
    /// Creates a new, empty storage with the given directory-entry name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Adds a stream to this storage.
    pub fn add_stream(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.children.push(Node::Stream {
            name: name.into(),
            data,
        });
        self
    }

    /// Adds a sub-storage to this storage and returns a mutable reference to
    /// it so callers can keep populating it.
    pub fn add_storage(&mut self, name: impl Into<String>) -> &mut Storage {
        self.children.push(Node::Storage(Storage::new(name)));
        match self.children.last_mut().expect("just pushed") {
            Node::Storage(s) => s,
            Node::Stream { .. } => unreachable!(),
        }
    }

    /// Adds an already-built sub-storage as a child, e.g. one assembled
    /// separately by a caller that composed it bottom-up.
    pub fn add_child_storage(&mut self, storage: Storage) -> &mut Storage {
        self.children.push(Node::Storage(storage));
        match self.children.last_mut().expect("just pushed") {
            Node::Storage(s) => s,
            Node::Stream { .. } => unreachable!(),
        }
    }
}

/// MS-CFB directory-entry sibling order: shorter (UTF-16) names first, then
/// case-insensitive codepoint order. All names used by this crate are plain
/// ASCII, so a simple uppercase comparison is equivalent to the codepoint
/// comparison MS-CFB specifies.
pub(crate) fn cfb_name_cmp(a: &str, b: &str) -> Ordering {
    let alen = a.encode_utf16().count();
    let blen = b.encode_utf16().count();
    alen.cmp(&blen).then_with(|| a.to_uppercase().cmp(&b.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_names_sort_first() {
        assert_eq!(cfb_name_cmp("ab", "abc"), Ordering::Less);
    }

    #[test]
    fn equal_length_is_case_insensitive() {
        assert_eq!(cfb_name_cmp("ABC", "abc"), Ordering::Equal);
        assert_eq!(cfb_name_cmp("abd", "abc"), Ordering::Greater);
    }
}
