//! Image identifiers.
//!
//! Ground truth and predictions come from unrelated sources, so images are
//! joined by a string key (usually a file stem) rather than a numeric ID.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The key that ties ground-truth annotations to predictions for one image.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({:?})", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ImageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ImageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_id_ordering() {
        assert!(ImageId::from("000001") < ImageId::from("000002"));
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(ImageId::from("img_a"), 1);
        assert_eq!(map.get("img_a"), Some(&1));
        assert_eq!(map.get("img_b"), None);
    }
}
