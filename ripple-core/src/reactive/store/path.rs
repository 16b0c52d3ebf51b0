//! Store paths.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// One step into a store value: an object key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A field of an object.
    Key(Arc<str>),
    /// An element of a list.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(Arc::from(key))
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(Arc::from(key))
    }
}

impl From<Arc<str>> for PathSegment {
    fn from(key: Arc<str>) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// An address inside a store, from the root down.
///
/// Displays as `$.items[0].completed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(SmallVec<[PathSegment; 4]>);

impl Path {
    /// The empty path, addressing the whole store.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend the path with an object key.
    pub fn key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.0.push(PathSegment::Key(key.into()));
        self
    }

    /// Extend the path with a list index.
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    /// The path one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        let (_, parent) = self.0.split_last()?;
        Some(parent.iter().cloned().collect())
    }

    /// The final segment, or `None` for the root.
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl From<&[PathSegment]> for Path {
    fn from(segments: &[PathSegment]) -> Self {
        segments.iter().cloned().collect()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Build a [`Path`] from keys and indices.
///
/// ```rust,ignore
/// let path = path!["items", 0usize, "completed"];
/// assert_eq!(path.to_string(), "$.items[0].completed");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::reactive::Path::root()
    };
    ($($segment:expr),+ $(,)?) => {
        <$crate::reactive::Path as ::std::iter::FromIterator<$crate::reactive::PathSegment>>::from_iter([
            $($crate::reactive::PathSegment::from($segment)),+
        ])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_display() {
        let path = Path::root().key("items").index(0).key("completed");
        assert_eq!(path.to_string(), "$.items[0].completed");
        assert_eq!(path.depth(), 3);
        assert_eq!(Path::root().to_string(), "$");
    }

    #[test]
    fn parent_drops_last_segment() {
        let path = Path::root().key("items").index(2);
        assert_eq!(path.parent(), Some(Path::root().key("items")));
        assert_eq!(path.last(), Some(&PathSegment::Index(2)));
        assert_eq!(Path::root().parent(), None);
    }

    #[test]
    fn macro_matches_builder() {
        let built = Path::root().key("todos").index(1).key("title");
        assert_eq!(crate::path!["todos", 1usize, "title"], built);
        assert!(crate::path![].is_root());
    }
}
