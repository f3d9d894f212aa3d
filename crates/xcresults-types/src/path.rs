use std::fmt;

/// Breadcrumb trail from the bundle root to a record.
///
/// Rendered as `root > actions[0] > testsRef(0~ab12) > summaries[0]`, which is
/// what fatal errors and warnings carry so the offending record can be found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordPath {
    segments: Vec<String>,
}

impl RecordPath {
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: vec!["root".to_owned()],
        }
    }

    /// `self > field`
    #[must_use]
    pub fn field(&self, field: &str) -> Self {
        self.with(field.to_owned())
    }

    /// `self > field[index]`
    #[must_use]
    pub fn index(&self, field: &str, index: usize) -> Self {
        self.with(format!("{field}[{index}]"))
    }

    /// `self > field(id)`
    #[must_use]
    pub fn reference(&self, field: &str, id: &str) -> Self {
        self.with(format!("{field}({id})"))
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    fn with(&self, segment: String) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(" > "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_breadcrumbs() {
        let path = RecordPath::root()
            .index("actions", 0)
            .reference("testsRef", "0~ab12")
            .field("summaries");
        assert_eq!(
            path.to_string(),
            "root > actions[0] > testsRef(0~ab12) > summaries"
        );
        assert_eq!(path.depth(), 4);
    }

    #[test]
    fn children_do_not_mutate_parent() {
        let root = RecordPath::root();
        let _child = root.field("actions");
        assert_eq!(root.to_string(), "root");
    }
}
