#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Deepest level below the root pointer that is walked (None = unlimited).
    /// Subtrees past the limit are left as they are.
    pub max_depth: Option<usize>,
}

impl Options {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}
