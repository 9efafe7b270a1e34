use lowjs_common::limits::MAX_LOWERING_DEPTH;

/// Per-invocation configuration of the lowering pass.
#[derive(Clone, Debug)]
pub struct LoweringOptions {
    /// Name used in synthesized eval locations (`name#line<eval>`).
    pub source_name: String,
    /// Statement/expression nesting limit. Deeper trees fail with
    /// [`LoweringError::RecursionLimit`](crate::LoweringError::RecursionLimit).
    pub max_depth: u32,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            source_name: "<script>".to_string(),
            max_depth: MAX_LOWERING_DEPTH,
        }
    }
}

impl LoweringOptions {
    #[must_use]
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }
}
