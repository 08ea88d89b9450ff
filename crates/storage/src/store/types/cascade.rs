#![forbid(unsafe_code)]

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Ancestors moved to the target status, nearest first.
    pub ids: Vec<String>,
    /// Dependents reopened because a cascaded ancestor closed.
    pub unblocked: Vec<String>,
}

impl CascadeReport {
    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnblockReport {
    pub ids: Vec<String>,
}

impl UnblockReport {
    pub fn count(&self) -> usize {
        self.ids.len()
    }
}
