#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserveError {
    #[error("observe options must include child list, attributes or character data")]
    NothingToObserve,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node belongs to a different document")]
    ForeignNode,
    #[error("cannot insert a node into itself or one of its descendants")]
    HierarchyCycle,
    #[error("node is not a child of this element")]
    NotAChild,
}
