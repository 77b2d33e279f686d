use thiserror::Error;

/// Chain construction and solve errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IkError {
    #[error("Chain needs at least one segment")]
    NoSegments,

    #[error("Segment count {requested} needs {needed} joints, skeleton has {available}")]
    SegmentCountExceedsSkeleton {
        requested: usize,
        needed: usize,
        available: usize,
    },

    #[error("Segment {index} has zero rest length")]
    DegenerateSegment { index: usize },

    #[error("Chain has no goal to solve toward")]
    MissingGoal,
}
