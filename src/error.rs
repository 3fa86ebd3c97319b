use thiserror::Error;

/// Fatal pipeline errors. Everything else in the planner degrades gracefully
/// (solver fallbacks, strategy switches, largest-component restriction) and is
/// reported through diagnostics instead of failing the run.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no boundary polygons supplied")]
    EmptyInput,

    #[error("boundary ring {index} has {points} points; a polygon needs at least 3")]
    InvalidBoundary { index: usize, points: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why the Voronoi road-network strategy could not produce a usable layout.
///
/// The orchestrator pattern-matches on this to decide the fallback path; the
/// reason is surfaced in the report diagnostics, never as a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoadGenFailure {
    #[error("Voronoi construction failed")]
    Construction,

    #[error("no road line network produced")]
    EmptyLineNetwork,

    #[error("no qualifying blocks after road subtraction")]
    NoBlocks,
}
