#![doc = "Land subdivision and infrastructure planning public API"]

pub mod cli;
pub mod commands;

mod config;
mod error;
mod geom;
mod infra;
mod pipeline;
mod report;
mod skeleton;
mod subdivision;

#[doc(inline)]
pub use config::PlanConfig;

#[doc(inline)]
pub use error::{PlanError, RoadGenFailure};

#[doc(inline)]
pub use pipeline::run;

#[doc(inline)]
pub use report::{
    AssetRecord, BlockRecord, DrainageRecord, InfrastructureReport, LotRecord, PlanReport,
    SkeletonReport, Strategy, SubdivisionReport,
};

pub use infra::{build_network, Asset, AssetRole, NetworkEdge, UtilityNetwork};
pub use skeleton::{Block, BlockRole, GenerationBest, GridParams};
pub use subdivision::{solve_widths, Lot};
