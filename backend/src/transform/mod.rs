//! Transformation module.
//!
//! This module turns an instrument export into normalized sheets:
//! - Reconcile: sample labels and boilerplate rows
//! - Aggregate: repeated measurements to geometric means
//! - Normalize: scaling against the reference protein
//! - Sheets: one sheet per sample group
//! - Pipeline: all of the above in order

pub mod aggregate;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod sheets;

pub use aggregate::{aggregate, geometric_mean, group_by_column, EmptyValuePolicy, ProteinGroups};
pub use normalize::{find_reference, normalize};
pub use pipeline::*;
pub use reconcile::reconcile;
pub use sheets::{build, check_sheet_names, col_to_letters, SheetOptions, ALL_DATA_SHEET, SUM_LABEL};
