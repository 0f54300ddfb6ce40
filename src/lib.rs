//! Maintenance check optimizer.
//!
//! Groups recurring maintenance-task intervals, normalized to equivalent
//! flight hours, into a small set of representative checks using adaptive
//! peak-based clustering (APBC), and finds checks that nest inside larger
//! ones.
//!
//! ```no_run
//! use apbc_optimizer::{analysis, config::OptimizerConfig, ingest::tasks};
//!
//! let list = tasks::read_task_csv("mpd.csv".as_ref())?;
//! let result = analysis::fit(&list.valid_tasks(), &OptimizerConfig::default())?;
//! for row in analysis::get_summary(&result) {
//!     println!("G{} @ {} EFH: {} tasks", row.group_id, row.center, row.task_count);
//! }
//! # Ok::<(), apbc_optimizer::model::OptimizerError>(())
//! ```

pub mod analysis;
pub mod config;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod model;

pub use analysis::{fit, get_summary, FitResult};
pub use config::{OptimizerConfig, Settings};
pub use model::{OptimizerError, Result, Task};
