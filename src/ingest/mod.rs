/// Input collaborators for the optimizer.
///
/// The clustering core only ever sees `model::Task` values with a validated
/// EFH interval. Everything that turns a spreadsheet export into those tasks
/// lives here.
///
/// Submodules:
/// - `efh`: unit conversion from FH / CY / CAL to equivalent flight hours.
/// - `tasks`: CSV reading, column auto-detection and dataset statistics.

pub mod efh;
pub mod tasks;
