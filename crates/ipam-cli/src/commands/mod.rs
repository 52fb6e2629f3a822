//! CLI commands

pub mod check;
pub mod list;
pub mod reconcile;
pub mod release;
pub mod reserve;

pub use check::CheckCommand;
pub use list::ListCommand;
pub use reconcile::ReconcileCommand;
pub use release::ReleaseCommand;
pub use reserve::ReserveCommand;
