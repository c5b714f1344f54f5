pub mod reconcile;

pub use reconcile::{AccountReport, ReconcileError, ReconcileWindow, Reconciler};
