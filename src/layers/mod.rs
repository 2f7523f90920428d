pub mod marker;
pub mod reconciler;

pub use marker::{Marker, MarkerId, MarkerOptions};
pub use reconciler::{MarkerReconciler, ReconcileMode, ReconcileOutcome};
