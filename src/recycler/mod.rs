//! Rotation core.
//!
//! [`Reconciler::reconcile`] is the single entry point: it asks the
//! [`scheduler`] whether a policy is due, and if so checks the target secret
//! is writable, runs the [`CredentialRotator`] and then the
//! [`SecretPublisher`]. Collaborators are injected as trait objects; nothing
//! here retries or spawns tasks.

pub mod clock;
pub mod error;
pub mod policy;
pub mod publisher;
pub mod reconciler;
pub mod rotator;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{RecyclerError, Result};
pub use policy::{RotationPolicy, RotationState};
pub use publisher::{PublishTarget, SecretPublisher};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use rotator::{CredentialRotator, CREDENTIAL_CEILING};
pub use scheduler::{due_check, next_run, DueCheck};
