//! Session orchestrator.
//!
//! DESIGN
//! ======
//! `Session` is cheap to clone; every clone shares one [`SessionState`] behind
//! an async `RwLock`, one [`QuotaGuard`] and one model handle. The lock is
//! never held across a remote call: each operation reads what it needs,
//! releases, awaits the capability, then re-locks to publish the outcome.
//!
//! A generation cycle:
//! 1. `submit` validates the form, clears the previous package, bumps the
//!    cycle id and awaits the brand identity.
//! 2. On success every image slot is marked `Pending` and `submit` spawns a
//!    background task that generates the logo and every offering image
//!    concurrently. Completions publish in whatever order they finish.
//!    `images_settled` awaits the latest such task.
//!
//! Every slot completion carries the cycle id it was issued under; results
//! from a cycle that is no longer current are dropped.
//!
//! ERROR HANDLING
//! ==============
//! Identity failures return the session to `Idle` with a generic notice.
//! Image failures stay on their slot as user-facing text for `retry_slot`.
//! Raw error values never reach the state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::brand::{BrandIdentity, BusinessForm, FormError, GeneratedImage};
use crate::error::ErrorCode;
use crate::llm::GenerativeModel;
use crate::quota::QuotaGuard;
use crate::retry::RetryPolicy;
use crate::services::GenerationError;
use crate::services::identity::generate_brand_identity;
use crate::services::image::{ImageRequest, generate_image, logo_prompt, offering_prompt};
use crate::services::location::validate_location;

/// Notice shown when a cycle is abandoned.
pub const IDENTITY_FAILURE_NOTICE: &str = "Something went wrong. Please try again.";

/// Shortest location input worth validating.
pub const MIN_LOCATION_CHARS: usize = 2;

// =============================================================================
// STATE TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    GeneratingIdentity,
    IdentityReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationStatus {
    #[default]
    Idle,
    Checking,
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Identity,
    Budget,
    Offerings,
}

/// Addressable image target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Logo,
    Offering(usize),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logo => f.write_str("logo"),
            Self::Offering(i) => write!(f, "product[{i}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Ready(GeneratedImage),
    Failed { message: String, quota: bool },
}

impl SlotState {
    fn from_result(result: Result<GeneratedImage, GenerationError>) -> Self {
        match result {
            Ok(image) => Self::Ready(image),
            Err(e) => Self::Failed { message: e.user_message(), quota: e.is_quota() },
        }
    }

    #[must_use]
    pub fn image(&self) -> Option<&GeneratedImage> {
        match self {
            Self::Ready(image) => Some(image),
            _ => None,
        }
    }
}

/// Everything the interaction layer renders.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub form: BusinessForm,
    pub location_status: LocationStatus,
    pub phase: Phase,
    /// Id of the current generation cycle; 0 before the first submit.
    pub cycle: u64,
    pub identity: Option<BrandIdentity>,
    pub slots: BTreeMap<Slot, SlotState>,
    pub view: View,
    /// Last user-facing notice, cleared on submit.
    pub notice: Option<String>,
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("a generation cycle is already running")]
    Busy,
    #[error("identity generation failed: {0}")]
    Identity(GenerationError),
    #[error("location check failed: {0}")]
    Location(GenerationError),
    #[error("cycle {0} is no longer current")]
    StaleCycle(u64),
    #[error("no brand identity in this session")]
    NoIdentity,
    #[error("unknown slot {0}")]
    UnknownSlot(Slot),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Form(e) => e.error_code(),
            Self::Busy => "E_SESSION_BUSY",
            Self::Identity(e) | Self::Location(e) => e.error_code(),
            Self::StaleCycle(_) => "E_STALE_CYCLE",
            Self::NoIdentity => "E_NO_IDENTITY",
            Self::UnknownSlot(_) => "E_UNKNOWN_SLOT",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Identity(e) | Self::Location(e) => e.retryable(),
            Self::Busy => true,
            _ => false,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Clone)]
pub struct Session {
    llm: Arc<dyn GenerativeModel>,
    policy: RetryPolicy,
    quota: QuotaGuard,
    state: Arc<RwLock<SessionState>>,
    /// Image task spawned by the latest successful submit.
    images: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Session {
    #[must_use]
    pub fn new(llm: Arc<dyn GenerativeModel>, policy: RetryPolicy) -> Self {
        Self {
            llm,
            policy,
            quota: QuotaGuard::new(),
            state: Arc::new(RwLock::new(SessionState::default())),
            images: Arc::new(Mutex::new(None)),
        }
    }

    /// Copy of the full state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase
    }

    pub async fn cycle(&self) -> u64 {
        self.state.read().await.cycle
    }

    pub async fn identity(&self) -> Option<BrandIdentity> {
        self.state.read().await.identity.clone()
    }

    pub async fn slot(&self, slot: Slot) -> Option<SlotState> {
        self.state.read().await.slots.get(&slot).cloned()
    }

    pub async fn notice(&self) -> Option<String> {
        self.state.read().await.notice.clone()
    }

    pub async fn form(&self) -> BusinessForm {
        self.state.read().await.form.clone()
    }

    pub async fn location_status(&self) -> LocationStatus {
        self.state.read().await.location_status
    }

    pub async fn view(&self) -> View {
        self.state.read().await.view
    }

    #[must_use]
    pub fn quota_blocked(&self) -> bool {
        self.quota.is_blocked()
    }

    /// Edit the form. A changed location resets its check status.
    pub async fn update_form(&self, edit: impl FnOnce(&mut BusinessForm)) {
        let mut state = self.state.write().await;
        let before = state.form.location.clone();
        edit(&mut state.form);
        if state.form.location != before {
            state.location_status = LocationStatus::Idle;
        }
    }

    /// Switch the visible view. Never triggers generation.
    pub async fn select_view(&self, view: View) {
        self.state.write().await.view = view;
    }

    // =========================================================================
    // LOCATION
    // =========================================================================

    /// Validate the current location input and adopt its normalized name.
    ///
    /// Inputs shorter than [`MIN_LOCATION_CHARS`] are not checked. A verdict
    /// for an input the user has since edited is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Location`] when the remote call fails after
    /// retries; the status returns to `Idle`.
    pub async fn check_location(&self) -> Result<LocationStatus, SessionError> {
        let input = {
            let mut state = self.state.write().await;
            let input = state.form.location.trim().to_string();
            if input.chars().count() < MIN_LOCATION_CHARS {
                state.location_status = LocationStatus::Idle;
                return Ok(LocationStatus::Idle);
            }
            state.location_status = LocationStatus::Checking;
            input
        };

        let result = validate_location(self.llm.as_ref(), &self.policy, &input).await;

        let mut state = self.state.write().await;
        if state.form.location.trim() != input {
            debug!(input, "session: location edited during check; dropping verdict");
            return Ok(state.location_status);
        }
        match result {
            Ok(verdict) if verdict.is_valid => {
                state.form.location = verdict.normalized_name;
                state.location_status = LocationStatus::Valid;
            }
            Ok(_) => state.location_status = LocationStatus::Invalid,
            Err(e) => {
                warn!(error = %e, "session: location check failed");
                state.location_status = LocationStatus::Idle;
                return Err(SessionError::Location(e));
            }
        }
        Ok(state.location_status)
    }

    // =========================================================================
    // GENERATION CYCLE
    // =========================================================================

    /// Start a new cycle and generate its brand identity.
    ///
    /// On success the cycle's images are launched in the background and the
    /// new cycle id is returned; see [`Session::images_settled`].
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] while another identity call is running
    /// - [`SessionError::Form`] for missing fields or a rejected location
    /// - [`SessionError::Identity`] when generation fails; the session is
    ///   back to `Idle` with [`IDENTITY_FAILURE_NOTICE`]
    pub async fn submit(&self) -> Result<u64, SessionError> {
        let (cycle, request) = {
            let mut state = self.state.write().await;
            if state.phase == Phase::GeneratingIdentity {
                return Err(SessionError::Busy);
            }
            let request = state.form.to_request()?;
            if state.location_status == LocationStatus::Invalid {
                return Err(FormError::LocationInvalid(request.location).into());
            }
            state.cycle += 1;
            state.phase = Phase::GeneratingIdentity;
            state.identity = None;
            state.slots.clear();
            state.notice = None;
            (state.cycle, request)
        };
        info!(cycle, location = %request.location, "session: cycle started");

        let result = generate_brand_identity(self.llm.as_ref(), &self.policy, &request).await;

        let mut state = self.state.write().await;
        let identity = match result {
            Ok(identity) => identity,
            Err(e) => {
                warn!(cycle, error = %e, code = e.error_code(), "session: identity failed; cycle abandoned");
                state.phase = Phase::Idle;
                state.notice = Some(IDENTITY_FAILURE_NOTICE.to_string());
                return Err(SessionError::Identity(e));
            }
        };
        let normalized = identity.normalized_location.trim();
        if !normalized.is_empty() && normalized != state.form.location {
            state.form.location = normalized.to_string();
        }
        state.slots.insert(Slot::Logo, SlotState::Pending);
        for index in 0..identity.products.len() {
            state.slots.insert(Slot::Offering(index), SlotState::Pending);
        }
        info!(cycle, offerings = identity.products.len(), "session: identity ready");
        state.identity = Some(identity);
        state.phase = Phase::IdentityReady;
        state.view = View::Identity;
        drop(state);

        self.spawn_images(cycle).await;
        Ok(cycle)
    }

    async fn spawn_images(&self, cycle: u64) {
        let session = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = session.generate_images(cycle).await {
                debug!(cycle, error = %e, "session: image task skipped");
            }
        });
        // A superseded task keeps running; its results are fenced by cycle.
        *self.images.lock().await = Some(handle);
    }

    /// Wait for the images launched by the latest successful submit.
    pub async fn images_settled(&self) {
        let Some(handle) = self.images.lock().await.take() else {
            return;
        };
        if let Err(e) = handle.await {
            warn!(error = %e, "session: image task failed");
        }
    }

    /// Generate the logo and every offering image of `cycle` concurrently.
    ///
    /// Offerings use the logo as reference only if it is already `Ready`
    /// when they launch.
    ///
    /// # Errors
    ///
    /// - [`SessionError::StaleCycle`] when `cycle` is not current
    /// - [`SessionError::NoIdentity`] when the cycle has no identity
    async fn generate_images(&self, cycle: u64) -> Result<(), SessionError> {
        let (identity, logo) = self.cycle_inputs(cycle).await?;

        let mut jobs = Vec::with_capacity(identity.products.len() + 1);
        jobs.push((Slot::Logo, ImageRequest::new(logo_prompt(&identity))));
        for index in 0..identity.products.len() {
            if let Some(prompt) = offering_prompt(&identity, index, logo.is_some()) {
                jobs.push((Slot::Offering(index), ImageRequest::new(prompt).with_reference(logo.clone())));
            }
        }
        info!(cycle, slots = jobs.len(), "session: generating images");

        join_all(
            jobs.into_iter()
                .map(|(slot, request)| self.run_slot(cycle, slot, request)),
        )
        .await;
        Ok(())
    }

    /// Regenerate one slot of the current cycle.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoIdentity`] before the first successful cycle
    /// - [`SessionError::UnknownSlot`] for an offering index the identity lacks
    pub async fn retry_slot(&self, slot: Slot) -> Result<SlotState, SessionError> {
        let cycle = self.cycle().await;
        let (identity, logo) = self.cycle_inputs(cycle).await?;
        let request = match slot {
            Slot::Logo => ImageRequest::new(logo_prompt(&identity)),
            Slot::Offering(index) => {
                let prompt = offering_prompt(&identity, index, logo.is_some()).ok_or(SessionError::UnknownSlot(slot))?;
                ImageRequest::new(prompt).with_reference(logo)
            }
        };
        info!(cycle, %slot, "session: retrying slot");
        self.state.write().await.slots.insert(slot, SlotState::Pending);
        Ok(self.run_slot(cycle, slot, request).await)
    }

    async fn cycle_inputs(&self, cycle: u64) -> Result<(BrandIdentity, Option<GeneratedImage>), SessionError> {
        let state = self.state.read().await;
        if state.cycle != cycle {
            return Err(SessionError::StaleCycle(cycle));
        }
        let identity = state.identity.clone().ok_or(SessionError::NoIdentity)?;
        let logo = state
            .slots
            .get(&Slot::Logo)
            .and_then(SlotState::image)
            .cloned();
        Ok((identity, logo))
    }

    /// Run one image attempt and publish it if `cycle` is still current.
    async fn run_slot(&self, cycle: u64, slot: Slot, request: ImageRequest) -> SlotState {
        let result = generate_image(self.llm.as_ref(), &self.policy, &self.quota, &request).await;
        let outcome = SlotState::from_result(result);

        let mut state = self.state.write().await;
        if state.cycle != cycle {
            debug!(cycle, current = state.cycle, %slot, "session: discarding stale slot result");
            return outcome;
        }
        match &outcome {
            SlotState::Ready(_) => info!(cycle, %slot, "session: slot ready"),
            SlotState::Failed { message, quota } => {
                warn!(cycle, %slot, quota = *quota, reason = %message, "session: slot failed");
            }
            SlotState::Pending => {}
        }
        state.slots.insert(slot, outcome.clone());
        outcome
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
