//! Drives one flow instance: validates steps, runs external actions and
//! reports where the user should go next.

use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{mask_phone, FlowKind, SymptomId},
    protocol::UserData,
};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    actions::{
        ActionFailure, ActionResult, AuthSession, ExternalActions, MissingExternalActions,
        OtpReceipt,
    },
    catalog::{self, Symptom, SymptomReport},
    error::{FlowError, ValidationError},
    session::{Field, FieldValue, Session, Verification},
    steps::{self, ActionKind, OnBack, OnConfirm, Step, StepDefinition},
};

/// How a flow ended. The session is cleared before this is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Exited,
    Authenticated(AuthSession),
    /// Registration succeeded; the user continues at the login entry.
    Registered(AuthSession),
    /// The phone number belongs in the other auth flow.
    Redirected { to: FlowKind, phone: String },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved { from: Step, to: Step },
    /// Session changed but the step did not, e.g. an OTP was sent.
    Updated,
    Blocked(ValidationError),
    Failed(ActionFailure),
    Busy,
    /// The result arrived after `back`, `reset` or `dispose` and was dropped.
    Stale,
    Finished(Terminal),
}

#[derive(Debug, Clone)]
pub enum FlowEvent {
    StepChanged { from: Step, to: Step },
    ActionStarted(ActionKind),
    ActionFailed { action: ActionKind, message: String },
    Finished(Terminal),
}

#[derive(Debug, Clone)]
pub struct FlowSnapshot {
    pub session_id: Uuid,
    pub flow: FlowKind,
    pub step: Step,
    pub fields: HashMap<Field, FieldValue>,
    pub verification: Verification,
    pub pending: Option<ActionKind>,
    /// Why confirm would be blocked right now, `None` when it is enabled.
    pub blocker: Option<ValidationError>,
}

pub struct FlowController {
    flow: FlowKind,
    actions: Arc<dyn ExternalActions>,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<FlowEvent>,
}

struct ControllerState {
    session: Session,
    /// Set while an external call is in flight; only its return clears it.
    pending: Option<ActionKind>,
    generation: u64,
    disposed: bool,
}

enum ActionRequest {
    CheckPhone { phone: String },
    SendOtp { phone: String },
    VerifyOtp { phone: String, code: String },
    Login { phone: String, password: String },
    Register(Box<UserData>),
    GoogleAuth { token: String },
}

impl ActionRequest {
    fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::CheckPhone { .. } => ActionKind::CheckPhone,
            ActionRequest::SendOtp { .. } => ActionKind::SendOtp,
            ActionRequest::VerifyOtp { .. } => ActionKind::VerifyOtp,
            ActionRequest::Login { .. } => ActionKind::Login,
            ActionRequest::Register(_) => ActionKind::Register,
            ActionRequest::GoogleAuth { .. } => ActionKind::GoogleAuth,
        }
    }

    /// Captures the inputs of a confirm-triggered action from the session.
    /// `None` for actions that take input from outside the session.
    fn for_confirm(kind: ActionKind, session: &Session) -> Result<Option<Self>, ValidationError> {
        let phone = || session.phone().ok_or(ValidationError::EmptyPhone);
        Ok(Some(match kind {
            ActionKind::CheckPhone => ActionRequest::CheckPhone { phone: phone()? },
            ActionKind::SendOtp => ActionRequest::SendOtp { phone: phone()? },
            ActionKind::VerifyOtp => ActionRequest::VerifyOtp {
                phone: phone()?,
                code: session
                    .text(Field::OtpCode)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            },
            ActionKind::Login => ActionRequest::Login {
                phone: phone()?,
                password: session.text(Field::Password).unwrap_or_default().to_string(),
            },
            ActionKind::Register => ActionRequest::Register(Box::new(session.user_data()?)),
            ActionKind::GoogleAuth => return Ok(None),
        }))
    }
}

enum ActionResponse {
    PhoneExists(bool),
    OtpSent(OtpReceipt),
    OtpVerified,
    Authenticated(AuthSession),
    Registered(AuthSession),
}

impl FlowController {
    /// Controller without a backend; enough for the symptom-check flow.
    pub fn new(flow: FlowKind) -> Arc<Self> {
        Self::new_with_actions(flow, Arc::new(MissingExternalActions))
    }

    pub fn new_with_actions(flow: FlowKind, actions: Arc<dyn ExternalActions>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            flow,
            actions,
            inner: Mutex::new(ControllerState {
                session: Session::new(flow),
                pending: None,
                generation: 0,
                disposed: false,
            }),
            events,
        })
    }

    pub fn flow(&self) -> FlowKind {
        self.flow
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Result<FlowSnapshot, FlowError> {
        let state = self.lock_active().await?;
        let blocker = self.definition_for(&state.session)?.precondition;
        Ok(FlowSnapshot {
            session_id: state.session.id(),
            flow: self.flow,
            step: state.session.step(),
            fields: state.session.fields().clone(),
            verification: state.session.verification().clone(),
            pending: state.pending,
            blocker: blocker(&state.session).err(),
        })
    }

    pub async fn current_step(&self) -> Result<Step, FlowError> {
        Ok(self.lock_active().await?.session.step())
    }

    pub async fn set_field(&self, field: Field, value: FieldValue) -> Result<(), FlowError> {
        let mut state = self.lock_active().await?;
        state.session.set(field, value)
    }

    pub async fn set_text(&self, field: Field, value: impl Into<String>) -> Result<(), FlowError> {
        self.set_field(field, FieldValue::text(value)).await
    }

    /// Returns `false` when the symptom was already selected.
    pub async fn add_symptom(&self, id: SymptomId) -> Result<bool, FlowError> {
        self.ensure_flow(FlowKind::SymptomCheck)?;
        if catalog::symptom_by_id(id).is_none() {
            return Err(FlowError::UnknownSymptom(id));
        }
        let mut state = self.lock_active().await?;
        state.session.add_symptom(id)
    }

    pub async fn remove_symptom(&self, id: SymptomId) -> Result<bool, FlowError> {
        self.ensure_flow(FlowKind::SymptomCheck)?;
        let mut state = self.lock_active().await?;
        state.session.remove_symptom(id)
    }

    /// Catalog symptoms suggested by the complaint text.
    pub async fn predicted_symptoms(&self) -> Result<Vec<&'static Symptom>, FlowError> {
        self.ensure_flow(FlowKind::SymptomCheck)?;
        let state = self.lock_active().await?;
        Ok(catalog::predict(
            state.session.text(Field::SymptomText).unwrap_or_default(),
        ))
    }

    /// Catalog search that leaves out symptoms already selected.
    pub async fn search_symptoms(&self, query: &str) -> Result<Vec<&'static Symptom>, FlowError> {
        self.ensure_flow(FlowKind::SymptomCheck)?;
        let state = self.lock_active().await?;
        Ok(catalog::search(query, &state.session.selected_symptoms()))
    }

    pub async fn report(&self) -> Result<SymptomReport, FlowError> {
        self.ensure_flow(FlowKind::SymptomCheck)?;
        let state = self.lock_active().await?;
        let session = &state.session;
        if session.step() != Step::Result {
            return Err(FlowError::NotAtStep {
                expected: Step::Result,
                actual: session.step(),
            });
        }
        Ok(SymptomReport {
            complaint: session
                .text(Field::SymptomText)
                .unwrap_or_default()
                .trim()
                .to_string(),
            symptoms: session
                .selected_symptoms()
                .into_iter()
                .filter_map(catalog::symptom_by_id)
                .copied()
                .collect(),
            duration: session
                .duration()
                .ok_or(ValidationError::NoDurationSelected)?,
            severity: session
                .severity()
                .ok_or(ValidationError::NoSeveritySelected)?,
            facilities: catalog::recommend_facilities(),
        })
    }

    /// Attempts to leave the current step forward.
    pub async fn confirm(&self) -> Result<Outcome, FlowError> {
        let (request, generation) = {
            let mut state = self.lock_active().await?;
            if let Some(kind) = state.pending {
                debug!("flow: {} confirm ignored, {kind:?} pending", self.flow);
                return Ok(Outcome::Busy);
            }
            let definition = self.definition_for(&state.session)?;
            if let Err(reason) = (definition.precondition)(&state.session) {
                debug!(
                    "flow: {} confirm blocked at {:?}: {reason}",
                    self.flow, definition.id
                );
                return Ok(Outcome::Blocked(reason));
            }

            match definition.on_confirm {
                OnConfirm::Advance(to) => return Ok(self.move_to(&mut state, to)),
                OnConfirm::Reset => return Ok(self.finish(&mut state, Terminal::Reset)),
                OnConfirm::Invoke(kind) => {
                    let request = match ActionRequest::for_confirm(kind, &state.session) {
                        Ok(Some(request)) => request,
                        Ok(None) => return Err(FlowError::UnsupportedInFlow(self.flow)),
                        Err(reason) => return Ok(Outcome::Blocked(reason)),
                    };
                    state.pending = Some(kind);
                    (request, state.generation)
                }
            }
        };
        self.run_action(request, generation).await
    }

    /// Sends (or resends) the verification code for the entered phone number.
    pub async fn request_otp(&self) -> Result<Outcome, FlowError> {
        self.ensure_auth_flow()?;
        let (request, generation) = {
            let mut state = self.lock_active().await?;
            if state.pending.is_some() {
                return Ok(Outcome::Busy);
            }
            let step = state.session.step();
            if step != Step::Verification {
                return Err(FlowError::NotAtStep {
                    expected: Step::Verification,
                    actual: step,
                });
            }
            let Some(phone) = state.session.phone() else {
                return Ok(Outcome::Blocked(ValidationError::EmptyPhone));
            };
            state.pending = Some(ActionKind::SendOtp);
            (ActionRequest::SendOtp { phone }, state.generation)
        };
        self.run_action(request, generation).await
    }

    pub async fn sign_in_with_google(&self, token: &str) -> Result<Outcome, FlowError> {
        self.ensure_auth_flow()?;
        let generation = {
            let mut state = self.lock_active().await?;
            if state.pending.is_some() {
                return Ok(Outcome::Busy);
            }
            let step = state.session.step();
            if step != Step::PhoneEntry {
                return Err(FlowError::NotAtStep {
                    expected: Step::PhoneEntry,
                    actual: step,
                });
            }
            state.pending = Some(ActionKind::GoogleAuth);
            state.generation
        };
        let request = ActionRequest::GoogleAuth {
            token: token.trim().to_string(),
        };
        self.run_action(request, generation).await
    }

    /// Returns to the previous step, keeping every entered value. The result
    /// of an action still in flight will be dropped when it returns.
    pub async fn back(&self) -> Result<Outcome, FlowError> {
        let mut state = self.lock_active().await?;
        self.invalidate_pending(&mut state);
        let definition = self.definition_for(&state.session)?;
        Ok(match definition.on_back {
            OnBack::Previous(to) => self.move_to(&mut state, to),
            OnBack::Exit => self.finish(&mut state, Terminal::Exited),
        })
    }

    /// Clears the session and starts the flow over.
    pub async fn reset(&self) -> Result<(), FlowError> {
        let mut state = self.lock_active().await?;
        self.invalidate_pending(&mut state);
        let from = state.session.step();
        state.session.clear();
        info!("flow: {} reset", self.flow);
        let to = state.session.step();
        if from != to {
            let _ = self.events.send(FlowEvent::StepChanged { from, to });
        }
        Ok(())
    }

    /// Ends the controller; later calls fail with [`FlowError::Disposed`].
    pub async fn dispose(&self) {
        let mut state = self.inner.lock().await;
        if state.disposed {
            return;
        }
        self.invalidate_pending(&mut state);
        state.session.clear();
        state.disposed = true;
        info!("flow: {} disposed", self.flow);
    }

    async fn lock_active(&self) -> Result<MutexGuard<'_, ControllerState>, FlowError> {
        let state = self.inner.lock().await;
        if state.disposed {
            return Err(FlowError::Disposed);
        }
        Ok(state)
    }

    fn ensure_flow(&self, flow: FlowKind) -> Result<(), FlowError> {
        if self.flow == flow {
            Ok(())
        } else {
            Err(FlowError::UnsupportedInFlow(self.flow))
        }
    }

    fn ensure_auth_flow(&self) -> Result<(), FlowError> {
        match self.flow {
            FlowKind::Login | FlowKind::Register => Ok(()),
            FlowKind::SymptomCheck => Err(FlowError::UnsupportedInFlow(self.flow)),
        }
    }

    fn definition_for(&self, session: &Session) -> Result<&'static StepDefinition, FlowError> {
        steps::definition(self.flow, session.step()).ok_or(FlowError::NotAtStep {
            expected: steps::initial_step(self.flow),
            actual: session.step(),
        })
    }

    fn invalidate_pending(&self, state: &mut ControllerState) {
        if let Some(kind) = state.pending {
            debug!("flow: {} result of pending {kind:?} will be dropped", self.flow);
        }
        state.generation += 1;
    }

    fn move_to(&self, state: &mut ControllerState, to: Step) -> Outcome {
        let from = state.session.step();
        state.session.move_to(to);
        info!("flow: {} {from:?} -> {to:?}", self.flow);
        let _ = self.events.send(FlowEvent::StepChanged { from, to });
        Outcome::Moved { from, to }
    }

    fn finish(&self, state: &mut ControllerState, terminal: Terminal) -> Outcome {
        state.session.clear();
        match &terminal {
            Terminal::Redirected { to, phone } => {
                info!(
                    "flow: {} redirected to {to} for {}",
                    self.flow,
                    mask_phone(phone)
                );
            }
            other => info!("flow: {} finished: {}", self.flow, terminal_label(other)),
        }
        let _ = self.events.send(FlowEvent::Finished(terminal.clone()));
        Outcome::Finished(terminal)
    }

    async fn run_action(
        &self,
        request: ActionRequest,
        generation: u64,
    ) -> Result<Outcome, FlowError> {
        let kind = request.kind();
        let _ = self.events.send(FlowEvent::ActionStarted(kind));
        let result = self.execute(request).await;

        let mut state = self.inner.lock().await;
        state.pending = None;
        if state.disposed || state.generation != generation {
            debug!("flow: {} dropping stale {kind:?} result", self.flow);
            return Ok(Outcome::Stale);
        }

        match result {
            Ok(response) => Ok(self.apply(&mut state, response)),
            Err(failure) => {
                warn!("flow: {} {kind:?} failed: {failure}", self.flow);
                let _ = self.events.send(FlowEvent::ActionFailed {
                    action: kind,
                    message: failure.message.clone(),
                });
                Ok(Outcome::Failed(failure))
            }
        }
    }

    async fn execute(&self, request: ActionRequest) -> ActionResult<ActionResponse> {
        match request {
            ActionRequest::CheckPhone { phone } => {
                debug!("flow: checking phone {}", mask_phone(&phone));
                self.actions
                    .check_phone_exists(&phone)
                    .await
                    .map(ActionResponse::PhoneExists)
            }
            ActionRequest::SendOtp { phone } => {
                debug!("flow: sending otp to {}", mask_phone(&phone));
                self.actions
                    .send_otp(&phone)
                    .await
                    .map(ActionResponse::OtpSent)
            }
            ActionRequest::VerifyOtp { phone, code } => self
                .actions
                .verify_otp(&phone, &code)
                .await
                .map(|()| ActionResponse::OtpVerified),
            ActionRequest::Login { phone, password } => self
                .actions
                .login(&phone, &password)
                .await
                .map(ActionResponse::Authenticated),
            ActionRequest::Register(user) => self
                .actions
                .register(&user)
                .await
                .map(ActionResponse::Registered),
            ActionRequest::GoogleAuth { token } => self
                .actions
                .google_auth(&token)
                .await
                .map(ActionResponse::Authenticated),
        }
    }

    fn apply(&self, state: &mut ControllerState, response: ActionResponse) -> Outcome {
        match response {
            ActionResponse::PhoneExists(exists) => {
                // login expects a known number, registration an unknown one
                if exists == (self.flow == FlowKind::Login) {
                    self.advance(state)
                } else {
                    let to = if exists {
                        FlowKind::Login
                    } else {
                        FlowKind::Register
                    };
                    let phone = state.session.phone().unwrap_or_default();
                    self.finish(state, Terminal::Redirected { to, phone })
                }
            }
            ActionResponse::OtpSent(receipt) => {
                let verification = state.session.verification_mut();
                verification.otp_sent = true;
                verification.verification_id = receipt.verification_id;
                info!("flow: {} otp sent", self.flow);
                Outcome::Updated
            }
            ActionResponse::OtpVerified => {
                state.session.verification_mut().verified = true;
                self.advance(state)
            }
            ActionResponse::Authenticated(auth) => self.finish(state, Terminal::Authenticated(auth)),
            ActionResponse::Registered(auth) => self.finish(state, Terminal::Registered(auth)),
        }
    }

    fn advance(&self, state: &mut ControllerState) -> Outcome {
        match steps::next(self.flow, state.session.step()) {
            Some(to) => self.move_to(state, to),
            None => Outcome::Updated,
        }
    }
}

fn terminal_label(terminal: &Terminal) -> &'static str {
    match terminal {
        Terminal::Exited => "exited",
        Terminal::Authenticated(_) => "authenticated",
        Terminal::Registered(_) => "registered",
        Terminal::Redirected { .. } => "redirected",
        Terminal::Reset => "reset",
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
