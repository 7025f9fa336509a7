#![forbid(unsafe_code)]

//! Drag session coordination.
//!
//! A [`DragManager`] owns a registry of [`DragListener`]s and at most one
//! [`DragSession`]. Listeners are shared, single-threaded handles
//! (`Rc<RefCell<dyn DragListener>>`); the manager never knows what they
//! render or mutate.
//!
//! # Lifecycle
//!
//! `Idle → Active → Idle`:
//!
//! 1. [`DragManager::begin_session`] records the start position, shows the
//!    avatar and asks every registered listener whether it wants the
//!    session. Those that say yes become the *active* listeners, in
//!    registration order.
//! 2. Each pointer move updates the avatar offset and offers the position
//!    to the active listeners until one claims it.
//! 3. Pointer-up offers a [`DropRequest`] to the active listeners in order;
//!    the first to accept wins and no later listener is asked.
//! 4. Cleanup calls `on_session_end` on every active listener, removes the
//!    avatar and clears the session.
//!
//! # Invariants
//!
//! 1. At most one session exists per manager; a second
//!    [`begin_session`](DragManager::begin_session) is rejected.
//! 2. Cleanup runs exactly once per session, whatever the outcome.
//! 3. At most one listener performs the drop.
//! 4. A failing or panicking listener never keeps the others from being
//!    asked or cleaned up.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Fallback |
//! |---------|-------|----------|
//! | Second session | `begin_session` while active | `DragError::SessionActive` |
//! | Listener returns `Err` | Hook failed | Logged at warn, treated as decline |
//! | Listener panics | Bug in a hook | Caught, logged at warn, treated as decline¹ |
//! | Listener already borrowed | Reentrant call into the same listener | Skipped, logged at warn |
//! | Escape pressed mid-drag | User cancellation | Session cancelled (if `cancel_on_escape`) |
//!
//! ¹ Only where panics unwind. Under `panic = "abort"` (the workspace release
//! profile) a panicking hook still aborts the process.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use rulekit_core::geometry::{Position, Rect};

// ---------------------------------------------------------------------------
// DragPayload
// ---------------------------------------------------------------------------

/// Data carried during a drag.
///
/// `kind` is a MIME-like string listeners match against; `data` is an
/// arbitrary typed value recovered with [`DragPayload::downcast_ref`].
pub struct DragPayload {
    /// Type identifier (e.g. `"rulekit/rule"`).
    pub kind: String,
    data: Box<dyn Any>,
    /// Human-readable preview text shown on the avatar.
    pub display_text: Option<String>,
}

impl fmt::Debug for DragPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragPayload")
            .field("kind", &self.kind)
            .field("data", &"..")
            .field("display_text", &self.display_text)
            .finish()
    }
}

impl DragPayload {
    #[must_use]
    pub fn new<T: Any>(kind: impl Into<String>, data: T) -> Self {
        Self {
            kind: kind.into(),
            data: Box::new(data),
            display_text: None,
        }
    }

    #[must_use]
    pub fn with_display_text(mut self, text: impl Into<String>) -> Self {
        self.display_text = Some(text.into());
        self
    }

    /// The carried value, if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }

    /// Returns true if the payload kind matches the given pattern.
    ///
    /// Supports exact match, `*` / `*/*`, and wildcard prefix (e.g.
    /// `"rulekit/*"`).
    #[must_use]
    pub fn matches_kind(&self, pattern: &str) -> bool {
        if pattern == "*" || pattern == "*/*" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            self.kind.starts_with(prefix) && self.kind.as_bytes().get(prefix.len()) == Some(&b'/')
        } else {
            self.kind == pattern
        }
    }
}

// ---------------------------------------------------------------------------
// DragConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragConfig {
    /// Whether [`DragInput::Escape`] cancels an active drag (default: true).
    pub cancel_on_escape: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            cancel_on_escape: true,
        }
    }
}

impl DragConfig {
    /// Create a config where Escape does not cancel drags.
    #[must_use]
    pub fn no_escape_cancel(mut self) -> Self {
        self.cancel_on_escape = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The visual that follows the pointer during a drag.
pub trait DragAvatar {
    fn show(&mut self);

    /// Offset from the position the drag started at.
    fn set_offset(&mut self, dx: i32, dy: i32);

    /// Current on-screen bounds, if known.
    fn bounds(&self) -> Option<Rect>;

    fn remove(&mut self);
}

/// A drop-target participant in drag sessions.
///
/// Hooks are called on the thread driving the [`DragManager`], never
/// concurrently. `on_release` and `on_session_end` may fail; failures are
/// logged by the manager and do not affect other listeners.
pub trait DragListener {
    /// Whether this listener wants to take part in the session.
    fn on_session_start(&mut self, payload: &DragPayload) -> bool;

    /// Pointer moved. Return true to claim the position, which stops the
    /// manager from offering it to later listeners.
    fn on_hover(&mut self, pointer: Position) -> bool;

    /// Pointer released. `Ok(true)` accepts the drop.
    fn on_release(&mut self, request: &DropRequest<'_>) -> Result<bool, DragListenerError>;

    /// The session is over. Called exactly once per session on every active
    /// listener.
    fn on_session_end(&mut self, outcome: SessionOutcome) -> Result<(), DragListenerError>;
}

/// Shared handle to a registered listener.
pub type SharedListener = Rc<RefCell<dyn DragListener>>;

/// What a listener sees when the pointer is released.
#[derive(Debug)]
pub struct DropRequest<'a> {
    pub payload: &'a DragPayload,
    pub pointer: Position,
    pub avatar_bounds: Option<Rect>,
}

// ---------------------------------------------------------------------------
// Ids, inputs, outcomes, errors
// ---------------------------------------------------------------------------

/// Registration handle returned by [`DragManager::register_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Pointer and keyboard input forwarded by the host while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragInput {
    PointerMove(Position),
    PointerUp(Position),
    Escape,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A listener accepted the drop.
    Dropped { by: ListenerId },
    /// Nobody accepted, or the session was aborted.
    Cancelled,
}

/// What [`DragManager::handle_input`] did with an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragDispatch {
    /// No session, or an input the configuration ignores.
    Ignored,
    /// Pointer moved; `handled_by` is the listener that claimed it.
    Hovered { handled_by: Option<ListenerId> },
    /// The session ended.
    Finished(SessionOutcome),
}

/// Drag manager misuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    /// A session is already running on this manager.
    SessionActive,
}

impl fmt::Display for DragError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionActive => write!(f, "a drag session is already active"),
        }
    }
}

impl std::error::Error for DragError {}

/// Failure reported by (or captured from) a listener hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragListenerError {
    pub message: String,
}

impl DragListenerError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self { message }
    }
}

impl fmt::Display for DragListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DragListenerError {}

// ---------------------------------------------------------------------------
// DragSession
// ---------------------------------------------------------------------------

/// The active drag. Owned by one [`DragManager`].
pub struct DragSession {
    payload: DragPayload,
    start: Position,
    current: Position,
    avatar: Box<dyn DragAvatar>,
    active: Vec<(ListenerId, SharedListener)>,
}

impl fmt::Debug for DragSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragSession")
            .field("payload", &self.payload)
            .field("start", &self.start)
            .field("current", &self.current)
            .field("active", &self.active_listeners().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl DragSession {
    #[must_use]
    pub fn payload(&self) -> &DragPayload {
        &self.payload
    }

    #[must_use]
    pub fn start(&self) -> Position {
        self.start
    }

    #[must_use]
    pub fn current(&self) -> Position {
        self.current
    }

    /// Delta from start to current position as `(dx, dy)`.
    #[must_use]
    pub fn delta(&self) -> (i32, i32) {
        self.start.delta_to(self.current)
    }

    /// Manhattan distance from start to current position.
    #[must_use]
    pub fn distance(&self) -> u32 {
        self.start.manhattan_distance(self.current)
    }

    /// Listeners that claimed the session, in registration order.
    pub fn active_listeners(&self) -> impl Iterator<Item = ListenerId> + '_ {
        self.active.iter().map(|(id, _)| *id)
    }
}

// ---------------------------------------------------------------------------
// DragManager
// ---------------------------------------------------------------------------

/// Listener registry plus the current session.
pub struct DragManager {
    config: DragConfig,
    listeners: Vec<(ListenerId, SharedListener)>,
    next_id: u64,
    session: Option<DragSession>,
}

impl fmt::Debug for DragManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragManager")
            .field("config", &self.config)
            .field(
                "listeners",
                &self.listeners.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            )
            .field("session", &self.session)
            .finish()
    }
}

impl Default for DragManager {
    fn default() -> Self {
        Self::new(DragConfig::default())
    }
}

impl DragManager {
    #[must_use]
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            listeners: Vec::new(),
            next_id: 1,
            session: None,
        }
    }

    /// Add a listener. It takes part in sessions started from now on.
    pub fn register_listener(&mut self, listener: SharedListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener from the registry.
    ///
    /// A running session keeps its own handle, so a listener removed
    /// mid-drag still receives `on_session_end`.
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Start a session at `pointer`.
    ///
    /// `make_avatar` is only called once the session is known to start.
    pub fn begin_session(
        &mut self,
        payload: DragPayload,
        pointer: Position,
        make_avatar: impl FnOnce(&DragPayload) -> Box<dyn DragAvatar>,
    ) -> Result<(), DragError> {
        if self.session.is_some() {
            tracing::debug!(kind = %payload.kind, "drag rejected: session already active");
            return Err(DragError::SessionActive);
        }

        let mut avatar = make_avatar(&payload);
        avatar.show();

        let mut active = Vec::new();
        for (id, listener) in &self.listeners {
            let wants = call_listener(*id, listener, "on_session_start", |l| {
                Ok(l.on_session_start(&payload))
            });
            if wants == Some(true) {
                active.push((*id, Rc::clone(listener)));
            }
        }

        tracing::debug!(
            kind = %payload.kind,
            x = pointer.x,
            y = pointer.y,
            active = active.len(),
            "drag session started"
        );
        self.session = Some(DragSession {
            payload,
            start: pointer,
            current: pointer,
            avatar,
            active,
        });
        Ok(())
    }

    /// Feed one input to the running session.
    pub fn handle_input(&mut self, input: DragInput) -> DragDispatch {
        if self.session.is_none() {
            return DragDispatch::Ignored;
        }
        match input {
            DragInput::PointerMove(pointer) => DragDispatch::Hovered {
                handled_by: self.pointer_move(pointer),
            },
            DragInput::PointerUp(pointer) => {
                let outcome = self.release(pointer);
                DragDispatch::Finished(self.finish(outcome))
            }
            DragInput::Escape if self.config.cancel_on_escape => {
                DragDispatch::Finished(self.finish(SessionOutcome::Cancelled))
            }
            DragInput::Escape => DragDispatch::Ignored,
        }
    }

    /// Abort the running session. Returns `None` when idle.
    pub fn cancel(&mut self) -> Option<SessionOutcome> {
        self.session.as_ref()?;
        Some(self.finish(SessionOutcome::Cancelled))
    }

    fn pointer_move(&mut self, pointer: Position) -> Option<ListenerId> {
        let session = self.session.as_mut()?;
        session.current = pointer;
        let (dx, dy) = session.delta();
        session.avatar.set_offset(dx, dy);

        let handled_by = session.active.iter().find_map(|(id, listener)| {
            let claimed = call_listener(*id, listener, "on_hover", |l| Ok(l.on_hover(pointer)));
            (claimed == Some(true)).then_some(*id)
        });
        if let Some(id) = handled_by {
            tracing::trace!(listener = %id, x = pointer.x, y = pointer.y, "hover claimed");
        }
        handled_by
    }

    fn release(&mut self, pointer: Position) -> SessionOutcome {
        let Some(session) = self.session.as_mut() else {
            return SessionOutcome::Cancelled;
        };
        session.current = pointer;
        let request = DropRequest {
            payload: &session.payload,
            pointer,
            avatar_bounds: session.avatar.bounds(),
        };
        session
            .active
            .iter()
            .find_map(|(id, listener)| {
                let accepted =
                    call_listener(*id, listener, "on_release", |l| l.on_release(&request));
                (accepted == Some(true)).then_some(SessionOutcome::Dropped { by: *id })
            })
            .unwrap_or(SessionOutcome::Cancelled)
    }

    /// Cleanup. The session is taken first so it can only end once.
    fn finish(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        let Some(mut session) = self.session.take() else {
            return outcome;
        };
        for (id, listener) in &session.active {
            call_listener(*id, listener, "on_session_end", |l| l.on_session_end(outcome));
        }
        session.avatar.remove();
        tracing::debug!(?outcome, distance = session.distance(), "drag session ended");
        outcome
    }
}

/// Run one listener hook with failures and panics contained.
fn call_listener<R>(
    id: ListenerId,
    listener: &SharedListener,
    hook: &'static str,
    f: impl FnOnce(&mut dyn DragListener) -> Result<R, DragListenerError>,
) -> Option<R> {
    let Ok(mut guard) = listener.try_borrow_mut() else {
        tracing::warn!(listener = %id, hook, "drag listener already borrowed; skipped");
        return None;
    };
    match catch_unwind(AssertUnwindSafe(|| f(&mut *guard))) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            tracing::warn!(listener = %id, hook, %err, "drag listener failed");
            None
        }
        Err(payload) => {
            let err = DragListenerError::from_panic(payload);
            tracing::warn!(listener = %id, hook, %err, "drag listener panicked");
            None
        }
    }
}
