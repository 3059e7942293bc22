//! Accessibility tree access.
//!
//! Accessibility calls are IPC into the target process and can fail
//! transiently or hang while the process is busy or dying. Every read and
//! write made through [`AxHandle`] runs under [`retry_until_timeout`] with the
//! configured [`AxPolicy`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use tracing::{debug, trace};

use super::app::pid_t;
use super::window_server::WindowServerId;
use crate::common::config::Settings;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AxError {
    /// Accessibility is (temporarily) unavailable for the process.
    #[error("accessibility API disabled")]
    ApiDisabled,
    /// The attribute exists but has no value yet.
    #[error("no value for attribute")]
    NoValue,
    #[error("the request could not be completed")]
    CannotComplete,
    /// The element no longer exists, usually because the app quit mid-call.
    #[error("invalid element")]
    InvalidElement,
    #[error("attribute {0} unsupported")]
    AttributeUnsupported(&'static str),
    #[error("action {0} unsupported")]
    ActionUnsupported(&'static str),
    #[error("attribute {attribute} has unexpected type, expected {expected}")]
    TypeMismatch { attribute: &'static str, expected: &'static str },
    #[error("accessibility call timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}

impl AxError {
    pub fn is_transient(&self) -> bool { matches!(self, AxError::ApiDisabled | AxError::NoValue) }
}

pub type AxResult<T> = Result<T, AxError>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum AxAttribute {
    #[strum(serialize = "AXRole")]
    Role,
    #[strum(serialize = "AXSubrole")]
    Subrole,
    #[strum(serialize = "AXTitle")]
    Title,
    #[strum(serialize = "AXMinimized")]
    Minimized,
    #[strum(serialize = "AXFullScreen")]
    FullScreen,
    #[strum(serialize = "AXWindows")]
    Windows,
    #[strum(serialize = "AXFocusedWindow")]
    FocusedWindow,
    #[strum(serialize = "AXChildren")]
    Children,
    #[strum(serialize = "AXCloseButton")]
    CloseButton,
    #[strum(serialize = "AXURL")]
    Url,
    #[strum(serialize = "AXStatusLabel")]
    StatusLabel,
    #[strum(serialize = "AXIsApplicationRunning")]
    IsApplicationRunning,
}

impl AxAttribute {
    pub fn name(self) -> &'static str { self.into() }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum AxAction {
    #[strum(serialize = "AXRaise")]
    Raise,
    #[strum(serialize = "AXPress")]
    Press,
}

pub mod role {
    pub const WINDOW: &str = "AXWindow";
    pub const LIST: &str = "AXList";
    pub const STANDARD_WINDOW: &str = "AXStandardWindow";
    pub const DIALOG: &str = "AXDialog";
    pub const APPLICATION_DOCK_ITEM: &str = "AXApplicationDockItem";
}

pub type AxRef = Arc<dyn AxElement>;

#[derive(Debug, Clone)]
pub enum AxValue {
    Bool(bool),
    String(String),
    Url(String),
    Element(AxRef),
    Elements(Vec<AxRef>),
}

/// A single node of some process's accessibility tree.
pub trait AxElement: fmt::Debug + Send + Sync {
    fn attribute(&self, attribute: AxAttribute) -> AxResult<AxValue>;
    fn set_attribute(&self, attribute: AxAttribute, value: AxValue) -> AxResult<()>;
    fn perform_action(&self, action: AxAction) -> AxResult<()>;
    /// The window server id backing this element, if it is a window.
    fn window_id(&self) -> AxResult<WindowServerId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxNotificationKind {
    WindowCreated,
    UiElementDestroyed,
    TitleChanged,
    MiniaturizedChanged,
    Moved,
    FocusedWindowChanged,
}

impl AxNotificationKind {
    /// Everything an application is observed for.
    pub const WINDOW_EVENTS: [AxNotificationKind; 6] = [
        AxNotificationKind::WindowCreated,
        AxNotificationKind::UiElementDestroyed,
        AxNotificationKind::TitleChanged,
        AxNotificationKind::MiniaturizedChanged,
        AxNotificationKind::Moved,
        AxNotificationKind::FocusedWindowChanged,
    ];
}

#[derive(Debug, Clone)]
pub struct AxNotification {
    pub kind: AxNotificationKind,
    pub element: AxRef,
    /// Destroyed elements can no longer be asked for their id, so the
    /// platform passes along the id it last knew for them.
    pub window_id: Option<WindowServerId>,
}

pub type AxHandler = Arc<dyn Fn(AxNotification) + Send + Sync>;

pub trait Accessibility {
    fn application_element(&self, pid: pid_t) -> AxResult<AxRef>;
    fn observe(
        &self,
        pid: pid_t,
        notifications: &[AxNotificationKind],
        handler: AxHandler,
    ) -> AxResult<()>;
    fn unobserve(&self, pid: pid_t);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxPolicy {
    pub timeout: Duration,
    pub retry_interval: Duration,
}

impl AxPolicy {
    pub fn from_settings(settings: &Settings) -> AxPolicy {
        AxPolicy {
            timeout: settings.ax_timeout,
            retry_interval: settings.ax_retry_interval,
        }
    }
}

impl Default for AxPolicy {
    fn default() -> Self { AxPolicy::from_settings(&Settings::default()) }
}

/// Runs `op` until it succeeds, fails with an error `is_transient` rejects,
/// or `deadline` has elapsed since the first attempt.
pub fn retry_until_timeout<T>(
    deadline: Duration,
    retry_interval: Duration,
    mut op: impl FnMut() -> AxResult<T>,
    is_transient: impl Fn(&AxError) -> bool,
) -> AxResult<T> {
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if !is_transient(&e) => return Err(e),
            Err(e) => {
                let elapsed = start.elapsed();
                if elapsed >= deadline {
                    debug!(?e, attempts, ?elapsed, "accessibility call gave up");
                    return Err(AxError::Timeout { elapsed });
                }
                trace!(?e, attempts, "retrying transient accessibility error");
                std::thread::sleep(retry_interval.min(deadline - elapsed));
            }
        }
    }
}

/// An accessibility node together with the retry policy used for every call
/// made on it.
#[derive(Clone)]
pub struct AxHandle {
    element: AxRef,
    policy: AxPolicy,
}

impl fmt::Debug for AxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AxHandle").field(&self.element).finish()
    }
}

impl AxHandle {
    pub fn new(element: AxRef, policy: AxPolicy) -> Self { AxHandle { element, policy } }

    pub fn element(&self) -> &AxRef { &self.element }

    fn retry<T>(&self, op: impl FnMut() -> AxResult<T>) -> AxResult<T> {
        retry_until_timeout(
            self.policy.timeout,
            self.policy.retry_interval,
            op,
            AxError::is_transient,
        )
    }

    fn wrap(&self, element: AxRef) -> AxHandle { AxHandle::new(element, self.policy) }

    pub fn get(&self, attribute: AxAttribute) -> AxResult<AxValue> {
        self.retry(|| self.element.attribute(attribute))
    }

    pub fn set(&self, attribute: AxAttribute, value: AxValue) -> AxResult<()> {
        self.retry(|| self.element.set_attribute(attribute, value.clone()))
    }

    pub fn perform(&self, action: AxAction) -> AxResult<()> {
        self.retry(|| self.element.perform_action(action))
    }

    pub fn window_id(&self) -> AxResult<WindowServerId> { self.retry(|| self.element.window_id()) }

    pub fn string(&self, attribute: AxAttribute) -> AxResult<String> {
        match self.get(attribute)? {
            AxValue::String(s) | AxValue::Url(s) => Ok(s),
            _ => Err(mismatch(attribute, "string")),
        }
    }

    pub fn bool(&self, attribute: AxAttribute) -> AxResult<bool> {
        match self.get(attribute)? {
            AxValue::Bool(b) => Ok(b),
            _ => Err(mismatch(attribute, "bool")),
        }
    }

    pub fn element_attr(&self, attribute: AxAttribute) -> AxResult<AxHandle> {
        match self.get(attribute)? {
            AxValue::Element(e) => Ok(self.wrap(e)),
            _ => Err(mismatch(attribute, "element")),
        }
    }

    pub fn elements(&self, attribute: AxAttribute) -> AxResult<Vec<AxHandle>> {
        match self.get(attribute)? {
            AxValue::Elements(es) => Ok(es.into_iter().map(|e| self.wrap(e)).collect()),
            _ => Err(mismatch(attribute, "elements")),
        }
    }

    pub fn children(&self) -> AxResult<Vec<AxHandle>> { self.elements(AxAttribute::Children) }

    pub fn windows(&self) -> AxResult<Vec<AxHandle>> { self.elements(AxAttribute::Windows) }

    pub fn role(&self) -> AxResult<String> { self.string(AxAttribute::Role) }

    pub fn subrole(&self) -> AxResult<String> { self.string(AxAttribute::Subrole) }

    /// The title, or `None` if it could not be read for any reason.
    pub fn title(&self) -> Option<String> { absent(self.string(AxAttribute::Title)) }

    pub fn is_minimized(&self) -> Option<bool> { absent(self.bool(AxAttribute::Minimized)) }

    pub fn is_fullscreen(&self) -> Option<bool> { absent(self.bool(AxAttribute::FullScreen)) }

    pub fn set_minimized(&self, minimized: bool) -> AxResult<()> {
        self.set(AxAttribute::Minimized, AxValue::Bool(minimized))
    }

    pub fn raise(&self) -> AxResult<()> { self.perform(AxAction::Raise) }

    /// Presses the window's close button.
    pub fn close(&self) -> AxResult<()> {
        self.element_attr(AxAttribute::CloseButton)?.perform(AxAction::Press)
    }
}

fn mismatch(attribute: AxAttribute, expected: &'static str) -> AxError {
    AxError::TypeMismatch { attribute: attribute.name(), expected }
}

/// Treats any failure as an absent attribute, logging it.
pub fn absent<T>(result: AxResult<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            trace!(%e, "attribute treated as absent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const SHORT: Duration = Duration::from_millis(50);
    const TICK: Duration = Duration::from_millis(1);

    #[test]
    fn transient_errors_are_retried_until_success() {
        let calls = Cell::new(0);
        let result = retry_until_timeout(
            SHORT,
            TICK,
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 { Err(AxError::NoValue) } else { Ok(7) }
            },
            AxError::is_transient,
        );
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn fatal_errors_return_immediately() {
        let calls = Cell::new(0);
        let result: AxResult<()> = retry_until_timeout(
            SHORT,
            TICK,
            || {
                calls.set(calls.get() + 1);
                Err(AxError::InvalidElement)
            },
            AxError::is_transient,
        );
        assert_eq!(result, Err(AxError::InvalidElement));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn deadline_turns_persistent_transient_errors_into_timeout() {
        let start = Instant::now();
        let result: AxResult<()> =
            retry_until_timeout(SHORT, TICK, || Err(AxError::ApiDisabled), AxError::is_transient);
        assert!(matches!(result, Err(AxError::Timeout { .. })));
        assert!(start.elapsed() >= SHORT);
    }

    #[test]
    fn only_api_disabled_and_no_value_are_transient() {
        assert!(AxError::ApiDisabled.is_transient());
        assert!(AxError::NoValue.is_transient());
        assert!(!AxError::CannotComplete.is_transient());
        assert!(!AxError::InvalidElement.is_transient());
        assert!(!AxError::Timeout { elapsed: SHORT }.is_transient());
    }

    #[test]
    fn attribute_names_match_the_os_constants() {
        assert_eq!(AxAttribute::StatusLabel.name(), "AXStatusLabel");
        assert_eq!(AxAttribute::FocusedWindow.name(), "AXFocusedWindow");
    }
}
