use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::screen::SpaceId;
use super::window_server::WindowImage;

#[allow(non_camel_case_types)]
pub type pid_t = i32;

/// The dock's bundle id. Its accessibility tree carries the badge labels.
pub const DOCK_BUNDLE_ID: &str = "com.apple.dock";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationPolicy {
    /// Ordinary app with a dock icon and menu bar.
    #[default]
    Regular,
    /// No dock icon, but may show windows.
    Accessory,
    /// May not create windows or be activated.
    Prohibited,
}

/// What the OS reports about a running process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: pid_t,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub localized_name: Option<String>,
    #[serde(default)]
    pub activation_policy: ActivationPolicy,
    /// The bundle is a background helper (an XPC service).
    #[serde(default)]
    pub is_background_helper: bool,
    #[serde(default = "yes")]
    pub is_finished_launching: bool,
    #[serde(default)]
    pub is_hidden: bool,
}

fn yes() -> bool { true }

/// Workspace-level notifications. The platform delivers these on an arbitrary
/// thread, in order.
#[derive(Debug, Clone)]
pub enum WorkspaceNotification {
    ApplicationLaunched(ProcessInfo),
    ApplicationFinishedLaunching(pid_t),
    ApplicationsTerminated(Vec<pid_t>),
    ApplicationActivated(pid_t),
    ApplicationHidden(pid_t),
    ApplicationUnhidden(pid_t),
    ActiveSpaceChanged(Option<SpaceId>),
    MissionControlEntered,
    MissionControlExited,
}

pub type WorkspaceHandler = Arc<dyn Fn(WorkspaceNotification) + Send + Sync>;

pub trait ProcessSource {
    fn running_applications(&self) -> Vec<ProcessInfo>;
    fn current_pid(&self) -> pid_t;
    fn frontmost_application(&self) -> Option<pid_t>;
    /// Asked again on every discovery attempt, since the launch-finished
    /// notification is not guaranteed to arrive.
    fn is_finished_launching(&self, pid: pid_t) -> bool;
    /// The bundle URL registered for `bundle_id`, as a string.
    fn application_url(&self, bundle_id: &str) -> Option<String>;
    fn application_icon(&self, pid: pid_t) -> Option<WindowImage>;
    /// Returns false if the OS refused.
    fn activate_application(&self, pid: pid_t) -> bool;
    fn terminate_application(&self, pid: pid_t) -> bool;
    fn set_application_hidden(&self, pid: pid_t, hidden: bool) -> bool;
    fn observe_workspace(&self, handler: WorkspaceHandler);
}

/// The eligibility filter applied to every process before it is tracked.
///
/// Prohibited-policy processes are only skipped when they are also background
/// helpers, and the switcher never tracks itself.
pub fn is_eligible(
    activation_policy: ActivationPolicy,
    is_background_helper: bool,
    pid: pid_t,
    self_pid: pid_t,
) -> bool {
    (activation_policy != ActivationPolicy::Prohibited || !is_background_helper) && pid != self_pid
}

impl ProcessInfo {
    pub fn is_eligible(&self, self_pid: pid_t) -> bool {
        is_eligible(self.activation_policy, self.is_background_helper, self.pid, self_pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICIES: [ActivationPolicy; 3] = [
        ActivationPolicy::Regular,
        ActivationPolicy::Accessory,
        ActivationPolicy::Prohibited,
    ];

    #[test]
    fn eligibility_matches_formula_for_all_inputs() {
        for policy in POLICIES {
            for helper in [false, true] {
                for (pid, self_pid) in [(10, 10), (10, 11), (1, 99)] {
                    let expected =
                        (policy != ActivationPolicy::Prohibited || !helper) && pid != self_pid;
                    assert_eq!(is_eligible(policy, helper, pid, self_pid), expected);
                    // Deterministic: same answer on a second call.
                    assert_eq!(is_eligible(policy, helper, pid, self_pid), expected);
                }
            }
        }
    }

    #[test]
    fn prohibited_helper_is_rejected_but_prohibited_app_is_kept() {
        assert!(!is_eligible(ActivationPolicy::Prohibited, true, 5, 1));
        assert!(is_eligible(ActivationPolicy::Prohibited, false, 5, 1));
        assert!(is_eligible(ActivationPolicy::Accessory, true, 5, 1));
    }

    #[test]
    fn self_is_never_eligible() {
        for policy in POLICIES {
            assert!(!is_eligible(policy, false, 42, 42));
        }
    }
}
