use serde::{Deserialize, Serialize};

/// Something the user did that would move away from the current view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum NavigationIntent {
    /// In-app link to a console path, e.g. `/volumes`.
    Link(String),
    /// Anchor inside the current page.
    Anchor(String),
    /// The wizard's own "back" control.
    StepBack,
    /// Browser history back button.
    HistoryBack,
    /// Browser history forward button.
    HistoryForward,
    /// Tab or window close, or a reload.
    Unload,
}

/// What the shell should do with a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "intent", rename_all = "snake_case")]
pub enum NavigationDecision {
    /// Not guarded; perform the navigation now.
    Proceed(NavigationIntent),
    /// Show the in-app "stay / leave anyway" dialog.
    Confirm(NavigationIntent),
    /// Let the browser show its native unload prompt; an in-app dialog cannot
    /// stop a tab from closing.
    NativePrompt,
}

/// Blocks navigation away from a flow while its creation is in progress.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    section: String,
    armed: bool,
    released: bool,
    pending: Option<NavigationIntent>,
}

impl NavigationGuard {
    /// Guard for a flow living under the console path `section`.
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            armed: false,
            released: false,
            pending: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn pending(&self) -> Option<&NavigationIntent> {
        self.pending.as_ref()
    }

    /// Follow the wizard's creation-started flag.
    ///
    /// After "leave anyway" the guard stays disarmed until the flag drops and
    /// rises again for a new creation.
    pub fn observe(&mut self, creation_started: bool) {
        if creation_started {
            if !self.released && !self.armed {
                tracing::debug!(section = %self.section, "Navigation guard armed");
                self.armed = true;
            }
        } else {
            self.armed = false;
            self.released = false;
            self.pending = None;
        }
    }

    /// Whether `intent` would be intercepted right now.
    pub fn should_intercept(&self, intent: &NavigationIntent) -> bool {
        self.armed && self.leaves_flow(intent)
    }

    /// `true` when the intent discards the flow's view.
    pub fn leaves_flow(&self, intent: &NavigationIntent) -> bool {
        match intent {
            NavigationIntent::Link(target) => !self.within_section(target),
            NavigationIntent::Anchor(_) | NavigationIntent::StepBack => false,
            NavigationIntent::HistoryBack | NavigationIntent::HistoryForward | NavigationIntent::Unload => true,
        }
    }

    /// Consult the guard before navigating.
    ///
    /// An intercepted in-app navigation replaces any earlier pending one.
    pub fn request(&mut self, intent: NavigationIntent) -> NavigationDecision {
        if !self.should_intercept(&intent) {
            return NavigationDecision::Proceed(intent);
        }
        if intent == NavigationIntent::Unload {
            return NavigationDecision::NativePrompt;
        }
        tracing::info!(section = %self.section, ?intent, "Navigation intercepted");
        self.pending = Some(intent.clone());
        NavigationDecision::Confirm(intent)
    }

    /// The user chose to stay: the blocked navigation is discarded.
    pub fn stay(&mut self) {
        if let Some(intent) = self.pending.take() {
            tracing::debug!(?intent, "Navigation discarded");
        }
    }

    /// The user chose to leave: disarm and hand back the blocked navigation,
    /// once.
    pub fn leave_anyway(&mut self) -> Option<NavigationIntent> {
        let intent = self.pending.take()?;
        self.armed = false;
        self.released = true;
        tracing::info!(?intent, "Navigation guard released");
        Some(intent)
    }

    fn within_section(&self, target: &str) -> bool {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        path == self.section || path.starts_with(&format!("{}/", self.section.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_guard_lets_everything_through() {
        let mut guard = NavigationGuard::new("/kubernetes");
        assert_eq!(
            guard.request(NavigationIntent::Link("/volumes".into())),
            NavigationDecision::Proceed(NavigationIntent::Link("/volumes".into()))
        );
    }

    #[test]
    fn links_inside_section_pass() {
        let mut guard = NavigationGuard::new("/kubernetes");
        guard.observe(true);
        assert!(!guard.should_intercept(&NavigationIntent::Link("/kubernetes/create?step=2".into())));
        assert!(!guard.should_intercept(&NavigationIntent::Link("/kubernetes".into())));
        assert!(guard.should_intercept(&NavigationIntent::Link("/kubernetes-old".into())));
        assert!(guard.should_intercept(&NavigationIntent::Link("/load-balancers".into())));
    }

    #[test]
    fn unload_uses_native_prompt_without_pending() {
        let mut guard = NavigationGuard::new("/kubernetes");
        guard.observe(true);
        assert_eq!(guard.request(NavigationIntent::Unload), NavigationDecision::NativePrompt);
        assert!(guard.pending().is_none());
    }

    #[test]
    fn release_survives_until_flag_drops() {
        let mut guard = NavigationGuard::new("/kubernetes");
        guard.observe(true);
        guard.request(NavigationIntent::HistoryBack);
        assert!(guard.leave_anyway().is_some());
        guard.observe(true);
        assert!(!guard.is_armed());
        guard.observe(false);
        guard.observe(true);
        assert!(guard.is_armed());
    }
}
