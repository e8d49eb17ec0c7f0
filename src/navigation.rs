//! View navigation for the run browser.
//!
//! The browser shows one view at a time:
//! - Workflows: every workflow of the selected project
//! - Runs: the runs of one workflow
//! - Details: the executions of one run, as a table or a conversation
//! - Comparison: one question across runs (entered from Details)
//! - Run Comparison: selected runs side by side (entered from Runs)
//! - Conversation Comparison: one session across runs (entered from Details)
//!
//! [`NavigationState`] is an immutable value. Each view carries its own
//! selection payload inside [`Screen`], so a view can never show another
//! view's stale selection. Transitions go through [`NavigationState::reduce`],
//! which either returns the next state or `None` when the transition is not
//! allowed from the current view.

use crate::model::{Execution, Project, Run, Workflow};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The available top-level views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Workflows,
    Runs,
    Details,
    Comparison,
    RunComparison,
    ConversationComparison,
}

impl View {
    /// Returns the display name for this view.
    pub fn name(&self) -> &'static str {
        match self {
            View::Workflows => "Workflows",
            View::Runs => "Runs",
            View::Details => "Run Details",
            View::Comparison => "Question Comparison",
            View::RunComparison => "Run Comparison",
            View::ConversationComparison => "Conversation Comparison",
        }
    }

    /// Get all views in order.
    pub fn all() -> &'static [View] {
        &[
            View::Workflows,
            View::Runs,
            View::Details,
            View::Comparison,
            View::RunComparison,
            View::ConversationComparison,
        ]
    }

    /// The view that going back from this one returns to.
    pub fn parent(&self) -> Option<View> {
        match self {
            View::Workflows => None,
            View::Runs => Some(View::Workflows),
            View::Details | View::RunComparison => Some(View::Runs),
            View::Comparison | View::ConversationComparison => Some(View::Details),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How the Details view renders a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    Table,
    #[default]
    Conversation,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Table => DisplayMode::Conversation,
            DisplayMode::Conversation => DisplayMode::Table,
        }
    }
}

/// A highlighted execution.
///
/// The sequence number changes on every request, so asking to highlight the
/// same execution twice still yields two distinct values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub execution_id: String,
    pub sequence: u64,
}

/// The run shown by the Details view.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSelection {
    pub version: String,
    pub executions: Arc<[Execution]>,
    pub run: Option<Arc<Run>>,
}

impl RunSelection {
    pub fn from_run(run: &Run) -> Self {
        Self {
            version: run.version().to_string(),
            executions: run.executions().into(),
            run: Some(Arc::new(run.clone())),
        }
    }
}

/// Selection payload of the Details view.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsState {
    pub workflow: Arc<Workflow>,
    pub run: RunSelection,
    pub mode: DisplayMode,
    /// Execution whose children should start expanded.
    pub auto_expand: Option<String>,
    pub highlight: Option<Highlight>,
}

impl DetailsState {
    fn new(workflow: Arc<Workflow>, run: RunSelection) -> Self {
        Self {
            workflow,
            run,
            mode: DisplayMode::Conversation,
            auto_expand: None,
            highlight: None,
        }
    }
}

/// The active view together with its selection payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Workflows,
    Runs {
        workflow: Arc<Workflow>,
    },
    Details(DetailsState),
    Comparison {
        details: DetailsState,
        base_id: String,
        run_version: String,
    },
    RunComparison {
        workflow: Arc<Workflow>,
        /// Never empty.
        run_ids: Vec<String>,
    },
    ConversationComparison {
        details: DetailsState,
        session_id: String,
        run_version: String,
    },
}

impl Screen {
    pub fn view(&self) -> View {
        match self {
            Screen::Workflows => View::Workflows,
            Screen::Runs { .. } => View::Runs,
            Screen::Details(_) => View::Details,
            Screen::Comparison { .. } => View::Comparison,
            Screen::RunComparison { .. } => View::RunComparison,
            Screen::ConversationComparison { .. } => View::ConversationComparison,
        }
    }

    /// The workflow this screen is scoped to.
    pub fn workflow(&self) -> Option<&Arc<Workflow>> {
        match self {
            Screen::Workflows => None,
            Screen::Runs { workflow } | Screen::RunComparison { workflow, .. } => Some(workflow),
            Screen::Details(details)
            | Screen::Comparison { details, .. }
            | Screen::ConversationComparison { details, .. } => Some(&details.workflow),
        }
    }

    /// The run details this screen is built on.
    pub fn details(&self) -> Option<&DetailsState> {
        match self {
            Screen::Details(details)
            | Screen::Comparison { details, .. }
            | Screen::ConversationComparison { details, .. } => Some(details),
            _ => None,
        }
    }
}

/// Where a sidebar breadcrumb points.
#[derive(Debug, Clone)]
pub enum NavTarget {
    Workflow(Arc<Workflow>),
    Run { workflow: Arc<Workflow>, run: Arc<Run> },
}

/// Every transition the browser supports.
#[derive(Debug, Clone)]
pub enum NavAction {
    SetProject(Arc<Project>),
    SelectWorkflow(Arc<Workflow>),
    ViewRunDetails {
        version: String,
        executions: Arc<[Execution]>,
        run: Option<Arc<Run>>,
    },
    ToggleViewMode {
        execution_id: Option<String>,
    },
    CompareQuestion {
        base_id: String,
        run_version: String,
    },
    CloseComparison,
    CompareRuns {
        workflow_id: String,
        run_ids: Vec<String>,
    },
    CloseRunComparison,
    CompareSession {
        session_id: String,
    },
    CloseConversationComparison,
    NavigateToSubExecution {
        workflow_id: String,
        run_id: String,
        execution_id: String,
        standalone: bool,
    },
    Navigate(NavTarget),
    GoBack,
    BackToWorkflows,
    BackToRuns,
}

/// The complete navigation state.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState {
    project: Option<Arc<Project>>,
    screen: Screen,
    /// Last highlight sequence handed out.
    highlight_sequence: u64,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            project: None,
            screen: Screen::Workflows,
            highlight_sequence: 0,
        }
    }
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.screen.view()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn project(&self) -> Option<&Arc<Project>> {
        self.project.as_ref()
    }

    pub fn selected_workflow(&self) -> Option<&Workflow> {
        self.screen.workflow().map(|w| w.as_ref())
    }

    pub fn selected_run(&self) -> Option<&RunSelection> {
        self.screen.details().map(|d| &d.run)
    }

    pub fn display_mode(&self) -> Option<DisplayMode> {
        self.screen.details().map(|d| d.mode)
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        self.screen.details().and_then(|d| d.highlight.as_ref())
    }

    pub fn auto_expand(&self) -> Option<&str> {
        self.screen.details().and_then(|d| d.auto_expand.as_deref())
    }

    fn with_screen(&self, screen: Screen) -> Self {
        Self {
            project: self.project.clone(),
            screen,
            highlight_sequence: self.highlight_sequence,
        }
    }

    /// Compute the state after `action`, or `None` when the action is not
    /// valid from the current view or its target cannot be found.
    pub fn reduce(&self, action: NavAction) -> Option<NavigationState> {
        match action {
            NavAction::SetProject(project) => Some(Self {
                project: Some(project),
                screen: Screen::Workflows,
                highlight_sequence: self.highlight_sequence,
            }),

            NavAction::SelectWorkflow(workflow) => match self.view() {
                View::Workflows | View::Runs => Some(self.with_screen(Screen::Runs { workflow })),
                _ => None,
            },

            NavAction::ViewRunDetails {
                version,
                executions,
                run,
            } => {
                let workflow = self.screen.workflow()?.clone();
                let selection = RunSelection {
                    version,
                    executions,
                    run,
                };
                Some(self.with_screen(Screen::Details(DetailsState::new(workflow, selection))))
            }

            NavAction::ToggleViewMode { execution_id } => {
                let Screen::Details(details) = &self.screen else {
                    return None;
                };
                let mut next = self.clone();
                let highlight = execution_id.map(|execution_id| {
                    next.highlight_sequence += 1;
                    Highlight {
                        execution_id,
                        sequence: next.highlight_sequence,
                    }
                });
                next.screen = Screen::Details(DetailsState {
                    mode: details.mode.toggled(),
                    highlight,
                    ..details.clone()
                });
                Some(next)
            }

            NavAction::CompareQuestion {
                base_id,
                run_version,
            } => {
                let Screen::Details(details) = &self.screen else {
                    return None;
                };
                Some(self.with_screen(Screen::Comparison {
                    details: details.clone(),
                    base_id,
                    run_version,
                }))
            }

            NavAction::CloseComparison => match &self.screen {
                Screen::Comparison { details, .. } => {
                    Some(self.with_screen(Screen::Details(details.clone())))
                }
                _ => None,
            },

            NavAction::CompareRuns {
                workflow_id,
                run_ids,
            } => {
                let Screen::Runs { workflow } = &self.screen else {
                    return None;
                };
                if run_ids.is_empty() || workflow.id() != workflow_id {
                    return None;
                }
                Some(self.with_screen(Screen::RunComparison {
                    workflow: workflow.clone(),
                    run_ids,
                }))
            }

            NavAction::CloseRunComparison => match &self.screen {
                Screen::RunComparison { workflow, .. } => Some(self.with_screen(Screen::Runs {
                    workflow: workflow.clone(),
                })),
                _ => None,
            },

            NavAction::CompareSession { session_id } => {
                let Screen::Details(details) = &self.screen else {
                    return None;
                };
                Some(self.with_screen(Screen::ConversationComparison {
                    run_version: details.run.version.clone(),
                    details: details.clone(),
                    session_id,
                }))
            }

            NavAction::CloseConversationComparison => match &self.screen {
                Screen::ConversationComparison { details, .. } => {
                    Some(self.with_screen(Screen::Details(DetailsState {
                        mode: DisplayMode::Conversation,
                        ..details.clone()
                    })))
                }
                _ => None,
            },

            NavAction::NavigateToSubExecution {
                workflow_id,
                run_id,
                execution_id,
                standalone,
            } => self.navigate_to_sub_execution(&workflow_id, &run_id, &execution_id, standalone),

            NavAction::Navigate(NavTarget::Workflow(workflow)) => {
                Some(self.with_screen(Screen::Runs { workflow }))
            }

            NavAction::Navigate(NavTarget::Run { workflow, run }) => {
                let selection = RunSelection {
                    version: run.version().to_string(),
                    executions: run.executions().into(),
                    run: Some(run),
                };
                Some(self.with_screen(Screen::Details(DetailsState::new(workflow, selection))))
            }

            NavAction::GoBack => match &self.screen {
                Screen::Workflows => None,
                Screen::Runs { .. } => Some(self.with_screen(Screen::Workflows)),
                Screen::Details(_) | Screen::RunComparison { .. } => self.reduce(NavAction::BackToRuns),
                Screen::Comparison { .. } => self.reduce(NavAction::CloseComparison),
                Screen::ConversationComparison { .. } => {
                    self.reduce(NavAction::CloseConversationComparison)
                }
            },

            NavAction::BackToWorkflows => match self.screen {
                Screen::Workflows => None,
                _ => Some(self.with_screen(Screen::Workflows)),
            },

            NavAction::BackToRuns => {
                if self.view() == View::Runs {
                    return None;
                }
                let workflow = self.screen.workflow()?.clone();
                Some(self.with_screen(Screen::Runs { workflow }))
            }
        }
    }

    fn navigate_to_sub_execution(
        &self,
        workflow_id: &str,
        run_id: &str,
        execution_id: &str,
        standalone: bool,
    ) -> Option<NavigationState> {
        let project = self.project.as_ref()?;

        if standalone {
            let workflow = project.find_workflow(workflow_id)?;
            return Some(self.with_screen(Screen::Runs {
                workflow: Arc::new(workflow.clone()),
            }));
        }

        // A run id is unique across the project, so search every workflow.
        let (workflow, run, parent_id) = project.workflows().iter().find_map(|workflow| {
            let run = workflow.find_run(run_id)?;
            let parent = run
                .executions()
                .iter()
                .find(|e| e.sub_execution_ids().iter().any(|id| id == execution_id))?;
            Some((workflow, run, parent.id().to_string()))
        })?;

        Some(self.with_screen(Screen::Details(DetailsState {
            mode: DisplayMode::Table,
            auto_expand: Some(parent_id),
            ..DetailsState::new(Arc::new(workflow.clone()), RunSelection::from_run(run))
        })))
    }
}

/// Owns the current [`NavigationState`] and applies actions to it.
#[derive(Debug, Default)]
pub struct Navigator {
    state: NavigationState,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn view(&self) -> View {
        self.state.view()
    }

    /// Apply an action. Returns whether the state changed.
    pub fn dispatch(&mut self, action: NavAction) -> bool {
        let name = action_name(&action);
        match self.state.reduce(action) {
            Some(next) => {
                debug!(action = name, from = %self.state.view(), to = %next.view(), "navigation");
                self.state = next;
                true
            }
            None => {
                debug!(action = name, view = %self.state.view(), "navigation ignored");
                false
            }
        }
    }

    pub fn set_project(&mut self, project: Arc<Project>) -> bool {
        self.dispatch(NavAction::SetProject(project))
    }

    pub fn select_workflow(&mut self, workflow: Arc<Workflow>) -> bool {
        self.dispatch(NavAction::SelectWorkflow(workflow))
    }

    pub fn view_run_details(
        &mut self,
        version: impl Into<String>,
        executions: Arc<[Execution]>,
        run: Option<Arc<Run>>,
    ) -> bool {
        self.dispatch(NavAction::ViewRunDetails {
            version: version.into(),
            executions,
            run,
        })
    }

    pub fn toggle_view_mode(&mut self, execution_id: Option<&str>) -> bool {
        self.dispatch(NavAction::ToggleViewMode {
            execution_id: execution_id.map(str::to_string),
        })
    }

    pub fn compare_question(&mut self, base_id: &str, run_version: &str) -> bool {
        self.dispatch(NavAction::CompareQuestion {
            base_id: base_id.to_string(),
            run_version: run_version.to_string(),
        })
    }

    pub fn close_comparison(&mut self) -> bool {
        self.dispatch(NavAction::CloseComparison)
    }

    pub fn compare_runs(&mut self, workflow_id: &str, run_ids: Vec<String>) -> bool {
        self.dispatch(NavAction::CompareRuns {
            workflow_id: workflow_id.to_string(),
            run_ids,
        })
    }

    pub fn close_run_comparison(&mut self) -> bool {
        self.dispatch(NavAction::CloseRunComparison)
    }

    pub fn compare_session(&mut self, session_id: &str) -> bool {
        self.dispatch(NavAction::CompareSession {
            session_id: session_id.to_string(),
        })
    }

    pub fn close_conversation_comparison(&mut self) -> bool {
        self.dispatch(NavAction::CloseConversationComparison)
    }

    pub fn navigate_to_sub_execution(
        &mut self,
        workflow_id: &str,
        run_id: &str,
        execution_id: &str,
        standalone: bool,
    ) -> bool {
        self.dispatch(NavAction::NavigateToSubExecution {
            workflow_id: workflow_id.to_string(),
            run_id: run_id.to_string(),
            execution_id: execution_id.to_string(),
            standalone,
        })
    }

    pub fn navigate(&mut self, target: NavTarget) -> bool {
        self.dispatch(NavAction::Navigate(target))
    }

    pub fn go_back(&mut self) -> bool {
        self.dispatch(NavAction::GoBack)
    }

    pub fn back_to_workflows(&mut self) -> bool {
        self.dispatch(NavAction::BackToWorkflows)
    }

    pub fn back_to_runs(&mut self) -> bool {
        self.dispatch(NavAction::BackToRuns)
    }
}

fn action_name(action: &NavAction) -> &'static str {
    match action {
        NavAction::SetProject(_) => "set_project",
        NavAction::SelectWorkflow(_) => "select_workflow",
        NavAction::ViewRunDetails { .. } => "view_run_details",
        NavAction::ToggleViewMode { .. } => "toggle_view_mode",
        NavAction::CompareQuestion { .. } => "compare_question",
        NavAction::CloseComparison => "close_comparison",
        NavAction::CompareRuns { .. } => "compare_runs",
        NavAction::CloseRunComparison => "close_run_comparison",
        NavAction::CompareSession { .. } => "compare_session",
        NavAction::CloseConversationComparison => "close_conversation_comparison",
        NavAction::NavigateToSubExecution { .. } => "navigate_to_sub_execution",
        NavAction::Navigate(_) => "navigate",
        NavAction::GoBack => "go_back",
        NavAction::BackToWorkflows => "back_to_workflows",
        NavAction::BackToRuns => "back_to_runs",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{project, run, workflow};
    use proptest::prelude::*;
    use serde_json::json;

    fn sample_project() -> Arc<Project> {
        Arc::new(project(
            "p",
            vec![
                workflow(
                    "wf-a",
                    vec![
                        run(json!({"id": "r1", "version": "v1", "runs": [
                            {"id": "e1", "sessionId": "s1", "subExecutions": [{"id": "sub-1"}, {"id": "sub-2"}]},
                            {"id": "e2", "sessionId": "s1"}
                        ]})),
                        run(json!({"id": "r2", "version": "v2", "runs": [{"id": "f1"}]})),
                    ],
                ),
                workflow("wf-b", vec![run(json!({"id": "r3", "version": "v3", "runs": []}))]),
            ],
        ))
    }

    fn wf(project: &Project, id: &str) -> Arc<Workflow> {
        Arc::new(project.find_workflow(id).unwrap().clone())
    }

    fn navigator_in_details() -> Navigator {
        let project = sample_project();
        let mut nav = Navigator::new();
        nav.set_project(project.clone());
        nav.select_workflow(wf(&project, "wf-a"));
        let r1 = project.find_run("r1").unwrap().1;
        assert!(nav.view_run_details("v1", r1.executions().into(), None));
        nav
    }

    // ========================================================================
    // View
    // ========================================================================

    #[test]
    fn test_view_names_and_parents() {
        assert_eq!(View::Details.name(), "Run Details");
        assert_eq!(View::all().len(), 6);
        assert_eq!(View::Workflows.parent(), None);
        assert_eq!(View::RunComparison.parent(), Some(View::Runs));
        assert_eq!(View::ConversationComparison.parent(), Some(View::Details));
        assert_eq!(format!("{}", View::Runs), "Runs");
    }

    // ========================================================================
    // Basic transitions
    // ========================================================================

    #[test]
    fn test_initial_state() {
        let nav = Navigator::new();
        assert_eq!(nav.view(), View::Workflows);
        assert!(nav.state().selected_workflow().is_none());
    }

    #[test]
    fn test_select_workflow_then_details_defaults_to_conversation() {
        let nav = navigator_in_details();
        assert_eq!(nav.view(), View::Details);
        assert_eq!(nav.state().display_mode(), Some(DisplayMode::Conversation));
        assert_eq!(nav.state().selected_run().unwrap().version, "v1");
        assert_eq!(nav.state().selected_workflow().unwrap().id(), "wf-a");
    }

    #[test]
    fn test_view_run_details_needs_workflow() {
        let mut nav = Navigator::new();
        assert!(!nav.view_run_details("v1", Vec::new().into(), None));
        assert_eq!(nav.view(), View::Workflows);
    }

    #[test]
    fn test_select_workflow_rejected_from_details() {
        let project = sample_project();
        let mut nav = navigator_in_details();
        assert!(!nav.select_workflow(wf(&project, "wf-b")));
        assert_eq!(nav.view(), View::Details);
    }

    #[test]
    fn test_go_back_chain() {
        let mut nav = navigator_in_details();
        assert!(nav.go_back());
        assert_eq!(nav.view(), View::Runs);
        assert!(nav.state().selected_run().is_none());
        assert!(nav.go_back());
        assert_eq!(nav.view(), View::Workflows);
        assert!(!nav.go_back());
    }

    #[test]
    fn test_back_to_workflows_and_runs() {
        let mut nav = navigator_in_details();
        assert!(nav.back_to_runs());
        assert_eq!(nav.view(), View::Runs);
        assert!(!nav.back_to_runs());
        assert!(nav.back_to_workflows());
        assert!(nav.state().selected_workflow().is_none());
        assert!(!nav.back_to_workflows());
    }

    // ========================================================================
    // View mode and highlight
    // ========================================================================

    #[test]
    fn test_toggle_view_mode_flips() {
        let mut nav = navigator_in_details();
        assert!(nav.toggle_view_mode(None));
        assert_eq!(nav.state().display_mode(), Some(DisplayMode::Table));
        assert!(nav.state().highlight().is_none());
        assert!(nav.toggle_view_mode(None));
        assert_eq!(nav.state().display_mode(), Some(DisplayMode::Conversation));
    }

    #[test]
    fn test_repeated_highlight_is_distinct() {
        let mut nav = navigator_in_details();
        nav.toggle_view_mode(Some("e1"));
        let first = nav.state().highlight().cloned().unwrap();
        nav.toggle_view_mode(Some("e1"));
        let second = nav.state().highlight().cloned().unwrap();
        assert_eq!(first.execution_id, second.execution_id);
        assert_ne!(first, second);
        assert!(second.sequence > first.sequence);
    }

    #[test]
    fn test_toggle_view_mode_only_in_details() {
        let mut nav = Navigator::new();
        assert!(!nav.toggle_view_mode(Some("e1")));
    }

    // ========================================================================
    // Comparison modes
    // ========================================================================

    #[test]
    fn test_question_comparison_round_trip() {
        let mut nav = navigator_in_details();
        nav.toggle_view_mode(None);
        assert!(nav.compare_question("e1", "v1"));
        assert_eq!(nav.view(), View::Comparison);
        match nav.state().screen() {
            Screen::Comparison { base_id, run_version, .. } => {
                assert_eq!(base_id, "e1");
                assert_eq!(run_version, "v1");
            }
            other => panic!("unexpected screen {other:?}"),
        }
        assert!(nav.close_comparison());
        assert_eq!(nav.view(), View::Details);
        assert_eq!(nav.state().display_mode(), Some(DisplayMode::Table));
        assert!(!nav.close_comparison());
    }

    #[test]
    fn test_run_comparison_requires_ids() {
        let project = sample_project();
        let mut nav = Navigator::new();
        nav.set_project(project.clone());
        nav.select_workflow(wf(&project, "wf-a"));
        assert!(!nav.compare_runs("wf-a", Vec::new()));
        assert!(!nav.compare_runs("wf-b", vec!["r3".into()]));
        assert!(nav.compare_runs("wf-a", vec!["r1".into(), "r2".into()]));
        assert_eq!(nav.view(), View::RunComparison);
        assert!(nav.go_back());
        assert_eq!(nav.view(), View::Runs);
        assert_eq!(nav.state().selected_workflow().unwrap().id(), "wf-a");
    }

    #[test]
    fn test_conversation_comparison_records_version_and_forces_conversation() {
        let mut nav = navigator_in_details();
        nav.toggle_view_mode(None);
        assert!(nav.compare_session("s1"));
        match nav.state().screen() {
            Screen::ConversationComparison { session_id, run_version, .. } => {
                assert_eq!(session_id, "s1");
                assert_eq!(run_version, "v1");
            }
            other => panic!("unexpected screen {other:?}"),
        }
        assert!(nav.close_conversation_comparison());
        assert_eq!(nav.view(), View::Details);
        assert_eq!(nav.state().display_mode(), Some(DisplayMode::Conversation));
    }

    // ========================================================================
    // Cross-hierarchy navigation
    // ========================================================================

    #[test]
    fn test_navigate_to_sub_execution_finds_parent() {
        let project = sample_project();
        let mut nav = Navigator::new();
        nav.set_project(project);
        assert!(nav.navigate_to_sub_execution("ignored", "r1", "sub-2", false));
        assert_eq!(nav.view(), View::Details);
        assert_eq!(nav.state().auto_expand(), Some("e1"));
        assert_eq!(nav.state().selected_run().unwrap().version, "v1");
        assert_eq!(nav.state().selected_workflow().unwrap().id(), "wf-a");
    }

    #[test]
    fn test_navigate_to_sub_execution_standalone() {
        let mut nav = navigator_in_details();
        assert!(nav.navigate_to_sub_execution("wf-b", "r3", "x", true));
        assert_eq!(nav.view(), View::Runs);
        assert_eq!(nav.state().selected_workflow().unwrap().id(), "wf-b");
    }

    #[test]
    fn test_navigate_to_sub_execution_not_found_is_noop() {
        let mut nav = navigator_in_details();
        let before = nav.state().clone();
        assert!(!nav.navigate_to_sub_execution("wf-a", "r1", "nope", false));
        assert!(!nav.navigate_to_sub_execution("wf-z", "r1", "sub-1", true));
        assert!(!nav.navigate_to_sub_execution("wf-a", "missing", "sub-1", false));
        assert_eq!(nav.state(), &before);
    }

    #[test]
    fn test_sidebar_navigate_to_run() {
        let project = sample_project();
        let mut nav = Navigator::new();
        nav.set_project(project.clone());
        let (w, r) = project.find_run("r2").unwrap();
        assert!(nav.navigate(NavTarget::Run {
            workflow: Arc::new(w.clone()),
            run: Arc::new(r.clone()),
        }));
        assert_eq!(nav.view(), View::Details);
        assert_eq!(nav.state().selected_run().unwrap().executions.len(), 1);
        assert!(nav.navigate(NavTarget::Workflow(wf(&project, "wf-b"))));
        assert_eq!(nav.view(), View::Runs);
    }

    // ========================================================================
    // Properties
    // ========================================================================

    fn action_for(code: u8, project: &Arc<Project>) -> NavAction {
        let wf_a = wf(project, "wf-a");
        match code % 15 {
            0 => NavAction::SelectWorkflow(wf_a),
            1 => NavAction::ViewRunDetails {
                version: "v1".into(),
                executions: Vec::new().into(),
                run: None,
            },
            2 => NavAction::ToggleViewMode { execution_id: Some("e1".into()) },
            3 => NavAction::CompareQuestion { base_id: "e1".into(), run_version: "v1".into() },
            4 => NavAction::CloseComparison,
            5 => NavAction::CompareRuns { workflow_id: "wf-a".into(), run_ids: vec!["r1".into()] },
            6 => NavAction::CompareRuns { workflow_id: "wf-a".into(), run_ids: Vec::new() },
            7 => NavAction::CloseRunComparison,
            8 => NavAction::CompareSession { session_id: "s1".into() },
            9 => NavAction::CloseConversationComparison,
            10 => NavAction::NavigateToSubExecution {
                workflow_id: "wf-a".into(),
                run_id: "r1".into(),
                execution_id: "sub-1".into(),
                standalone: false,
            },
            11 => NavAction::GoBack,
            12 => NavAction::BackToWorkflows,
            13 => NavAction::BackToRuns,
            _ => NavAction::SetProject(project.clone()),
        }
    }

    proptest! {
        #[test]
        fn test_prop_payload_matches_view(codes in prop::collection::vec(any::<u8>(), 0..40)) {
            let project = sample_project();
            let mut nav = Navigator::new();
            nav.set_project(project.clone());
            for code in codes {
                nav.dispatch(action_for(code, &project));
                let state = nav.state();
                match state.screen() {
                    Screen::Workflows => prop_assert!(state.selected_workflow().is_none()),
                    Screen::RunComparison { run_ids, .. } => prop_assert!(!run_ids.is_empty()),
                    Screen::Runs { .. } => prop_assert!(state.selected_run().is_none()),
                    _ => prop_assert!(state.selected_run().is_some()),
                }
                prop_assert_eq!(state.view().parent().is_none(), state.view() == View::Workflows);
            }
        }
    }
}
