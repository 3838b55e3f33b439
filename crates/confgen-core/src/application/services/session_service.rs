//! Editor Session - the main application orchestrator.
//!
//! One session owns one template text, its schema, one live
//! [`VariableStore`] and one [`DirtyScheduler`]. It coordinates:
//! 1. Template edits: extract schema, reconcile the store
//! 2. Value edits: forward to the store, mark dirty
//! 3. Loading value sets: ask for a merge choice, resolve, commit
//! 4. Debounced renders: issue when the window elapses, apply only the latest
//!
//! The session runs on a single task. Callers interleave edits with
//! [`EditorSession::next_event`], which sleeps until the debounce deadline or
//! until an in-flight render finishes.

use std::sync::Arc;
use std::time::Duration;

use futures::{
    future::BoxFuture,
    stream::{FuturesUnordered, StreamExt},
    FutureExt,
};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    application::{
        ApplicationError,
        ports::{ExitGuard, PersistenceService, PortResult, RenderService, SchemaService},
        scheduler::{Completion, DirtyScheduler, RenderTicket, SyncState, DEFAULT_DEBOUNCE},
    },
    domain::{
        ItemCountPolicy, ListItem, MergeChoice, MergeChoiceProvider, MergeOutcome, MergeResolver,
        Reconciler, Snapshot, VariableSchema, VariableStore, VariableValue,
    },
    error::ConfgenResult,
};

type RenderFuture = BoxFuture<'static, (u64, PortResult<String>)>;

/// The adapters a session talks to.
#[derive(Clone)]
pub struct SessionPorts {
    pub schema: Arc<dyn SchemaService>,
    pub renderer: Arc<dyn RenderService>,
    pub persistence: Arc<dyn PersistenceService>,
}

impl SessionPorts {
    pub fn new(
        schema: Arc<dyn SchemaService>,
        renderer: Arc<dyn RenderService>,
        persistence: Arc<dyn PersistenceService>,
    ) -> Self {
        Self {
            schema,
            renderer,
            persistence,
        }
    }
}

/// Tunables for a session.
#[derive(Debug)]
pub struct SessionSettings {
    pub debounce: Duration,
    pub item_policy: ItemCountPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            item_policy: ItemCountPolicy::default(),
        }
    }
}

/// Something the render loop did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The debounce window elapsed and a render was sent.
    RenderIssued { version: u64 },
    /// Output for the latest issued version arrived and is now current.
    Rendered { version: u64, output: String },
    /// The latest issued render failed; the session is dirty again.
    RenderFailed { version: u64, error: ApplicationError },
    /// A superseded render finished; its result was dropped.
    Discarded { version: u64 },
    /// Nothing scheduled and nothing in flight.
    Idle,
}

enum Wake {
    Due,
    Finished(u64, PortResult<String>),
    Idle,
}

/// Main editing service.
pub struct EditorSession {
    id: Uuid,
    ports: SessionPorts,
    template_name: Option<String>,
    template: String,
    store: VariableStore,
    reconciler: Reconciler,
    resolver: MergeResolver,
    scheduler: DirtyScheduler,
    rendered: Option<String>,
    last_error: Option<ApplicationError>,
    in_flight: FuturesUnordered<RenderFuture>,
}

impl EditorSession {
    /// Create a session with an empty template and an empty store.
    pub fn new(ports: SessionPorts, settings: SessionSettings) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, debounce_ms = settings.debounce.as_millis() as u64, "Session created");
        Self {
            id,
            ports,
            template_name: None,
            template: String::new(),
            store: VariableStore::new(),
            reconciler: Reconciler::new(settings.item_policy),
            resolver: MergeResolver::new(),
            scheduler: DirtyScheduler::new(settings.debounce),
            rendered: None,
            last_error: None,
            in_flight: FuturesUnordered::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref()
    }

    pub fn template_text(&self) -> &str {
        &self.template
    }

    pub fn schema(&self) -> &VariableSchema {
        self.store.schema()
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn state(&self) -> SyncState {
        self.scheduler.state()
    }

    pub fn version(&self) -> u64 {
        self.scheduler.version()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.scheduler.has_unsaved_changes()
    }

    /// Output of the most recent applied render.
    pub fn rendered_output(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    /// Error of the most recent failed render, cleared by the next success.
    pub fn last_error(&self) -> Option<&ApplicationError> {
        self.last_error.as_ref()
    }

    pub fn renders_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// No render is scheduled or in flight; [`Self::next_event`] would return
    /// [`SessionEvent::Idle`] right away.
    pub fn is_idle(&self) -> bool {
        self.scheduler.deadline().is_none() && self.in_flight.is_empty()
    }

    // -------------------------------------------------------------------------
    // Template
    // -------------------------------------------------------------------------

    /// Replace the template text and reconcile the store to its schema.
    ///
    /// On a parse failure nothing changes: text, schema and store stay as
    /// they were.
    #[instrument(skip_all, fields(session = %self.id, len = text.as_ref().len()))]
    pub async fn set_template_text(&mut self, text: impl AsRef<str>) -> ConfgenResult<()> {
        let text = text.as_ref();
        let schema = match self.ports.schema.extract_schema(text).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(error = %e, "Schema extraction failed; keeping previous schema");
                return Err(e.into());
            }
        };

        let next = self.reconciler.reconcile(&self.store, &schema)?;
        let store_changed = self.store.commit(next);
        let text_changed = self.template != text;
        if text_changed {
            self.template = text.to_string();
        }

        info!(
            scalars = schema.scalars().len(),
            lists = schema.lists().len(),
            store_changed,
            "Template updated"
        );
        if store_changed || text_changed {
            self.touch();
        }
        Ok(())
    }

    /// Load a stored template and make it current.
    #[instrument(skip_all, fields(session = %self.id, template = %name))]
    pub async fn load_template(&mut self, name: &str) -> ConfgenResult<()> {
        let text = self.ports.persistence.load_template(name).await?;
        self.set_template_text(&text).await?;
        self.template_name = Some(name.to_string());
        Ok(())
    }

    /// Start over on a stored template: a fresh store built from its schema
    /// replaces the current one, and the current values are dropped.
    ///
    /// On any failure the session is left as it was.
    #[instrument(skip_all, fields(session = %self.id, template = %name))]
    pub async fn start_template(&mut self, name: &str) -> ConfgenResult<()> {
        let text = self.ports.persistence.load_template(name).await?;
        let schema = self.ports.schema.extract_schema(&text).await?;
        let fresh = self.reconciler.reconcile(&VariableStore::new(), &schema)?;

        self.store.commit(fresh);
        self.template = text;
        self.template_name = Some(name.to_string());
        self.rendered = None;
        self.last_error = None;
        self.touch();
        self.scheduler.mark_saved();

        info!(
            scalars = schema.scalars().len(),
            lists = schema.lists().len(),
            "Started over on template"
        );
        Ok(())
    }

    /// Store the current template text under `name` and make it the current
    /// template name.
    #[instrument(skip_all, fields(session = %self.id, template = %name))]
    pub async fn save_template(&mut self, name: &str) -> ConfgenResult<()> {
        self.ports
            .persistence
            .save_template(name, &self.template)
            .await?;
        self.template_name = Some(name.to_string());
        info!("Template saved");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Value edits
    // -------------------------------------------------------------------------

    pub fn get(&self, name: &str) -> ConfgenResult<&VariableValue> {
        Ok(self.store.get(name)?)
    }

    pub fn set_scalar(&mut self, name: &str, value: impl Into<String>) -> ConfgenResult<()> {
        self.store.set_scalar(name, value)?;
        self.touch();
        Ok(())
    }

    pub fn add_list_item(&mut self, list: &str) -> ConfgenResult<usize> {
        let index = self.store.add_list_item(list)?;
        self.touch();
        Ok(index)
    }

    pub fn remove_list_item(&mut self, list: &str, index: usize) -> ConfgenResult<ListItem> {
        let removed = self.store.remove_list_item(list, index)?;
        self.touch();
        Ok(removed)
    }

    pub fn set_list_field(
        &mut self,
        list: &str,
        index: usize,
        field: &str,
        value: impl Into<String>,
    ) -> ConfgenResult<()> {
        self.store.set_list_field(list, index, field, value)?;
        self.touch();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Value sets
    // -------------------------------------------------------------------------

    /// Load a stored value set and merge it in under the provider's choice.
    ///
    /// The choice is made before anything is touched. A malformed value
    /// aborts the load with the store unchanged.
    #[instrument(skip_all, fields(session = %self.id, values = %name))]
    pub async fn load_values(
        &mut self,
        name: &str,
        provider: &dyn MergeChoiceProvider,
    ) -> ConfgenResult<MergeOutcome> {
        let incoming = self.ports.persistence.load_values(name).await?;
        let request = self.resolver.request(name, &self.store, &incoming);
        let choice = provider.choose(&request);

        if choice == MergeChoice::Cancel {
            info!("Load cancelled");
            return Ok(MergeOutcome {
                choice,
                replaced: Vec::new(),
                ignored: Vec::new(),
            });
        }

        let (next, outcome) = self.resolver.resolve(&self.store, &incoming, choice)?;
        if self.store.commit(next) {
            self.touch();
        }

        // The store now mirrors the stored set exactly.
        if choice == MergeChoice::Overwrite && outcome.replaced.len() == self.store.len() {
            self.scheduler.mark_saved();
        }

        info!(
            choice = %choice,
            replaced = outcome.replaced.len(),
            ignored = outcome.ignored.len(),
            "Value set loaded"
        );
        Ok(outcome)
    }

    #[instrument(skip_all, fields(session = %self.id, values = %name))]
    pub async fn save_values(&mut self, name: &str) -> ConfgenResult<()> {
        let snapshot = self.store.snapshot();
        self.ports.persistence.save_values(name, &snapshot).await?;
        self.scheduler.mark_saved();
        info!(names = snapshot.len(), "Values saved");
        Ok(())
    }

    /// Write the current output under `name`, or append it.
    #[instrument(skip_all, fields(session = %self.id, output = %name, append))]
    pub async fn save_output(&mut self, name: &str, append: bool) -> ConfgenResult<()> {
        let output = self
            .rendered
            .as_deref()
            .ok_or(ApplicationError::NothingRendered)?;
        if append {
            self.ports.persistence.append_output(name, output).await?;
        } else {
            self.ports.persistence.save_output(name, output).await?;
        }
        info!("Output written");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Exit
    // -------------------------------------------------------------------------

    /// Whether the caller may drop the current values, to leave or to start
    /// over. The guard is asked only when there are unsaved changes.
    pub fn request_exit(&self, guard: &dyn ExitGuard) -> bool {
        if self.scheduler.can_exit_silently() {
            return true;
        }
        let confirmed = guard.confirm_discard();
        debug!(session = %self.id, confirmed, "Exit with unsaved changes");
        confirmed
    }

    // -------------------------------------------------------------------------
    // Render loop
    // -------------------------------------------------------------------------

    /// Wait for the next render-loop event.
    ///
    /// Returns [`SessionEvent::Idle`] immediately when there is neither a
    /// pending deadline nor a render in flight.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            let deadline = self.scheduler.deadline();
            if deadline.is_none() && self.in_flight.is_empty() {
                return SessionEvent::Idle;
            }

            let busy = !self.in_flight.is_empty();
            let wake = tokio::select! {
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Wake::Due,
                Some((version, result)) = self.in_flight.next(), if busy => Wake::Finished(version, result),
                else => Wake::Idle,
            };

            match wake {
                Wake::Due => {
                    if let Some(ticket) = self.scheduler.poll_due(Instant::now()) {
                        self.issue(ticket);
                        return SessionEvent::RenderIssued {
                            version: ticket.version,
                        };
                    }
                }
                Wake::Finished(version, result) => return self.settle_render(version, result),
                Wake::Idle => return SessionEvent::Idle,
            }
        }
    }

    /// Drive the render loop until it goes idle, collecting the events.
    pub async fn settle(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match self.next_event().await {
                SessionEvent::Idle => return events,
                event => events.push(event),
            }
        }
    }

    /// Skip the rest of the debounce window; the render issues on the next poll.
    pub fn flush(&mut self) {
        if self.scheduler.deadline().is_some() {
            self.scheduler.mark_due(Instant::now());
        }
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    fn touch(&mut self) {
        self.scheduler.mark_dirty(Instant::now());
    }

    fn issue(&mut self, ticket: RenderTicket) {
        let renderer = Arc::clone(&self.ports.renderer);
        let template = self.template.clone();
        let snapshot = self.store.snapshot();
        let version = ticket.version;
        self.in_flight.push(
            async move {
                let result = renderer.render(&template, &snapshot).await;
                (version, result)
            }
            .boxed(),
        );
    }

    fn settle_render(&mut self, version: u64, result: PortResult<String>) -> SessionEvent {
        let succeeded = result.is_ok();
        match (self.scheduler.complete(version, succeeded), result) {
            (Completion::Discard, _) => {
                warn!(session = %self.id, version, "Stale render discarded");
                SessionEvent::Discarded { version }
            }
            (Completion::Apply { clean }, Ok(output)) => {
                debug!(session = %self.id, version, clean, bytes = output.len(), "Render applied");
                self.rendered = Some(output.clone());
                self.last_error = None;
                SessionEvent::Rendered { version, output }
            }
            (_, Err(error)) => {
                warn!(session = %self.id, version, error = %error, "Render failed");
                self.last_error = Some(error.clone());
                SessionEvent::RenderFailed { version, error }
            }
            (Completion::Failed, Ok(_)) => SessionEvent::Discarded { version },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockPersistenceService, MockSchemaService};
    use crate::domain::RawValues;
    use async_trait::async_trait;
    use serde_json::json;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Renderer with scripted per-call latency and an optional failure.
    #[derive(Default)]
    struct ScriptedRenderer {
        delays: Mutex<VecDeque<u64>>,
        calls: Mutex<Vec<Snapshot>>,
        fail: bool,
    }

    impl ScriptedRenderer {
        fn with_delays(delays: &[u64]) -> Self {
            Self {
                delays: Mutex::new(delays.iter().copied().collect()),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Snapshot> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RenderService for ScriptedRenderer {
        async fn render(&self, _template: &str, snapshot: &Snapshot) -> PortResult<String> {
            let delay = self.delays.lock().unwrap().pop_front().unwrap_or(0);
            self.calls.lock().unwrap().push(snapshot.clone());
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if self.fail {
                return Err(ApplicationError::render("undefined filter 'nope'"));
            }
            let host = snapshot
                .get("host")
                .and_then(VariableValue::as_scalar)
                .unwrap_or_default();
            Ok(format!("host={}", host))
        }
    }

    fn schema_service() -> MockSchemaService {
        let mut mock = MockSchemaService::new();
        mock.expect_extract_schema().returning(|text| {
            if text.contains("{%") && !text.contains("%}") {
                return Err(ApplicationError::schema_parse("unexpected end of template"));
            }
            if text.contains("disks") {
                Ok(VariableSchema::new(
                    ["host"],
                    [("disks".to_string(), vec!["name", "size"])],
                ))
            } else {
                Ok(VariableSchema::new(["host"], Vec::<(String, Vec<String>)>::new()))
            }
        });
        mock
    }

    fn session_with(
        renderer: Arc<ScriptedRenderer>,
        persistence: MockPersistenceService,
    ) -> EditorSession {
        let ports = SessionPorts::new(
            Arc::new(schema_service()),
            renderer,
            Arc::new(persistence),
        );
        EditorSession::new(ports, SessionSettings::default())
    }

    fn session(renderer: Arc<ScriptedRenderer>) -> EditorSession {
        session_with(renderer, MockPersistenceService::new())
    }

    const DISKS: &str = "{{ host }}{% for d in disks %}{{ d.name }}{{ d.size }}{% endfor %}";

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce_into_one_render() {
        let renderer = Arc::new(ScriptedRenderer::default());
        let mut s = session(Arc::clone(&renderer));
        s.set_template_text("{{ host }}").await.unwrap();
        for i in 0..5 {
            s.set_scalar("host", format!("v{}", i)).unwrap();
        }
        assert_eq!(s.state(), SyncState::Dirty);
        assert!(!s.is_idle());

        let events = s.settle().await;
        assert!(s.is_idle());

        assert_eq!(renderer.calls().len(), 1);
        assert_eq!(
            renderer.calls()[0].get("host"),
            Some(&VariableValue::from("v4"))
        );
        assert_eq!(
            events.last(),
            Some(&SessionEvent::Rendered {
                version: s.version(),
                output: "host=v4".into()
            })
        );
        assert_eq!(s.state(), SyncState::Clean);
        assert_eq!(s.rendered_output(), Some("host=v4"));
    }

    #[tokio::test(start_paused = true)]
    async fn render_waits_for_the_debounce_window() {
        let renderer = Arc::new(ScriptedRenderer::default());
        let mut s = session(Arc::clone(&renderer));
        s.set_template_text("{{ host }}").await.unwrap();

        let started = Instant::now();
        let event = s.next_event().await;
        assert!(matches!(event, SessionEvent::RenderIssued { .. }));
        assert!(Instant::now() - started >= DEFAULT_DEBOUNCE);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_order_responses_keep_the_latest() {
        let renderer = Arc::new(ScriptedRenderer::with_delays(&[1000, 10]));
        let mut s = session(Arc::clone(&renderer));
        s.set_template_text("{{ host }}").await.unwrap();
        s.set_scalar("host", "v1").unwrap();
        let first = s.version();

        assert_eq!(s.next_event().await, SessionEvent::RenderIssued { version: first });
        s.set_scalar("host", "v2").unwrap();
        let second = s.version();

        assert_eq!(s.next_event().await, SessionEvent::RenderIssued { version: second });
        assert_eq!(
            s.next_event().await,
            SessionEvent::Rendered {
                version: second,
                output: "host=v2".into()
            }
        );
        assert_eq!(s.next_event().await, SessionEvent::Discarded { version: first });
        assert_eq!(s.next_event().await, SessionEvent::Idle);

        assert_eq!(s.rendered_output(), Some("host=v2"));
        assert_eq!(s.state(), SyncState::Clean);
    }

    #[tokio::test(start_paused = true)]
    async fn template_switch_invalidates_in_flight_render() {
        let renderer = Arc::new(ScriptedRenderer::with_delays(&[500, 0]));
        let mut s = session(Arc::clone(&renderer));
        s.set_template_text("{{ host }}").await.unwrap();
        let first = s.version();
        assert_eq!(s.next_event().await, SessionEvent::RenderIssued { version: first });

        s.set_template_text(DISKS).await.unwrap();
        let events = s.settle().await;

        assert!(events.contains(&SessionEvent::Discarded { version: first }));
        assert_eq!(s.state(), SyncState::Clean);
        assert_eq!(renderer.calls().len(), 2);
        assert!(renderer.calls()[1].contains_key("disks"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_render_goes_back_to_dirty_without_retry() {
        let renderer = Arc::new(ScriptedRenderer::failing());
        let mut s = session(Arc::clone(&renderer));
        s.set_template_text("{{ host }}").await.unwrap();

        let events = s.settle().await;
        assert!(matches!(events.last(), Some(SessionEvent::RenderFailed { .. })));
        assert_eq!(s.state(), SyncState::Dirty);
        assert!(s.last_error().is_some());
        assert_eq!(s.rendered_output(), None);
        assert_eq!(renderer.calls().len(), 1);
        assert_eq!(s.next_event().await, SessionEvent::Idle);
    }

    #[tokio::test]
    async fn schema_parse_failure_keeps_previous_state() {
        let mut s = session(Arc::new(ScriptedRenderer::default()));
        s.set_template_text(DISKS).await.unwrap();
        s.set_scalar("host", "db01").unwrap();
        let before = s.store().clone();
        let version = s.version();

        let err = s.set_template_text("{% for x in").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(s.store(), &before);
        assert_eq!(s.template_text(), DISKS);
        assert_eq!(s.version(), version);
    }

    #[tokio::test]
    async fn template_edit_reconciles_and_preserves_values() {
        let mut s = session(Arc::new(ScriptedRenderer::default()));
        s.set_template_text("{{ host }}").await.unwrap();
        s.set_scalar("host", "db01").unwrap();

        s.set_template_text(DISKS).await.unwrap();
        assert_eq!(s.get("host").unwrap().as_scalar(), Some("db01"));
        assert_eq!(s.get("disks").unwrap().as_list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn caller_errors_do_not_mark_dirty() {
        let mut s = session(Arc::new(ScriptedRenderer::default()));
        s.set_template_text(DISKS).await.unwrap();
        let version = s.version();

        assert!(s.set_scalar("port", "22").is_err());
        assert!(s.remove_list_item("disks", 5).is_err());
        assert!(s.set_list_field("disks", 0, "mount", "/").is_err());
        assert_eq!(s.version(), version);

        assert_eq!(s.add_list_item("disks").unwrap(), 1);
        s.set_list_field("disks", 1, "name", "sdb").unwrap();
        assert_eq!(s.remove_list_item("disks", 0).unwrap().get("name"), Some(""));
        assert_eq!(s.version(), version + 3);
    }

    fn templates(entries: &'static [(&'static str, &'static str)]) -> MockPersistenceService {
        let mut mock = MockPersistenceService::new();
        mock.expect_load_template().returning(move |name| {
            entries
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, text)| text.to_string())
                .ok_or_else(|| ApplicationError::not_found(name))
        });
        mock
    }

    #[tokio::test]
    async fn load_template_keeps_compatible_values() {
        let mut s = session_with(
            Arc::new(ScriptedRenderer::default()),
            templates(&[("a.j2", "{{ host }}"), ("b.j2", DISKS)]),
        );
        s.load_template("a.j2").await.unwrap();
        s.set_scalar("host", "core-sw1").unwrap();

        s.load_template("b.j2").await.unwrap();
        assert_eq!(s.get("host").unwrap().as_scalar(), Some("core-sw1"));
        assert_eq!(s.template_name(), Some("b.j2"));
    }

    #[tokio::test]
    async fn start_template_replaces_the_store() {
        let mut s = session_with(
            Arc::new(ScriptedRenderer::default()),
            templates(&[("a.j2", "{{ host }}"), ("b.j2", DISKS)]),
        );
        s.load_template("a.j2").await.unwrap();
        s.set_scalar("host", "core-sw1").unwrap();
        let revision = s.store().revision();
        let version = s.version();

        s.start_template("b.j2").await.unwrap();
        assert_eq!(s.get("host").unwrap().as_scalar(), Some(""));
        assert_eq!(s.get("disks").unwrap().as_list().unwrap().len(), 1);
        assert_eq!(s.template_name(), Some("b.j2"));
        assert_eq!(s.template_text(), DISKS);
        assert!(!s.has_unsaved_changes());
        assert!(s.store().revision() > revision);
        assert!(s.version() > version);
        assert_eq!(s.state(), SyncState::Dirty);
    }

    #[tokio::test]
    async fn failed_start_keeps_the_session() {
        let mut s = session_with(
            Arc::new(ScriptedRenderer::default()),
            templates(&[("a.j2", "{{ host }}"), ("broken.j2", "{% for x in")]),
        );
        s.load_template("a.j2").await.unwrap();
        s.set_scalar("host", "core-sw1").unwrap();
        let before = s.store().clone();

        assert!(s.start_template("ghost.j2").await.is_err());
        assert!(s.start_template("broken.j2").await.is_err());
        assert_eq!(s.store(), &before);
        assert_eq!(s.template_name(), Some("a.j2"));
        assert!(s.has_unsaved_changes());
    }

    #[tokio::test]
    async fn save_template_stores_the_current_text() {
        let mut mock = MockPersistenceService::new();
        mock.expect_save_template()
            .withf(|name, text| name == "copy.j2" && text == "{{ host }}")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut s = session_with(Arc::new(ScriptedRenderer::default()), mock);
        s.set_template_text("{{ host }}").await.unwrap();

        s.save_template("copy.j2").await.unwrap();
        assert_eq!(s.template_name(), Some("copy.j2"));
    }

    fn persistence_with(values: serde_json::Value) -> MockPersistenceService {
        let mut mock = MockPersistenceService::new();
        let raw: RawValues = serde_json::from_value(values).unwrap();
        mock.expect_load_values()
            .returning(move |_| Ok(raw.clone()));
        mock
    }

    #[tokio::test]
    async fn load_values_merges_under_chosen_policy() {
        let mut s = session_with(
            Arc::new(ScriptedRenderer::default()),
            persistence_with(json!({"host": "b", "port": "22"})),
        );
        s.set_template_text("{{ host }}").await.unwrap();
        s.set_scalar("host", "a").unwrap();

        let outcome = s.load_values("site", &MergeChoice::Merge).await.unwrap();
        assert!(outcome.replaced.is_empty());
        assert_eq!(outcome.ignored, vec!["port"]);
        assert_eq!(s.get("host").unwrap().as_scalar(), Some("a"));

        let asked = Cell::new(false);
        let overwrite = |req: &crate::domain::MergeRequest<'_>| {
            asked.set(true);
            assert_eq!(req.source, "site");
            assert_eq!(req.matching, 1);
            MergeChoice::Overwrite
        };
        s.load_values("site", &overwrite).await.unwrap();
        assert!(asked.get());
        assert_eq!(s.get("host").unwrap().as_scalar(), Some("b"));
        assert!(!s.has_unsaved_changes());
    }

    #[tokio::test]
    async fn cancel_leaves_store_untouched() {
        let mut s = session_with(
            Arc::new(ScriptedRenderer::default()),
            persistence_with(json!({"host": "b"})),
        );
        s.set_template_text("{{ host }}").await.unwrap();
        let version = s.version();

        let outcome = s.load_values("site", &MergeChoice::Cancel).await.unwrap();
        assert_eq!(outcome.choice, MergeChoice::Cancel);
        assert_eq!(s.get("host").unwrap().as_scalar(), Some(""));
        assert_eq!(s.version(), version);
    }

    #[tokio::test]
    async fn malformed_value_set_aborts_load() {
        let mut s = session_with(
            Arc::new(ScriptedRenderer::default()),
            persistence_with(json!({"host": "b", "disks": "sda"})),
        );
        s.set_template_text(DISKS).await.unwrap();
        let before = s.store().clone();

        assert!(s.load_values("site", &MergeChoice::Overwrite).await.is_err());
        assert_eq!(s.store(), &before);
    }

    #[tokio::test]
    async fn missing_value_set_surfaces_not_found() {
        let mut mock = MockPersistenceService::new();
        mock.expect_load_values()
            .returning(|name| Err(ApplicationError::not_found(name)));
        let mut s = session_with(Arc::new(ScriptedRenderer::default()), mock);

        let err = s.load_values("ghost", &MergeChoice::Merge).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::ConfgenError::Application(ref e) if e.is_not_found()
        ));
    }

    #[tokio::test]
    async fn save_values_clears_unsaved_flag() {
        let mut mock = MockPersistenceService::new();
        mock.expect_save_values()
            .withf(|name, snapshot| name == "site" && snapshot.contains_key("host"))
            .times(1)
            .returning(|_, _| Ok(()));
        let mut s = session_with(Arc::new(ScriptedRenderer::default()), mock);
        s.set_template_text("{{ host }}").await.unwrap();
        assert!(s.has_unsaved_changes());

        s.save_values("site").await.unwrap();
        assert!(!s.has_unsaved_changes());
    }

    #[tokio::test]
    async fn exit_asks_only_with_unsaved_changes() {
        let mut s = session(Arc::new(ScriptedRenderer::default()));
        let asked = Cell::new(0);
        let guard = || {
            asked.set(asked.get() + 1);
            false
        };

        assert!(s.request_exit(&guard));
        assert_eq!(asked.get(), 0);

        s.set_template_text("{{ host }}").await.unwrap();
        assert!(!s.request_exit(&guard));
        assert_eq!(asked.get(), 1);
        assert!(s.request_exit(&true));
    }

    #[tokio::test(start_paused = true)]
    async fn save_output_requires_a_render() {
        let mut mock = MockPersistenceService::new();
        mock.expect_append_output()
            .withf(|name, text| name == "out.cfg" && text == "host=")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut s = session_with(Arc::new(ScriptedRenderer::default()), mock);
        s.set_template_text("{{ host }}").await.unwrap();
        let err = s.save_output("out.cfg", true).await.unwrap_err();
        assert_eq!(
            err,
            crate::error::ConfgenError::Application(ApplicationError::NothingRendered)
        );

        s.flush();
        s.settle().await;
        s.save_output("out.cfg", true).await.unwrap();
    }
}
