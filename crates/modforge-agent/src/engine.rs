use crate::client::{ModelClient, ModelStreamEvent};
use crate::config::{AgentConfig, DeliveryMode, ProviderSettings, ResolvedModel, SavedModel};
use crate::context::ContextWindow;
use crate::event::{codes, AgentEvent, ErrorReport};
use crate::parser::{extract_fixed_code, parse_module_response};
use crate::prompts;
use futures_util::{Stream, StreamExt};
use modforge_core::{
    AgentMessage, ChatMessage, GeneratedModuleData, ModforgeError, ModuleCategory, ToolArguments,
    ToolCallRequest, ToolCallResult,
};
use modforge_session::{AgentState, GenerationToken, SessionHandle, ToolCallInfo};
use modforge_tools::{
    catalog, code_arguments, CodeError, Language, SecurityScanResult, SyntaxCheckResult,
    ToolChainEvent, ToolExecutor,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// One module development request.
#[derive(Debug, Clone, Default)]
pub struct DevelopRequest {
    /// Natural-language description of the module.
    pub requirement: String,
    /// Model to use instead of the configured selection.
    pub model: Option<SavedModel>,
    /// Category the module should belong to.
    pub category: Option<ModuleCategory>,
    /// Code to revise instead of starting from scratch.
    pub existing_code: Option<String>,
}

impl DevelopRequest {
    #[allow(missing_docs)]
    pub fn new(requirement: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            ..Self::default()
        }
    }

    #[allow(missing_docs)]
    pub fn with_model(mut self, model: SavedModel) -> Self {
        self.model = Some(model);
        self
    }

    #[allow(missing_docs)]
    pub fn with_category(mut self, category: ModuleCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[allow(missing_docs)]
    pub fn with_existing_code(mut self, code: impl Into<String>) -> Self {
        self.existing_code = Some(code.into());
        self
    }
}

/// Drives develop runs for one session.
///
/// Each [`develop`](Self::develop) call spawns a task that owns the session's
/// working memory for the duration of the run and reports progress as
/// [`AgentEvent`]s. Starting a new run, or resetting the session, stops the
/// previous run from writing to memory.
pub struct AgentEngine {
    client: Arc<dyn ModelClient>,
    settings: Arc<ProviderSettings>,
    config: AgentConfig,
    executor: ToolExecutor,
    session: SessionHandle,
}

impl AgentEngine {
    /// Engine with a fresh session.
    pub fn new(client: Arc<dyn ModelClient>, settings: ProviderSettings, config: AgentConfig) -> Self {
        let session = SessionHandle::new(config.max_fix_attempts);
        Self {
            client,
            settings: Arc::new(settings),
            config,
            executor: ToolExecutor::new(),
            session,
        }
    }

    /// Uses `executor` for tool calls, e.g. one with a module store attached.
    pub fn with_executor(mut self, executor: ToolExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Continues an existing session instead of the fresh one.
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = session;
        self
    }

    #[allow(missing_docs)]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> AgentState {
        self.session.state()
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Clears working memory and detaches any run still in flight.
    pub fn reset(&self) {
        self.session.reset();
    }

    /// Starts a develop run and returns its event stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn develop(&self, request: DevelopRequest) -> DevelopStream {
        let span = info_span!("agent.develop", session_id = %self.session.id());
        self.spawn(span, |run| run.execute(request))
    }

    /// Checks `code` and applies rule-based fixes until it passes or the
    /// session's fix attempt limit is spent, without calling the model.
    ///
    /// Reports SYNTAX_CHECKING and FIXING state changes with a
    /// `ToolStart`/`ToolComplete` pair per tool, then COMPLETED, or ERROR
    /// with a `TOOL_CHAIN_FAILED` report.
    pub fn syntax_check_and_fix(
        &self,
        code: impl Into<String>,
        language: Language,
    ) -> DevelopStream {
        let code = code.into();
        let span = info_span!("agent.repair", session_id = %self.session.id());
        self.spawn(span, move |run| run.repair(code, language))
    }

    fn spawn<F, Fut>(&self, span: Span, body: F) -> DevelopStream
    where
        F: FnOnce(Run) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.session.begin_generation();
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let session_id = self.session.id();
        let run = Run {
            client: Arc::clone(&self.client),
            settings: Arc::clone(&self.settings),
            config: self.config.clone(),
            executor: self.executor.clone(),
            token: token.clone(),
            tx,
            session_id,
        };
        let task = tokio::spawn(body(run).instrument(span));
        DevelopStream {
            session_id,
            events: ReceiverStream::new(rx),
            task,
            token,
        }
    }

    /// Runs a develop request to the end and collects its outcome.
    pub async fn develop_to_end(&self, request: DevelopRequest) -> DevelopOutcome {
        self.develop(request).collect_outcome().await
    }
}

/// Events of one develop run.
///
/// Dropping the stream abandons the run at its next model call or event.
/// [`cancel`](Self::cancel) stops it immediately.
pub struct DevelopStream {
    session_id: Uuid,
    events: ReceiverStream<AgentEvent>,
    task: JoinHandle<()>,
    token: GenerationToken,
}

impl DevelopStream {
    #[allow(missing_docs)]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Aborts the run. Events already queued can still be drained.
    pub fn cancel(&mut self) {
        self.task.abort();
        self.events.close();
        if self.token.set_state(AgentState::Idle) {
            info!(session_id = %self.session_id, "develop run cancelled");
        }
    }

    /// Drains the stream into a [`DevelopOutcome`].
    pub async fn collect_outcome(mut self) -> DevelopOutcome {
        let mut outcome = DevelopOutcome::default();
        while let Some(event) = self.next().await {
            match &event {
                AgentEvent::Completed { module } => outcome.module = Some(module.clone()),
                AgentEvent::Error(report) => outcome.error = Some(report.clone()),
                _ => {}
            }
            outcome.events.push(event);
        }
        if outcome.error.is_none() && !outcome.reached_completed() {
            outcome.error = Some(ErrorReport::recoverable(
                "The develop run ended without a result",
                codes::INTERRUPTED,
            ));
        }
        outcome
    }
}

impl Stream for DevelopStream {
    type Item = AgentEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<AgentEvent>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

/// Result of a develop run that was consumed to the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevelopOutcome {
    /// Every event in emission order.
    pub events: Vec<AgentEvent>,
    /// The completed module, if the run succeeded.
    pub module: Option<GeneratedModuleData>,
    /// The terminal error, if the run failed.
    pub error: Option<ErrorReport>,
}

impl DevelopOutcome {
    /// The run reached COMPLETED without an error.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.reached_completed()
    }

    fn reached_completed(&self) -> bool {
        self.module.is_some() || self.states().last() == Some(&AgentState::Completed)
    }

    /// States in the order they were entered.
    pub fn states(&self) -> Vec<AgentState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::StateChange { state } => Some(*state),
                _ => None,
            })
            .collect()
    }
}

/// Why a run stopped early.
enum Halt {
    /// The consumer went away or a newer run took over.
    Cancelled,
    /// The run failed; `record` stores the message as the session's last error.
    Failed { report: ErrorReport, record: bool },
}

impl Halt {
    fn failed(report: ErrorReport) -> Self {
        Halt::Failed {
            report,
            record: true,
        }
    }
}

struct Generation {
    text: String,
    thoughts: String,
}

/// State of one spawned develop task.
struct Run {
    client: Arc<dyn ModelClient>,
    settings: Arc<ProviderSettings>,
    config: AgentConfig,
    executor: ToolExecutor,
    token: GenerationToken,
    tx: mpsc::Sender<AgentEvent>,
    session_id: Uuid,
}

impl Run {
    async fn execute(self, request: DevelopRequest) {
        if let Err(halt) = self.drive(&request).await {
            self.halt(halt).await;
        }
    }

    async fn repair(self, code: String, language: Language) {
        if let Err(halt) = self.drive_repair(&code, language).await {
            self.halt(halt).await;
        }
    }

    async fn halt(&self, halt: Halt) {
        match halt {
            Halt::Cancelled => {
                info!(session_id = %self.session_id, "develop run abandoned");
                if self.token.is_current() {
                    self.token.set_state(AgentState::Idle);
                }
            }
            Halt::Failed { report, record } => {
                warn!(
                    session_id = %self.session_id,
                    code = report.code.as_deref().unwrap_or("UNKNOWN"),
                    recoverable = report.recoverable,
                    "develop run failed: {}",
                    report.message
                );
                if record {
                    let message = report.message.clone();
                    self.token.write(|m| m.last_error = Some(message));
                }
                // The consumer may already be gone; nothing left to do then.
                if self.change_state(AgentState::Error).await.is_ok() {
                    let _ = self.emit(AgentEvent::Error(report)).await;
                }
            }
        }
    }

    /// Follows the check-and-fix chain, mirroring each tool into memory and
    /// onto the event stream.
    async fn drive_repair(&self, code: &str, language: Language) -> Result<(), Halt> {
        let max_attempts = self.token.session().read(|m| m.max_fix_attempts);
        self.change_state(AgentState::SyntaxChecking).await?;

        let chain = self
            .executor
            .syntax_check_and_fix_chain(code, language, max_attempts);
        tokio::pin!(chain);
        let mut fixing = false;
        let mut in_flight: Option<ToolCallInfo> = None;

        while let Some(event) = self.guarded(chain.next()).await? {
            match event {
                ToolChainEvent::ChainStarted { total_tools } => {
                    debug!(session_id = %self.session_id, total_tools, "repair chain started");
                }
                ToolChainEvent::ToolStarted { request, .. } => {
                    if request.tool_name == catalog::FIX_ERROR {
                        fixing = true;
                        self.change_state(AgentState::Fixing).await?;
                    } else if fixing {
                        fixing = false;
                        self.change_state(AgentState::SyntaxChecking).await?;
                    }
                    in_flight = Some(self.start_tool(&request).await?);
                }
                ToolChainEvent::ToolCompleted { result, .. } => {
                    if let Some(started) = in_flight.take() {
                        self.complete_tool(&started, &result).await?;
                    }
                }
                ToolChainEvent::ChainCompleted { results } => {
                    info!(session_id = %self.session_id, tools = results.len(), "repair completed");
                    return self.change_state(AgentState::Completed).await;
                }
                ToolChainEvent::ChainFailed { error, .. } => {
                    return Err(Halt::failed(ErrorReport::recoverable(
                        error,
                        codes::TOOL_CHAIN_FAILED,
                    )));
                }
            }
        }
        Err(Halt::Cancelled)
    }

    async fn drive(&self, request: &DevelopRequest) -> Result<(), Halt> {
        self.token
            .write(|m| m.begin_requirement(&request.requirement))
            .ok_or(Halt::Cancelled)?;
        self.change_state(AgentState::Thinking).await?;

        let resolved = self
            .settings
            .select_model(request.model.as_ref())
            .map_err(|e| Halt::failed(ErrorReport::from(&e)))?;
        info!(
            session_id = %self.session_id,
            model = %resolved.model.model_id,
            delivery = ?self.config.delivery,
            "model selected"
        );

        let messages = self.generation_messages(request);
        self.change_state(AgentState::Generating).await?;
        let generation = self.generate(&resolved, &messages).await?;

        let module = parse_module_response(&generation.text).map_err(|e| {
            Halt::failed(ErrorReport::from(&e).with_raw_response(generation.text.clone()))
        })?;
        self.store_draft(&module)?;
        self.emit(AgentEvent::ModuleGenerated {
            module: module.clone(),
        })
        .await?;

        let (draft, remaining_errors) = self.check_and_fix(&resolved, module).await?;

        self.change_state(AgentState::SecurityScanning).await?;
        let scan = self
            .run_tool(ToolCallRequest::new(
                catalog::SECURITY_SCAN,
                ToolArguments::new().with("code", draft.js_code.clone()),
            ))
            .await?;
        let module = match scan.decode::<SecurityScanResult>() {
            Some(result) => draft.with_security_safe(result.safe),
            None => {
                warn!(session_id = %self.session_id, "security scan produced no result");
                draft
            }
        };
        self.store_draft(&module)?;

        if let Some(errors) = remaining_errors {
            let max = self.token.session().read(|m| m.max_fix_attempts);
            return Err(Halt::Failed {
                report: ErrorReport::recoverable(
                    prompts::fix_limit_message(&errors, max),
                    codes::MAX_FIX_ATTEMPTS_REACHED,
                ),
                record: false,
            });
        }

        self.change_state(AgentState::Completed).await?;
        let mut message = AgentMessage::assistant(format!("Generated module \"{}\"", module.name))
            .with_module(module.clone());
        if !generation.thoughts.is_empty() {
            message = message.with_thoughts(generation.thoughts);
        }
        self.token
            .write(|m| m.add_assistant_message(message))
            .ok_or(Halt::Cancelled)?;
        info!(session_id = %self.session_id, module = %module.name, "module completed");
        self.emit(AgentEvent::Completed { module }).await
    }

    /// System prompt, prior turns, and the current requirement rendered as
    /// a full user request.
    fn generation_messages(&self, request: &DevelopRequest) -> Vec<ChatMessage> {
        let limit = self.config.max_history_messages;
        let history = self
            .token
            .session()
            .read(|m| m.context_for_model(limit.saturating_add(1)));
        let prior = history.len().saturating_sub(1);

        let mut window = ContextWindow::new(limit.max(1));
        window.set_system_prompt(prompts::development_system_prompt(
            request.category,
            request.existing_code.as_deref(),
        ));
        for message in history.into_iter().take(prior) {
            window.push(message);
        }
        window.push(ChatMessage::user(prompts::user_request(
            &request.requirement,
            request.category,
            request.existing_code.as_deref(),
        )));
        debug!(
            session_id = %self.session_id,
            estimated_tokens = window.estimated_tokens(),
            "prompt built"
        );
        window.into_messages()
    }

    async fn generate(
        &self,
        resolved: &ResolvedModel,
        messages: &[ChatMessage],
    ) -> Result<Generation, Halt> {
        match self.config.delivery {
            DeliveryMode::Streamed => self.generate_streamed(resolved, messages).await,
            DeliveryMode::Buffered => {
                let call = tokio::time::timeout(
                    self.config.stream_timeout(),
                    self.client
                        .chat(&resolved.credentials, &resolved.model.model_id, messages),
                );
                let text = match self.guarded(call).await? {
                    Err(_) => {
                        return Err(Halt::failed(ErrorReport::from(&ModforgeError::Timeout(
                            self.config.stream_timeout_secs,
                        ))))
                    }
                    Ok(Err(e)) => return Err(Halt::failed(ErrorReport::from(&e))),
                    Ok(Ok(text)) => text,
                };
                if text.trim().is_empty() {
                    return Err(Halt::failed(empty_response()));
                }
                Ok(Generation {
                    text,
                    thoughts: String::new(),
                })
            }
        }
    }

    async fn generate_streamed(
        &self,
        resolved: &ResolvedModel,
        messages: &[ChatMessage],
    ) -> Result<Generation, Halt> {
        let deadline = Instant::now() + self.config.stream_timeout();
        let open = tokio::time::timeout_at(
            deadline,
            self.client
                .chat_stream(&resolved.credentials, &resolved.model.model_id, messages),
        );
        let mut stream = match self.guarded(open).await? {
            Err(_) => return Err(Halt::failed(self.stream_timeout(""))),
            Ok(Err(e)) => return Err(Halt::failed(ErrorReport::from(&e))),
            Ok(Ok(stream)) => stream,
        };

        let mut content = String::new();
        let mut thoughts = String::new();
        let mut finished = false;
        loop {
            let next = self
                .guarded(tokio::time::timeout_at(deadline, stream.recv()))
                .await?;
            let event = match next {
                Err(_) => return Err(Halt::failed(self.stream_timeout(&content))),
                Ok(None) => break,
                Ok(Some(event)) => event,
            };
            match event {
                ModelStreamEvent::Started => debug!(session_id = %self.session_id, "stream started"),
                ModelStreamEvent::Thinking { delta } => {
                    thoughts.push_str(&delta);
                    self.emit(AgentEvent::Thinking {
                        delta,
                        accumulated: thoughts.clone(),
                    })
                    .await?;
                }
                ModelStreamEvent::Content { delta, accumulated } => {
                    content.clone_from(&accumulated);
                    self.emit(AgentEvent::Content { delta, accumulated }).await?;
                }
                ModelStreamEvent::Done { full_text } => {
                    if content.is_empty() {
                        content = full_text;
                    }
                    finished = true;
                    break;
                }
                ModelStreamEvent::Error { message } => {
                    let err = ModforgeError::Model(message);
                    return Err(Halt::failed(
                        ErrorReport::from(&err).with_raw_response(content),
                    ));
                }
            }
        }

        debug!(
            session_id = %self.session_id,
            finished,
            content_len = content.len(),
            "stream ended"
        );
        if !finished || content.trim().is_empty() {
            return Err(Halt::failed(empty_response().with_raw_response(content)));
        }
        Ok(Generation {
            text: content,
            thoughts,
        })
    }

    fn stream_timeout(&self, partial: &str) -> ErrorReport {
        ErrorReport::from(&ModforgeError::Timeout(self.config.stream_timeout_secs))
            .with_raw_response(partial)
    }

    /// Syntax check with bounded repair. Returns the last draft and, when
    /// the attempts ran out, the errors that remain.
    async fn check_and_fix(
        &self,
        resolved: &ResolvedModel,
        mut draft: GeneratedModuleData,
    ) -> Result<(GeneratedModuleData, Option<Vec<CodeError>>), Halt> {
        let max = self.token.session().read(|m| m.max_fix_attempts);
        loop {
            self.change_state(AgentState::SyntaxChecking).await?;
            let result = self
                .run_tool(ToolCallRequest::new(
                    catalog::SYNTAX_CHECK,
                    code_arguments(&draft.js_code, Language::JavaScript),
                ))
                .await?;
            let errors = match result.decode::<SyntaxCheckResult>() {
                Some(check) if !check.valid => check.errors,
                Some(_) => return Ok((draft, None)),
                None => {
                    warn!(session_id = %self.session_id, "syntax check produced no result");
                    return Ok((draft, None));
                }
            };

            let attempt = self
                .token
                .write(|m| {
                    m.can_attempt_fix().then(|| {
                        m.increment_fix_attempt();
                        m.fix_attempt_count
                    })
                })
                .ok_or(Halt::Cancelled)?;
            let Some(attempt) = attempt else {
                warn!(
                    session_id = %self.session_id,
                    remaining = errors.len(),
                    "fix attempts exhausted"
                );
                return Ok((draft, Some(errors)));
            };

            info!(
                session_id = %self.session_id,
                attempt,
                errors = errors.len(),
                "attempting fix"
            );
            self.change_state(AgentState::Fixing).await?;
            let fixed = self
                .request_fix(resolved, &draft, &errors, attempt, max)
                .await?;
            draft = draft.with_js_code(fixed);
            self.store_draft(&draft)?;
            self.emit(AgentEvent::ModuleGenerated {
                module: draft.clone(),
            })
            .await?;
        }
    }

    async fn request_fix(
        &self,
        resolved: &ResolvedModel,
        draft: &GeneratedModuleData,
        errors: &[CodeError],
        attempt: u32,
        max: u32,
    ) -> Result<String, Halt> {
        let messages = [
            ChatMessage::system(prompts::FIX_SYSTEM_PROMPT),
            ChatMessage::user(prompts::fix_request(&draft.js_code, errors, attempt, max)),
        ];
        let call = tokio::time::timeout(
            self.config.fix_timeout(),
            self.client
                .chat(&resolved.credentials, &resolved.model.model_id, &messages),
        );
        let reply = match self.guarded(call).await? {
            Err(_) => {
                return Err(Halt::failed(ErrorReport::from(&ModforgeError::Timeout(
                    self.config.fix_timeout_secs,
                ))))
            }
            Ok(Err(e @ ModforgeError::Timeout(_))) => return Err(Halt::failed(ErrorReport::from(&e))),
            Ok(Err(e)) => {
                return Err(Halt::failed(ErrorReport::recoverable(
                    format!("Automatic fix failed: {e}"),
                    codes::AUTO_FIX_FAILED,
                )))
            }
            Ok(Ok(reply)) => reply,
        };
        extract_fixed_code(&reply).ok_or_else(|| {
            Halt::failed(
                ErrorReport::recoverable(
                    "Automatic fix returned no code; please check the code manually",
                    codes::AUTO_FIX_FAILED,
                )
                .with_raw_response(reply),
            )
        })
    }

    /// Runs one tool, tracking it in memory and reporting start and end.
    async fn run_tool(&self, request: ToolCallRequest) -> Result<ToolCallResult, Halt> {
        let started = self.start_tool(&request).await?;
        let result = self.executor.execute(&request).await;
        self.complete_tool(&started, &result).await?;
        Ok(result)
    }

    /// Records `request` as executing and emits `ToolStart`.
    async fn start_tool(&self, request: &ToolCallRequest) -> Result<ToolCallInfo, Halt> {
        let recorded = self.token.write(|m| {
            m.record_tool_call(ToolCallInfo::from_request(request))?;
            m.mark_tool_call_executing(&request.call_id);
            Ok::<_, ModforgeError>(())
        });
        if let Some(Err(e)) = recorded {
            warn!(session_id = %self.session_id, call_id = %request.call_id, "tool call not recorded: {e}");
        }

        let started = ToolCallInfo::from_request(request).executing();
        self.emit(AgentEvent::ToolStart {
            info: started.clone(),
        })
        .await?;
        Ok(started)
    }

    async fn complete_tool(
        &self,
        started: &ToolCallInfo,
        result: &ToolCallResult,
    ) -> Result<(), Halt> {
        self.token.write(|m| m.complete_tool_call(result));
        self.emit(AgentEvent::ToolComplete {
            info: ToolCallInfo::from_result(started, result),
        })
        .await
    }

    fn store_draft(&self, module: &GeneratedModuleData) -> Result<(), Halt> {
        self.token
            .write(|m| m.update_module(module.clone()))
            .ok_or(Halt::Cancelled)
    }

    async fn change_state(&self, state: AgentState) -> Result<(), Halt> {
        if self.token.set_state(state) {
            debug!(session_id = %self.session_id, state = %state, "state changed");
        }
        self.emit(AgentEvent::StateChange { state }).await
    }

    async fn emit(&self, event: AgentEvent) -> Result<(), Halt> {
        self.tx.send(event).await.map_err(|_| Halt::Cancelled)
    }

    /// Awaits `fut` unless the consumer goes away or a newer run starts.
    async fn guarded<F: Future>(&self, fut: F) -> Result<F::Output, Halt> {
        if !self.token.is_current() {
            return Err(Halt::Cancelled);
        }
        tokio::select! {
            () = self.tx.closed() => Err(Halt::Cancelled),
            output = fut => Ok(output),
        }
    }
}

fn empty_response() -> ErrorReport {
    ErrorReport::recoverable("The model returned an empty response", codes::EMPTY_RESPONSE)
}
