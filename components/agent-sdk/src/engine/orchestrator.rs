//! The decision/execution loop.

use crate::config::{AgentConfig, CancellationPolicy, ContinuationPolicy};
use crate::decision::{Choice, Verdict, parse_choice, parse_tool_instruction, parse_verdict};
use crate::engine::log::{ActionLog, LogEvent};
use crate::engine::outcome::{RunOutcome, RunReport};
use crate::engine::state::{ActionKind, LoopState, RetryCounter};
use crate::error::{AgentError, DecisionError, ParseError};
use crate::executor::{Action, ActionExecutor};
use crate::inference::{CancelFlag, ChatRequest, ChunkSink, InferenceGateway};
use crate::parser::{extract_fenced_blocks, extract_single_json};
use crate::prompt::{
    PromptBuilder, PromptKind, RECONSIDER, answer_question, check_question, execution_report,
    failure_report,
};
use crate::tools::ToolRegistry;
use crate::types::{Conversation, Message};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const CHOICE_SHAPE: &str = "with a 'use' key of python, tool or respond";
const VERDICT_SHAPE: &str = "with a 'use' key of yes or no";
const TOOL_SHAPE: &str = "containing the keys 'tool' and 'parameters'";

/// Drives one request through `DECIDING -> EXECUTING -> CHECKING -> ANSWERING`.
///
/// Malformed model output and failed executions are fed back as correction
/// messages. Each of them consumes one retry; once more than
/// `max_retries` attempts failed the request ends in `FAILED`.
///
/// The orchestrator holds no per-request state, so one instance can serve
/// many requests.
pub struct Orchestrator {
    pub(crate) gateway: Arc<dyn InferenceGateway>,
    pub(crate) executor: Arc<dyn ActionExecutor>,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) prompts: PromptBuilder,
    pub(crate) config: AgentConfig,
    pub(crate) sink: Option<Arc<dyn ChunkSink>>,
    pub(crate) cancel: Option<CancelFlag>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// State owned by a single request.
struct Run {
    request: String,
    conversation: Conversation,
    retries: RetryCounter,
    log: ActionLog,
    executions: u32,
    last_action: Option<Action>,
    last_summary: Option<String>,
    answer: Option<String>,
}

enum Reply {
    Complete(String),
    Cancelled(String),
}

enum Flow {
    Next(LoopState),
    Cancelled(String),
}

impl Orchestrator {
    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The shared tool registry.
    #[must_use]
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Handles one user request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyRequest`] for a blank request and
    /// [`AgentError::Inference`] when the gateway fails. Protocol violations
    /// and failed executions never surface here; they end in
    /// [`RunOutcome::Failed`] once the retry budget is spent.
    pub async fn run(&self, request: &str) -> Result<RunReport, AgentError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(AgentError::EmptyRequest);
        }

        let started = Instant::now();
        let mut run = Run {
            request: request.to_string(),
            conversation: Conversation::new(self.prompts.initial_request(request)),
            retries: RetryCounter::new(self.config.max_retries),
            log: ActionLog::new(),
            executions: 0,
            last_action: None,
            last_summary: None,
            answer: None,
        };
        info!(
            model = %self.config.model,
            max_retries = self.config.max_retries,
            "Handling request"
        );

        let mut state = LoopState::Deciding;
        let outcome = loop {
            let flow = match state {
                LoopState::Deciding => self.decide(&mut run).await?,
                LoopState::Executing(kind) => self.execute(&mut run, kind).await?,
                LoopState::Checking => self.check(&mut run).await?,
                LoopState::Answering => self.answer(&mut run).await?,
                LoopState::Failed => {
                    let attempts = run.retries.used();
                    run.log
                        .record(LoopState::Failed, LogEvent::RetriesExhausted { attempts });
                    warn!(attempts, "Retry budget exhausted");
                    let message = format!(
                        "Unable to complete the request after {attempts} attempts.\n\n{}",
                        run.log.render()
                    );
                    break RunOutcome::Failed {
                        message,
                        log: std::mem::take(&mut run.log),
                    };
                }
                LoopState::Done => {
                    break RunOutcome::Answered {
                        answer: run.answer.take().unwrap_or_default(),
                        log: std::mem::take(&mut run.log),
                    };
                }
            };

            match flow {
                Flow::Next(next) => {
                    if next == state {
                        debug!(%state, retries = run.retries.used(), "Re-entering state");
                    } else {
                        info!(from = %state, to = %next, "State transition");
                    }
                    state = next;
                }
                Flow::Cancelled(partial) => {
                    info!(%state, "Request cancelled");
                    break RunOutcome::Cancelled {
                        partial,
                        log: std::mem::take(&mut run.log),
                    };
                }
            }
        };

        Ok(RunReport {
            outcome,
            request: run.request,
            instructions: self.prompts.system(PromptKind::Decision, &self.tools).content,
            last_action: run.last_action,
            executions: run.executions,
            elapsed: started.elapsed(),
        })
    }

    async fn decide(&self, run: &mut Run) -> Result<Flow, AgentError> {
        let state = LoopState::Deciding;
        let text = match self.ask(run, state, PromptKind::Decision).await? {
            Reply::Complete(text) => text,
            Reply::Cancelled(partial) => return Ok(self.on_cancelled(run, state, partial, state)),
        };

        let choice = match extract_single_json(&text) {
            Ok(value) => parse_choice(&value).map_err(|e| decision_correction(&e, CHOICE_SHAPE)),
            Err(e) => Err(parse_correction(&e, CHOICE_SHAPE)),
        };

        Ok(match choice {
            Ok(choice) => {
                run.log.record(state, LogEvent::Decision { choice });
                Flow::Next(match choice {
                    Choice::Python => LoopState::Executing(ActionKind::Python),
                    Choice::Tool => LoopState::Executing(ActionKind::Tool),
                    Choice::Respond => LoopState::Answering,
                })
            }
            Err(reason) => self.correct(run, state, reason, state),
        })
    }

    async fn execute(&self, run: &mut Run, kind: ActionKind) -> Result<Flow, AgentError> {
        let state = LoopState::Executing(kind);
        let prompt = match kind {
            ActionKind::Python => PromptKind::Python,
            ActionKind::Tool => PromptKind::Tool,
        };
        let text = match self.ask(run, state, prompt).await? {
            Reply::Complete(text) => text,
            Reply::Cancelled(partial) => return Ok(self.on_cancelled(run, state, partial, state)),
        };

        let extracted = match kind {
            ActionKind::Python => extract_python(&text),
            ActionKind::Tool => extract_tool(&text),
        };
        let (action, shown, label) = match extracted {
            Ok(extracted) => extracted,
            Err(reason) => return Ok(self.correct(run, state, reason, state)),
        };

        info!(%kind, "Executing action");
        let result = self.executor.execute(&action).await;
        run.executions += 1;
        run.log.record(
            state,
            LogEvent::Execution {
                kind,
                result: result.clone(),
            },
        );

        if !result.is_success() {
            warn!(%kind, status = %result.status, "Execution failed");
            run.conversation
                .push(Message::user(failure_report(label, &shown, &result)));
            return Ok(self.consume_retry(run, state));
        }

        run.last_action = Some(action);
        run.conversation
            .push(Message::user(execution_report(label, &shown, &result)));

        let summary = match self.ask(run, state, PromptKind::Summary).await? {
            Reply::Complete(text) => text,
            Reply::Cancelled(partial) => {
                return Ok(self.on_cancelled(run, state, partial, LoopState::Checking));
            }
        };
        run.log.record(
            state,
            LogEvent::Summary {
                content: summary.clone(),
            },
        );
        run.last_summary = Some(summary);
        run.conversation
            .push(Message::user(check_question(&run.request)));

        Ok(Flow::Next(LoopState::Checking))
    }

    async fn check(&self, run: &mut Run) -> Result<Flow, AgentError> {
        let state = LoopState::Checking;
        let text = match self.ask(run, state, PromptKind::Check).await? {
            Reply::Complete(text) => text,
            Reply::Cancelled(partial) => return Ok(self.on_cancelled(run, state, partial, state)),
        };

        let verdict = match extract_single_json(&text) {
            Ok(value) => parse_verdict(&value).map_err(|e| decision_correction(&e, VERDICT_SHAPE)),
            Err(e) => Err(parse_correction(&e, VERDICT_SHAPE)),
        };
        let verdict = match verdict {
            Ok(verdict) => verdict,
            Err(reason) => return Ok(self.correct(run, state, reason, state)),
        };

        run.log.record(state, verdict);
        if verdict == Verdict::Yes {
            return Ok(Flow::Next(LoopState::Answering));
        }

        info!(continuation = ?self.config.continuation, "Request not answered yet");
        if run.retries.consume() {
            return Ok(Flow::Next(LoopState::Failed));
        }
        if self.config.continuation == ContinuationPolicy::FreshPrompt {
            run.conversation.reset();
        }
        run.conversation.push(Message::user(RECONSIDER));
        Ok(Flow::Next(LoopState::Deciding))
    }

    async fn answer(&self, run: &mut Run) -> Result<Flow, AgentError> {
        let state = LoopState::Answering;
        run.conversation
            .push(Message::user(answer_question(&run.request)));
        let text = match self.ask(run, state, PromptKind::Answer).await? {
            Reply::Complete(text) => text,
            Reply::Cancelled(partial) => return Ok(self.on_cancelled(run, state, partial, state)),
        };
        run.answer = Some(text.trim().to_string());
        Ok(Flow::Next(LoopState::Done))
    }

    /// One gateway call with the system prompt for `kind`. The reply is
    /// appended to the conversation and the log.
    async fn ask(&self, run: &mut Run, state: LoopState, kind: PromptKind) -> Result<Reply, AgentError> {
        self.truncate_history(run, state);

        if self.config.cancellation == CancellationPolicy::Abort
            && self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
        {
            return Ok(Reply::Cancelled(String::new()));
        }

        let messages = self
            .prompts
            .messages(kind, &self.tools, &run.conversation, None);
        if self.config.verbose {
            debug!(%state, ?messages, "Prompt");
        }

        let mut request = ChatRequest::new(self.config.model.clone(), messages);
        if matches!(kind, PromptKind::Decision | PromptKind::Tool) {
            request = request.with_tools(self.tools.docs());
        }
        if let Some(sink) = &self.sink {
            request = request.with_sink(Arc::clone(sink));
        }
        if let Some(cancel) = &self.cancel {
            request = request.with_cancel(cancel.clone());
        }

        let response = self.gateway.chat(request).await?;
        debug!(%state, chars = response.content.len(), cancelled = response.cancelled, "Model replied");

        run.log.record(
            state,
            LogEvent::ModelResponse {
                content: response.content.clone(),
            },
        );
        run.conversation
            .push(Message::assistant(response.content.clone()));

        Ok(if response.cancelled {
            Reply::Cancelled(response.content)
        } else {
            Reply::Complete(response.content)
        })
    }

    fn truncate_history(&self, run: &mut Run, state: LoopState) {
        let Some(max) = self.config.max_history_messages else {
            return;
        };
        if run.conversation.len() <= max {
            return;
        }
        let summary = run
            .last_summary
            .as_ref()
            .map(|summary| format!("Summary of earlier steps:\n{summary}"));
        let keep = max.saturating_sub(if summary.is_some() { 2 } else { 1 }).max(1);
        let dropped = run.conversation.truncate(keep, summary);
        if dropped > 0 {
            info!(dropped, max, "Conversation truncated");
            run.log.record(state, LogEvent::Truncation { dropped });
        }
    }

    fn on_cancelled(&self, run: &mut Run, state: LoopState, partial: String, resume: LoopState) -> Flow {
        run.log.record(
            state,
            LogEvent::Cancelled {
                partial: partial.clone(),
            },
        );
        match self.config.cancellation {
            CancellationPolicy::Abort => Flow::Cancelled(partial),
            CancellationPolicy::Retry => {
                if let Some(cancel) = &self.cancel {
                    cancel.reset();
                }
                self.correct(
                    run,
                    state,
                    "The previous response was cancelled before it finished. Reply again.".to_string(),
                    resume,
                )
            }
        }
    }

    /// Feeds a correction back and consumes one retry.
    fn correct(&self, run: &mut Run, state: LoopState, reason: String, resume: LoopState) -> Flow {
        warn!(%state, %reason, "Correcting model output");
        run.log.record(
            state,
            LogEvent::Correction {
                reason: reason.clone(),
            },
        );
        run.conversation.push(Message::user(reason));
        self.consume_retry(run, resume)
    }

    fn consume_retry(&self, run: &mut Run, resume: LoopState) -> Flow {
        if run.retries.consume() {
            Flow::Next(LoopState::Failed)
        } else {
            debug!(
                used = run.retries.used(),
                max = run.retries.max(),
                "Retry consumed"
            );
            Flow::Next(resume)
        }
    }
}

type Extracted = (Action, String, &'static str);

fn extract_python(text: &str) -> Result<Extracted, String> {
    let blocks = extract_fenced_blocks(text, "python");
    if blocks.is_empty() {
        return Err(
            "No python block found. Wrap the code in triple backticks and specify 'python' (starting with ```python)."
                .to_string(),
        );
    }
    let code = blocks.join("\n");
    Ok((Action::Python(code.clone()), code, "code"))
}

fn extract_tool(text: &str) -> Result<Extracted, String> {
    let value = extract_single_json(text).map_err(|e| parse_correction(&e, TOOL_SHAPE))?;
    parse_tool_instruction(&value).map_err(|e| decision_correction(&e, TOOL_SHAPE))?;
    let shown = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    Ok((Action::Tool(value), shown, "tool instruction"))
}

fn parse_correction(error: &ParseError, shape: &str) -> String {
    match error {
        ParseError::NoJsonBlock => format!(
            "Wrap the instruction in triple backticks and specify 'json' (starting with ```json). Reply with a JSON object {shape}."
        ),
        ParseError::InvalidJson(reason) => format!(
            "The JSON block could not be parsed: {reason}. Reply with one valid JSON object {shape}, wrapped in triple backticks starting with ```json."
        ),
    }
}

fn decision_correction(error: &DecisionError, shape: &str) -> String {
    format!("Invalid instruction: {error}. Reply with a JSON object {shape}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OrchestratorBuilder;
    use crate::inference::{ChatResponse, InferenceError};
    use crate::types::{ExecutionResult, Role};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays canned replies and records every request.
    #[derive(Default)]
    struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<ChatResponse, InferenceError>>>,
        requests: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedGateway {
        fn new(replies: &[&str]) -> Arc<Self> {
            let gateway = Self::default();
            gateway
                .replies
                .lock()
                .extend(replies.iter().map(|r| Ok(ChatResponse::new(*r))));
            Arc::new(gateway)
        }

        fn push(&self, reply: Result<ChatResponse, InferenceError>) {
            self.replies.lock().push_back(reply);
        }

        fn calls(&self) -> usize {
            self.requests.lock().len()
        }

        fn request(&self, index: usize) -> Vec<Message> {
            self.requests.lock()[index].clone()
        }
    }

    #[async_trait]
    impl InferenceGateway for ScriptedGateway {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
            self.requests.lock().push(request.messages);
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(InferenceError::ProviderError("script exhausted".into())))
        }
    }

    /// Returns scripted results, `200` once the script runs out.
    #[derive(Default)]
    struct CountingExecutor {
        results: Mutex<VecDeque<ExecutionResult>>,
        calls: AtomicUsize,
    }

    impl CountingExecutor {
        fn new(results: Vec<ExecutionResult>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ActionExecutor for CountingExecutor {
        async fn execute(&self, _action: &Action) -> ExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .pop_front()
                .unwrap_or_else(|| ExecutionResult::ok("Execution successful.\nOutput:\n68"))
        }
    }

    fn json_block(body: &str) -> String {
        format!("```json\n{body}\n```")
    }

    fn orchestrator(
        gateway: Arc<ScriptedGateway>,
        executor: Arc<CountingExecutor>,
        config: AgentConfig,
    ) -> Orchestrator {
        OrchestratorBuilder::new()
            .gateway(gateway)
            .executor(executor)
            .config(config)
            .build()
            .unwrap()
    }

    fn config(max_retries: u32) -> AgentConfig {
        AgentConfig::builder().max_retries(max_retries).build().unwrap()
    }

    #[tokio::test]
    async fn test_respond_answers_without_execution() {
        let respond = json_block(r#"{"use": "respond"}"#);
        let gateway = ScriptedGateway::new(&[respond.as_str(), "68"]);
        let executor = CountingExecutor::new(vec![]);
        let agent = orchestrator(gateway.clone(), executor.clone(), config(3));

        let report = agent.run("what is 17 * 4").await.unwrap();

        assert_eq!(report.outcome.text(), "68");
        assert!(report.outcome.is_answered());
        assert_eq!(executor.calls(), 0);
        assert_eq!(report.executions, 0);
        assert_eq!(gateway.calls(), 2);
        let last = gateway.request(1);
        assert_eq!(
            last.last().unwrap().content,
            "What is the final answer to the following request: 'what is 17 * 4'?"
        );
    }

    #[tokio::test]
    async fn test_malformed_outputs_exhaust_budget() {
        let max = 3;
        let replies = vec!["no json here"; usize::try_from(max + 1).unwrap()];
        let gateway = ScriptedGateway::new(&replies);
        let executor = CountingExecutor::new(vec![]);
        let agent = orchestrator(gateway.clone(), executor.clone(), config(max));

        let report = agent.run("do something").await.unwrap();

        let RunOutcome::Failed { message, log } = &report.outcome else {
            panic!("expected failure, got {:?}", report.outcome);
        };
        assert!(message.starts_with("Unable to complete the request after 4 attempts."));
        assert!(message.contains("correction:"));
        assert_eq!(log.corrections(), 4);
        assert_eq!(gateway.calls(), 4);
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_each_malformed_choice_gets_one_named_correction() {
        let malformed = [
            "I think python".to_string(),
            json_block("{not json"),
            json_block(r#"[{"use": "python"}]"#),
            json_block(r#"{"use": "maybe"}"#),
            json_block(r#"{"choice": "python"}"#),
        ];
        let respond = json_block(r#"{"use": " RESPOND "}"#);
        let mut replies: Vec<&str> = malformed.iter().map(String::as_str).collect();
        replies.push(respond.as_str());
        replies.push("done");
        let gateway = ScriptedGateway::new(&replies);
        let agent = orchestrator(gateway.clone(), CountingExecutor::new(vec![]), config(10));

        let report = agent.run("task").await.unwrap();

        assert_eq!(report.outcome.text(), "done");
        assert_eq!(report.outcome.log().corrections(), 5);

        // Request 6 carries every exchange: request, then (reply, correction) x5.
        let messages = gateway.request(5);
        let corrections: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .skip(1)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(corrections.len(), 5);
        assert!(corrections[0].contains("specify 'json'"));
        assert!(corrections[1].contains("could not be parsed"));
        assert!(corrections[2].contains("found an array"));
        assert!(corrections[3].contains("'maybe'"));
        assert!(corrections[4].contains("missing key 'use'"));
    }

    #[tokio::test]
    async fn test_python_round_trip_reaches_checking_with_result() {
        let python = json_block(r#"{"use": "python"}"#);
        let yes = json_block(r#"{"use": "yes"}"#);
        let gateway = ScriptedGateway::new(&[
            python.as_str(),
            "```python\nprint(17 * 4)\n```",
            "The product is 68.",
            yes.as_str(),
            "68",
        ]);
        let executor = CountingExecutor::new(vec![]);
        let agent = orchestrator(gateway.clone(), executor.clone(), config(3));

        let report = agent.run("what is 17 * 4").await.unwrap();

        assert_eq!(report.outcome.text(), "68");
        assert_eq!(executor.calls(), 1);
        assert_eq!(report.last_action, Some(Action::Python("print(17 * 4)".into())));

        let check = gateway.request(3);
        assert!(check[0].content.contains("determine if the user's request was fulfilled"));
        assert!(check.iter().any(|m| m.content.contains("Execution successful")));
        assert_eq!(
            check.last().unwrap().content,
            "Was the request 'what is 17 * 4' answered?"
        );
    }

    #[tokio::test]
    async fn test_failed_execution_is_fed_back_and_retried() {
        let python = json_block(r#"{"use": "python"}"#);
        let yes = json_block(r#"{"use": "yes"}"#);
        let gateway = ScriptedGateway::new(&[
            python.as_str(),
            "```python\nprint(x)\n```",
            "```python\nimport time\ntime.sleep(999)\n```",
            "```python\nprint(1)\n```",
            "summary",
            yes.as_str(),
            "1",
        ]);
        let executor = CountingExecutor::new(vec![
            ExecutionResult::error("Execution failed with exit code 1.\nError:\nNameError"),
            ExecutionResult::timeout("Execution timed out after 1 seconds."),
        ]);
        let agent = orchestrator(gateway.clone(), executor.clone(), config(3));

        let report = agent.run("print one").await.unwrap();

        assert!(report.outcome.is_answered());
        assert_eq!(executor.calls(), 3);
        let third = gateway.request(3);
        let feedback: Vec<&str> = third
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        assert!(feedback[1].ends_with("# Fix and complete the code"));
        assert!(feedback[2].contains("took too long"));
    }

    #[tokio::test]
    async fn test_unanswered_verdict_with_fresh_prompt_resets_conversation() {
        let python = json_block(r#"{"use": "python"}"#);
        let no = json_block(r#"{"use": "no"}"#);
        let respond = json_block(r#"{"use": "respond"}"#);
        let gateway = ScriptedGateway::new(&[
            python.as_str(),
            "```python\nprint(2)\n```",
            "summary",
            no.as_str(),
            respond.as_str(),
            "2",
        ]);
        let mut config = config(3);
        config.continuation = ContinuationPolicy::FreshPrompt;
        let agent = orchestrator(gateway.clone(), CountingExecutor::new(vec![]), config);

        let report = agent.run("compute").await.unwrap();

        assert!(report.outcome.is_answered());
        let redecide = gateway.request(4);
        assert_eq!(redecide.len(), 3);
        assert_eq!(redecide[1].content, "compute");
        assert_eq!(redecide[2].content, RECONSIDER);
    }

    #[tokio::test]
    async fn test_unanswered_verdict_with_full_context_keeps_history() {
        let python = json_block(r#"{"use": "python"}"#);
        let no = json_block(r#"{"use": "no"}"#);
        let respond = json_block(r#"{"use": "respond"}"#);
        let gateway = ScriptedGateway::new(&[
            python.as_str(),
            "```python\nprint(2)\n```",
            "summary",
            no.as_str(),
            respond.as_str(),
            "2",
        ]);
        let agent = orchestrator(gateway.clone(), CountingExecutor::new(vec![]), config(3));

        agent.run("compute").await.unwrap();

        let redecide = gateway.request(4);
        assert!(redecide.len() > 3);
        assert_eq!(redecide.last().unwrap().content, RECONSIDER);
    }

    #[tokio::test]
    async fn test_cancelled_reply_aborts_by_default() {
        let gateway = ScriptedGateway::new(&[]);
        gateway.push(Ok(ChatResponse::cancelled("```json\n{\"use\"")));
        let agent = OrchestratorBuilder::new()
            .gateway(gateway.clone())
            .executor(CountingExecutor::new(vec![]))
            .cancel(CancelFlag::new())
            .build()
            .unwrap();

        let report = agent.run("anything").await.unwrap();

        let RunOutcome::Cancelled { partial, log } = &report.outcome else {
            panic!("expected cancellation, got {:?}", report.outcome);
        };
        assert!(partial.ends_with("[Inference cancelled]"));
        assert_eq!(log.corrections(), 0);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_reply_retries_when_configured() {
        let respond = json_block(r#"{"use": "respond"}"#);
        let gateway = ScriptedGateway::new(&[]);
        gateway.push(Ok(ChatResponse::cancelled("partial")));
        gateway.push(Ok(ChatResponse::new(respond)));
        gateway.push(Ok(ChatResponse::new("ok")));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let config = AgentConfig::builder()
            .cancellation(CancellationPolicy::Retry)
            .build()
            .unwrap();
        let agent = OrchestratorBuilder::new()
            .gateway(gateway)
            .executor(CountingExecutor::new(vec![]))
            .config(config)
            .cancel(cancel.clone())
            .build()
            .unwrap();

        let report = agent.run("anything").await.unwrap();

        assert_eq!(report.outcome.text(), "ok");
        assert_eq!(report.outcome.log().corrections(), 1);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_transport_error_aborts_request() {
        let gateway = ScriptedGateway::new(&[]);
        gateway.push(Err(InferenceError::NetworkError("connection refused".into())));
        let agent = orchestrator(gateway, CountingExecutor::new(vec![]), config(3));

        let err = agent.run("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::Inference(InferenceError::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_blank_request_is_rejected() {
        let agent = orchestrator(
            ScriptedGateway::new(&[]),
            CountingExecutor::new(vec![]),
            config(3),
        );
        assert!(matches!(agent.run("  ").await, Err(AgentError::EmptyRequest)));
    }

    #[tokio::test]
    async fn test_long_histories_are_truncated() {
        let replies = vec!["garbage"; 6];
        let gateway = ScriptedGateway::new(&replies);
        let config = AgentConfig::builder()
            .max_retries(5)
            .max_history_messages(4)
            .build()
            .unwrap();
        let agent = orchestrator(gateway.clone(), CountingExecutor::new(vec![]), config);

        let report = agent.run("task").await.unwrap();

        let truncations = report
            .outcome
            .log()
            .entries()
            .iter()
            .filter(|e| matches!(e.event, LogEvent::Truncation { .. }))
            .count();
        assert!(truncations > 0);
        // system prompt + at most four conversation messages
        assert!(gateway.request(5).len() <= 5);
        assert_eq!(gateway.request(5)[1].content, "task");
    }

    #[tokio::test]
    async fn test_malformed_verdict_is_corrected_in_checking() {
        let python = json_block(r#"{"use": "python"}"#);
        let maybe = json_block(r#"{"use": "maybe"}"#);
        let yes = json_block(r#"{"use": "yes"}"#);
        let gateway = ScriptedGateway::new(&[
            python.as_str(),
            "```python\nprint(17 * 4)\n```",
            "The product is 68.",
            maybe.as_str(),
            yes.as_str(),
            "68",
        ]);
        let executor = CountingExecutor::new(vec![]);
        let agent = orchestrator(gateway.clone(), executor.clone(), config(3));

        let report = agent.run("what is 17 * 4").await.unwrap();

        assert_eq!(report.outcome.text(), "68");
        assert_eq!(report.outcome.log().corrections(), 1);
        assert_eq!(executor.calls(), 1);
        assert_eq!(gateway.calls(), 6);

        let recheck = gateway.request(4);
        assert!(recheck[0].content.contains("determine if the user's request was fulfilled"));
        let correction = &recheck.last().unwrap().content;
        assert!(correction.contains("'maybe'"));
        assert!(correction.contains("yes or no"));

        let corrected_in: Vec<LoopState> = report
            .outcome
            .log()
            .entries()
            .iter()
            .filter(|e| matches!(e.event, LogEvent::Correction { .. }))
            .map(|e| e.state)
            .collect();
        assert_eq!(corrected_in, vec![LoopState::Checking]);
    }

    #[tokio::test]
    async fn test_repeated_unanswered_verdicts_exhaust_budget() {
        let max = 2;
        let python = json_block(r#"{"use": "python"}"#);
        let no = json_block(r#"{"use": "no"}"#);
        let mut replies = Vec::new();
        for _ in 0..=max {
            replies.extend([
                python.as_str(),
                "```python\nprint(2)\n```",
                "summary",
                no.as_str(),
            ]);
        }
        let gateway = ScriptedGateway::new(&replies);
        let executor = CountingExecutor::new(vec![]);
        let agent = orchestrator(gateway.clone(), executor.clone(), config(max));

        let report = agent.run("compute").await.unwrap();

        let RunOutcome::Failed { message, log } = &report.outcome else {
            panic!("expected failure, got {:?}", report.outcome);
        };
        assert!(message.starts_with("Unable to complete the request after 3 attempts."));
        assert_eq!(log.corrections(), 0);
        assert_eq!(executor.calls(), 3);
        assert_eq!(gateway.calls(), replies.len());
        assert_eq!(log.entries().last().unwrap().state, LoopState::Failed);
    }

    #[tokio::test]
    async fn test_truncation_keeps_the_latest_question() {
        let python = json_block(r#"{"use": "python"}"#);
        let yes = json_block(r#"{"use": "yes"}"#);
        let gateway = ScriptedGateway::new(&[
            python.as_str(),
            "```python\nprint(2)\n```",
            "It printed 2.",
            yes.as_str(),
            "2",
        ]);
        let config = AgentConfig::builder()
            .max_retries(3)
            .max_history_messages(3)
            .build()
            .unwrap();
        let agent = orchestrator(gateway.clone(), CountingExecutor::new(vec![]), config);

        let report = agent.run("compute").await.unwrap();

        assert_eq!(report.outcome.text(), "2");
        let check = gateway.request(3);
        assert_eq!(check[1].content, "compute");
        assert!(check[2].content.contains("It printed 2."));
        assert_eq!(
            check.last().unwrap().content,
            "Was the request 'compute' answered?"
        );
        let answer = gateway.request(4);
        assert_eq!(
            answer.last().unwrap().content,
            "What is the final answer to the following request: 'compute'?"
        );
    }
}
