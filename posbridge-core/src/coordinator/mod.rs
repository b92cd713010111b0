//! TransactionCoordinator processor.
//!
//! The TransactionCoordinator is responsible for:
//! - Sending SETUP when the page loads
//! - Receiving cashier commands from a [`CoordinatorHandle`]
//! - Requesting sale data with a DATA step and waiting for the host's reply
//! - Settling the sale with the gateway and classifying the response
//! - Emitting exactly one terminal step per attempt, immediately (ACCEPT) or
//!   after a dwell delay (DECLINE, EXIT)
//!
//! Phases run `Idle → AwaitingHostReply → Settling → Terminal`. Terminal is
//! absorbing for the attempt; the next `begin_*` starts a fresh one.

mod handle;
mod state;

pub use handle::{Command, CommandReceiver, CommandSender, CoordinatorHandle, command_channel};
pub use state::Phase;

use crate::channel::{ChannelError, HostChannel};
use crate::classifier::{Action, ResponseClassifier};
use crate::config::CoordinatorConfig;
use crate::context::{FlowKind, SaleReference, SettlementInput, TransactionContext};
use crate::events::{FlowEvent, FlowReporter};
use crate::gateway::{self, GatewayError, SettlementGateway};
use crate::ui::{StatusFragment, UiAdapter};
use crate::utils::Scheduled;
use posbridge_sdk::objects::{GatewayResponse, HostReply};
use state::{AttemptEvent, AttemptState, SettlementTask};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const CANCELLED_RECEIPT: &str = "<div>CANCELLED</div>";
const TIMEOUT_RECEIPT: &str = "<div>TIMEOUT</div>";

/// Errors returned to the caller of a coordinator command.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Another attempt has not reached Terminal, or its final step is
    /// still scheduled.
    #[error("an attempt is already in flight ({0})")]
    AttemptInFlight(Phase),

    /// Fewer than two launch parameters; EXIT has been scheduled.
    #[error("only {present} of 3 launch parameters present")]
    Precondition { present: usize },

    /// The bridge is not framed by a host page; the attempt was abandoned.
    #[error("not embedded in a host window")]
    NotEmbedded,

    #[error("cannot cancel while {0}")]
    NotCancellable(Phase),

    #[error("host channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("coordinator stopped")]
    Stopped,
}

/// A step waiting out its dwell delay.
#[derive(Debug)]
enum PendingStep {
    Decline {
        attempt: Uuid,
        receipt_html: Option<String>,
    },
    Exit {
        attempt: Uuid,
    },
}

/// Drives one attempt at a time through the step protocol.
pub struct TransactionCoordinator {
    context: TransactionContext,
    channel: HostChannel,
    gateway: Arc<dyn SettlementGateway>,
    ui: Arc<dyn UiAdapter>,
    classifier: ResponseClassifier,
    config: CoordinatorConfig,
    reporter: FlowReporter,
    state: AttemptState,
    reply_deadline: Scheduled<Uuid>,
    pending_step: Scheduled<PendingStep>,
    phase_tx: watch::Sender<Phase>,
}

impl TransactionCoordinator {
    /// Create a new TransactionCoordinator.
    ///
    /// # Arguments
    ///
    /// * `context` - Launch parameters of this page load
    /// * `channel` - Step channel to the host window
    /// * `gateway` - Settlement backend
    /// * `ui` - Status area and outcome controls
    /// * `config` - Delays and the host reply timeout
    /// * `reporter` - Sink for flow events
    pub fn new(
        context: TransactionContext,
        channel: HostChannel,
        gateway: Arc<dyn SettlementGateway>,
        ui: Arc<dyn UiAdapter>,
        config: CoordinatorConfig,
        reporter: FlowReporter,
    ) -> Self {
        let (phase_tx, _) = watch::channel(Phase::Idle);
        Self {
            context,
            channel,
            gateway,
            ui,
            classifier: ResponseClassifier::new(config.decline_delay),
            config,
            reporter,
            state: AttemptState::Idle,
            reply_deadline: Scheduled::new(),
            pending_step: Scheduled::new(),
            phase_tx,
        }
    }

    /// Watch the phase of the current attempt.
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    /// Run the coordinator until shutdown is signaled.
    pub async fn run(
        mut self,
        mut command_rx: CommandReceiver,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("TransactionCoordinator started");
        self.on_page_load();

        let mut commands_open = true;
        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("TransactionCoordinator received shutdown signal");
                        break;
                    }
                }

                command = command_rx.recv(), if commands_open => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => {
                            debug!("Command channel closed");
                            commands_open = false;
                        }
                    }
                }

                event = self.state.next_event(), if self.state.is_waiting() => {
                    match event {
                        AttemptEvent::Reply(reply) => self.on_host_reply(reply),
                        AttemptEvent::Settled(outcome) => self.on_settled(outcome),
                    }
                }

                attempt = self.reply_deadline.fired(), if self.reply_deadline.is_armed() => {
                    self.on_reply_timeout(attempt);
                }

                step = self.pending_step.fired(), if self.pending_step.is_armed() => {
                    self.on_scheduled_step(step);
                }
            }
        }

        self.shutdown();
    }

    fn on_page_load(&mut self) {
        let sent = self.channel.send_setup();
        self.deliver(sent, "SETUP");
        self.ui.clear_status();
        self.ui.show_status(&StatusFragment::Waiting);
        self.ui.set_outcomes_visible(true);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Begin { input, reply } => {
                let _ = reply.send(self.begin(input));
            }
            Command::Cancel { kind, reply } => {
                let _ = reply.send(self.cancel(kind));
            }
            Command::AllowClose { reply } => {
                info!("Re-enabling the host close button");
                let _ = reply.send(self.channel.allow_close().map_err(Into::into));
            }
            Command::Print {
                receipt_html,
                reply,
            } => {
                let _ = reply.send(self.channel.send_print(receipt_html).map_err(Into::into));
            }
        }
    }

    /// Idle/Terminal → AwaitingHostReply, or straight to Terminal when the
    /// launch parameters are insufficient.
    fn begin(&mut self, input: SettlementInput) -> Result<Uuid, CoordinatorError> {
        let phase = self.state.phase();
        if !matches!(phase, Phase::Idle | Phase::Terminal) || self.pending_step.is_armed() {
            warn!(phase = %phase, "Attempt rejected, another attempt is in flight");
            return Err(CoordinatorError::AttemptInFlight(phase));
        }

        let attempt = Uuid::now_v7();
        let kind = input.kind();
        info!(attempt = %attempt, kind = %kind, "Attempt started");

        self.ui.set_outcomes_visible(false);
        self.ui.clear_status();
        self.ui.show_status(&StatusFragment::Payment);

        if !self.context.is_sufficient() {
            let present = self.context.present_fields();
            error!(
                attempt = %attempt,
                present = present,
                "Not enough launch parameters to start a flow"
            );
            self.ui.clear_status();
            self.ui.show_status(&StatusFragment::generic_failure());
            self.pending_step
                .arm(self.config.exit_delay, PendingStep::Exit { attempt });
            self.set_state(AttemptState::Terminal { attempt });
            self.reporter
                .report(FlowEvent::PreconditionFailed { attempt, present });
            return Err(CoordinatorError::Precondition { present });
        }

        if self.context.amount.is_some() && self.context.amount_decimal().is_none() {
            warn!(
                attempt = %attempt,
                amount = ?self.context.amount,
                "Amount is not a decimal, forwarding it as given"
            );
        }

        let subscription = self.channel.once_reply(self.channel.target_origin())?;

        if let Err(e) = self.channel.send_data_request() {
            drop(subscription);
            self.set_state(AttemptState::Terminal { attempt });
            return match e {
                ChannelError::NotEmbedded => {
                    error!(
                        attempt = %attempt,
                        "Not contained in a host frame, attempt abandoned"
                    );
                    self.reporter.report(FlowEvent::NotEmbedded { attempt });
                    Err(CoordinatorError::NotEmbedded)
                }
                other => {
                    error!(attempt = %attempt, error = %other, "Failed to send DATA step");
                    self.reporter.report(FlowEvent::StepDeliveryFailed {
                        step: "DATA",
                        error: other.to_string(),
                    });
                    Err(other.into())
                }
            };
        }

        if let Some(timeout) = self.config.reply_timeout {
            self.reply_deadline.arm(timeout, attempt);
        }
        self.set_state(AttemptState::AwaitingHostReply {
            attempt,
            input,
            subscription,
        });
        Ok(attempt)
    }

    /// AwaitingHostReply → Settling.
    fn on_host_reply(&mut self, reply: Result<HostReply, ChannelError>) {
        let AttemptState::AwaitingHostReply {
            attempt,
            input,
            subscription,
        } = std::mem::replace(&mut self.state, AttemptState::Idle)
        else {
            return;
        };
        drop(subscription);
        self.reply_deadline.cancel();

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                error!(attempt = %attempt, error = %e, "Reply listener closed without a reply");
                self.fail_settlement(attempt, GatewayError::Aborted(e.to_string()));
                return;
            }
        };

        let sale = SaleReference::from_reply(reply, &input);
        let request = self.context.settlement_request(sale, &input);
        info!(
            attempt = %attempt,
            kind = request.kind(),
            sale_id = %request.sale_id(),
            "Submitting settlement"
        );

        let gateway = Arc::clone(&self.gateway);
        let task = tokio::spawn(async move { gateway::submit(gateway.as_ref(), request).await });
        self.set_state(AttemptState::Settling {
            attempt,
            task: SettlementTask(task),
        });
    }

    /// Settling → Terminal.
    fn on_settled(&mut self, outcome: Result<GatewayResponse, GatewayError>) {
        let Some(attempt) = self.state.attempt() else {
            return;
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.fail_settlement(attempt, e);
                return;
            }
        };

        info!(
            attempt = %attempt,
            status = %response.status,
            id = ?response.id,
            "Gateway responded"
        );
        self.ui.set_outcomes_visible(false);

        match self.classifier.classify(&response) {
            Action::Accept {
                receipt_html,
                transaction_id,
            } => {
                self.ui.clear_status();
                let sent = self.channel.send_accept(receipt_html, transaction_id);
                self.deliver(sent, "ACCEPT");
            }
            Action::DelayedDecline {
                fragment,
                receipt_html,
                delay,
            } => {
                self.ui.clear_status();
                self.ui.show_status(&fragment);
                self.pending_step.arm(
                    delay,
                    PendingStep::Decline {
                        attempt,
                        receipt_html,
                    },
                );
            }
        }
        self.set_state(AttemptState::Terminal { attempt });
    }

    fn fail_settlement(&mut self, attempt: Uuid, error: GatewayError) {
        error!(attempt = %attempt, error = %error, "Settlement failed");
        self.ui.set_outcomes_visible(false);
        self.ui.clear_status();
        self.ui.show_status(&StatusFragment::generic_failure());
        self.pending_step.arm(
            self.config.decline_delay,
            PendingStep::Decline {
                attempt,
                receipt_html: None,
            },
        );
        self.set_state(AttemptState::Terminal { attempt });
        self.reporter
            .report(FlowEvent::GatewayFailed { attempt, error });
    }

    /// AwaitingHostReply → Terminal when the host never answers.
    fn on_reply_timeout(&mut self, attempt: Uuid) {
        if self.state.phase() != Phase::AwaitingHostReply || self.state.attempt() != Some(attempt)
        {
            return;
        }

        warn!(attempt = %attempt, "Host did not reply to DATA in time");
        self.set_state(AttemptState::Terminal { attempt });
        self.ui.clear_status();
        self.ui.show_status(&StatusFragment::Timeout);
        self.pending_step.arm(
            self.config.decline_delay,
            PendingStep::Decline {
                attempt,
                receipt_html: Some(TIMEOUT_RECEIPT.to_owned()),
            },
        );
        self.reporter.report(FlowEvent::ReplyTimedOut { attempt });
    }

    /// Idle/AwaitingHostReply → Terminal on the cashier's request.
    fn cancel(&mut self, kind: FlowKind) -> Result<(), CoordinatorError> {
        let phase = self.state.phase();
        if !matches!(phase, Phase::Idle | Phase::AwaitingHostReply) {
            warn!(phase = %phase, kind = %kind, "Cancel rejected");
            return Err(CoordinatorError::NotCancellable(phase));
        }

        let attempt = self.state.attempt().unwrap_or_else(Uuid::now_v7);
        info!(attempt = %attempt, kind = %kind, "Cancelling");

        self.reply_deadline.cancel();
        self.set_state(AttemptState::Terminal { attempt });
        self.ui.set_outcomes_visible(false);
        self.ui.clear_status();
        self.ui.show_status(&StatusFragment::Cancelling);
        self.pending_step.arm(
            self.config.decline_delay,
            PendingStep::Decline {
                attempt,
                receipt_html: Some(CANCELLED_RECEIPT.to_owned()),
            },
        );
        Ok(())
    }

    fn on_scheduled_step(&mut self, step: PendingStep) {
        match step {
            PendingStep::Decline {
                attempt,
                receipt_html,
            } => {
                info!(attempt = %attempt, "Sending DECLINE");
                let sent = self.channel.send_decline(receipt_html);
                self.deliver(sent, "DECLINE");
            }
            PendingStep::Exit { attempt } => {
                info!(attempt = %attempt, "Sending EXIT");
                let sent = self.channel.send_exit();
                self.deliver(sent, "EXIT");
            }
        }
    }

    fn deliver(&self, sent: Result<(), ChannelError>, step: &'static str) {
        if let Err(e) = sent {
            error!(step = step, error = %e, "Failed to deliver step");
            self.reporter.report(FlowEvent::StepDeliveryFailed {
                step,
                error: e.to_string(),
            });
        }
    }

    fn set_state(&mut self, state: AttemptState) {
        let phase = state.phase();
        self.state = state;
        debug!(phase = %phase, "Phase changed");
        self.phase_tx.send_replace(phase);
    }

    fn shutdown(&mut self) {
        if let Some(step) = self.pending_step.cancel() {
            warn!(step = ?step, "Scheduled step discarded on shutdown");
        }
        self.reply_deadline.cancel();
        // Dropping the state aborts a settlement in flight and disarms the
        // reply listener.
        self.state = AttemptState::Idle;
        info!("TransactionCoordinator shutdown complete");
    }
}
