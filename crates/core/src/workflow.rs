//! Request creation and stage decisions, with the uploads that follow them.

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{AttachmentsApi, CreateRequestPayload, Decision, DecisionAction, RequestsApi};
use crate::attachments::{AttachmentService, BatchReport};
use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink, TracingAuditSink};
use crate::domain::attachment::PendingAttachment;
use crate::domain::request::{ApprovalStage, Request};
use crate::domain::user::{User, UserRole};
use crate::errors::{ApplicationError, DomainError};
use crate::flows::{
    FlowContext, FlowEngine, FlowEvent, FlowState, FlowTransitionError, RequestApprovalFlow,
};
use crate::forms::CreateRequestForm;

pub const CREATED_NOTICE: &str = "Demande créée avec succès !";
pub const CREATED_WITH_FILES_NOTICE: &str =
    "Demande créée et tous les fichiers ajoutés avec succès !";
pub const MG_AUTO_VALIDATED_NOTICE: &str =
    "Votre demande a été automatiquement validée côté MG et transmise à la comptabilité";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkflowOutcome {
    pub request: Request,
    pub attachments: BatchReport,
    /// Headline shown to the actor.
    pub message: String,
    /// Set when some uploads failed; the action itself still succeeded.
    pub warning: bool,
    pub follow_up: Option<String>,
}

pub struct RequestWorkflow<R, A, S = TracingAuditSink> {
    requests: R,
    attachments: AttachmentService<A>,
    engine: FlowEngine<RequestApprovalFlow>,
    audit: S,
}

impl<R, A> RequestWorkflow<R, A>
where
    R: RequestsApi,
    A: AttachmentsApi,
{
    pub fn new(requests: R, attachments: AttachmentService<A>) -> Self {
        Self::with_audit(requests, attachments, TracingAuditSink)
    }
}

impl<R, A, S> RequestWorkflow<R, A, S>
where
    R: RequestsApi,
    A: AttachmentsApi,
    S: AuditSink,
{
    pub fn with_audit(requests: R, attachments: AttachmentService<A>, audit: S) -> Self {
        Self { requests, attachments, engine: FlowEngine::default(), audit }
    }

    pub fn attachments(&self) -> &AttachmentService<A> {
        &self.attachments
    }

    /// Creates a request, then uploads whatever was staged on the form.
    ///
    /// A form that fails validation never reaches the backend. Upload
    /// failures are reported on the outcome and never undo the creation.
    pub async fn create_request(
        &self,
        form: &CreateRequestForm,
        creator: &User,
        staged: Vec<PendingAttachment>,
    ) -> Result<WorkflowOutcome, ApplicationError> {
        form.validate(&creator.role).map_err(DomainError::Validation)?;
        let payload = CreateRequestPayload::from_form(form, &creator.role);
        let audit = AuditContext::generated(None, creator.username.clone());

        let request = match self.requests.create(&payload).await {
            Ok(request) => request,
            Err(error) => {
                warn!(
                    event_name = "workflow.create.failed",
                    correlation_id = %audit.correlation_id,
                    error = %error,
                    "request creation failed"
                );
                self.audit.emit(
                    audit
                        .event(
                            "workflow.request_create_failed",
                            AuditCategory::Workflow,
                            AuditOutcome::Failed,
                        )
                        .with_metadata("error", error.to_string()),
                );
                return Err(error.into());
            }
        };

        let audit = AuditContext::new(Some(request.id), audit.correlation_id, audit.actor);
        info!(
            event_name = "workflow.create.succeeded",
            correlation_id = %audit.correlation_id,
            request_id = request.id.0,
            auto_validate_mg = payload.auto_validate_mg,
            staged = staged.len(),
            "request created"
        );
        self.audit.emit(
            audit
                .event("workflow.request_created", AuditCategory::Workflow, AuditOutcome::Success)
                .with_metadata("status", request.status.code())
                .with_metadata("auto_validate_mg", payload.auto_validate_mg.to_string()),
        );

        let had_files = !staged.is_empty();
        let attachments = self.settle(&audit, &request, staged).await;
        let (message, warning) = if !had_files {
            (CREATED_NOTICE.to_owned(), false)
        } else if attachments.all_succeeded() {
            (CREATED_WITH_FILES_NOTICE.to_owned(), false)
        } else {
            (format!("Demande créée avec succès. {}", attachments.summary()), true)
        };
        let follow_up =
            (creator.role == UserRole::Mg).then(|| MG_AUTO_VALIDATED_NOTICE.to_owned());

        Ok(WorkflowOutcome { request, attachments, message, warning, follow_up })
    }

    /// Records the actor's decision at the stage the request is waiting on.
    ///
    /// The lifecycle check runs first so an out-of-turn decision is refused
    /// locally; the backend stays the authority either way. Files the MG
    /// staged while reviewing are uploaded once the decision is stored.
    pub async fn submit_decision(
        &self,
        request: &Request,
        actor: &User,
        decision: &Decision,
        staged: Vec<PendingAttachment>,
    ) -> Result<WorkflowOutcome, ApplicationError> {
        let audit = AuditContext::generated(Some(request.id), actor.username.clone());
        let state = FlowState::of(request).ok_or_else(|| {
            DomainError::from(FlowTransitionError::UnknownStatus(request.status.code().to_owned()))
        })?;
        let stage = ApprovalStage::for_role(&actor.role)
            .or_else(|| state.awaiting())
            .unwrap_or(ApprovalStage::Mg);
        let event = FlowEvent::from_decision(stage, decision);
        let mut context = FlowContext::new(actor.role.clone());
        if let Some(comment) = &decision.comment {
            context = context.with_comment(comment.clone());
        }

        let outcome = self
            .engine
            .apply_with_audit(&state, &event, &context, &self.audit, &audit)
            .map_err(DomainError::from)?;

        let updated = match self.requests.validate(request.id, decision).await {
            Ok(updated) => updated,
            Err(error) => {
                warn!(
                    event_name = "workflow.decision.failed",
                    correlation_id = %audit.correlation_id,
                    request_id = request.id.0,
                    error = %error,
                    "decision was not recorded"
                );
                return Err(error.into());
            }
        };
        info!(
            event_name = "workflow.decision.recorded",
            correlation_id = %audit.correlation_id,
            request_id = request.id.0,
            from = ?outcome.from,
            to = ?outcome.to,
            "decision recorded"
        );

        let attachments = if stage == ApprovalStage::Mg {
            self.settle(&audit, &updated, staged).await
        } else {
            if !staged.is_empty() {
                warn!(
                    event_name = "workflow.decision.staged_ignored",
                    request_id = request.id.0,
                    count = staged.len(),
                    "only MG may attach files while deciding"
                );
            }
            BatchReport::default()
        };

        let headline = match decision.action {
            DecisionAction::Approve => "Demande validée avec succès",
            DecisionAction::Reject => "Demande refusée",
        };
        let (message, warning) = if attachments.all_succeeded() {
            (headline.to_owned(), false)
        } else {
            (format!("{headline}. {}", attachments.summary()), true)
        };

        Ok(WorkflowOutcome { request: updated, attachments, message, warning, follow_up: None })
    }

    async fn settle(
        &self,
        audit: &AuditContext,
        request: &Request,
        staged: Vec<PendingAttachment>,
    ) -> BatchReport {
        if staged.is_empty() {
            return BatchReport::default();
        }
        let report = self.attachments.settle_staged(request.id, staged).await;
        let outcome =
            if report.all_succeeded() { AuditOutcome::Success } else { AuditOutcome::Failed };
        self.audit.emit(
            audit
                .event("attachments.batch_settled", AuditCategory::Attachment, outcome)
                .with_metadata("succeeded", report.succeeded().to_string())
                .with_metadata("failed", report.failures().to_string()),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{
        RequestWorkflow, CREATED_NOTICE, CREATED_WITH_FILES_NOTICE, MG_AUTO_VALIDATED_NOTICE,
    };
    use crate::api::fakes::{FakeAttachments, FakeRequests};
    use crate::api::Decision;
    use crate::attachments::{AttachmentRules, AttachmentService};
    use crate::audit::{AuditOutcome, InMemoryAuditSink};
    use crate::domain::attachment::{FileCandidate, PendingAttachment};
    use crate::domain::fixtures;
    use crate::domain::request::{RequestStatus, Urgency};
    use crate::errors::{ApiError, ApplicationError, DomainError};
    use crate::flows::FlowTransitionError;
    use crate::forms::CreateRequestForm;

    type TestWorkflow = RequestWorkflow<FakeRequests, FakeAttachments, InMemoryAuditSink>;

    fn workflow(requests: FakeRequests) -> (TestWorkflow, InMemoryAuditSink) {
        let sink = InMemoryAuditSink::default();
        let attachments =
            AttachmentService::new(FakeAttachments::default(), AttachmentRules::default());
        (RequestWorkflow::with_audit(requests, attachments, sink.clone()), sink)
    }

    fn form() -> CreateRequestForm {
        CreateRequestForm {
            item_description: "Écran 27 pouces pour la comptabilité".to_owned(),
            quantity: Some(2),
            estimated_cost: Some(Decimal::new(180_000, 0)),
            urgency: Urgency::High,
            justification: "Les écrans actuels sont trop petits pour les tableurs".to_owned(),
        }
    }

    fn staged(name: &str) -> PendingAttachment {
        PendingAttachment {
            temp_id: Uuid::new_v4(),
            description: name.to_owned(),
            file: FileCandidate::new(name, "application/pdf", b"%PDF-1.4".to_vec()),
        }
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_backend() {
        let (workflow, sink) = workflow(FakeRequests::default());
        let mut form = form();
        form.justification = "trop court".to_owned();

        let error = workflow
            .create_request(&form, &fixtures::user(10, "employee"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
        assert!(workflow.requests.created.lock().unwrap().is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn mg_creation_is_auto_validated() {
        let (workflow, _) = workflow(FakeRequests::default());
        let outcome = workflow
            .create_request(&form(), &fixtures::user(2, "mg"), Vec::new())
            .await
            .unwrap();

        assert!(workflow.requests.created.lock().unwrap()[0].auto_validate_mg);
        assert_eq!(outcome.request.status, RequestStatus::MgApproved);
        assert_eq!(outcome.message, CREATED_NOTICE);
        assert_eq!(outcome.follow_up.as_deref(), Some(MG_AUTO_VALIDATED_NOTICE));
    }

    #[tokio::test]
    async fn upload_failures_do_not_fail_creation() {
        let (workflow, sink) = workflow(FakeRequests::default());
        let outcome = workflow
            .create_request(
                &form(),
                &fixtures::user(10, "employee"),
                vec![staged("devis.pdf"), staged("fail.pdf"), staged("bon.pdf")],
            )
            .await
            .unwrap();

        assert_eq!(outcome.request.status, RequestStatus::Pending);
        assert!(outcome.warning);
        assert_eq!(
            outcome.message,
            "Demande créée avec succès. 2 fichier(s) ajouté(s), 1 échec(s)"
        );
        let settled = sink
            .events()
            .into_iter()
            .find(|event| event.event_type == "attachments.batch_settled")
            .unwrap();
        assert_eq!(settled.outcome, AuditOutcome::Failed);
    }

    #[tokio::test]
    async fn all_uploads_succeeding_gets_success_message() {
        let (workflow, _) = workflow(FakeRequests::default());
        let outcome = workflow
            .create_request(&form(), &fixtures::user(10, "employee"), vec![staged("devis.pdf")])
            .await
            .unwrap();
        assert_eq!(outcome.message, CREATED_WITH_FILES_NOTICE);
        assert!(!outcome.warning);
    }

    #[tokio::test]
    async fn backend_failure_on_create_is_returned() {
        let requests = FakeRequests {
            fail_create: Some(ApiError::Transport("refused".to_owned())),
            ..FakeRequests::default()
        };
        let (workflow, _) = workflow(requests);
        let error = workflow
            .create_request(&form(), &fixtures::user(10, "employee"), vec![staged("devis.pdf")])
            .await
            .unwrap_err();

        assert_eq!(error.class(), "network");
        assert!(workflow.attachments.api().uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mg_decision_uploads_staged_files_afterwards() {
        let requests = FakeRequests {
            status_after_decision: Some(RequestStatus::MgApproved),
            ..FakeRequests::default()
        };
        let (workflow, _) = workflow(requests);
        let request = fixtures::request(7, "pending");

        let outcome = workflow
            .submit_decision(
                &request,
                &fixtures::user(2, "mg"),
                &Decision::approve(),
                vec![staged("facture.pdf")],
            )
            .await
            .unwrap();

        assert_eq!(outcome.request.status, RequestStatus::MgApproved);
        assert_eq!(outcome.attachments.succeeded(), 1);
        assert_eq!(workflow.requests.decisions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn out_of_turn_decision_is_refused_locally() {
        let (workflow, sink) = workflow(FakeRequests::default());
        let request = fixtures::request(7, "pending");

        let error = workflow
            .submit_decision(
                &request,
                &fixtures::user(5, "director"),
                &Decision::approve(),
                Vec::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::FlowTransition(
                FlowTransitionError::InvalidTransition { .. }
            ))
        ));
        assert!(workflow.requests.decisions.lock().unwrap().is_empty());
        assert_eq!(sink.events()[0].event_type, "flow.transition_rejected");
    }

    #[tokio::test]
    async fn rejection_without_comment_reaches_backend() {
        let requests = FakeRequests {
            status_after_decision: Some(RequestStatus::Rejected),
            ..FakeRequests::default()
        };
        let (workflow, _) = workflow(requests);
        let request = fixtures::request(7, "pending");
        let decision = Decision { comment: None, ..Decision::reject("") };

        let outcome = workflow
            .submit_decision(&request, &fixtures::user(2, "mg"), &decision, Vec::new())
            .await
            .unwrap();

        assert_eq!(outcome.request.status, RequestStatus::Rejected);
        assert_eq!(outcome.message, "Demande refusée");
        let decisions = workflow.requests.decisions.lock().unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].1.comment, None);
    }

    #[tokio::test]
    async fn unknown_status_cannot_be_decided() {
        let (workflow, _) = workflow(FakeRequests::default());
        let request = fixtures::request(7, "archived");

        let error = workflow
            .submit_decision(&request, &fixtures::user(2, "mg"), &Decision::approve(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::FlowTransition(
                FlowTransitionError::UnknownStatus(_)
            ))
        ));
    }
}
