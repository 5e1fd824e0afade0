use std::sync::Arc;
use std::time::Duration;

use storage::session::SessionStateStore;
use stress_core::model::{
    AnswerSet, Choice, Member, MemberId, Page, QUESTION_COUNT, QUESTIONS, QuestionId,
    RespondentInfo, ScoreTuple, StressTestId, StressTestSubmission, WorkflowState,
};
use stress_core::{Clock, score};
use tracing::{debug, info, warn};

use super::validation::{RestartReason, ValidationReport};
use crate::error::{SubmissionError, WorkflowError};
use crate::member_lookup_service::MemberLookupService;
use crate::submission_sink::SubmissionSink;

/// Returned once a submission has been accepted and the session cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub id: StressTestId,
    pub scores: ScoreTuple,
}

/// Drives one questionnaire attempt across its two pages.
///
/// Every edit is written through to the `SessionStateStore` immediately, so a
/// controller can be rebuilt over the same store and resumed with
/// [`StressTestWorkflow::enter_page2`].
pub struct StressTestWorkflow {
    clock: Clock,
    store: SessionStateStore,
    sink: Arc<dyn SubmissionSink>,
    members: Option<MemberLookupService>,
    submit_timeout: Option<Duration>,
    state: WorkflowState,
}

impl StressTestWorkflow {
    #[must_use]
    pub fn new(clock: Clock, store: SessionStateStore, sink: Arc<dyn SubmissionSink>) -> Self {
        Self {
            clock,
            store,
            sink,
            members: None,
            submit_timeout: None,
            state: WorkflowState::Page1Editing,
        }
    }

    /// Enables respondent pre-fill in [`StressTestWorkflow::select_member`].
    #[must_use]
    pub fn with_member_lookup(mut self, members: MemberLookupService) -> Self {
        self.members = Some(members);
        self
    }

    /// Bounds how long [`StressTestWorkflow::submit`] waits for the sink.
    #[must_use]
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    #[must_use]
    pub fn store(&self) -> &SessionStateStore {
        &self.store
    }

    //
    // ─── READS ─────────────────────────────────────────────────────────────────
    //

    /// Stored respondent header, or a blank one dated today.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Storage` if the store cannot be read.
    pub fn respondent(&self) -> Result<RespondentInfo, WorkflowError> {
        Ok(self
            .store
            .load_respondent()?
            .unwrap_or_else(|| RespondentInfo::blank(&self.clock)))
    }

    /// # Errors
    ///
    /// Returns `WorkflowError::Storage` if the store cannot be read.
    pub fn answers(&self, page: Page) -> Result<AnswerSet, WorkflowError> {
        Ok(self.store.load_answers(page)?.unwrap_or_default())
    }

    /// What is still missing before `page` can be left.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Storage` if the store cannot be read.
    pub fn validation_report(&self, page: Page) -> Result<ValidationReport, WorkflowError> {
        let answers = self.answers(page)?;
        Ok(match page {
            Page::One => ValidationReport::for_page1(&self.respondent()?, &answers),
            Page::Two => ValidationReport::for_page2(&answers),
        })
    }

    //
    // ─── EDITS ─────────────────────────────────────────────────────────────────
    //

    /// Overwrites the respondent header.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::NotEditable` outside page 1, or a storage error.
    pub fn update_respondent(&mut self, info: RespondentInfo) -> Result<(), WorkflowError> {
        self.require_state(WorkflowState::Page1Editing, "edit the respondent")?;
        self.store.save_respondent(&info)?;
        Ok(())
    }

    /// Records the member the test is taken for and, when a lookup is
    /// configured, copies the member's name (and occupation, if no position is
    /// set yet) into the respondent header.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::NotEditable` outside page 1, or a storage or
    /// lookup error.
    pub async fn select_member(&mut self, id: MemberId) -> Result<Option<Member>, WorkflowError> {
        self.require_state(WorkflowState::Page1Editing, "select a member")?;
        self.store.save_selected_member(id)?;

        let Some(lookup) = &self.members else {
            return Ok(None);
        };
        let Some(member) = lookup.find(id).await? else {
            return Ok(None);
        };

        let mut info = self.respondent()?;
        info.name.clone_from(&member.name);
        if info.position.trim().is_empty() {
            if let Some(occupation) = &member.occupation {
                info.position.clone_from(occupation);
            }
        }
        self.store.save_respondent(&info)?;
        debug!(%id, "respondent pre-filled from member");
        Ok(Some(member))
    }

    /// Records a choice for a question on the page being edited.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::WrongPage` if the question belongs to the other
    /// page, `WorkflowError::NotEditable` if no page is being edited, or a
    /// storage error.
    pub fn select_answer(&mut self, id: QuestionId, choice: Choice) -> Result<(), WorkflowError> {
        let page = self.require_page_of(id, "answer questions")?;
        let mut answers = self.answers(page)?;
        answers.set(id, choice);
        self.store.save_answers(page, &answers)?;
        debug!(question = %id, choice = choice.as_str(), "answer recorded");
        Ok(())
    }

    /// Marks a question unanswered again.
    ///
    /// # Errors
    ///
    /// Same as [`StressTestWorkflow::select_answer`].
    pub fn clear_answer(&mut self, id: QuestionId) -> Result<(), WorkflowError> {
        let page = self.require_page_of(id, "answer questions")?;
        let mut answers = self.answers(page)?;
        answers.unset(id);
        self.store.save_answers(page, &answers)?;
        Ok(())
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Validates page 1 and moves on to page 2.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Validation` with the missing fields and question
    /// ordinals; the state stays `Page1Editing`.
    pub fn advance_to_page2(&mut self) -> Result<(), WorkflowError> {
        self.require_state(WorkflowState::Page1Editing, "leave page 1")?;
        let report = self.validation_report(Page::One)?;
        if !report.is_complete() {
            debug!(%report, "page 1 incomplete");
            return Err(WorkflowError::Validation(report));
        }
        self.transition(WorkflowState::Page1Validated)?;
        if let Err(err) = self.enter_page2() {
            self.state = WorkflowState::Page1Editing;
            return Err(err);
        }
        Ok(())
    }

    /// Opens page 2 from the stored state.
    ///
    /// The stored page 1 must pass the same check as
    /// [`StressTestWorkflow::advance_to_page2`]: a complete respondent header
    /// and all page-1 questions answered. A selected member does not stand in
    /// for the header.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::RestartRequired` if no page-1 answers or no
    /// respondent header are stored, and `WorkflowError::Validation` if either
    /// is incomplete. The workflow does not advance.
    pub fn enter_page2(&mut self) -> Result<(), WorkflowError> {
        self.state.check_transition(WorkflowState::Page2Editing)?;

        let page1 = self.answers(Page::One)?;
        if page1.answered_count() == 0 {
            warn!("page 2 requested without page 1 answers");
            return Err(WorkflowError::RestartRequired(
                RestartReason::MissingPage1Answers,
            ));
        }

        let Some(respondent) = self.store.load_respondent()? else {
            warn!("page 2 requested without a respondent");
            return Err(WorkflowError::RestartRequired(
                RestartReason::MissingRespondent,
            ));
        };

        let report = ValidationReport::for_page1(&respondent, &page1);
        if !report.is_complete() {
            warn!(%report, "page 2 requested with page 1 incomplete");
            return Err(WorkflowError::Validation(report));
        }

        self.transition(WorkflowState::Page2Editing)
    }

    /// # Errors
    ///
    /// Returns `WorkflowError::Transition` if page 1 cannot be reopened from
    /// the current state.
    pub fn back_to_page1(&mut self) -> Result<(), WorkflowError> {
        self.transition(WorkflowState::Page1Editing)
    }

    /// Clears the session and starts over on page 1.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Transition` after a completed submission, or a
    /// storage error.
    pub fn discard(&mut self) -> Result<(), WorkflowError> {
        if self.state != WorkflowState::Page1Editing {
            self.state.check_transition(WorkflowState::Page1Editing)?;
        }
        self.store.clear_all()?;
        self.state = WorkflowState::Page1Editing;
        info!("discarded in-progress stress test");
        Ok(())
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// Scores the merged answers and hands them to the sink.
    ///
    /// On success the session is cleared and the workflow is finished. On
    /// failure, timeout or cancellation of the returned future the session is
    /// left intact in `SubmissionFailed`, from where `submit` may be retried.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::IncompleteAnswers` if fewer than all questions
    /// are answered, `WorkflowError::RestartRequired` or
    /// `WorkflowError::Validation` if the respondent header is missing or
    /// incomplete, `WorkflowError::Submission` if the sink fails, or
    /// `WorkflowError::ClearAfterSubmit` if the result was stored but the
    /// session could not be cleared.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, WorkflowError> {
        self.state.check_transition(WorkflowState::Submitting)?;

        let answers = self.store.merge_all()?;
        let answered = answers.answered_count();
        if answered < QUESTION_COUNT {
            return Err(WorkflowError::IncompleteAnswers {
                answered,
                unanswered: answers.unanswered(&QUESTIONS),
            });
        }

        let Some(respondent) = self.store.load_respondent()? else {
            return Err(WorkflowError::RestartRequired(
                RestartReason::MissingRespondent,
            ));
        };
        if !respondent.is_complete() {
            let page1 = answers.for_page(Page::One);
            return Err(WorkflowError::Validation(ValidationReport::for_page1(
                &respondent,
                &page1,
            )));
        }

        let scores = score(&answers);
        let submission = StressTestSubmission::new(
            self.store.load_selected_member()?,
            respondent,
            scores,
            answers,
            self.clock.now(),
        );
        info!(
            a = scores.a_score(),
            b = scores.b_score(),
            c = scores.c_score(),
            d = scores.d_score(),
            total = scores.total_score(),
            level = scores.level().label(),
            "submitting stress test"
        );

        let in_flight = InFlight::begin(&mut self.state);
        let outcome = match self.submit_timeout {
            Some(limit) => tokio::time::timeout(limit, self.sink.submit(&submission))
                .await
                .unwrap_or(Err(SubmissionError::Timeout(limit))),
            None => self.sink.submit(&submission).await,
        };

        match outcome {
            Ok(id) => {
                in_flight.finish(WorkflowState::Submitted);
                self.store
                    .clear_all()
                    .map_err(|source| WorkflowError::ClearAfterSubmit { id, source })?;
                info!(%id, "stress test submitted");
                Ok(SubmissionReceipt { id, scores })
            }
            Err(err) => {
                in_flight.finish(WorkflowState::SubmissionFailed);
                warn!(error = %err, "stress test submission failed; answers kept for retry");
                Err(err.into())
            }
        }
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    fn transition(&mut self, to: WorkflowState) -> Result<(), WorkflowError> {
        self.state.check_transition(to)?;
        debug!(from = %self.state, %to, "workflow transition");
        self.state = to;
        Ok(())
    }

    fn require_state(
        &self,
        expected: WorkflowState,
        operation: &'static str,
    ) -> Result<(), WorkflowError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WorkflowError::NotEditable {
                operation,
                state: self.state,
            })
        }
    }

    fn require_page_of(
        &self,
        id: QuestionId,
        operation: &'static str,
    ) -> Result<Page, WorkflowError> {
        let editing = match self.state {
            WorkflowState::Page1Editing => Page::One,
            WorkflowState::Page2Editing => Page::Two,
            state => return Err(WorkflowError::NotEditable { operation, state }),
        };
        if editing.contains(id) {
            Ok(editing)
        } else {
            Err(WorkflowError::WrongPage {
                question: id,
                page: editing.number(),
            })
        }
    }
}

/// Holds the workflow in `Submitting` for the duration of one sink call.
///
/// Dropped without [`InFlight::finish`] (the submit future was cancelled), it
/// moves the workflow to `SubmissionFailed`.
struct InFlight<'a> {
    state: &'a mut WorkflowState,
}

impl<'a> InFlight<'a> {
    fn begin(state: &'a mut WorkflowState) -> Self {
        *state = WorkflowState::Submitting;
        Self { state }
    }

    fn finish(self, to: WorkflowState) {
        debug_assert!(WorkflowState::Submitting.check_transition(to).is_ok());
        *self.state = to;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if *self.state == WorkflowState::Submitting {
            warn!("submission abandoned while in flight");
            *self.state = WorkflowState::SubmissionFailed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::kv::{InMemoryKeyValueStore, KeyValueStore};
    use storage::repository::StorageError;
    use storage::session::SessionRegion;
    use stress_core::time::fixed_clock;

    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<StressTestSubmission>>,
    }

    #[async_trait]
    impl SubmissionSink for RecordingSink {
        async fn submit(
            &self,
            submission: &StressTestSubmission,
        ) -> Result<StressTestId, SubmissionError> {
            let mut guard = self.received.lock().unwrap();
            guard.push(submission.clone());
            Ok(StressTestId::new(i64::try_from(guard.len()).unwrap()))
        }
    }

    fn workflow() -> (StressTestWorkflow, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let wf = StressTestWorkflow::new(fixed_clock(), SessionStateStore::in_memory(), sink.clone());
        (wf, sink)
    }

    fn id(s: &str) -> QuestionId {
        s.parse().unwrap()
    }

    fn answer_page(wf: &mut StressTestWorkflow, page: Page) {
        for q in page.questions() {
            wf.select_answer(q.id, Choice::A).unwrap();
        }
    }

    #[test]
    fn blank_respondent_is_dated_today() {
        let (wf, _) = workflow();
        assert_eq!(wf.respondent().unwrap().test_date, "2024-05-01");
        assert_eq!(wf.state(), WorkflowState::Page1Editing);
    }

    #[test]
    fn edits_are_persisted_immediately() {
        let (mut wf, _) = workflow();
        wf.select_answer(id("a1"), Choice::A).unwrap();
        wf.select_answer(id("a1"), Choice::B).unwrap();
        let stored = wf.store().load_answers(Page::One).unwrap().unwrap();
        assert_eq!(stored.choice(id("a1")), Some(Choice::B));
    }

    #[test]
    fn page2_question_rejected_on_page1() {
        let (mut wf, _) = workflow();
        let err = wf.select_answer(id("c1"), Choice::A).unwrap_err();
        assert!(matches!(err, WorkflowError::WrongPage { page: 1, .. }));
        assert_eq!(wf.store().load_answers(Page::Two).unwrap(), None);
    }

    #[test]
    fn incomplete_page1_reports_and_stays() {
        let (mut wf, _) = workflow();
        answer_page(&mut wf, Page::One);
        wf.clear_answer(id("b5")).unwrap();

        let err = wf.advance_to_page2().unwrap_err();
        let WorkflowError::Validation(report) = err else {
            panic!("expected validation error");
        };
        assert_eq!(report.missing_fields.len(), 2);
        assert_eq!(report.unanswered.iter().map(|o| o.get()).collect::<Vec<_>>(), vec![10]);
        assert_eq!(wf.state(), WorkflowState::Page1Editing);
    }

    #[test]
    fn respondent_cannot_change_on_page2() {
        let (mut wf, _) = workflow();
        wf.update_respondent(RespondentInfo::new("王小明", "技師", "2024-05-01"))
            .unwrap();
        answer_page(&mut wf, Page::One);
        wf.advance_to_page2().unwrap();
        assert_eq!(wf.state(), WorkflowState::Page2Editing);

        let err = wf
            .update_respondent(RespondentInfo::new("李大華", "技師", "2024-05-01"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotEditable { .. }));

        wf.back_to_page1().unwrap();
        wf.update_respondent(RespondentInfo::new("李大華", "技師", "2024-05-01"))
            .unwrap();
        assert_eq!(wf.respondent().unwrap().name, "李大華");
    }

    #[test]
    fn selected_member_does_not_replace_respondent_header() {
        let (mut wf, _) = workflow();
        wf.store().save_selected_member(MemberId::new(3)).unwrap();
        answer_page(&mut wf, Page::One);
        let err = wf.enter_page2().unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::RestartRequired(RestartReason::MissingRespondent)
        ));

        wf.update_respondent(RespondentInfo::new("王小明", "", "2024-05-01"))
            .unwrap();
        let err = wf.enter_page2().unwrap_err();
        let WorkflowError::Validation(report) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(report.missing_fields.len(), 1);
        assert_eq!(wf.state(), WorkflowState::Page1Editing);
    }

    #[test]
    fn resume_requires_every_page1_answer() {
        let (mut wf, _) = workflow();
        wf.update_respondent(RespondentInfo::new("王小明", "技師", "2024-05-01"))
            .unwrap();
        wf.select_answer(id("a1"), Choice::A).unwrap();

        let err = wf.enter_page2().unwrap_err();
        let WorkflowError::Validation(report) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(report.missing_fields.is_empty());
        assert_eq!(report.unanswered.len(), 9);
        assert_eq!(wf.state(), WorkflowState::Page1Editing);

        answer_page(&mut wf, Page::One);
        wf.enter_page2().unwrap();
        assert_eq!(wf.state(), WorkflowState::Page2Editing);
    }

    /// Lets `reads` reads of `key` through, then fails every later one.
    struct FailingReads {
        inner: InMemoryKeyValueStore,
        key: &'static str,
        reads: AtomicUsize,
    }

    impl KeyValueStore for FailingReads {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if key == self.key {
                let left = self.reads.load(Ordering::SeqCst);
                if left == 0 {
                    return Err(StorageError::Connection("read failed".into()));
                }
                self.reads.store(left - 1, Ordering::SeqCst);
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn failed_page2_entry_returns_to_page1_editing() {
        let kv = Arc::new(FailingReads {
            inner: InMemoryKeyValueStore::new(),
            key: SessionRegion::Page1Answers.key(),
            reads: AtomicUsize::new(1),
        });
        let store = SessionStateStore::new(kv);
        store
            .save_respondent(&RespondentInfo::new("王小明", "技師", "2024-05-01"))
            .unwrap();
        let page1: AnswerSet = Page::One.questions().iter().map(|q| (q.id, Choice::A)).collect();
        store.save_answers(Page::One, &page1).unwrap();
        let mut wf =
            StressTestWorkflow::new(fixed_clock(), store, Arc::new(RecordingSink::default()));

        let err = wf.advance_to_page2().unwrap_err();
        assert!(matches!(err, WorkflowError::Storage(_)), "{err:?}");
        assert_eq!(wf.state(), WorkflowState::Page1Editing);
        wf.update_respondent(RespondentInfo::new("李大華", "技師", "2024-05-01"))
            .unwrap();
    }

    #[test]
    fn enter_page2_without_reference_requires_restart() {
        let (mut wf, _) = workflow();
        answer_page(&mut wf, Page::One);
        let err = wf.enter_page2().unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::RestartRequired(RestartReason::MissingRespondent)
        ));
        assert_eq!(wf.state(), WorkflowState::Page1Editing);
    }

    #[tokio::test]
    async fn submit_requires_all_answers() {
        let (mut wf, sink) = workflow();
        wf.update_respondent(RespondentInfo::new("王小明", "技師", "2024-05-01"))
            .unwrap();
        answer_page(&mut wf, Page::One);
        wf.advance_to_page2().unwrap();
        wf.select_answer(id("c1"), Choice::B).unwrap();

        let err = wf.submit().await.unwrap_err();
        let WorkflowError::IncompleteAnswers { answered, unanswered } = err else {
            panic!("expected incomplete answers");
        };
        assert_eq!(answered, 11);
        assert_eq!(unanswered.len(), 9);
        assert_eq!(wf.state(), WorkflowState::Page2Editing);
        assert!(sink.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_rejects_blanked_respondent() {
        let (mut wf, sink) = workflow();
        wf.update_respondent(RespondentInfo::new("王小明", "技師", "2024-05-01"))
            .unwrap();
        answer_page(&mut wf, Page::One);
        wf.advance_to_page2().unwrap();
        answer_page(&mut wf, Page::Two);
        wf.store()
            .save_respondent(&RespondentInfo::new("", "", "2024-05-01"))
            .unwrap();

        let err = wf.submit().await.unwrap_err();
        let WorkflowError::Validation(report) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(report.missing_fields.len(), 2);
        assert_eq!(wf.state(), WorkflowState::Page2Editing);
        assert!(sink.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_is_rejected_from_page1() {
        let (mut wf, _) = workflow();
        assert!(matches!(
            wf.submit().await,
            Err(WorkflowError::Transition(_))
        ));
    }

    #[tokio::test]
    async fn select_member_prefills_respondent() {
        let repo = storage::repository::InMemoryRepository::new();
        storage::repository::MemberRepository::upsert_member(
            &repo,
            &Member::new(MemberId::new(5), "陳美玲", Some("護理師".into())),
        )
        .await
        .unwrap();
        let (wf, _) = workflow();
        let mut wf = wf.with_member_lookup(MemberLookupService::new(Arc::new(repo)));

        let member = wf.select_member(MemberId::new(5)).await.unwrap();
        assert_eq!(member.map(|m| m.name), Some("陳美玲".to_owned()));
        let info = wf.respondent().unwrap();
        assert_eq!(info.name, "陳美玲");
        assert_eq!(info.position, "護理師");
        assert_eq!(info.test_date, "2024-05-01");
        assert_eq!(
            wf.store().load_selected_member().unwrap(),
            Some(MemberId::new(5))
        );

        assert_eq!(wf.select_member(MemberId::new(6)).await.unwrap(), None);
    }

    #[test]
    fn discard_clears_and_restarts() {
        let (mut wf, _) = workflow();
        wf.update_respondent(RespondentInfo::new("王小明", "技師", "2024-05-01"))
            .unwrap();
        answer_page(&mut wf, Page::One);
        wf.advance_to_page2().unwrap();
        wf.select_answer(id("d1"), Choice::A).unwrap();

        wf.discard().unwrap();
        assert_eq!(wf.state(), WorkflowState::Page1Editing);
        assert!(wf.store().merge_all().unwrap().is_empty());
        assert_eq!(wf.store().load_respondent().unwrap(), None);
    }
}
