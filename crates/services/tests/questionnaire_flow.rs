use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use services::{
    RepositorySubmissionSink, StressTestWorkflow, SubmissionError, SubmissionSink, WorkflowError,
};
use storage::kv::JsonFileKeyValueStore;
use storage::repository::{InMemoryRepository, StressTestFilter, StressTestRepository};
use storage::session::{SessionRegion, SessionStateStore};
use stress_core::model::{
    AnswerSet, Choice, MemberId, Page, QUESTIONS, RespondentInfo, StressTestId,
    StressTestSubmission, WorkflowState,
};
use stress_core::time::fixed_clock;

/// Fails until `healthy` is set, counting every call.
#[derive(Default)]
struct FlakySink {
    healthy: AtomicBool,
    calls: AtomicUsize,
}

#[async_trait]
impl SubmissionSink for FlakySink {
    async fn submit(
        &self,
        _submission: &StressTestSubmission,
    ) -> Result<StressTestId, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(StressTestId::new(77))
        } else {
            Err(SubmissionError::Rejected {
                status: Some(500),
                message: "database unavailable".into(),
            })
        }
    }
}

/// Never answers.
struct StalledSink;

#[async_trait]
impl SubmissionSink for StalledSink {
    async fn submit(
        &self,
        _submission: &StressTestSubmission,
    ) -> Result<StressTestId, SubmissionError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(StressTestId::new(1))
    }
}

fn alternating(page: Page) -> Vec<(stress_core::model::QuestionId, Choice)> {
    page.questions()
        .iter()
        .map(|q| {
            let choice = if q.ordinal.get() % 2 == 1 {
                Choice::A
            } else {
                Choice::B
            };
            (q.id, choice)
        })
        .collect()
}

fn fill_both_pages(wf: &mut StressTestWorkflow) {
    wf.update_respondent(RespondentInfo::new("王小明", "技師", "2024-05-01"))
        .unwrap();
    for (id, choice) in alternating(Page::One) {
        wf.select_answer(id, choice).unwrap();
    }
    assert!(wf.validation_report(Page::One).unwrap().is_complete());
    wf.advance_to_page2().unwrap();
    for (id, choice) in alternating(Page::Two) {
        wf.select_answer(id, choice).unwrap();
    }
    assert!(wf.validation_report(Page::Two).unwrap().is_complete());
}

#[tokio::test]
async fn end_to_end_submission_scores_and_clears() {
    let repo = InMemoryRepository::new();
    let store = SessionStateStore::in_memory();
    let sink = Arc::new(RepositorySubmissionSink::new(Arc::new(repo.clone())));
    let mut wf = StressTestWorkflow::new(fixed_clock(), store.clone(), sink);

    fill_both_pages(&mut wf);
    let receipt = wf.submit().await.unwrap();

    assert_eq!(wf.state(), WorkflowState::Submitted);
    assert_eq!(receipt.scores.total_score(), 20);
    assert_eq!(
        (
            receipt.scores.a_score(),
            receipt.scores.b_score(),
            receipt.scores.c_score(),
            receipt.scores.d_score()
        ),
        (10, 7, 3, 0)
    );

    let stored = repo.get_result(receipt.id).await.unwrap();
    assert_eq!(stored.respondent.name, "王小明");
    assert_eq!(stored.answers.answered_count(), QUESTIONS.len());

    for page in [Page::One, Page::Two] {
        assert_eq!(store.load_answers(page).unwrap(), None);
    }
    assert_eq!(store.load_respondent().unwrap(), None);
    assert!(store.merge_all().unwrap().is_empty());

    // Terminal: nothing more can happen to this attempt.
    assert!(matches!(wf.submit().await, Err(WorkflowError::Transition(_))));
    assert!(wf.discard().is_err());
}

#[tokio::test]
async fn failed_submission_keeps_state_and_retries() {
    let store = SessionStateStore::in_memory();
    let sink = Arc::new(FlakySink::default());
    let mut wf = StressTestWorkflow::new(fixed_clock(), store.clone(), sink.clone());
    fill_both_pages(&mut wf);
    let before = store.merge_all().unwrap();

    let err = wf.submit().await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Submission(SubmissionError::Rejected { status: Some(500), .. })
    ));
    assert_eq!(wf.state(), WorkflowState::SubmissionFailed);
    assert_eq!(store.merge_all().unwrap(), before);
    assert!(store.load_respondent().unwrap().is_some());

    sink.healthy.store(true, Ordering::SeqCst);
    let receipt = wf.submit().await.unwrap();
    assert_eq!(receipt.id, StressTestId::new(77));
    assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    assert_eq!(wf.state(), WorkflowState::Submitted);
    assert!(store.merge_all().unwrap().is_empty());
}

#[tokio::test]
async fn empty_page1_blocks_page2_entry() {
    let store = SessionStateStore::in_memory();
    store
        .save_respondent(&RespondentInfo::new("王小明", "技師", "2024-05-01"))
        .unwrap();
    store.save_answers(Page::One, &AnswerSet::new()).unwrap();

    let mut wf = StressTestWorkflow::new(fixed_clock(), store, Arc::new(FlakySink::default()));
    let err = wf.enter_page2().unwrap_err();
    assert!(matches!(err, WorkflowError::RestartRequired(_)));
    assert_eq!(wf.state(), WorkflowState::Page1Editing);
}

#[tokio::test]
async fn selected_member_cannot_skip_page1_checks() {
    let repo = InMemoryRepository::new();
    let store = SessionStateStore::in_memory();
    let sink = Arc::new(RepositorySubmissionSink::new(Arc::new(repo.clone())));
    let mut wf = StressTestWorkflow::new(fixed_clock(), store.clone(), sink.clone());

    wf.select_member(MemberId::new(9)).await.unwrap();
    let (first, choice) = alternating(Page::One)[0];
    wf.select_answer(first, choice).unwrap();
    assert!(wf.enter_page2().is_err());
    assert_eq!(wf.state(), WorkflowState::Page1Editing);

    // A stored session with every answer but no respondent header.
    for page in [Page::One, Page::Two] {
        let answers: AnswerSet = alternating(page).into_iter().collect();
        store.save_answers(page, &answers).unwrap();
    }
    let mut resumed = StressTestWorkflow::new(fixed_clock(), store.clone(), sink);
    assert!(matches!(
        resumed.enter_page2(),
        Err(WorkflowError::RestartRequired(_))
    ));
    assert!(matches!(
        resumed.submit().await,
        Err(WorkflowError::Transition(_))
    ));

    store
        .save_respondent(&RespondentInfo::new("", "", "2024-05-01"))
        .unwrap();
    let err = resumed.enter_page2().unwrap_err();
    let WorkflowError::Validation(report) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(report.missing_fields.len(), 2);
    assert_eq!(resumed.state(), WorkflowState::Page1Editing);

    let stored = repo.list_results(&StressTestFilter::default()).await.unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn submit_times_out_into_failed_state() {
    let store = SessionStateStore::in_memory();
    let mut wf = StressTestWorkflow::new(fixed_clock(), store.clone(), Arc::new(StalledSink))
        .with_submit_timeout(Duration::from_millis(50));
    fill_both_pages(&mut wf);

    let err = wf.submit().await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Submission(SubmissionError::Timeout(_))
    ));
    assert_eq!(wf.state(), WorkflowState::SubmissionFailed);
    assert_eq!(store.merge_all().unwrap().answered_count(), 20);
}

#[tokio::test]
async fn cancelled_submit_lands_in_failed_state() {
    let store = SessionStateStore::in_memory();
    let mut wf = StressTestWorkflow::new(fixed_clock(), store.clone(), Arc::new(StalledSink));
    fill_both_pages(&mut wf);

    let outcome = tokio::time::timeout(Duration::from_millis(50), wf.submit()).await;
    assert!(outcome.is_err());
    assert_eq!(wf.state(), WorkflowState::SubmissionFailed);
    assert_eq!(store.merge_all().unwrap().answered_count(), 20);

    // From the failed state the user may go back and edit page 2.
    wf.enter_page2().unwrap();
    assert_eq!(wf.state(), WorkflowState::Page2Editing);
}

#[tokio::test]
async fn session_file_resumes_on_page2() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let repo = InMemoryRepository::new();

    {
        let store = SessionStateStore::new(Arc::new(JsonFileKeyValueStore::open(&path).unwrap()));
        let sink = Arc::new(RepositorySubmissionSink::new(Arc::new(repo.clone())));
        let mut wf = StressTestWorkflow::new(fixed_clock(), store, sink);
        wf.update_respondent(RespondentInfo::new("王小明", "技師", "2024-05-01"))
            .unwrap();
        for (id, choice) in alternating(Page::One) {
            wf.select_answer(id, choice).unwrap();
        }
        wf.advance_to_page2().unwrap();
        for (id, choice) in alternating(Page::Two).into_iter().take(4) {
            wf.select_answer(id, choice).unwrap();
        }
    }

    let store = SessionStateStore::new(Arc::new(JsonFileKeyValueStore::open(&path).unwrap()));
    let sink = Arc::new(RepositorySubmissionSink::new(Arc::new(repo.clone())));
    let mut wf = StressTestWorkflow::new(fixed_clock(), store.clone(), sink);
    wf.enter_page2().unwrap();
    assert_eq!(wf.validation_report(Page::Two).unwrap().unanswered.len(), 6);
    for (id, choice) in alternating(Page::Two).into_iter().skip(4) {
        wf.select_answer(id, choice).unwrap();
    }
    let receipt = wf.submit().await.unwrap();
    assert_eq!(receipt.scores.total_score(), 20);

    let listed = repo.list_results(&StressTestFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 1);

    let reopened = JsonFileKeyValueStore::open(&path).unwrap();
    for region in SessionRegion::ALL {
        assert_eq!(
            storage::kv::KeyValueStore::get(&reopened, region.key()).unwrap(),
            None
        );
    }
}
