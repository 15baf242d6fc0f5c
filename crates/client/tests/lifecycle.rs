use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use telexport_client::{
    ActionError, InMemoryJobGateway, JobActions, JobGateway, NoticeLevel, PollWorker, Reconciler,
    SortKey, SubmitForm, TableState,
};
use telexport_core::{ExportError, JobStatus};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

#[tokio::test(start_paused = true)]
async fn export_job_lifecycle() {
    let gateway = Arc::new(InMemoryJobGateway::new());
    let shared: Arc<dyn JobGateway> = gateway.clone();
    let reconciler = Arc::new(Reconciler::new(shared.clone()));
    let actions = JobActions::attach(shared, &reconciler);
    let mut notices = actions.subscribe_notices();

    let poller = PollWorker::new(reconciler.clone(), Duration::from_secs(60)).start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(reconciler.snapshot().is_empty());
    assert_eq!(gateway.calls().list, 1);

    // Submit: one immediate refresh shows the new job.
    let job = actions
        .submit(&SubmitForm::new(date(4, 1), date(4, 7)).with_tenant("tenant-a"))
        .await
        .unwrap();
    assert_eq!(notices.recv().await.unwrap().level, NoticeLevel::Success);
    assert_eq!(gateway.calls().list, 2);
    let listed = reconciler.snapshot();
    assert_eq!(listed.find(&job.job_id).unwrap().status, JobStatus::Queued);

    // The worker picks it up; the next poll tick reports it running.
    gateway.set_status(&job.job_id, JobStatus::Running);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(
        reconciler.snapshot().find(&job.job_id).unwrap().status,
        JobStatus::Running
    );
    assert!(matches!(
        actions.request_delete(&job.job_id),
        Err(ActionError::NotAllowed { .. })
    ));

    // A failed poll keeps the table and shows the error.
    gateway.fail_next_list(ExportError::transport("Failed to fetch telemetry data"));
    tokio::time::sleep(Duration::from_secs(60)).await;
    let snapshot = reconciler.snapshot();
    assert_eq!(snapshot.jobs.len(), 1);
    assert_eq!(snapshot.error.as_deref(), Some("Failed to fetch telemetry data"));

    // Completion arrives with the next tick and clears the error.
    gateway.set_status(&job.job_id, JobStatus::Completed);
    tokio::time::sleep(Duration::from_secs(60)).await;
    let snapshot = reconciler.snapshot();
    assert_eq!(snapshot.error, None);

    let file = actions.download(&job.job_id).await.unwrap();
    assert_eq!(file.filename, "export_20240401_to_20240407.xlsx");

    actions.request_delete(&job.job_id).unwrap();
    actions.confirm_delete().await.unwrap();
    assert!(reconciler.snapshot().is_empty());
    assert!(gateway.jobs().is_empty());

    poller.shutdown().await;
}

#[tokio::test]
async fn table_renders_the_latest_snapshot() {
    let gateway = Arc::new(InMemoryJobGateway::new());
    let shared: Arc<dyn JobGateway> = gateway.clone();
    let reconciler = Arc::new(Reconciler::new(shared.clone()));
    let actions = JobActions::attach(shared, &reconciler);

    for day in 1..=12 {
        actions
            .submit(&SubmitForm::new(date(5, day), date(5, day)))
            .await
            .unwrap();
    }

    let rows = reconciler.snapshot().rows();
    let mut table = TableState::new(10);
    table.toggle_sort(SortKey::DateFrom);

    let first = table.view(&rows);
    assert_eq!(first.summary(), "Showing 1 to 10 of 12 entries");
    assert_eq!(first.rows[0].date_from, Some(date(5, 1)));

    assert!(table.next_page(rows.len()));
    let second = table.view(&rows);
    assert_eq!(second.rows.len(), 2);
    assert_eq!(second.rows[1].date_from, Some(date(5, 12)));

    table.toggle_sort(SortKey::DateFrom);
    assert_eq!(table.page(), 1);
    assert_eq!(table.view(&rows).rows[0].date_from, Some(date(5, 12)));
}
