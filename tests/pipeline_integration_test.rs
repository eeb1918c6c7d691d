use async_trait::async_trait;
use httpmock::prelude::*;
use job_alert::core::dedup::PersistencePolicy;
use job_alert::domain::model::{JobPosting, WatchList};
use job_alert::domain::ports::Notifier;
use job_alert::{
    AppConfig, JobPipeline, ListingExtractor, PipelineSettings, RateLimitedFetcher, Scheduler,
    SchedulerConfig, SqliteSeenStore, TriggerOutcome, WatchError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct RecordingNotifier {
    batches: Arc<Mutex<Vec<Vec<JobPosting>>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, postings: &[JobPosting]) -> job_alert::Result<()> {
        self.batches.lock().await.push(postings.to_vec());
        Ok(())
    }
}

fn card(id: &str, title: &str, skills: &[&str]) -> String {
    let tags: String = skills
        .iter()
        .map(|s| format!(r#"<span data-test="attr-item">{}</span>"#, s))
        .collect();
    format!(
        r#"<section class="up-card-section">
             <h3 data-test="job-title"><a href="/jobs/{title}_~{id}/?referrer_url_path=%2Fsearch">{title}</a></h3>
             <div class="skills">{tags}</div>
           </section>"#
    )
}

fn search_page(cards: &[String]) -> String {
    format!(
        "<!DOCTYPE html><html><body><div class=\"results\">{}</div></body></html>",
        cards.concat()
    )
}

type TestPipeline = JobPipeline<RateLimitedFetcher, SqliteSeenStore, RecordingNotifier>;

async fn build_scheduler(
    server: &MockServer,
    notifier: RecordingNotifier,
) -> (Arc<Scheduler<TestPipeline>>, SqliteSeenStore) {
    let config = AppConfig::from_toml_str(&format!(
        r#"
[source]
url = "{}"
origin = "{}"
"#,
        server.url("/nx/jobs/search/"),
        server.base_url()
    ))
    .unwrap();

    let store = SqliteSeenStore::connect("sqlite::memory:").await.unwrap();
    let fetcher = RateLimitedFetcher::new(
        config.user_agent(),
        Duration::from_secs(5),
        Duration::from_millis(20),
    )
    .unwrap();

    let pipeline = JobPipeline::new(
        fetcher,
        ListingExtractor::from_config(&config).unwrap(),
        store.clone(),
        notifier,
        PipelineSettings {
            source_url: config.source_url().to_string(),
            watch_list: WatchList::new(["React developer", "Nextjs developer"]),
            persistence_policy: PersistencePolicy::Abort,
            zero_result_alert_after: 3,
        },
    );

    let scheduler = Arc::new(Scheduler::new(
        pipeline,
        SchedulerConfig {
            interval: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
        },
    ));
    (scheduler, store)
}

#[tokio::test]
async fn test_passes_report_each_matching_job_once() {
    let server = MockServer::start();
    let notifier = RecordingNotifier::default();
    let (scheduler, store) = build_scheduler(&server, notifier.clone()).await;

    let mut first_page = server.mock(|when, then| {
        when.method(GET).path("/nx/jobs/search/");
        then.status(200).body(search_page(&[
            card("01java", "Java-API", &["Java"]),
            card("01react", "React-SPA", &["React developer"]),
            card("01next", "Next-Shop", &["Nextjs developer", "Java"]),
        ]));
    });

    match scheduler.trigger().await {
        TriggerOutcome::Completed(report) => {
            assert_eq!(report.scraped, 3);
            assert_eq!(report.matched, 2);
            assert_eq!(report.new_jobs, 2);
            assert!(report.notified);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    first_page.assert();
    first_page.delete();

    let second_page = server.mock(|when, then| {
        when.method(GET).path("/nx/jobs/search/");
        then.status(200).body(search_page(&[
            card("01react", "React-SPA", &["React developer"]),
            card("01vue", "Vue-App", &["Vue developer"]),
            card("01mern", "Mern-Board", &["MERN developer", "React developer"]),
        ]));
    });

    match scheduler.trigger().await {
        TriggerOutcome::Completed(report) => assert_eq!(report.new_jobs, 1),
        other => panic!("unexpected outcome: {:?}", other),
    }
    second_page.assert();

    let batches = notifier.batches.lock().await;
    assert_eq!(batches.len(), 2);
    let first_ids: Vec<&str> = batches[0].iter().map(|p| p.id.as_str()).collect();
    assert_eq!(first_ids, vec!["01react", "01next"]);
    assert_eq!(batches[1][0].id, "01mern");
    assert_eq!(
        batches[1][0].link,
        server.url("/jobs/Mern-Board_~01mern/?referrer_url_path=%2Fsearch")
    );

    assert_eq!(store.count().await.unwrap(), 3);
    store.close().await;
}

#[tokio::test]
async fn test_blocked_page_fails_pass_without_touching_store() {
    let server = MockServer::start();
    let notifier = RecordingNotifier::default();
    let (scheduler, store) = build_scheduler(&server, notifier.clone()).await;

    server.mock(|when, then| {
        when.method(GET).path("/nx/jobs/search/");
        then.status(403).body("Access denied");
    });

    match scheduler.trigger().await {
        TriggerOutcome::Failed(WatchError::HttpStatus { status, .. }) => {
            assert_eq!(status.as_u16(), 403)
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(store.count().await.unwrap(), 0);
    assert!(notifier.batches.lock().await.is_empty());
}

#[tokio::test]
async fn test_layout_change_yields_empty_pass() {
    let server = MockServer::start();
    let notifier = RecordingNotifier::default();
    let (scheduler, _store) = build_scheduler(&server, notifier.clone()).await;

    server.mock(|when, then| {
        when.method(GET).path("/nx/jobs/search/");
        then.status(200)
            .body("<html><body><article class=\"job-tile\">Redesigned</article></body></html>");
    });

    match scheduler.trigger().await {
        TriggerOutcome::Completed(report) => {
            assert_eq!(report.scraped, 0);
            assert!(!report.notified);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(scheduler.pipeline().empty_streak(), 1);
    assert!(notifier.batches.lock().await.is_empty());
}

#[tokio::test]
async fn test_closed_store_aborts_pass() {
    let server = MockServer::start();
    let notifier = RecordingNotifier::default();
    let (scheduler, store) = build_scheduler(&server, notifier.clone()).await;

    server.mock(|when, then| {
        when.method(GET).path("/nx/jobs/search/");
        then.status(200)
            .body(search_page(&[card("01react", "React-SPA", &["React developer"])]));
    });

    store.close().await;

    assert!(matches!(
        scheduler.trigger().await,
        TriggerOutcome::Failed(WatchError::Persistence(_))
    ));
    assert!(notifier.batches.lock().await.is_empty());
}
