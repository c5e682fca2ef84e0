use alertctl_cli::config::Config;
use alertctl_cli::workflow::{self, DeleteRequest, Outcome, WorkflowError};
use alertctl_client::{CollectionKind, ConnectionConfig, Namespace, Scheme, Session};
use alertctl_test::server::{self, TestServer};

const TARGET: &str = "My Awesome Alert";

fn config(server: &TestServer) -> Config {
    Config {
        connection: ConnectionConfig {
            scheme: Scheme::Http,
            host: server.host(),
            port: server.port(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn session(server: &TestServer) -> Session {
    workflow::session(&config(server)).unwrap()
}

async fn server_with(names: &[&str]) -> TestServer {
    let config = server::Config::default().with_collection("saved/searches", names.iter().copied());
    TestServer::with_config(config).await
}

#[tokio::test]
async fn deletes_the_named_resource_once() {
    alertctl_test::tracing::init();
    let server = server_with(&["Alpha", TARGET, "Beta"]).await;

    let outcome = workflow::run(session(&server), &DeleteRequest::new(TARGET))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Deleted {
            name: TARGET.into()
        }
    );
    assert_eq!(outcome.to_string(), "Deleted alert: My Awesome Alert");

    let counts = server.counts();
    assert_eq!(counts.logins, 1);
    assert_eq!(counts.lists, 1);
    assert_eq!(counts.deletes, 1);
    assert_eq!(server.names("saved/searches"), ["Alpha", "Beta"]);

    let last = server.requests().pop().unwrap();
    assert_eq!(last.method, reqwest::Method::DELETE);
    assert_eq!(last.path, "/services/saved/searches/My%20Awesome%20Alert");
}

#[tokio::test]
async fn missing_resource_is_not_an_error() {
    let server = server_with(&["Alpha", "Beta"]).await;

    let outcome = workflow::run(session(&server), &DeleteRequest::new(TARGET))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::NotFound {
            name: TARGET.into()
        }
    );
    assert_eq!(
        outcome.to_string(),
        "Can't delete 'My Awesome Alert' because it doesn't exist!"
    );
    assert_eq!(server.counts().deletes, 0);
    assert_eq!(server.names("saved/searches"), ["Alpha", "Beta"]);
}

#[tokio::test]
async fn empty_collection_is_not_found() {
    let server = server_with(&[]).await;

    let outcome = workflow::run(session(&server), &DeleteRequest::new(TARGET))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::NotFound { .. }));
    assert_eq!(server.counts().deletes, 0);
}

#[tokio::test]
async fn lookup_does_not_match_similar_names() {
    let server = server_with(&["my awesome alert", "My Awesome Alert 2", "My Awesome"]).await;

    let outcome = workflow::run(session(&server), &DeleteRequest::new(TARGET))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::NotFound { .. }));
    assert_eq!(server.counts().deletes, 0);
    assert_eq!(server.names("saved/searches").len(), 3);
}

#[tokio::test]
async fn second_run_finds_nothing() {
    let server = server_with(&["Alpha", TARGET]).await;
    let request = DeleteRequest::new(TARGET);

    let first = workflow::run(session(&server), &request).await.unwrap();
    let second = workflow::run(session(&server), &request).await.unwrap();

    assert!(matches!(first, Outcome::Deleted { .. }));
    assert!(matches!(second, Outcome::NotFound { .. }));

    let counts = server.counts();
    assert_eq!(counts.logins, 2);
    assert_eq!(counts.lists, 2);
    assert_eq!(counts.deletes, 1);
}

#[tokio::test]
async fn bad_password_stops_before_fetching() {
    let server = server_with(&[TARGET]).await;

    let mut config = config(&server);
    config.connection = config.connection.with_password("wrong");
    let session = workflow::session(&config).unwrap();

    let err = workflow::run(session, &DeleteRequest::new(TARGET))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Login(_)));
    assert_eq!(
        err.client_error().status(),
        Some(reqwest::StatusCode::UNAUTHORIZED)
    );

    let counts = server.counts();
    assert_eq!(counts.logins, 1);
    assert_eq!(counts.lists, 0);
    assert_eq!(counts.deletes, 0);
    assert_eq!(server.names("saved/searches"), [TARGET]);
}

#[tokio::test]
async fn failed_fetch_skips_lookup() {
    let config = server::Config {
        fail_list: true,
        ..Default::default()
    }
    .with_collection("saved/searches", [TARGET]);
    let server = TestServer::with_config(config).await;

    let err = workflow::run(session(&server), &DeleteRequest::new(TARGET))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Fetch(_)));
    assert_eq!(server.counts().deletes, 0);
}

#[tokio::test]
async fn failed_delete_is_reported_with_name() {
    let config = server::Config {
        fail_delete: true,
        ..Default::default()
    }
    .with_collection("saved/searches", [TARGET]);
    let server = TestServer::with_config(config).await;

    let err = workflow::run(session(&server), &DeleteRequest::new(TARGET))
        .await
        .unwrap_err();

    let WorkflowError::Delete { name, source } = &err else {
        panic!("expected delete failure, got {err:?}");
    };
    assert_eq!(name, TARGET);
    assert_eq!(
        source.status(),
        Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
    );
    assert_eq!(server.counts().deletes, 1);
    assert_eq!(server.names("saved/searches"), [TARGET]);
}

#[tokio::test]
async fn deletes_from_configured_namespace() {
    let config = server::Config::default().with_collection("alerts/fired_alerts", [TARGET]);
    let server = TestServer::with_config(config).await;

    let mut config = self::config(&server);
    config.target.collection = CollectionKind::FiredAlerts;
    config.target.owner = Some("nobody".into());
    config.target.app = Some("search".into());

    let request = DeleteRequest::from_config(&config);
    assert_eq!(request.namespace, Namespace::new(Some("nobody"), Some("search")));

    let session = workflow::session(&config).unwrap();
    let outcome = workflow::run(session, &request).await.unwrap();

    assert!(matches!(outcome, Outcome::Deleted { .. }));
    assert!(server.names("alerts/fired_alerts").is_empty());

    let paths = server
        .requests()
        .into_iter()
        .map(|request| request.path)
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        [
            "/services/auth/login",
            "/servicesNS/nobody/search/alerts/fired_alerts",
            "/servicesNS/nobody/search/alerts/fired_alerts/My%20Awesome%20Alert",
        ]
    );
}

#[tokio::test]
async fn spawned_run_completes_once() {
    let server = server_with(&[TARGET]).await;

    let receiver = workflow::spawn(session(&server), DeleteRequest::new(TARGET));
    let outcome = receiver.await.unwrap().unwrap();

    assert_eq!(
        outcome,
        Outcome::Deleted {
            name: TARGET.into()
        }
    );
    assert_eq!(server.counts().deletes, 1);
}

#[tokio::test]
async fn spawned_run_reports_failure() {
    let server = server_with(&[TARGET]).await;

    let mut config = config(&server);
    config.connection = config.connection.with_password("wrong");
    let session = workflow::session(&config).unwrap();

    let receiver = workflow::spawn(session, DeleteRequest::new(TARGET));
    let err = receiver.await.unwrap().unwrap_err();

    assert!(matches!(err, WorkflowError::Login(_)));
    assert_eq!(server.counts().lists, 0);
}

#[tokio::test]
async fn lists_collection_names() {
    let server = server_with(&["Alpha", TARGET, "Beta"]).await;

    let collection = workflow::list(
        session(&server),
        CollectionKind::SavedSearches,
        Namespace::global(),
    )
    .await
    .unwrap();

    assert_eq!(
        collection.names().collect::<Vec<_>>(),
        ["Alpha", TARGET, "Beta"]
    );
    assert_eq!(server.counts().deletes, 0);
}

#[test]
fn invalid_host_fails_setup() {
    let mut config = Config::default();
    config.connection.host = String::new();

    let err = workflow::session(&config).unwrap_err();
    assert!(matches!(err, WorkflowError::Setup(_)));
}
