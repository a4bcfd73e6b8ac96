use share_sync::client::{NextcloudClient, SharePayload};
use share_sync_core::config::{Configuration, ServerSettings};
use share_sync_core::contract::{ShareClient, ShareResult, ShareStatus};
use share_sync_core::SyncError;
use tempfile::TempDir;
use wiremock::matchers::{body_bytes, body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHARES_PATH: &str = "/ocs/v2.php/apps/files_sharing/api/v1/shares";
// base64("alice:secret")
const AUTH: &str = "Basic YWxpY2U6c2VjcmV0";

fn setup(server: &MockServer, payload: SharePayload) -> (NextcloudClient, Configuration) {
    let address = server.address();
    let config = Configuration::new(ServerSettings {
        hostname: address.ip().to_string(),
        port: address.port(),
        username: "alice".to_string(),
        password: "secret".to_string(),
        root_path: "/remote.php/dav/files/alice/".to_string(),
        upload_dir: "Uploads".to_string(),
        ocs_endpoint: "/ocs/v2.php/apps/files_sharing/api/v1/".to_string(),
    })
    .expect("valid configuration");
    let client = NextcloudClient::new(config.clone(), payload).expect("client builds");
    (client, config)
}

fn local_file(name: &str, content: &[u8]) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

// --- Upload ---

#[tokio::test]
async fn upload_puts_raw_bytes_with_ocs_headers() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/remote.php/dav/files/alice/Uploads/report.pdf"))
        .and(header("OCS-APIRequest", "true"))
        .and(header("Authorization", AUTH))
        .and(body_bytes(b"%PDF-1.7 bytes".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (client, config) = setup(&server, SharePayload::Json);
    let (_dir, file) = local_file("report.pdf", b"%PDF-1.7 bytes");
    let target = config.target_for(file.clone()).unwrap();

    assert!(client.upload(&target).await.expect("upload request"));
    assert!(file.exists(), "upload must not touch the local file");
}

#[tokio::test]
async fn upload_keeps_literal_percent_in_file_name() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/remote.php/dav/files/alice/Uploads/50%2525%20off.pdf"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SHARES_PATH))
        .and(query_param("path", "Uploads/50%25 off.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<ocs><data><url>https://cloud.example/s/p</url></data></ocs>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, config) = setup(&server, SharePayload::Json);
    let (_dir, file) = local_file("50%25 off.pdf", b"data");
    let target = config.target_for(file).unwrap();

    assert!(client.upload(&target).await.unwrap());
    let result = client.create_link(&target.share_path).await.unwrap();
    assert_eq!(result, ShareResult::success("https://cloud.example/s/p"));
}

#[tokio::test]
async fn upload_with_any_body_is_rejected_regardless_of_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201).set_body_string("{}"))
        .mount(&server)
        .await;

    let (client, config) = setup(&server, SharePayload::Json);
    let (_dir, file) = local_file("bad.pdf", b"data");
    let target = config.target_for(file).unwrap();

    assert!(!client.upload(&target).await.unwrap());
}

#[tokio::test]
async fn upload_with_empty_error_status_still_counts_as_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (client, config) = setup(&server, SharePayload::Json);
    let (_dir, file) = local_file("odd.pdf", b"data");
    let target = config.target_for(file).unwrap();

    assert!(client.upload(&target).await.unwrap());
}

#[tokio::test]
async fn upload_of_missing_local_file_is_io_error() {
    let server = MockServer::start().await;
    let (client, config) = setup(&server, SharePayload::Json);
    let target = config
        .target_for(std::path::PathBuf::from("/nonexistent/dir/ghost.pdf"))
        .unwrap();

    let err = client.upload(&target).await.unwrap_err();
    assert!(matches!(err, SyncError::Io { .. }), "got {err}");
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Grab a free port and release it so nothing listens there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = Configuration::new(ServerSettings {
        hostname: "127.0.0.1".to_string(),
        port,
        username: "alice".to_string(),
        password: "secret".to_string(),
        root_path: "/remote.php/dav/files/alice/".to_string(),
        upload_dir: "Uploads".to_string(),
        ocs_endpoint: "/ocs/v2.php/apps/files_sharing/api/v1/".to_string(),
    })
    .unwrap();
    let client = NextcloudClient::new(config.clone(), SharePayload::Json).unwrap();

    let (_dir, file) = local_file("report.pdf", b"data");
    let target = config.target_for(file).unwrap();
    let err = client.upload(&target).await.unwrap_err();
    assert!(matches!(err, SyncError::Transport(_)), "got {err}");
}

// --- Share link ---

#[tokio::test]
async fn create_link_posts_public_share_and_returns_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SHARES_PATH))
        .and(query_param("shareType", "3"))
        .and(query_param("path", "Uploads/report.pdf"))
        .and(header("OCS-APIRequest", "true"))
        .and(header("Authorization", AUTH))
        .and(body_json(serde_json::json!({ "shareType": 3, "path": "Uploads/report.pdf" })))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<?xml version=\"1.0\"?>\n<ocs><meta><status>ok</status><statuscode>200</statuscode>\
             <message>OK</message></meta><data><id>1</id>\
             <url>https://cloud.example/s/abc123</url></data></ocs>\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _config) = setup(&server, SharePayload::Json);
    let result = client.create_link("Uploads/report.pdf").await.unwrap();

    assert_eq!(result, ShareResult::success("https://cloud.example/s/abc123"));
}

#[tokio::test]
async fn create_link_form_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SHARES_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("shareType=3&path=Uploads%2Freport.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<ocs><data><url>https://cloud.example/s/f</url></data></ocs>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _config) = setup(&server, SharePayload::Form);
    let result = client.create_link("Uploads/report.pdf").await.unwrap();
    assert_eq!(result.message, "https://cloud.example/s/f");
}

#[tokio::test]
async fn create_link_failure_status_is_a_failed_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SHARES_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            "<ocs><meta><status>failure</status><statuscode>404</statuscode>\
             <message>Not found</message></meta><data/></ocs>",
        ))
        .mount(&server)
        .await;

    let (client, _config) = setup(&server, SharePayload::Json);
    let result = client.create_link("Uploads/missing.pdf").await.unwrap();
    assert_eq!(result, ShareResult::fail("Not found"));
}

#[tokio::test]
async fn create_link_non_xml_body_is_a_failed_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("plain text"))
        .mount(&server)
        .await;

    let (client, _config) = setup(&server, SharePayload::Json);
    let result = client.create_link("Uploads/a.pdf").await.unwrap();
    assert_eq!(result.status, ShareStatus::Fail);
    assert!(result.message.starts_with("Response is not in XML"));
}

#[tokio::test]
async fn create_link_malformed_xml_shape_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ocs><meta/></ocs>"))
        .mount(&server)
        .await;

    let (client, _config) = setup(&server, SharePayload::Json);
    let err = client.create_link("Uploads/a.pdf").await.unwrap_err();
    assert!(matches!(err, SyncError::MalformedResponse(_)), "got {err}");
}
