mod common;

use common::mock_server::DriveSafeMock;
use drivesafe::DriveSafeClient;

#[tokio::test]
async fn test_root_valid() {
    let mock = DriveSafeMock::start().await;
    mock.mount_fixture("root/root_valid.json").await;

    let client = mock.client();
    let root = client.root().await.unwrap();

    assert_eq!(root.status.as_deref(), Some("ok"));
    assert_eq!(root.version.as_deref(), Some("1.2"));
    assert_eq!(root.message, None);
    assert_eq!(root.time, None);
}

#[tokio::test]
async fn test_root_ignores_base_path() {
    let mock = DriveSafeMock::start().await;
    mock.mount_fixture("root/root_valid.json").await;

    let client = DriveSafeClient::new(&format!("{}/api/v1", mock.base_url())).unwrap();
    let root = client.root().await.unwrap();
    assert_eq!(root.status.as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_root_bundled_backend_shape() {
    let mock = DriveSafeMock::start().await;
    mock.mount_fixture("root/root_backend.json").await;

    let client = mock.client();
    let root = client.root().await.unwrap();

    assert_eq!(root.status.as_deref(), Some("true"));
    assert_eq!(root.message.as_deref(), Some("Hello from Kotlin/Ktor"));
    assert_eq!(root.success, None);
}
