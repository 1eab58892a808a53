mod common;

use common::mock_server::DriveSafeMock;

#[tokio::test]
async fn test_get_members_valid() {
    let mock = DriveSafeMock::start().await;
    mock.mount_fixture("members/get_members_valid.json").await;

    let client = mock.client();
    let members = client.get_members().await.unwrap();

    assert_eq!(members.len(), 3);
    assert_eq!(members[0].name.as_deref(), Some("Alice"));
    assert_eq!(members[1].id, Some(2));
    assert_eq!(members[1].email.as_deref(), Some("b@example.com"));
    assert_eq!(members[1].name.as_deref(), Some("bob"));
    assert_eq!(members[2].id_or_zero(), 0);
    assert_eq!(members[2].name.as_deref(), Some("carol"));
}
