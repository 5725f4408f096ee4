//! PostgreSQL repository tests.
//!
//! Require a migrated database at DATABASE_URL (see `test_fixtures`).

use chrono::{Duration, Utc};
use ideabase_db::test_fixtures::TestDatabase;
use ideabase_db::{
    AccountRepository, AttachmentMetadata, AttachmentRepository, AttachmentStatus,
    CreateNoteRequest, CreateTagRequest, Credentials, Error, FileType, ListNotesRequest,
    NewAttachment, NoteRepository, TagRepository, UpdateNoteRequest,
};
use uuid::Uuid;

fn new_attachment(owner: Uuid, note_id: Option<Uuid>, status: AttachmentStatus) -> NewAttachment {
    let id = Uuid::new_v4();
    NewAttachment {
        id,
        owner_id: owner,
        note_id,
        file_name: format!("{}.pdf", id),
        file_path: format!("{}/{}.pdf", owner, id),
        file_size: 2 * 1024 * 1024,
        file_type: FileType::Pdf,
        metadata: AttachmentMetadata {
            original_name: "report.pdf".into(),
            uploaded_by: owner,
            uploaded_at: Utc::now(),
        },
        status,
    }
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a migrated database
async fn test_note_insert_fetch_update_is_owner_scoped() {
    let mut db = TestDatabase::new().await;
    let alice = db.create_user().await;
    let bob = db.create_user().await;

    let note = db
        .notes
        .insert(
            alice,
            CreateNoteRequest {
                title: "  Meeting notes ".into(),
                content: "<p>agenda</p>".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(note.title, "Meeting notes");
    assert_eq!(note.owner_id, alice);

    assert!(matches!(
        db.notes.fetch(bob, note.id).await,
        Err(Error::NoteNotFound(_))
    ));

    let updated = db
        .notes
        .update(
            alice,
            note.id,
            UpdateNoteRequest {
                archived: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.archived);
    assert_eq!(updated.content, "<p>agenda</p>");

    let archived = db
        .notes
        .list(
            alice,
            ListNotesRequest {
                archived: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);

    db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a migrated database
async fn test_empty_title_never_reaches_database() {
    let mut db = TestDatabase::new().await;
    let alice = db.create_user().await;

    let err = db
        .notes
        .insert(
            alice,
            CreateNoteRequest {
                title: "   ".into(),
                content: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Please add a title");

    db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a migrated database
async fn test_attachment_round_trip_preserves_type_and_size() {
    let mut db = TestDatabase::new().await;
    let alice = db.create_user().await;

    let row = db
        .attachments
        .insert(new_attachment(alice, None, AttachmentStatus::Committed))
        .await
        .unwrap();
    assert_eq!(row.file_type, FileType::Pdf);
    assert_eq!(row.file_size, 2_097_152);

    let fetched = db.attachments.get(alice, row.id).await.unwrap();
    assert_eq!(fetched.metadata.original_name, "report.pdf");
    assert!(fetched.file_path.starts_with(&alice.to_string()));

    let deleted = db.attachments.delete(alice, row.id).await.unwrap();
    assert_eq!(deleted.id, row.id);
    assert!(db.attachments.get(alice, row.id).await.is_err());

    db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a migrated database
async fn test_pending_rows_commit_and_reconcile() {
    let mut db = TestDatabase::new().await;
    let alice = db.create_user().await;

    let pending = db
        .attachments
        .insert(new_attachment(alice, None, AttachmentStatus::Pending))
        .await
        .unwrap();
    assert!(db.attachments.get(alice, pending.id).await.is_err());

    let stale = db
        .attachments
        .list_stale_pending(Utc::now() + Duration::seconds(1))
        .await
        .unwrap();
    assert!(stale.iter().any(|a| a.id == pending.id));

    db.attachments.mark_committed(pending.id).await.unwrap();
    assert!(db.attachments.get(alice, pending.id).await.is_ok());
    assert!(db.attachments.mark_committed(pending.id).await.is_err());

    db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a migrated database
async fn test_tags_unique_per_owner_case_insensitive() {
    let mut db = TestDatabase::new().await;
    let alice = db.create_user().await;
    let bob = db.create_user().await;

    let req = |name: &str| CreateTagRequest {
        name: name.into(),
        color: Some("#3B82F6".into()),
    };
    let tag = db.tags.create(alice, req("Ideas")).await.unwrap();
    assert!(matches!(
        db.tags.create(alice, req("ideas")).await,
        Err(Error::Conflict(_))
    ));
    // Another owner may reuse the name.
    db.tags.create(bob, req("ideas")).await.unwrap();

    let note = db
        .notes
        .insert(
            alice,
            CreateNoteRequest {
                title: "Tagged".into(),
                content: String::new(),
            },
        )
        .await
        .unwrap();
    db.tags.add_to_note(alice, note.id, tag.id).await.unwrap();
    db.tags.add_to_note(alice, note.id, tag.id).await.unwrap();
    assert_eq!(db.tags.list_for_note(alice, note.id).await.unwrap().len(), 1);
    assert!(db.tags.add_to_note(bob, note.id, tag.id).await.is_err());

    db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a migrated database
async fn test_account_sign_up_sign_in_resolve() {
    let mut db = TestDatabase::new().await;
    let email = format!("user-{}@example.test", Uuid::new_v4());
    let creds = Credentials {
        email: email.to_uppercase(),
        password: "correct horse battery".into(),
    };

    let identity = db.accounts.sign_up(&creds).await.unwrap();
    db.track_user(identity.user_id);
    assert_eq!(identity.email, email);
    assert!(db.accounts.sign_up(&creds).await.unwrap_err().is_unique_violation());

    let session = db.accounts.sign_in(&creds).await.unwrap();
    assert_eq!(
        db.accounts.resolve(&session.token).await.unwrap(),
        Some(identity)
    );

    let wrong = Credentials {
        email,
        password: "wrong password".into(),
    };
    assert!(matches!(
        db.accounts.sign_in(&wrong).await,
        Err(Error::Unauthorized(_))
    ));

    assert!(db.accounts.sign_out(&session.token).await.unwrap());
    assert_eq!(db.accounts.resolve(&session.token).await.unwrap(), None);

    db.cleanup().await;
}
