//! Integration tests for the database object model.

use kdbx::crypto::Credentials;
use kdbx::format::{Compression, KdbxFormat, KdbxHeader};
use kdbx::model::entry::{NOTES, PASSWORD, TITLE, URL, USERNAME};
use kdbx::model::{Database, Entry, FieldValue, Meta, ProtectedValue};
use kdbx::xml;
use kdbx::KdbxError;

fn format() -> KdbxFormat {
    KdbxFormat::default()
}

fn quick_db(name: &str) -> Database {
    let mut db = Database::create(Credentials::from_password(b"pw"), name);
    db.header_mut().transform_rounds = 5;
    db
}

fn entry(title: &str, user: &str, password: &str) -> Entry {
    let mut e = Entry::new(title);
    e.set_field(USERNAME, user);
    e.set_field(PASSWORD, password);
    e
}

#[test]
fn new_database_has_metadata_and_no_entries() {
    let db = quick_db("Personal");
    assert_eq!(db.meta().database_name.as_deref(), Some("Personal"));
    assert_eq!(db.document().root.name, "KeePassFile");
    assert!(db.entries().is_empty());
    assert_eq!(db.header().compression, Compression::GZip);
}

#[test]
fn entries_survive_save_and_load() {
    let mut db = quick_db("Personal");
    db.upsert_entry(&entry("bank", "alice", "1234")).unwrap();
    let mut site = entry("forum", "al", "pass word");
    site.set_field(URL, "https://forum.example");
    site.set_field(NOTES, "line one\nline two");
    db.upsert_entry(&site).unwrap();

    let bytes = format().save(&mut db).unwrap();
    let loaded = format()
        .load(Credentials::from_password(b"pw"), &bytes)
        .unwrap();

    assert_eq!(loaded.entries(), db.entries());
    let forum = loaded.find_entry("forum").unwrap();
    assert_eq!(forum.field(NOTES).unwrap().reveal().as_str(), "line one\nline two");
    assert_eq!(forum.field(PASSWORD).unwrap().reveal().as_str(), "pass word");
}

#[test]
fn upsert_replaces_by_title() {
    let mut db = quick_db("Personal");
    db.upsert_entry(&entry("bank", "alice", "old")).unwrap();
    db.upsert_entry(&entry("bank", "alice", "new")).unwrap();

    let all = db.entries();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].field(PASSWORD).unwrap().reveal().as_str(), "new");
}

#[test]
fn remove_entry_then_missing() {
    let mut db = quick_db("Personal");
    db.upsert_entry(&entry("bank", "alice", "1234")).unwrap();
    db.remove_entry("bank").unwrap();
    assert!(matches!(
        db.remove_entry("bank"),
        Err(KdbxError::EntryNotFound(_))
    ));
}

#[test]
fn password_field_is_always_protected() {
    let e = entry("bank", "alice", "1234");
    assert!(matches!(e.field(PASSWORD), Some(FieldValue::Protected(_))));
    assert!(matches!(e.field(USERNAME), Some(FieldValue::Plain(_))));
    assert_eq!(e.title(), "bank");
    assert!(e.field(TITLE).is_some());
}

#[test]
fn unknown_elements_are_preserved() {
    let text = r#"<KeePassFile>
    <Meta><DatabaseName>Imported</DatabaseName><Custom>keep me</Custom></Meta>
    <Root>
        <Group>
            <Name>Root</Name>
            <Entry>
                <UUID>AAAAAAAAAAAAAAAAAAAAAA==</UUID>
                <String><Key>Title</Key><Value>mail</Value></String>
                <String><Key>Password</Key><Value ProtectInMemory="True">pw1</Value></String>
                <Times><Created>2020-01-01T00:00:00Z</Created></Times>
            </Entry>
        </Group>
        <DeletedObjects/>
    </Root>
</KeePassFile>"#;
    let mut db = format()
        .load_xml(Credentials::from_password(b"pw"), text)
        .unwrap();
    db.header_mut().transform_rounds = 5;
    assert_eq!(db.meta().database_name.as_deref(), Some("Imported"));

    let bytes = format().save(&mut db).unwrap();
    let loaded = format()
        .load(Credentials::from_password(b"pw"), &bytes)
        .unwrap();

    let meta = loaded.document().root.child("Meta").unwrap();
    assert_eq!(meta.child("Custom").unwrap().text(), "keep me");
    let entry = loaded.find_entry("mail").unwrap();
    assert_eq!(entry.uuid, "AAAAAAAAAAAAAAAAAAAAAA==");
    assert_eq!(entry.field(PASSWORD).unwrap().reveal().as_str(), "pw1");
    assert!(loaded
        .document()
        .root
        .child("Root")
        .unwrap()
        .child("DeletedObjects")
        .is_some());
}

#[test]
fn meta_roundtrips_through_the_document() {
    let mut doc = xml::parse("<KeePassFile/>").unwrap();
    let meta = Meta {
        generator: None,
        database_name: Some("Work".into()),
        header_hash: Some(vec![0xAB; 32]),
    };
    meta.build_xml(&mut doc);

    let read = Meta::load_from_xml(&doc).unwrap();
    assert_eq!(read.database_name, meta.database_name);
    assert_eq!(read.header_hash, meta.header_hash);
    assert!(read.generator.is_some());
}

#[test]
fn protected_value_resalting_keeps_text() {
    let mut pv = ProtectedValue::from_text("value");
    let masked_before = pv.to_base64();
    pv.set_salt(vec![0xFF; 5]);
    assert_ne!(pv.to_base64(), masked_before);
    assert_eq!(pv.text(), "value");
}

#[test]
fn from_document_reads_existing_meta() {
    let doc = xml::parse(
        "<KeePassFile><Meta><DatabaseName>Old</DatabaseName></Meta><Root/></KeePassFile>",
    )
    .unwrap();
    let db = Database::from_document(Credentials::from_password(b"pw"), KdbxHeader::create(), doc)
        .unwrap();
    assert_eq!(db.meta().database_name.as_deref(), Some("Old"));
    assert!(db.entries().is_empty());
}

#[test]
fn entry_in_empty_root_creates_a_group() {
    let doc = xml::parse("<KeePassFile><Root/></KeePassFile>").unwrap();
    let mut db =
        Database::from_document(Credentials::from_password(b"pw"), KdbxHeader::create(), doc)
            .unwrap();
    db.upsert_entry(&entry("first", "me", "pw")).unwrap();

    let root = db.document().root.child("Root").unwrap();
    assert!(root.child("Group").unwrap().child("Entry").is_some());
    assert_eq!(db.entries().len(), 1);
}

#[test]
fn editing_an_entry_keeps_times_and_history() {
    let text = r#"<KeePassFile>
    <Meta><DatabaseName>Imported</DatabaseName></Meta>
    <Root>
        <Group>
            <Name>Root</Name>
            <Entry>
                <UUID>AAAAAAAAAAAAAAAAAAAAAA==</UUID>
                <IconID>7</IconID>
                <String><Key>Title</Key><Value>mail</Value></String>
                <String><Key>Password</Key><Value ProtectInMemory="True">pw1</Value></String>
                <Times><Created>2020-01-01T00:00:00Z</Created></Times>
                <History>
                    <Entry>
                        <UUID>AAAAAAAAAAAAAAAAAAAAAA==</UUID>
                        <String><Key>Title</Key><Value>mail</Value></String>
                        <String><Key>Password</Key><Value ProtectInMemory="True">pw0</Value></String>
                    </Entry>
                </History>
            </Entry>
        </Group>
    </Root>
</KeePassFile>"#;
    let mut db = format()
        .load_xml(Credentials::from_password(b"pw"), text)
        .unwrap();
    db.header_mut().transform_rounds = 5;

    let mut mail = db.find_entry("mail").unwrap();
    mail.set_field(URL, "https://mail.example");
    mail.set_field(PASSWORD, "pw2");
    db.upsert_entry(&mail).unwrap();

    let bytes = format().save(&mut db).unwrap();
    let loaded = format()
        .load(Credentials::from_password(b"pw"), &bytes)
        .unwrap();
    let exported = format().save_xml(&mut db).unwrap();

    let entry_el = loaded
        .document()
        .root
        .child("Root")
        .and_then(|r| r.child("Group"))
        .and_then(|g| g.child("Entry"))
        .unwrap();
    assert_eq!(entry_el.child("IconID").unwrap().text(), "7");
    assert!(entry_el.child("Times").and_then(|t| t.child("Created")).is_some());
    let history = entry_el.child("History").unwrap();
    assert_eq!(history.elements().count(), 1);
    assert!(exported.contains("pw0"));

    assert_eq!(loaded.entries().len(), 1);
    let edited = loaded.find_entry("mail").unwrap();
    assert_eq!(edited.uuid, "AAAAAAAAAAAAAAAAAAAAAA==");
    assert_eq!(edited.field(URL).unwrap().reveal().as_str(), "https://mail.example");
    assert_eq!(edited.field(PASSWORD).unwrap().reveal().as_str(), "pw2");
}
