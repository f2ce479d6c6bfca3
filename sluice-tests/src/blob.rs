use sluice::{Indicator, Session, into, use_};

pub fn blob(session: &mut Session) {
    session
        .once("drop table if exists sluice_blob")
        .run()
        .expect("Failed to drop the sluice_blob table");
    session
        .once("create table sluice_blob (id integer, data blob)")
        .run()
        .expect("Failed to create the sluice_blob table");

    let mut blob = session.make_blob().expect("Could not create a blob");
    assert!(blob.is_empty().expect("Blob length"));
    blob.write(0, b"hello").expect("Failed to write the blob");
    blob.append(b" world").expect("Failed to append to the blob");
    blob.write(0, b"H").expect("Failed to overwrite the blob");
    assert_eq!(blob.len().expect("Blob length"), 11);
    let id = 1i32;
    session
        .once("insert into sluice_blob (id, data) values (:id, :data)")
        .exchange(use_(&id))
        .exchange(use_(&blob))
        .run()
        .expect("Failed to insert the blob");

    let mut fetched = session.make_blob().expect("Could not create a blob");
    let mut indicator = Indicator::Null;
    let got_data = session
        .once("select data from sluice_blob where id = :id")
        .exchange(into(&mut fetched).indicator(&mut indicator))
        .exchange(use_(&id))
        .run()
        .expect("Failed to select the blob");
    assert!(got_data);
    assert_eq!(indicator, Indicator::Ok);
    assert_eq!(
        fetched.read_all().expect("Failed to read the blob"),
        b"Hello world"
    );
    let mut buffer = [0u8; 5];
    assert_eq!(fetched.read(6, &mut buffer).expect("Partial read"), 5);
    assert_eq!(&buffer, b"world");
    fetched.trim(5).expect("Failed to trim the blob");
    assert_eq!(fetched.read_all().expect("Failed to read the blob"), b"Hello");

    // Binary content that is not valid text
    let binary = {
        let mut blob = session.make_blob().expect("Could not create a blob");
        blob.append(&[0, 159, 146, 150, 255])
            .expect("Failed to append to the blob");
        blob
    };
    let id = 2i32;
    session
        .once("insert into sluice_blob (id, data) values (:id, :data)")
        .exchange(use_(&id))
        .exchange(use_(&binary))
        .run()
        .expect("Failed to insert binary data");
    session
        .once("select data from sluice_blob where id = :id")
        .exchange(into(&mut fetched))
        .exchange(use_(&id))
        .run()
        .expect("Failed to select binary data");
    assert_eq!(
        fetched.read_all().expect("Failed to read the blob"),
        [0u8, 159, 146, 150, 255]
    );

    session
        .once("drop table sluice_blob")
        .run()
        .expect("Failed to drop the sluice_blob table");
}
