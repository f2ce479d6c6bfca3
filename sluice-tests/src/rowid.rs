use sluice::{Session, into, use_};

pub fn rowid(session: &mut Session) {
    session
        .once("drop table if exists sluice_rowid")
        .run()
        .expect("Failed to drop the sluice_rowid table");
    session
        .once("create table sluice_rowid (name varchar(10))")
        .run()
        .expect("Failed to create the sluice_rowid table");
    let names = vec![String::from("a"), String::from("b"), String::from("c")];
    session
        .once("insert into sluice_rowid (name) values (:name)")
        .exchange(use_(&names))
        .run()
        .expect("Failed to insert in sluice_rowid");

    let mut rowid = session.make_rowid().expect("Could not create a row id");
    let got_data = session
        .once("select rowid from sluice_rowid where name = 'b'")
        .exchange(into(&mut rowid))
        .run()
        .expect("Failed to select the row id");
    assert!(got_data);

    let mut name = String::new();
    let got_data = session
        .once("select name from sluice_rowid where rowid = :id")
        .exchange(into(&mut name))
        .exchange(use_(&rowid))
        .run()
        .expect("Failed to select by row id");
    assert!(got_data);
    assert_eq!(name, "b");

    session
        .once("drop table sluice_rowid")
        .run()
        .expect("Failed to drop the sluice_rowid table");
}
