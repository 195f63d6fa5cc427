//! End-to-end tests over the service surface: a clinic day from room
//! selection through registration, reassignment and completion.

use chrono::{DateTime, TimeZone, Utc};
use opd_core::{
    ClinicCore, ClinicError, PatientRecord, PatientType, QueueFilters, Role, Room, Viewer,
};

/// Clinic-local 2024-03-11 HH:MM as a UTC instant (UTC+05:30).
fn ist(h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap() + chrono::Duration::minutes((h * 60 + mi) as i64)
        - chrono::Duration::minutes(5 * 60 + 30)
}

fn setup_clinic() -> ClinicCore {
    let core = ClinicCore::open_in_memory().unwrap();
    for n in 1..=5 {
        core.upsert_room(Role::Admin, &Room::new(format!("Room {}", n)))
            .unwrap();
    }
    core
}

fn doctor_viewer(id: &str, name: &str) -> Viewer {
    Viewer {
        user_id: id.into(),
        user_name: name.into(),
        role: Role::SeniorDoctor,
    }
}

fn register(core: &ClinicCore, name: &str, room: &str, now: DateTime<Utc>) -> PatientRecord {
    let patient = PatientRecord::new_at(name, PatientType::Adult, now.to_rfc3339());
    core.register_patient(patient, Some(room), now).unwrap()
}

#[test]
fn test_full_day_scenario() {
    // Room 1 is empty. Doctor A takes it at 09:00.
    let core = setup_clinic();
    core.select_room("A", "Dr. A", "Room 1", ist(9, 0)).unwrap();

    // Doctor B tries the same room at 09:05 and is told who holds it.
    let err = core.select_room("B", "Dr. B", "Room 1", ist(9, 5)).unwrap_err();
    match err {
        ClinicError::RoomAlreadyAssigned { room, occupied_by } => {
            assert_eq!(room, "Room 1");
            assert_eq!(occupied_by, "Dr. A");
        }
        other => panic!("expected RoomAlreadyAssigned, got {:?}", other),
    }

    // Patient X registers into Room 1 at 09:10.
    let x = register(&core, "X", "Room 1", ist(9, 10));

    // Doctor A sees X; Doctor B does not.
    let queue_a = core
        .todays_queue(&doctor_viewer("A", "Dr. A"), &QueueFilters::default(), ist(9, 30))
        .unwrap();
    assert_eq!(queue_a.patients.len(), 1);
    assert_eq!(queue_a.patients[0].id, x.id);

    let queue_b = core
        .todays_queue(&doctor_viewer("B", "Dr. B"), &QueueFilters::default(), ist(9, 30))
        .unwrap();
    assert!(queue_b.patients.is_empty());

    // Admin moves Doctor A to Room 2; X follows.
    let moved = core
        .change_doctor_room(Role::Admin, "A", "Dr. A", "Room 2", ist(10, 0))
        .unwrap();
    assert_eq!(moved, 1);

    let queue_a = core
        .todays_queue(&doctor_viewer("A", "Dr. A"), &QueueFilters::default(), ist(10, 30))
        .unwrap();
    assert_eq!(queue_a.patients[0].assigned_room, Some("Room 2".into()));

    // Room 1 is available again; Doctor B can take it now.
    let view = core.available_rooms(Some("B"), ist(10, 30)).unwrap();
    assert!(view.rooms.iter().any(|r| r.room_number == "Room 1"));
    core.select_room("B", "Dr. B", "Room 1", ist(10, 35)).unwrap();
}

#[test]
fn test_day_boundary_resets_occupancy() {
    let core = setup_clinic();

    // Doctor A selects at 23:59:59 clinic-local
    let late = ist(23, 59) + chrono::Duration::seconds(59);
    core.select_room("A", "Dr. A", "Room 1", late).unwrap();

    // 00:00:01 the next clinic day: the room reads free and a different
    // doctor's selection succeeds
    let next_day = late + chrono::Duration::seconds(2);
    let view = core.available_rooms(None, next_day).unwrap();
    assert!(view.occupied_rooms.is_empty());
    assert!(view.rooms.iter().any(|r| r.room_number == "Room 1"));

    core.select_room("B", "Dr. B", "Room 1", next_day).unwrap();
    let view = core.available_rooms(None, next_day).unwrap();
    assert_eq!(view.occupied_rooms["Room 1"].doctor_id, "B");

    // Doctor A is prompted to re-select: my-room reads None
    assert!(core.my_room("A", next_day).unwrap().is_none());
}

#[test]
fn test_completion_is_terminal_for_the_day() {
    let core = setup_clinic();
    core.select_room("A", "Dr. A", "Room 1", ist(9, 0)).unwrap();
    let x = register(&core, "X", "Room 1", ist(9, 10));

    core.mark_visit_completed(&x.id, ist(11, 0)).unwrap();

    // Absent from every view for the rest of the day, even after another
    // field update (a room move) touches the record
    core.change_patient_room(&x.id, "Room 2", ist(11, 30)).unwrap();

    let admin = Viewer {
        user_id: "adm".into(),
        user_name: "Admin".into(),
        role: Role::Admin,
    };
    let queue = core
        .todays_queue(&admin, &QueueFilters::default(), ist(12, 0))
        .unwrap();
    assert!(queue.patients.is_empty());

    // Still counted as today's footfall
    assert_eq!(queue.counts.total, 1);
}

#[test]
fn test_same_day_readd_does_not_revive_completed_visit() {
    let core = setup_clinic();
    core.select_room("A", "Dr. A", "Room 1", ist(9, 0)).unwrap();
    let x = register(&core, "X", "Room 1", ist(9, 0));

    core.mark_visit_completed(&x.id, ist(10, 0)).unwrap();

    // Staff re-add the completed patient later the same day; the room
    // moves but the visit stays done
    core.add_patient_to_today(&x.id, "Room 2", ist(11, 0)).unwrap();

    let admin = Viewer {
        user_id: "adm".into(),
        user_name: "Admin".into(),
        role: Role::Admin,
    };
    let queue = core
        .todays_queue(&admin, &QueueFilters::default(), ist(12, 0))
        .unwrap();
    assert!(queue.patients.is_empty());
    assert_eq!(queue.counts.total, 1);

    let x = core.get_patient(&x.id).unwrap().unwrap();
    assert_eq!(x.assigned_room, Some("Room 2".into()));

    // The next clinic day the re-add starts a fresh pending visit
    let tomorrow = ist(9, 0) + chrono::Duration::days(1);
    core.add_patient_to_today(&x.id, "Room 2", tomorrow).unwrap();
    let queue = core
        .todays_queue(&admin, &QueueFilters::default(), tomorrow)
        .unwrap();
    assert_eq!(queue.patients.len(), 1);
}

#[test]
fn test_completion_without_todays_visit() {
    let core = setup_clinic();

    let err = core.mark_visit_completed("missing", ist(9, 0)).unwrap_err();
    assert!(matches!(err, ClinicError::NoActiveVisit(_)));

    // Registered yesterday, nothing today
    let yesterday = ist(9, 0) - chrono::Duration::days(1);
    let old = register(&core, "Old", "Room 1", yesterday);
    let err = core.mark_visit_completed(&old.id, ist(9, 0)).unwrap_err();
    assert!(matches!(err, ClinicError::NoActiveVisit(_)));
}

#[test]
fn test_returning_patient_rejoins_queue_next_day() {
    let core = setup_clinic();
    let yesterday = ist(9, 0) - chrono::Duration::days(1);
    let p = register(&core, "Returning", "Room 1", yesterday);
    core.mark_visit_completed(&p.id, yesterday).unwrap();

    let admin = Viewer {
        user_id: "adm".into(),
        user_name: "Admin".into(),
        role: Role::Admin,
    };

    // Not in today's queue on their own
    let queue = core.todays_queue(&admin, &QueueFilters::default(), ist(9, 0)).unwrap();
    assert!(queue.patients.is_empty());

    // Staff pull them back in; the visit starts fresh at pending
    core.add_patient_to_today(&p.id, "Room 3", ist(9, 15)).unwrap();
    let queue = core.todays_queue(&admin, &QueueFilters::default(), ist(9, 30)).unwrap();
    assert_eq!(queue.patients.len(), 1);
    assert_eq!(queue.patients[0].assigned_room, Some("Room 3".into()));
    assert_eq!(queue.counts.existing, 1);
    assert_eq!(queue.counts.new, 0);
}

#[test]
fn test_queue_fcfs_across_rooms() {
    let core = setup_clinic();
    core.select_room("A", "Dr. A", "Room 1", ist(8, 30)).unwrap();

    let p1 = register(&core, "First", "Room 1", ist(9, 0));
    let p2 = register(&core, "Second", "Room 1", ist(9, 5));
    let p3 = register(&core, "Third", "Room 1", ist(9, 10));

    let queue = core
        .todays_queue(&doctor_viewer("A", "Dr. A"), &QueueFilters::default(), ist(10, 0))
        .unwrap();
    let ids: Vec<&str> = queue.patients.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![p1.id.as_str(), p2.id.as_str(), p3.id.as_str()]);
    assert_eq!(queue.counts.new, 3);
}

#[test]
fn test_walk_in_visible_until_claimed_elsewhere() {
    let core = setup_clinic();
    core.select_room("A", "Dr. A", "Room 1", ist(9, 0)).unwrap();

    // Walk-in lands in Room 1 with no named doctor (the record came in
    // with the room already on it, bypassing the snapshot)
    let mut walk_in = PatientRecord::new_at("Walkin", PatientType::Child, ist(9, 5).to_rfc3339());
    walk_in.assigned_room = Some("Room 1".into());
    let walk_in = core.register_patient(walk_in, None, ist(9, 5)).unwrap();

    let queue = core
        .todays_queue(&doctor_viewer("A", "Dr. A"), &QueueFilters::default(), ist(9, 30))
        .unwrap();
    assert_eq!(queue.patients.len(), 1);
    assert_eq!(queue.patients[0].id, walk_in.id);
}
