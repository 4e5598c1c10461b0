#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Barrier};
use std::thread;

use fiorunner_agent::job::JobAdmission;
use fiorunner_core::job::JobState;

#[test]
fn concurrent_admission_admits_exactly_one() {
    const N: usize = 32;
    let admission = Arc::new(JobAdmission::new());
    let barrier = Arc::new(Barrier::new(N));

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let admission = Arc::clone(&admission);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                admission.try_admit()
            })
        })
        .collect();

    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(admitted, 1);
    assert_eq!(admission.state(), JobState::Validating);
    assert_eq!(admission.admitted_runs(), 1);
}

#[test]
fn lifecycle_transitions() {
    let admission = JobAdmission::new();
    assert_eq!(admission.state(), JobState::Idle);

    assert!(admission.try_admit());
    assert!(!admission.try_admit());

    admission.mark_running();
    assert_eq!(admission.state(), JobState::Running);
    assert!(!admission.try_admit());

    admission.finish(false);
    assert_eq!(admission.state(), JobState::Failed);
    assert!(!admission.try_admit(), "node is busy until released");

    admission.release();
    assert_eq!(admission.state(), JobState::Idle);
    assert!(admission.try_admit());
}

#[test]
#[should_panic]
fn release_while_idle_panics() {
    JobAdmission::new().release();
}

#[test]
#[should_panic]
fn mark_running_without_admission_panics() {
    JobAdmission::new().mark_running();
}

#[test]
fn dropped_permit_releases_once() {
    let admission = Arc::new(JobAdmission::new());

    let permit = admission.admit().expect("idle node admits");
    assert!(admission.admit().is_none());
    drop(permit);

    assert_eq!(admission.state(), JobState::Idle);
    assert_eq!(admission.released_runs(), 1);
}

#[test]
fn finished_permit_releases_once() {
    let admission = Arc::new(JobAdmission::new());

    let permit = admission.admit().unwrap();
    permit.mark_running();
    permit.finish(true);

    assert_eq!(admission.state(), JobState::Idle);
    assert_eq!(admission.admitted_runs(), 1);
    assert_eq!(admission.released_runs(), 1);
}

#[test]
fn permit_released_when_holder_panics() {
    let admission = Arc::new(JobAdmission::new());
    let a = Arc::clone(&admission);

    let res = thread::spawn(move || {
        let permit = a.admit().unwrap();
        permit.mark_running();
        panic!("runner task died");
    })
    .join();

    assert!(res.is_err());
    assert_eq!(admission.state(), JobState::Idle);
    assert_eq!(admission.released_runs(), 1);
}
