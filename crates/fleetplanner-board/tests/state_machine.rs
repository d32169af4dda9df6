use fleetplanner_board::Board;
use fleetplanner_core::dag::Dag;
use fleetplanner_core::task::{Task, TaskEvent, TaskState};
use pretty_assertions::assert_eq;

fn two_task_dag() -> Dag {
    let mut dag = Dag::new("mission");
    let a = dag.add_task(Task::new("a", "a"));
    let b = dag.add_task(Task::new("b", "b"));
    dag.set_downstream(&a, &b).unwrap();
    dag
}

#[test]
fn invariant_4_every_legal_transition_reaches_its_target() {
    let board = Board::new();
    board.execute(two_task_dag());
    let id = "mission/a".to_string();

    let steps = [
        (TaskEvent::Plan, TaskState::Planned),
        (TaskEvent::Accept, TaskState::Queued),
        (TaskEvent::Start, TaskState::Running),
        (TaskEvent::Completed, TaskState::Completed),
    ];
    for (event, expected) in steps {
        board.event_input(&id, event);
        assert_eq!(board.task_by_id(&id).unwrap().0.state, expected);
    }
}

#[test]
fn invariant_4_failure_and_resolution_cycle() {
    let board = Board::new();
    board.execute(two_task_dag());
    let id = "mission/a".to_string();

    board.event_input(&id, TaskEvent::Plan);
    board.event_input(&id, TaskEvent::Accept);
    board.event_input(&id, TaskEvent::Start);
    board.event_input(&id, TaskEvent::Error);
    assert_eq!(board.task_by_id(&id).unwrap().0.state, TaskState::Failure);

    board.event_input(&id, TaskEvent::Resolved);
    assert_eq!(board.task_by_id(&id).unwrap().0.state, TaskState::Planned);
}

#[test]
fn invariant_5_cascading_enablement_fires_exactly_on_completion() {
    let board = Board::new();
    board.execute(two_task_dag());
    let a = "mission/a".to_string();
    let b = "mission/b".to_string();

    board.event_input(&a, TaskEvent::Plan);
    board.event_input(&a, TaskEvent::Accept);
    board.event_input(&a, TaskEvent::Start);
    assert_eq!(board.task_by_id(&b).unwrap().0.state, TaskState::Undefined);

    board.event_input(&a, TaskEvent::Completed);
    assert_eq!(board.task_by_id(&b).unwrap().0.state, TaskState::Available);
}
