//! Update source behavior observed through the in-memory broker

use std::sync::Arc;

use bytes::Bytes;

use f1_publisher::feed::{ButtonMap, CarButton, ControlAxis, DeviceProfile};
use f1_publisher::source::SourceState;
use f1_publisher::stats::MetricKind;
use f1_publisher::testing::MockBroker;
use f1_publisher::topic::{FREQUENCY_FIELD, SLEEP_DURATION_FIELD};
use f1_publisher::{Publisher, PublisherConfig, TopicPath};

fn topic(relative: &str) -> TopicPath {
    TopicPath::new(format!("F1Publisher/{}", relative)).unwrap()
}

fn connected() -> (Publisher, MockBroker) {
    let publisher = Publisher::new(PublisherConfig::default());
    let broker = MockBroker::auto();
    publisher.on_connected(Arc::new(broker.clone())).unwrap();
    (publisher, broker)
}

fn button_states(broker: &MockBroker) -> Vec<String> {
    broker
        .latest(&topic("Buttons/States"))
        .unwrap()
        .as_record()
        .unwrap()
        .values()
        .to_vec()
}

#[test]
fn test_initial_content_on_activation() {
    let (publisher, broker) = connected();
    let controls = &publisher.collaborators().controls;
    controls.set_axis(ControlAxis::Steering, -0.35);

    assert_eq!(broker.activate_all(), 13);

    assert_eq!(broker.push_count(), 13);
    assert_eq!(
        broker.latest(&topic("Steering")).unwrap().as_scalar(),
        Some("-0.35")
    );
    assert_eq!(
        broker.latest(&topic("Braking")).unwrap().as_scalar(),
        Some("0.0")
    );
    assert_eq!(
        broker.latest(&topic("Gear")).unwrap().as_scalar(),
        Some("1")
    );

    let names = broker.latest(&topic("Buttons/Names")).unwrap();
    let names = names.as_record().unwrap();
    assert_eq!(names.get("0"), Some("RightQuadLeft"));
    assert_eq!(names.get("12"), Some("Home"));
}

#[test]
fn test_button_record_tracks_single_changes() {
    let (publisher, broker) = connected();
    let controls = &publisher.collaborators().controls;
    controls.set_button(CarButton::RightQuadRight, true);
    controls.set_button(CarButton::TopRight1, true);

    broker.activate(&topic("Buttons/States"));

    let mut expected = vec!["0".to_string(); 13];
    expected[2] = "1".into();
    expected[7] = "1".into();
    assert_eq!(button_states(&broker), expected);

    controls.set_button(CarButton::ShiftUp, true);

    expected[5] = "1".into();
    assert_eq!(button_states(&broker), expected);
    assert_eq!(broker.pushes_for(&topic("Buttons/States")).len(), 2);
}

#[test]
fn test_gear_follows_shift_buttons() {
    let (publisher, broker) = connected();
    broker.activate(&topic("Gear"));
    let controls = &publisher.collaborators().controls;

    controls.set_button(CarButton::ShiftUp, true);
    controls.set_button(CarButton::ShiftUp, false);
    controls.set_button(CarButton::ShiftUp, true);

    let gears: Vec<_> = broker
        .pushes_for(&topic("Gear"))
        .iter()
        .map(|c| c.as_scalar().unwrap().to_string())
        .collect();
    assert_eq!(gears, vec!["1", "2", "3"]);
}

#[test]
fn test_refresh_buttons_update_interval_record() {
    let (publisher, broker) = connected();
    broker.activate(&topic("RefreshInterval"));
    let controls = &publisher.collaborators().controls;

    controls.set_button(CarButton::ST, true);

    let latest = broker.latest(&topic("RefreshInterval")).unwrap();
    let record = latest.as_record().unwrap();
    assert_eq!(record.get(FREQUENCY_FIELD), Some("52"));
    assert_eq!(record.get(SLEEP_DURATION_FIELD), Some("19"));

    controls.set_button(CarButton::Home, true);

    let latest = broker.latest(&topic("RefreshInterval")).unwrap();
    assert_eq!(latest.as_record().unwrap().get(FREQUENCY_FIELD), Some("50"));
}

#[test]
fn test_raw_device_buttons_reach_broker() {
    let (publisher, broker) = connected();
    broker.activate(&topic("Buttons/States"));
    let controls = &publisher.collaborators().controls;
    let map = ButtonMap::new(DeviceProfile::Joystick, 4).unwrap();

    controls.apply_raw_buttons(&map, &[false; 4]).unwrap();
    let changed = controls
        .apply_raw_buttons(&map, &[false, false, true, false])
        .unwrap();

    assert_eq!(changed, 1);
    assert_eq!(button_states(&broker)[CarButton::Home.index()], "1");
}

#[test]
fn test_no_pushes_without_authority() {
    let (publisher, broker) = connected();
    let controls = &publisher.collaborators().controls;

    controls.set_axis(ControlAxis::Braking, 0.5);
    assert_eq!(broker.push_count(), 0);

    broker.activate(&topic("Braking"));
    broker.standby(&topic("Braking"));
    controls.set_axis(ControlAxis::Braking, 0.75);

    let pushes = broker.pushes_for(&topic("Braking"));
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].as_scalar(), Some("0.5"));
}

#[test]
fn test_reactivation_pushes_current_value() {
    let (publisher, broker) = connected();
    let controls = &publisher.collaborators().controls;
    let path = topic("Acceleration");

    broker.activate(&path);
    broker.standby(&path);
    controls.set_axis(ControlAxis::Acceleration, 1.0);
    broker.activate(&path);

    let pushes = broker.pushes_for(&path);
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[1].as_scalar(), Some("1.0"));
}

#[test]
fn test_standby_then_close_releases_once() {
    let (publisher, broker) = connected();
    let controls = &publisher.collaborators().controls;
    let path = topic("Buttons/States");
    let baseline = controls.button_changes().listener_count();

    broker.activate(&path);
    assert_eq!(controls.button_changes().listener_count(), baseline + 1);

    broker.standby(&path);
    broker.close(&path);
    broker.close(&path);
    assert_eq!(controls.button_changes().listener_count(), baseline);

    let provisioner = publisher.provisioner().unwrap();
    let source = provisioner
        .sources()
        .into_iter()
        .find(|s| *s.path() == path)
        .unwrap();
    assert_eq!(source.state(), SourceState::Closed);

    // Closed is terminal
    broker.activate(&path);
    assert_eq!(source.state(), SourceState::Closed);
    assert_eq!(source.activations(), 1);
}

#[test]
fn test_refused_pushes_counted_as_failures() {
    let (publisher, broker) = connected();
    broker.activate(&topic("Steering"));
    let metrics = &publisher.collaborators().metrics;
    let successes = metrics.value(MetricKind::CountOfSuccessfulTopicSourceUpdates);

    broker.set_refuse_pushes(true);
    publisher
        .collaborators()
        .controls
        .set_axis(ControlAxis::Steering, 0.2);

    assert_eq!(successes, 1);
    assert_eq!(
        metrics.value(MetricKind::CountOfSuccessfulTopicSourceUpdates),
        1
    );
    assert_eq!(
        metrics.value(MetricKind::CountOfFailedTopicSourceUpdates),
        1
    );
    assert_eq!(publisher.acks().unwrap().failed(), 1);
}

#[test]
fn test_failed_acks_counted() {
    let (publisher, broker) = connected();
    broker.set_fail_acks(true);
    broker.activate(&topic("Gear"));

    let acks = publisher.acks().unwrap();
    assert_eq!(acks.succeeded(), 0);
    assert_eq!(acks.failed(), 1);
    assert_eq!(broker.pushes_for(&topic("Gear")).len(), 1);
}

#[test]
fn test_metric_topics_follow_updates() {
    let (publisher, broker) = connected();
    let path = topic("Metrics/CountOfUpdates");
    broker.activate(&path);

    publisher.collaborators().metrics.update();
    publisher.collaborators().metrics.update();

    let values: Vec<_> = broker
        .pushes_for(&path)
        .iter()
        .map(|c| c.as_scalar().unwrap().to_string())
        .collect();
    assert_eq!(values, vec!["0", "1", "2"]);
}

#[test]
fn test_wire_payloads() {
    let (publisher, broker) = connected();
    publisher
        .collaborators()
        .controls
        .set_axis(ControlAxis::Steering, 0.7);
    broker.activate(&topic("Steering"));
    broker.activate(&topic("RefreshInterval"));

    assert_eq!(
        broker.payloads_for(&topic("Steering")),
        vec![Bytes::from_static(b"0.7")]
    );
    assert_eq!(
        broker.payloads_for(&topic("RefreshInterval")),
        vec![Bytes::from_static(b"50\x0220")]
    );
}
