//! End-to-end request scenarios against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use giot_common::LongLat;
use giot_protocol::{
    DataReply, DataReplyContainer, DataRequest, Interval, Operation, RegionSpecification,
    ReplyStatus, Statistics,
};
use query_engine::{CoverageConfig, EngineConfig, QueryEngine};
use sensor_store::MemorySensorStore;
use test_utils::{
    area, assert_approx_eq, assert_bins_eq, assert_position_approx_eq, fixed_sensor, lon_lat,
    moving_sensor, regular_samples, samples, ts, FailingStore, SlowStore, COVERAGE_YAML,
};

const NAN: f64 = f64::NAN;

fn coverage() -> CoverageConfig {
    serde_yaml::from_str(COVERAGE_YAML).unwrap()
}

fn uppsala_store() -> MemorySensorStore {
    let mut store = MemorySensorStore::new();

    store
        .insert_sensor(fixed_sensor("S1", "NO2", lon_lat(area::CATHEDRAL)))
        .unwrap();
    store.add_samples(
        "S1",
        samples(
            &[
                ("2012-04-23T01:10:00Z", 5.0),
                ("2012-04-23T01:45:00Z", 9.0),
                ("2012-04-23T03:20:00Z", 2.0),
                ("2019-12-31T23:50:00Z", 4.0),
            ],
            0.9,
        ),
    );

    store
        .insert_sensor(fixed_sensor("S2", "NO2", LongLat::new(17.64, 59.86)))
        .unwrap();
    store.add_samples("S2", samples(&[("2012-04-23T01:30:00Z", 11.0)], 0.8));

    store
        .insert_sensor(moving_sensor(
            "BUS",
            "NO2",
            &[
                ("2012-04-23T00:00:00Z", LongLat::new(17.62, 59.85)),
                ("2012-04-23T02:00:00Z", LongLat::new(17.66, 59.87)),
            ],
        ))
        .unwrap();
    store.add_samples(
        "BUS",
        samples(
            &[("2012-04-23T00:30:00Z", 20.0), ("2012-04-23T02:30:00Z", 30.0)],
            0.5,
        ),
    );

    store
        .insert_sensor(fixed_sensor("P1", "PM10", lon_lat(area::CATHEDRAL)))
        .unwrap();
    store.add_samples("P1", samples(&[("2012-04-23T01:00:00Z", 42.0)], 1.0));

    store
}

fn engine() -> QueryEngine {
    QueryEngine::with_store(
        EngineConfig::default(),
        coverage(),
        Arc::new(uppsala_store()),
    )
    .unwrap()
}

fn whole_area() -> RegionSpecification {
    RegionSpecification::sensors(lon_lat(area::SOUTH_WEST), lon_lat(area::NORTH_EAST))
}

fn request(region: RegionSpecification, stats: Statistics) -> DataRequest {
    DataRequest::new(region, "NO2")
        .with_time("2012-04-23T00:00:00Z", "2012-04-23T05:00:00Z")
        .with_statistics(stats)
}

fn assert_failed(reply: &DataReplyContainer, status: ReplyStatus) {
    assert_eq!(reply.status, status, "message: {}", reply.message);
    assert!(reply.replies.is_empty());
}

fn reply_for<'a>(container: &'a DataReplyContainer, id: &str) -> &'a DataReply {
    container
        .replies
        .iter()
        .find(|r| r.sensor().is_some_and(|s| s.unique_id == id))
        .unwrap_or_else(|| panic!("no reply for {}", id))
}

#[tokio::test]
async fn test_hourly_max_of_one_sensor() {
    let reply = engine()
        .handle(&request(
            RegionSpecification::sensor_id("S1"),
            Statistics::new(Interval::Hour, Operation::Max),
        ))
        .await;

    assert_eq!(reply.status, ReplyStatus::Success);
    assert_eq!(reply.message, "Success");
    assert_eq!(reply.replies.len(), 1);

    let r = &reply.replies[0];
    assert_eq!(r.kind(), "SensorDataReply");
    let mut expected = [NAN; 24];
    expected[1] = 9.0;
    expected[3] = 2.0;
    assert_bins_eq!(r.data(), expected);
    assert!(r.accuracy() > 0.0);
}

#[tokio::test]
async fn test_one_hour_window_gives_24_bins() {
    let req = DataRequest::new(RegionSpecification::sensor_id("S1"), "NO2")
        .with_time("2012-04-23T01:00:00Z", "2012-04-23T02:00:00Z")
        .with_statistics(Statistics::new(Interval::Hour, Operation::Mean));

    let reply = engine().handle(&req).await;
    let data = reply.replies[0].data();
    assert_eq!(data.len(), 24);
    assert_eq!(data.iter().filter(|v| v.is_nan()).count(), 23);
    assert_approx_eq!(data[1], 7.0, 1e-12);
}

/// One sensor at the cathedral reporting every half hour from 01:00.
fn on_the_hour_engine() -> QueryEngine {
    let mut store = MemorySensorStore::new();
    store
        .insert_sensor(fixed_sensor("H1", "NO2", lon_lat(area::CATHEDRAL)))
        .unwrap();
    store.add_samples(
        "H1",
        regular_samples(
            ts("2012-04-23T01:00:00Z"),
            chrono::Duration::minutes(30),
            &[5.0, 7.0, 100.0],
            0.9,
        ),
    );
    QueryEngine::with_store(EngineConfig::default(), coverage(), Arc::new(store)).unwrap()
}

#[tokio::test]
async fn test_sample_at_window_end_fills_no_periodic_bin() {
    let engine = on_the_hour_engine();
    let regions = [
        RegionSpecification::sensor_id("H1"),
        RegionSpecification::points(vec![lon_lat(area::CATHEDRAL)]),
    ];

    for region in regions {
        let req = DataRequest::new(region.clone(), "NO2")
            .with_time("2012-04-23T01:00:00Z", "2012-04-23T02:00:00Z")
            .with_statistics(Statistics::new(Interval::Hour, Operation::Mean));
        let reply = engine.handle(&req).await;
        assert_eq!(reply.status, ReplyStatus::Success, "{}", region.kind());

        let data = reply.replies[0].data();
        assert_eq!(data.len(), 24);
        assert_eq!(data.iter().filter(|v| v.is_nan()).count(), 23, "{}", region.kind());
        assert_approx_eq!(data[1], 6.0, 1e-12);

        let linear = engine
            .handle(&req.clone().with_statistics(Statistics::new(Interval::Hour, Operation::None)))
            .await;
        assert_bins_eq!(linear.replies[0].data(), [6.0]);
    }
}

#[tokio::test]
async fn test_day_of_week_with_calibration() {
    let req = DataRequest::new(RegionSpecification::sensor_id("S1"), "NO2")
        .with_time("2012-04-19T00:00:00Z", "2012-04-24T00:00:00Z")
        .with_statistics(Statistics::new(Interval::DayOfWeek, Operation::Mean));

    let reply = engine().handle(&req).await;
    let r = &reply.replies[0];
    assert_eq!(r.data().len(), 7);
    // 2012-04-23 is a Monday
    assert_approx_eq!(r.data()[0], 16.0 / 3.0, 1e-12);
    assert_eq!(r.sensor().unwrap().calibration_date, "2012-04-20T00:00:00Z");
}

#[tokio::test]
async fn test_blank_from_gives_single_value_per_target() {
    let req = DataRequest::new(whole_area(), "NO2")
        .with_time("", "2020-01-01T00:00:00Z")
        .with_statistics(Statistics::new(Interval::Hour, Operation::Mean));

    let reply = engine().handle(&req).await;
    assert_eq!(reply.status, ReplyStatus::Success);
    assert!(!reply.replies.is_empty());
    for r in &reply.replies {
        assert_eq!(r.data().len(), 1);
    }
    assert_eq!(reply_for(&reply, "S1").data(), &[4.0]);
    assert!(reply_for(&reply, "S2").data()[0].is_nan());
}

#[tokio::test]
async fn test_blank_from_interpolates_fixed_points() {
    let engine = engine();
    let far_from_sensors = LongLat::new(17.70, 59.82);
    let at = |to: &str| {
        DataRequest::new(
            RegionSpecification::points(vec![lon_lat(area::CATHEDRAL), far_from_sensors]),
            "NO2",
        )
        .with_time("", to)
        .with_statistics(Statistics::new(Interval::Hour, Operation::Mean))
    };

    // S1 sits on the cathedral, its 01:45 reading is the nearest to 02:00
    let reply = engine.handle(&at("2012-04-23T02:00:00Z")).await;
    assert_eq!(reply.status, ReplyStatus::Success);
    assert_eq!(reply.replies.len(), 2);
    assert_eq!(reply.replies[0].kind(), "DataReply");
    assert_bins_eq!(reply.replies[0].data(), [9.0]);
    assert!(reply.replies[0].accuracy() > 0.0);
    assert_bins_eq!(reply.replies[1].data(), [NAN]);
    assert_eq!(reply.replies[1].accuracy(), 0.0);

    let reply = engine.handle(&at("2012-04-23T04:00:00Z")).await;
    assert_bins_eq!(reply.replies[0].data(), [2.0]);

    // 03:20 is more than an hour before 05:00
    let reply = engine.handle(&at("2012-04-23T05:00:00Z")).await;
    assert_eq!(reply.status, ReplyStatus::Success);
    assert_bins_eq!(reply.replies[0].data(), [NAN]);
    assert_eq!(reply.replies[0].accuracy(), 0.0);
}

#[tokio::test]
async fn test_sensor_region_finds_bus_by_track_fix() {
    let engine = engine();
    // Only the bus's 02:00 fix lies in this box
    let terminus = RegionSpecification::sensors(
        LongLat::new(17.655, 59.865),
        LongLat::new(17.665, 59.875),
    );
    let stats = Statistics::new(Interval::Hour, Operation::Mean);

    let reply = engine
        .handle(
            &DataRequest::new(terminus.clone(), "NO2")
                .with_time("2012-04-23T01:00:00Z", "2012-04-23T05:00:00Z")
                .with_statistics(stats),
        )
        .await;
    assert_eq!(reply.status, ReplyStatus::Success);
    assert_eq!(reply.replies.len(), 1);
    let bus = reply_for(&reply, "BUS");
    assert_eq!(bus.kind(), "SensorDataReply");
    assert_position_approx_eq!(bus.position(), LongLat::new(17.66, 59.87), 1e-12);
    assert_approx_eq!(bus.data()[2], 30.0, 1e-12);

    let before_arrival = engine
        .handle(
            &DataRequest::new(terminus, "NO2")
                .with_time("2012-04-23T01:00:00Z", "2012-04-23T01:30:00Z")
                .with_statistics(stats),
        )
        .await;
    assert_eq!(before_arrival.status, ReplyStatus::Success);
    assert!(before_arrival.replies.is_empty());
}

#[tokio::test]
async fn test_region_outside_coverage() {
    let req = request(
        RegionSpecification::points(vec![lon_lat(area::STOCKHOLM)]),
        Statistics::new(Interval::Hour, Operation::None),
    );
    assert_failed(&engine().handle(&req).await, ReplyStatus::RangeError);
}

#[tokio::test]
async fn test_raw_values_need_sensor_region() {
    let engine = engine();

    let points = request(
        RegionSpecification::points(vec![lon_lat(area::CATHEDRAL)]),
        Statistics::raw(),
    );
    assert_failed(&engine.handle(&points).await, ReplyStatus::InvalidRequest);

    let rect = request(
        RegionSpecification::rect(lon_lat(area::SOUTH_WEST), lon_lat(area::NORTH_EAST), 500.0),
        Statistics::raw(),
    );
    assert_failed(&engine.handle(&rect).await, ReplyStatus::InvalidRequest);
}

#[tokio::test]
async fn test_sensor_id_matches_sensor_region() {
    let engine = engine();
    let stats = Statistics::new(Interval::Hour, Operation::Mean);

    let by_region = engine.handle(&request(whole_area(), stats)).await;
    let ids: Vec<_> = by_region
        .replies
        .iter()
        .map(|r| r.sensor().unwrap().unique_id.clone())
        .collect();
    assert_eq!(ids, vec!["S1", "S2", "BUS"]);

    let by_id = engine
        .handle(&request(RegionSpecification::sensor_id("S1"), stats))
        .await;
    let a = reply_for(&by_region, "S1");
    let b = &by_id.replies[0];
    assert_eq!(a.sensor(), b.sensor());
    assert_eq!(a.position(), b.position());
    assert_bins_eq!(a.data(), b.data().to_vec());
}

#[tokio::test]
async fn test_moving_sensor_raw_values() {
    let reply = engine()
        .handle(&request(
            RegionSpecification::sensor_id("BUS"),
            Statistics::raw(),
        ))
        .await;

    let r = &reply.replies[0];
    assert_eq!(r.kind(), "MovingSensorReply");
    assert_eq!(r.data(), &[20.0, 30.0]);
    assert_eq!(
        r.positions().unwrap(),
        &[LongLat::new(17.62, 59.85), LongLat::new(17.66, 59.87)]
    );

    let json = reply.to_json().unwrap();
    assert!(json.contains(r#""Type":"MovingSensorReply""#));
    assert!(json.contains(r#""Positions""#));
}

#[tokio::test]
async fn test_grid_is_row_major_and_interpolated() {
    let req = DataRequest::new(
        RegionSpecification::rect(
            LongLat::new(17.62, 59.85),
            LongLat::new(17.645, 59.865),
            500.0,
        ),
        "NO2",
    )
    .with_time("2012-04-23T01:00:00Z", "2012-04-23T02:00:00Z")
    .with_statistics(Statistics::new(Interval::Hour, Operation::None));

    let reply = engine().handle(&req).await;
    assert_eq!(reply.status, ReplyStatus::Success);
    assert_eq!(reply.replies.len(), 12);
    assert_position_approx_eq!(reply.replies[0].position(), LongLat::new(17.62, 59.85), 1e-12);

    for pair in reply.replies.windows(2) {
        let (a, b) = (pair[0].position(), pair[1].position());
        assert!(
            b.latitude > a.latitude || (b.latitude == a.latitude && b.longitude > a.longitude)
        );
    }

    let mut interpolated = 0;
    for r in &reply.replies {
        assert_eq!(r.kind(), "DataReply");
        assert_eq!(r.data().len(), 1);
        let v = r.data()[0];
        if !v.is_nan() {
            interpolated += 1;
            assert!((7.0 - 1e-9..=11.0 + 1e-9).contains(&v), "value {}", v);
            assert!(r.accuracy() > 0.0);
        } else {
            assert_eq!(r.accuracy(), 0.0);
        }
    }
    assert!(interpolated > 0);
}

#[tokio::test]
async fn test_accuracy_channel() {
    let reply = engine()
        .handle(&request(
            RegionSpecification::sensor_id("S1"),
            Statistics::new(Interval::Hour, Operation::Mean).with_accuracies(),
        ))
        .await;
    assert_approx_eq!(reply.replies[0].data()[1], 0.9, 1e-12);

    let stddev = engine()
        .handle(&request(
            RegionSpecification::sensor_id("S1"),
            Statistics::new(Interval::Hour, Operation::StdDev).with_accuracies(),
        ))
        .await;
    assert_failed(&stddev, ReplyStatus::InvalidRequest);
}

#[tokio::test]
async fn test_request_errors() {
    let engine = engine();
    let stats = Statistics::new(Interval::Hour, Operation::Mean);

    let unknown_sensor = request(RegionSpecification::sensor_id("NOPE"), stats);
    assert_failed(&engine.handle(&unknown_sensor).await, ReplyStatus::InvalidRequest);

    let wrong_dataset = request(RegionSpecification::sensor_id("P1"), stats);
    assert_failed(&engine.handle(&wrong_dataset).await, ReplyStatus::InvalidRequest);

    let mut unknown_dataset = request(whole_area(), stats);
    unknown_dataset.dataset = "O3".to_string();
    assert_failed(&engine.handle(&unknown_dataset).await, ReplyStatus::RangeError);

    let mut empty_dataset = request(whole_area(), stats);
    empty_dataset.dataset = String::new();
    assert_failed(&engine.handle(&empty_dataset).await, ReplyStatus::SyntaxError);

    let too_late = request(whole_area(), stats).with_time("2020-12-30", "2021-02-01");
    assert_failed(&engine.handle(&too_late).await, ReplyStatus::RangeError);

    let inverted = request(whole_area(), stats).with_time("2012-04-24", "2012-04-23");
    assert_failed(&engine.handle(&inverted).await, ReplyStatus::InvalidRequest);

    assert_failed(&engine.handle_json("{not json").await, ReplyStatus::SyntaxError);
    assert_failed(
        &engine.handle_json(r#"{"Region":{"Type":"Circle"},"Dataset":"NO2"}"#).await,
        ReplyStatus::SyntaxError,
    );
}

#[tokio::test]
async fn test_handle_json_round_trip() {
    let json = r#"{
        "TimeInterval": {"From": "2012-04-23T00:00:00Z", "To": "2012-04-23T05:00:00Z"},
        "Region": {"Type": "SensorIdRegion", "UniqueId": "S1"},
        "Dataset": "NO2",
        "Statistics": {"Interval": "cHour", "Operation": "cMax", "GetAccuracies": false}
    }"#;

    let reply = engine().handle_json(json).await;
    let encoded = reply.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

    assert_eq!(value["Status"], 0);
    assert_eq!(value["Replies"][0]["Data"][0], serde_json::Value::Null);
    assert_eq!(value["Replies"][0]["Data"][1], 9.0);
    assert_eq!(value["Replies"][0]["UniqueId"], "S1");
}

#[tokio::test]
async fn test_storage_failure_is_server_error() {
    let mut inner = MemorySensorStore::new();
    inner
        .insert_sensor(fixed_sensor("S1", "NO2", lon_lat(area::CATHEDRAL)))
        .unwrap();
    let engine = QueryEngine::with_store(
        EngineConfig::default(),
        coverage(),
        Arc::new(test_utils::FailingStore::new(inner)),
    )
    .unwrap();

    let reply = engine
        .handle(&request(
            RegionSpecification::sensor_id("S1"),
            Statistics::new(Interval::Hour, Operation::Max),
        ))
        .await;
    assert_failed(&reply, ReplyStatus::ServerError);

    let offline = QueryEngine::with_store(
        EngineConfig::default(),
        coverage(),
        Arc::new(FailingStore::unavailable()),
    )
    .unwrap();
    let reply = offline
        .handle(&request(whole_area(), Statistics::new(Interval::Hour, Operation::Max)))
        .await;
    assert_failed(&reply, ReplyStatus::ServerError);
}

#[tokio::test]
async fn test_validation_runs_before_storage() {
    let offline = QueryEngine::with_store(
        EngineConfig::default(),
        coverage(),
        Arc::new(FailingStore::unavailable()),
    )
    .unwrap();

    let reply = offline
        .handle(&request(
            RegionSpecification::points(vec![lon_lat(area::CATHEDRAL)]),
            Statistics::raw(),
        ))
        .await;
    assert_failed(&reply, ReplyStatus::InvalidRequest);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_server_error() {
    let config = EngineConfig {
        request_timeout_secs: 1,
        ..Default::default()
    };
    let store = SlowStore::new(uppsala_store(), Duration::from_secs(30));
    let engine = QueryEngine::with_store(config, coverage(), Arc::new(store)).unwrap();

    let reply = engine
        .handle(&request(
            RegionSpecification::sensor_id("S1"),
            Statistics::new(Interval::Hour, Operation::Max),
        ))
        .await;
    assert_failed(&reply, ReplyStatus::ServerError);
    assert!(reply.message.contains("timed out"));
}

#[tokio::test]
async fn test_info_reflects_coverage() {
    let info = engine().info();
    assert_eq!(info.datasets, vec!["NO2", "PM10", "Noise"]);
    assert_eq!(info.max_forecast, 86400.0);
    assert_eq!(info.south_west, lon_lat(area::SOUTH_WEST));
    assert_eq!(info.oldest, "2010-01-01T00:00:00Z");
}
