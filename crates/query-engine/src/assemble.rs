//! Turning aggregated series into typed replies.

use giot_common::{format_iso8601, LongLat, TimeWindow};
use giot_protocol::{DataReply, MovingSensorReply, ReplyData, SensorDataReply, SensorMetadata};
use sensor_store::SensorRecord;

use crate::aggregate::Series;
use crate::region::Target;

/// Builds replies for one request.
#[derive(Debug, Clone, Copy)]
pub struct ReplyAssembler {
    window: TimeWindow,
    raw: bool,
}

impl ReplyAssembler {
    /// `window` is the requested interval; `raw` whether raw values were
    /// requested.
    pub fn new(window: TimeWindow, raw: bool) -> Self {
        Self { window, raw }
    }

    pub fn reply(&self, target: &Target, series: Series) -> DataReply {
        match target {
            Target::Point(position) => DataReply::DataReply(ReplyData {
                position: *position,
                accuracy: series.reply_accuracy(),
                data: series.data,
            }),
            Target::Sensor(sensor) => self.sensor_reply(sensor, series),
        }
    }

    fn sensor_reply(&self, sensor: &SensorRecord, series: Series) -> DataReply {
        let metadata = self.metadata(sensor);
        let position = sensor
            .position_at(self.window.end)
            .unwrap_or_default();
        let accuracy = series.reply_accuracy();

        if self.raw && sensor.moved_during(&self.window) {
            let positions: Vec<LongLat> = series
                .times
                .iter()
                .map(|t| sensor.position_at(*t).unwrap_or(position))
                .collect();
            return DataReply::MovingSensorReply(MovingSensorReply {
                reply: ReplyData {
                    position,
                    accuracy,
                    data: series.data,
                },
                sensor: metadata,
                positions,
            });
        }

        DataReply::SensorDataReply(SensorDataReply {
            reply: ReplyData {
                position,
                accuracy,
                data: series.data,
            },
            sensor: metadata,
        })
    }

    fn metadata(&self, sensor: &SensorRecord) -> SensorMetadata {
        SensorMetadata {
            installation_date: format_iso8601(&sensor.installation_date),
            exstallation_date: sensor
                .exstallation_date
                .as_ref()
                .map(format_iso8601)
                .unwrap_or_default(),
            calibration_date: sensor
                .newest_calibration_in(&self.window)
                .as_ref()
                .map(format_iso8601)
                .unwrap_or_default(),
            data_set: sensor.dataset.clone(),
            manufacturer: sensor.manufacturer.clone(),
            model: sensor.model.clone(),
            serial: sensor.serial.clone(),
            unique_id: sensor.unique_id.clone(),
            sample_time: sensor.sample_time_secs,
        }
    }
}
