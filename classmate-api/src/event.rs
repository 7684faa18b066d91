use crate::{Error, RecordId, Time, TimeInput};

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: RecordId,
    pub title: String,
    pub semantic_location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub users_attending: serde_json::Value,
    pub start_time: Time,
    pub end_time: Time,
}

/// Body of an event creation request. Every field is required.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: Option<String>,
    pub semantic_location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub users_attending: Option<serde_json::Value>,
    pub start_time: Option<TimeInput>,
    pub end_time: Option<TimeInput>,
}

impl NewEvent {
    /// Checks presence of all fields, in wire order, and builds the event
    pub fn into_event(self, id: RecordId) -> Result<Event, Error> {
        Ok(Event {
            id,
            title: crate::require_str("title", self.title)?,
            semantic_location: crate::require_str("semanticLocation", self.semantic_location)?,
            latitude: crate::require_coordinate("latitude", self.latitude)?,
            longitude: crate::require_coordinate("longitude", self.longitude)?,
            users_attending: crate::require_value("usersAttending", self.users_attending)?,
            start_time: crate::require_time("startTime", self.start_time)?,
            end_time: crate::require_time("endTime", self.end_time)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn full_body() -> serde_json::Value {
        json!({
            "title": "Study group",
            "semanticLocation": "Library, 2nd floor",
            "latitude": 47.6553,
            "longitude": -122.3035,
            "usersAttending": ["alice", "bob"],
            "startTime": "2018-03-14T18:00:00Z",
            "endTime": 1521061200000i64,
        })
    }

    #[test]
    fn builds_event_from_complete_body() {
        let new: NewEvent = serde_json::from_value(full_body()).unwrap();
        let event = new.into_event(RecordId::from("abc234")).unwrap();
        assert_eq!(event.id, RecordId::from("abc234"));
        assert_eq!(event.semantic_location, "Library, 2nd floor");
        assert_eq!(event.users_attending, json!(["alice", "bob"]));
        assert_eq!(event.start_time.to_rfc3339(), "2018-03-14T18:00:00+00:00");
        assert_eq!(event.end_time.timestamp_millis(), 1521061200000);
    }

    #[test]
    fn each_missing_field_is_reported() {
        for field in [
            "title",
            "semanticLocation",
            "latitude",
            "longitude",
            "usersAttending",
            "startTime",
            "endTime",
        ] {
            let mut body = full_body();
            body.as_object_mut().unwrap().remove(field);
            let new: NewEvent = serde_json::from_value(body).unwrap();
            assert_eq!(
                new.into_event(RecordId::from("abc234")),
                Err(Error::MissingField(String::from(field)))
            );
        }
    }

    #[test]
    fn zero_coordinates_are_missing() {
        let mut body = full_body();
        body["latitude"] = json!(0);
        let new: NewEvent = serde_json::from_value(body).unwrap();
        assert_eq!(
            new.into_event(RecordId::from("abc234")),
            Err(Error::MissingField(String::from("latitude")))
        );

        let mut body = full_body();
        body["longitude"] = json!(-0.0);
        let new: NewEvent = serde_json::from_value(body).unwrap();
        assert_eq!(
            new.into_event(RecordId::from("abc234")),
            Err(Error::MissingField(String::from("longitude")))
        );
    }

    #[test]
    fn unparseable_time_is_invalid() {
        let mut body = full_body();
        body["endTime"] = json!("whenever");
        let new: NewEvent = serde_json::from_value(body).unwrap();
        assert_eq!(
            new.into_event(RecordId::from("abc234")),
            Err(Error::InvalidField(String::from("endTime")))
        );
    }

    #[test]
    fn stored_form_uses_camel_case() {
        let new: NewEvent = serde_json::from_value(full_body()).unwrap();
        let event = new.into_event(RecordId::from("abc234")).unwrap();
        let stored = serde_json::to_value(&event).unwrap();
        assert_eq!(stored["semanticLocation"], json!("Library, 2nd floor"));
        assert_eq!(stored["startTime"], json!("2018-03-14T18:00:00Z"));
        let back: Event = serde_json::from_value(stored).unwrap();
        assert_eq!(back, event);
    }
}
