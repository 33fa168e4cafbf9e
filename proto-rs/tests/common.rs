use recording_catalog_proto::*;

// egress_ended payload as delivered by the LiveKit server (protojson)
pub const EGRESS_ENDED_JSON: &str = r#"{
  "event": "egress_ended",
  "id": "EV_3kZ9WcTqvC7p",
  "createdAt": "1722550012",
  "egressInfo": {
    "egressId": "EG_hXRhy4CxBn6e",
    "roomId": "RM_QcLjVzmLXh2g",
    "roomName": "RoomA",
    "status": "EGRESS_COMPLETE",
    "startedAt": "1722550000123456789",
    "endedAt": "1722550012623456789",
    "updatedAt": "1722550012700000000",
    "roomComposite": { "roomName": "RoomA", "layout": "grid" },
    "fileResults": [
      {
        "filename": "recordings/RoomA-RM_QcLjVzmLXh2g-2024-08-01T220640.mp4",
        "startedAt": "1722550000123456789",
        "endedAt": "1722550012623456789",
        "duration": "12500000000",
        "size": "1048576",
        "location": "s3://openvidu/recordings/RoomA-RM_QcLjVzmLXh2g-2024-08-01T220640.mp4"
      }
    ]
  }
}"#;

// egress_started payload: no file result yet, status as a number
pub const EGRESS_STARTED_JSON: &str = r#"{
  "event": "egress_started",
  "id": "EV_8sPm2LxQwe1r",
  "createdAt": 1722550000,
  "room": { "sid": "RM_QcLjVzmLXh2g", "name": "RoomA", "metadata": "{\"createdBy\":\"recording-catalog\",\"recordingStatus\":\"STARTING\"}" },
  "egressInfo": {
    "egressId": "EG_hXRhy4CxBn6e",
    "roomId": "RM_QcLjVzmLXh2g",
    "roomName": "RoomA",
    "status": 1,
    "startedAt": "1722550000123456789"
  }
}"#;

pub fn expected_record() -> RecordingRecord {
    RecordingRecord {
        id: "EG_hXRhy4CxBn6e".to_string(),
        name: "RoomA-RM_QcLjVzmLXh2g-2024-08-01T220640.mp4".to_string(),
        room_name: "RoomA".to_string(),
        room_id: "RM_QcLjVzmLXh2g".to_string(),
        started_at: 1_722_550_000_123,
        duration: Some(12.5),
        size: Some(1_048_576),
    }
}
