//! JSON encoding of worker messages
//!
//! Field names are camelCase: `{ "requestId": 1, "config": { .. } }` and
//! `{ "requestId": 1, "data": { .. } }` or `{ "requestId": 1, "error": ".." }`.

use super::{WorkerRequest, WorkerResponse};
use crate::error::{PlanetError, Result};

pub fn encode_request(request: &WorkerRequest) -> Result<String> {
    serde_json::to_string(request).map_err(protocol)
}

/// # Errors
///
/// Returns `Protocol` for malformed JSON or a message of the wrong shape
pub fn decode_request(json: &str) -> Result<WorkerRequest> {
    serde_json::from_str(json).map_err(protocol)
}

pub fn encode_response(response: &WorkerResponse) -> Result<String> {
    serde_json::to_string(response).map_err(protocol)
}

/// # Errors
///
/// Returns `Protocol` for malformed JSON or a message of the wrong shape
pub fn decode_response(json: &str) -> Result<WorkerResponse> {
    serde_json::from_str(json).map_err(protocol)
}

fn protocol(e: serde_json::Error) -> PlanetError {
    PlanetError::Protocol(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanetRequestBuilder;
    use crate::mesh::MeshBuilder;
    use crate::worker::handle_request;

    #[test]
    fn test_request_field_names() {
        let request = WorkerRequest {
            request_id: 12,
            config: PlanetRequestBuilder::new().seed(1).build().unwrap(),
        };
        let json = encode_request(&request).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["requestId"], 12);
        assert_eq!(value["config"]["shape"], "sphere");
        assert_eq!(decode_request(&json).unwrap(), request);
    }

    #[test]
    fn test_failure_message_shape() {
        let response = WorkerResponse::Failure {
            request_id: 3,
            error: "boom".into(),
        };
        let json = encode_response(&response).unwrap();
        assert_eq!(json, r#"{"requestId":3,"error":"boom"}"#);
        assert_eq!(decode_response(&json).unwrap(), response);
    }

    #[test]
    fn test_success_survives_transport() {
        let request = WorkerRequest {
            request_id: 4,
            config: PlanetRequestBuilder::new()
                .seed(8)
                .detail(2)
                .unwrap()
                .build()
                .unwrap(),
        };
        let decoded = decode_request(&encode_request(&request).unwrap()).unwrap();
        let response = handle_request(&MeshBuilder::new(), decoded);
        let back = decode_response(&encode_response(&response).unwrap()).unwrap();

        assert_eq!(back.request_id(), 4);
        assert!(back.into_result().unwrap().is_consistent());
    }

    #[test]
    fn test_negative_detail_decodes_then_fails() {
        let json = r#"{"requestId":5,"config":{"shape":"sphere","detail":-2,"seed":1,"biome":"beach"}}"#;
        let request = decode_request(json).unwrap();
        let response = handle_request(&MeshBuilder::new(), request);
        assert!(!response.is_success());
        assert_eq!(response.request_id(), 5);
    }

    #[test]
    fn test_malformed_messages() {
        assert!(matches!(decode_request("{"), Err(PlanetError::Protocol(_))));
        assert!(matches!(
            decode_request(r#"{"requestId":1,"config":{"shape":"torus","detail":1,"seed":1,"biome":"beach"}}"#),
            Err(PlanetError::Protocol(_))
        ));
        assert!(matches!(decode_response(r#"{"requestId":1}"#), Err(PlanetError::Protocol(_))));
    }
}
