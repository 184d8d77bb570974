//! gRPC-Web body framing
//!
//! A body is a sequence of frames: one flag byte, a 4-byte big-endian length,
//! then the payload. Flag bit 0x80 marks the trailer frame, whose payload is
//! HTTP/1-style header lines carrying `grpc-status` and `grpc-message`.

use enclave_core_interface::{StatusCode, TransportError};

/// Flag byte + length prefix
pub const FRAME_HEADER_LEN: usize = 5;

const FLAG_COMPRESSED: u8 = 0x01;
const FLAG_TRAILER: u8 = 0x80;

/// One frame borrowed from a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub trailer: bool,
    pub payload: &'a [u8],
}

/// Status reported by the backend, from trailers or response headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcStatus {
    pub code: i32,
    pub message: String,
}

impl GrpcStatus {
    /// Parse raw `grpc-status` / `grpc-message` values
    pub fn parse(code: &str, message: Option<&str>) -> Result<Self, TransportError> {
        let code = code.trim().parse::<i32>().map_err(|_| {
            TransportError::MalformedResponse(format!("Invalid grpc-status value '{}'", code))
        })?;
        let message = message.map(percent_decode).unwrap_or_default();
        Ok(Self { code, message })
    }
}

/// Wrap an encoded request message in a single uncompressed data frame
pub fn encode_frame(message: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + message.len());
    buf.push(0x00);
    buf.extend_from_slice(&(message.len() as u32).to_be_bytes());
    buf.extend_from_slice(message);
    buf
}

/// Split a response body into frames
pub fn split_frames(mut body: &[u8]) -> Result<Vec<Frame<'_>>, TransportError> {
    let mut frames = Vec::new();

    while !body.is_empty() {
        if body.len() < FRAME_HEADER_LEN {
            return Err(TransportError::MalformedResponse(format!(
                "Truncated frame header ({} bytes)",
                body.len()
            )));
        }

        let flag = body[0];
        if flag & FLAG_COMPRESSED != 0 {
            return Err(TransportError::MalformedResponse(
                "Compressed frames are not supported".to_string(),
            ));
        }

        let len = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
        let rest = &body[FRAME_HEADER_LEN..];
        if rest.len() < len {
            return Err(TransportError::MalformedResponse(format!(
                "Frame declares {} bytes but only {} remain",
                len,
                rest.len()
            )));
        }

        frames.push(Frame {
            trailer: flag & FLAG_TRAILER != 0,
            payload: &rest[..len],
        });
        body = &rest[len..];
    }

    Ok(frames)
}

/// Extract the status from a trailer frame payload
pub fn parse_trailers(payload: &[u8]) -> Result<Option<GrpcStatus>, TransportError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| TransportError::MalformedResponse("Trailer frame is not UTF-8".to_string()))?;

    let mut code = None;
    let mut message = None;
    for line in text.split("\r\n").flat_map(|l| l.split('\n')) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "grpc-status" => code = Some(value.trim()),
            "grpc-message" => message = Some(value.trim()),
            _ => {}
        }
    }

    code.map(|c| GrpcStatus::parse(c, message)).transpose()
}

/// Turn a complete unary response into its message bytes
///
/// `header_status` is the status found in the HTTP response headers, which a
/// trailers-only response uses instead of a trailer frame. A trailer frame
/// wins when both are present.
///
/// Returns `Ok(None)` when the backend reported OK without a data frame.
pub fn decode_response(
    header_status: Option<GrpcStatus>,
    body: &[u8],
) -> Result<Option<Vec<u8>>, TransportError> {
    let frames = split_frames(body)?;

    let mut data: Option<&[u8]> = None;
    let mut trailer_status = None;
    for frame in frames {
        if frame.trailer {
            trailer_status = parse_trailers(frame.payload)?;
        } else if data.is_some() {
            return Err(TransportError::MalformedResponse(
                "Unary response carried more than one message".to_string(),
            ));
        } else {
            data = Some(frame.payload);
        }
    }

    let status = trailer_status.or(header_status).ok_or_else(|| {
        TransportError::MalformedResponse("Response carried no grpc-status".to_string())
    })?;

    if status.code != 0 {
        return Err(TransportError::from_status(
            StatusCode::from_i32(status.code),
            status.message,
        ));
    }

    Ok(data.map(<[u8]>::to_vec))
}

fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trailer(text: &str) -> Vec<u8> {
        let mut buf = vec![FLAG_TRAILER];
        buf.extend_from_slice(&(text.len() as u32).to_be_bytes());
        buf.extend_from_slice(text.as_bytes());
        buf
    }

    #[test]
    fn test_encode_frame_layout() {
        let framed = encode_frame(b"abc");
        assert_eq!(framed, vec![0, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_ok_with_message() {
        let mut body = encode_frame(b"hello");
        body.extend(trailer("grpc-status: 0\r\ngrpc-message: \r\n"));

        let decoded = decode_response(None, &body).unwrap();
        assert_eq!(decoded.as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_ok_without_message_is_none() {
        let body = trailer("grpc-status:0\r\n");
        assert_eq!(decode_response(None, &body).unwrap(), None);
    }

    #[test]
    fn test_zero_length_message_is_some() {
        // google.protobuf.Empty encodes to zero bytes but still has a frame
        let mut body = encode_frame(b"");
        body.extend(trailer("grpc-status: 0\r\n"));
        assert_eq!(decode_response(None, &body).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_error_status_in_trailer() {
        let body = trailer("grpc-status: 2\r\ngrpc-message: No%20service%20with%20ID%20'x'\r\n");
        let err = decode_response(None, &body).unwrap_err();
        assert_eq!(
            err,
            TransportError::Rejected {
                code: StatusCode::Unknown,
                message: "No service with ID 'x'".to_string(),
            }
        );
    }

    #[test]
    fn test_trailers_only_response_uses_header_status() {
        let status = GrpcStatus::parse("14", Some("upstream%20down")).unwrap();
        let err = decode_response(Some(status), &[]).unwrap_err();
        assert!(err.is_unreachable());
        assert_eq!(err.code(), Some(StatusCode::Unavailable));
    }

    #[test]
    fn test_missing_status_is_malformed() {
        let body = encode_frame(b"x");
        let err = decode_response(None, &body).unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_truncated_frame_is_malformed() {
        let mut body = encode_frame(b"hello");
        body.truncate(7);
        assert!(matches!(
            split_frames(&body),
            Err(TransportError::MalformedResponse(_))
        ));
        assert!(split_frames(&[0, 0]).is_err());
    }

    #[test]
    fn test_compressed_frame_rejected() {
        let body = vec![FLAG_COMPRESSED, 0, 0, 0, 0];
        assert!(split_frames(&body).is_err());
    }

    #[test]
    fn test_non_numeric_status_is_malformed() {
        let body = trailer("grpc-status: ok\r\n");
        assert!(decode_response(None, &body)
            .unwrap_err()
            .is_protocol_violation());
    }
}
