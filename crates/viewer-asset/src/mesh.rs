use std::{
    fmt::{self, Display, Formatter},
    io::Cursor,
    ops::Range,
};

use binrw::{binrw, BinRead, BinWrite};
use log::debug;

pub const DEFAULT_FORMAT_TAG: [u8; 4] = *b"VANM";
pub const HEADER_SIZE: usize = 20;

const VALUE_SIZE: usize = 4;

#[derive(Debug)]
pub enum MeshFormatError {
    TruncatedHeader {
        actual: usize,
    },
    BadHeader(binrw::Error),
    CountOverflow {
        frame_count: u32,
        vertex_count: u32,
        face_count: u32,
    },
    TruncatedBody {
        expected: usize,
        actual: usize,
    },
    TrailingBytes {
        expected: usize,
        actual: usize,
    },
    FaceIndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: u32,
    },
    BadFps(f32),
    BufferLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl Display for MeshFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MeshFormatError::TruncatedHeader { actual } => write!(
                f,
                "Mesh stream header needs {} bytes, got {}",
                HEADER_SIZE, actual
            ),
            MeshFormatError::BadHeader(err) => write!(f, "Bad mesh stream header: {}", err),
            MeshFormatError::CountOverflow {
                frame_count,
                vertex_count,
                face_count,
            } => write!(
                f,
                "Mesh stream counts are too large (frames: {}, vertices: {}, faces: {})",
                frame_count, vertex_count, face_count
            ),
            MeshFormatError::TruncatedBody { expected, actual } => write!(
                f,
                "Mesh stream is truncated: header declares {} bytes, got {}",
                expected, actual
            ),
            MeshFormatError::TrailingBytes { expected, actual } => write!(
                f,
                "Mesh stream has trailing data: header declares {} bytes, got {}",
                expected, actual
            ),
            MeshFormatError::FaceIndexOutOfRange {
                face,
                index,
                vertex_count,
            } => write!(
                f,
                "Face #{} references vertex {}, but there are only {} vertices",
                face, index, vertex_count
            ),
            MeshFormatError::BadFps(fps) => write!(f, "Bad mesh stream fps: {}", fps),
            MeshFormatError::BufferLength {
                name,
                expected,
                actual,
            } => write!(
                f,
                "Bad {} buffer length: expected {}, got {}",
                name, expected, actual
            ),
        }
    }
}

impl std::error::Error for MeshFormatError {}

impl From<binrw::Error> for MeshFormatError {
    fn from(value: binrw::Error) -> Self {
        MeshFormatError::BadHeader(value)
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStreamHeader {
    pub format_tag: [u8; 4],
    pub frame_count: u32,
    pub vertex_count: u32,
    pub face_count: u32,
    pub fps: f32,
}

impl MeshStreamHeader {
    fn vertex_values(&self) -> Option<usize> {
        (self.frame_count as usize)
            .checked_mul(self.vertex_count as usize)?
            .checked_mul(3)
    }

    fn face_values(&self) -> Option<usize> {
        (self.face_count as usize).checked_mul(3)
    }

    /// Total byte length of an artifact carrying this header.
    pub fn stream_len(&self) -> Result<usize, MeshFormatError> {
        self.vertex_values()
            .zip(self.face_values())
            .and_then(|(vertices, faces)| vertices.checked_add(faces))
            .and_then(|values| values.checked_mul(VALUE_SIZE))
            .and_then(|body| body.checked_add(HEADER_SIZE))
            .ok_or(MeshFormatError::CountOverflow {
                frame_count: self.frame_count,
                vertex_count: self.vertex_count,
                face_count: self.face_count,
            })
    }
}

/// A deforming surface: one pose per frame over a constant triangle topology.
///
/// Vertex positions are kept frame-major in a single buffer, so one frame is a
/// plain offset slice of `vertex_count * 3` floats.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAnimationStream {
    format_tag: [u8; 4],
    frame_count: u32,
    vertex_count: u32,
    fps: f32,
    vertices: Vec<f32>,
    faces: Vec<u32>,
}

fn validate_fps(fps: f32) -> Result<(), MeshFormatError> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(MeshFormatError::BadFps(fps))
    }
}

fn validate_faces(faces: &[u32], vertex_count: u32) -> Result<(), MeshFormatError> {
    match faces.iter().position(|index| *index >= vertex_count) {
        Some(position) => Err(MeshFormatError::FaceIndexOutOfRange {
            face: position / 3,
            index: faces[position],
            vertex_count,
        }),
        None => Ok(()),
    }
}

fn read_values<T>(bytes: &[u8], convert: impl Fn([u8; 4]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(VALUE_SIZE)
        .map(|chunk| convert([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

impl MeshAnimationStream {
    pub fn new(
        frame_count: u32,
        vertex_count: u32,
        fps: f32,
        vertices: Vec<f32>,
        faces: Vec<u32>,
    ) -> Result<Self, MeshFormatError> {
        Self::with_format_tag(
            DEFAULT_FORMAT_TAG,
            frame_count,
            vertex_count,
            fps,
            vertices,
            faces,
        )
    }

    pub fn with_format_tag(
        format_tag: [u8; 4],
        frame_count: u32,
        vertex_count: u32,
        fps: f32,
        vertices: Vec<f32>,
        faces: Vec<u32>,
    ) -> Result<Self, MeshFormatError> {
        let header = MeshStreamHeader {
            format_tag,
            frame_count,
            vertex_count,
            face_count: (faces.len() / 3) as u32,
            fps,
        };
        header.stream_len()?;
        let expected_vertices = header.vertex_values().unwrap_or(usize::MAX);
        if vertices.len() != expected_vertices {
            return Err(MeshFormatError::BufferLength {
                name: "vertex",
                expected: expected_vertices,
                actual: vertices.len(),
            });
        }
        if faces.len() % 3 != 0 {
            return Err(MeshFormatError::BufferLength {
                name: "face",
                expected: faces.len() / 3 * 3,
                actual: faces.len(),
            });
        }
        validate_fps(fps)?;
        validate_faces(&faces, vertex_count)?;
        Ok(Self {
            format_tag,
            frame_count,
            vertex_count,
            fps,
            vertices,
            faces,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MeshFormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(MeshFormatError::TruncatedHeader {
                actual: bytes.len(),
            });
        }
        let header = MeshStreamHeader::read(&mut Cursor::new(&bytes[..HEADER_SIZE]))?;
        let expected = header.stream_len()?;
        if bytes.len() < expected {
            return Err(MeshFormatError::TruncatedBody {
                expected,
                actual: bytes.len(),
            });
        }
        if bytes.len() > expected {
            return Err(MeshFormatError::TrailingBytes {
                expected,
                actual: bytes.len(),
            });
        }
        validate_fps(header.fps)?;

        // Both counts are known to fit after stream_len() succeeded.
        let vertex_end = HEADER_SIZE + header.vertex_values().unwrap_or(0) * VALUE_SIZE;
        let vertices = read_values(&bytes[HEADER_SIZE..vertex_end], f32::from_le_bytes);
        let faces = read_values(&bytes[vertex_end..], u32::from_le_bytes);
        validate_faces(&faces, header.vertex_count)?;

        debug!(
            "Decoded mesh stream: {} frames, {} vertices, {} faces at {} fps",
            header.frame_count, header.vertex_count, header.face_count, header.fps
        );
        Ok(Self {
            format_tag: header.format_tag,
            frame_count: header.frame_count,
            vertex_count: header.vertex_count,
            fps: header.fps,
            vertices,
            faces,
        })
    }

    pub fn header(&self) -> MeshStreamHeader {
        MeshStreamHeader {
            format_tag: self.format_tag,
            frame_count: self.frame_count,
            vertex_count: self.vertex_count,
            face_count: self.face_count(),
            fps: self.fps,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let header = self.header();
        let mut cursor = Cursor::new(Vec::with_capacity(
            HEADER_SIZE + (self.vertices.len() + self.faces.len()) * VALUE_SIZE,
        ));
        // Writing plain integers into an in-memory cursor cannot fail.
        if let Err(err) = header.write(&mut cursor) {
            unreachable!("Writing a mesh header into memory failed: {}", err);
        }
        let mut bytes = cursor.into_inner();
        for value in &self.vertices {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        for index in &self.faces {
            bytes.extend_from_slice(&index.to_le_bytes());
        }
        bytes
    }

    pub fn format_tag(&self) -> [u8; 4] {
        self.format_tag
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn face_count(&self) -> u32 {
        (self.faces.len() / 3) as u32
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn faces(&self) -> &[u32] {
        &self.faces
    }

    /// Clamps any frame index, negative or past the end, into the stream.
    pub fn clamp_frame(&self, frame_index: i64) -> usize {
        let last = i64::from(self.frame_count).saturating_sub(1).max(0);
        frame_index.clamp(0, last) as usize
    }

    pub fn frame_range(&self, frame_index: i64) -> Range<usize> {
        if self.frame_count == 0 {
            return 0..0;
        }
        let stride = self.vertex_count as usize * 3;
        let start = self.clamp_frame(frame_index) * stride;
        start..start + stride
    }

    pub fn frame(&self, frame_index: i64) -> &[f32] {
        &self.vertices[self.frame_range(frame_index)]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_stream() -> MeshAnimationStream {
        let frame_count = 4;
        let vertex_count = 3;
        let vertices = (0..frame_count * vertex_count * 3)
            .map(|value| value as f32 * 0.5)
            .collect();
        MeshAnimationStream::new(frame_count, vertex_count, 30.0, vertices, vec![0, 1, 2])
            .unwrap()
    }

    #[test]
    fn test_encode_decode_identity() {
        let stream = sample_stream();
        let bytes = stream.encode();
        assert_eq!(bytes.len(), HEADER_SIZE + (36 + 3) * 4);
        let decoded = MeshAnimationStream::decode(&bytes).unwrap();
        assert_eq!(decoded, stream);
        assert_eq!(decoded.encode(), bytes);
    }

    fn assert_bytes_round_trip(stream: &MeshAnimationStream) {
        let bytes = stream.encode();
        let decoded = MeshAnimationStream::decode(&bytes).unwrap();
        assert_eq!(decoded.frame_count(), stream.frame_count());
        assert_eq!(decoded.vertex_count(), stream.vertex_count());
        assert_eq!(decoded.face_count(), stream.face_count());
        assert_eq!(decoded.fps().to_bits(), stream.fps().to_bits());
        assert_eq!(decoded.encode(), bytes);
    }

    #[test]
    fn test_round_trip_without_frames() {
        let stream = MeshAnimationStream::new(0, 3, 24.0, Vec::new(), vec![0, 1, 2]).unwrap();
        assert_eq!(stream.encode().len(), HEADER_SIZE + 3 * 4);
        assert_bytes_round_trip(&stream);
        assert!(MeshAnimationStream::decode(&stream.encode())
            .unwrap()
            .vertices()
            .is_empty());
    }

    #[test]
    fn test_round_trip_without_faces() {
        let stream = MeshAnimationStream::new(2, 1, 60.0, vec![1.0; 6], Vec::new()).unwrap();
        assert_bytes_round_trip(&stream);
        let decoded = MeshAnimationStream::decode(&stream.encode()).unwrap();
        assert_eq!(decoded.face_count(), 0);
        assert_eq!(decoded.frame(1), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_round_trip_keeps_float_bits() {
        let payload_nan = f32::from_bits(0x7fc0_1234);
        let vertices = vec![payload_nan, -0.0, f32::INFINITY];
        let stream = MeshAnimationStream::new(1, 1, 30.0, vertices, Vec::new()).unwrap();
        assert_bytes_round_trip(&stream);
        let decoded = MeshAnimationStream::decode(&stream.encode()).unwrap();
        let bits: Vec<u32> = decoded.vertices().iter().map(|value| value.to_bits()).collect();
        assert_eq!(
            bits,
            vec![0x7fc0_1234, (-0.0f32).to_bits(), f32::INFINITY.to_bits()]
        );
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample_stream().encode();
        assert_eq!(&bytes[0..4], b"VANM");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 4);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 1);
        assert_eq!(f32::from_le_bytes(bytes[16..20].try_into().unwrap()), 30.0);
    }

    #[test]
    fn test_format_tag_is_kept() {
        let mut bytes = sample_stream().encode();
        bytes[0..4].copy_from_slice(b"SMPL");
        let decoded = MeshAnimationStream::decode(&bytes).unwrap();
        assert_eq!(&decoded.format_tag(), b"SMPL");
        assert_eq!(decoded.encode(), bytes);
    }

    #[test]
    fn test_frame_slice() {
        let stream = sample_stream();
        for frame in 0..4 {
            let start = frame * 9;
            assert_eq!(
                stream.frame(frame as i64),
                &stream.vertices()[start..start + 9]
            );
        }
    }

    #[test]
    fn test_frame_clamping() {
        let stream = sample_stream();
        assert_eq!(stream.frame(-5), stream.frame(0));
        assert_eq!(stream.frame(4 + 10), stream.frame(3));
    }

    #[test]
    fn test_two_frame_triangle() {
        let vertices = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0,
        ];
        let bytes = MeshAnimationStream::new(2, 3, 30.0, vertices, vec![0, 1, 2])
            .unwrap()
            .encode();
        let stream = MeshAnimationStream::decode(&bytes).unwrap();
        assert_eq!(stream.faces(), &[0, 1, 2]);
        assert_eq!(stream.frame(0).len(), 9);
        assert_eq!(stream.frame(1).len(), 9);
        assert_ne!(stream.frame(0), stream.frame(1));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = sample_stream().encode();
        assert!(matches!(
            MeshAnimationStream::decode(&bytes[..12]),
            Err(MeshFormatError::TruncatedHeader { actual: 12 })
        ));
    }

    #[test]
    fn test_truncated_body() {
        let bytes = sample_stream().encode();
        let result = MeshAnimationStream::decode(&bytes[..bytes.len() - 4]);
        assert!(matches!(
            result,
            Err(MeshFormatError::TruncatedBody { expected, actual }) if expected == actual + 4
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = sample_stream().encode();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            MeshAnimationStream::decode(&bytes),
            Err(MeshFormatError::TrailingBytes { .. })
        ));
    }

    #[test]
    fn test_face_index_out_of_range() {
        let mut bytes = sample_stream().encode();
        let last = bytes.len() - 4;
        bytes[last..].copy_from_slice(&3u32.to_le_bytes());
        assert!(matches!(
            MeshAnimationStream::decode(&bytes),
            Err(MeshFormatError::FaceIndexOutOfRange {
                face: 0,
                index: 3,
                vertex_count: 3
            })
        ));
    }

    #[test]
    fn test_count_overflow() {
        let header = MeshStreamHeader {
            format_tag: DEFAULT_FORMAT_TAG,
            frame_count: u32::MAX,
            vertex_count: u32::MAX,
            face_count: u32::MAX,
            fps: 30.0,
        };
        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor).unwrap();
        let result = MeshAnimationStream::decode(&cursor.into_inner());
        assert!(matches!(
            result,
            Err(MeshFormatError::CountOverflow { .. }) | Err(MeshFormatError::TruncatedBody { .. })
        ));
    }

    #[test]
    fn test_bad_fps() {
        let mut bytes = sample_stream().encode();
        bytes[16..20].copy_from_slice(&0.0f32.to_le_bytes());
        assert!(matches!(
            MeshAnimationStream::decode(&bytes),
            Err(MeshFormatError::BadFps(_))
        ));
    }

    #[test]
    fn test_new_rejects_short_vertex_buffer() {
        let result = MeshAnimationStream::new(2, 3, 30.0, vec![0.0; 9], vec![0, 1, 2]);
        assert!(matches!(
            result,
            Err(MeshFormatError::BufferLength {
                name: "vertex",
                expected: 18,
                actual: 9
            })
        ));
    }
}
