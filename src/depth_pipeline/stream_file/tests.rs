#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::depth_pipeline::common::error::PipelineError;
    use crate::depth_pipeline::stream_file::{
        FpsMode, StreamFileHeader, StreamFileReader, StreamWriter, WriterKind, HEADER_LEN,
        MAX_FRAME_BYTES,
    };

    const WIDTH: u32 = 310;
    const HEIGHT: u32 = 205;
    const FRAME_BYTES: usize = (WIDTH * HEIGHT * 2) as usize;

    fn frame_payload(seed: u8) -> Vec<u8> {
        (0..FRAME_BYTES).map(|i| (i as u8).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_header_round_trip() {
        let header = StreamFileHeader::dynamic(0, WIDTH, HEIGHT, 2);
        let bytes = header.encode();

        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1..5], 310u32.to_le_bytes());
        assert_eq!(bytes[5..9], 205u32.to_le_bytes());
        assert_eq!(bytes[9..13], 2u32.to_le_bytes());
        assert_eq!(bytes[13..17], 0u32.to_le_bytes());

        let decoded = StreamFileHeader::decode(&bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.fps_mode, FpsMode::Dynamic);
    }

    #[test]
    fn test_fixed_fps_header_has_no_timestamps() {
        let header = StreamFileHeader {
            platform_id: 1,
            width: 4,
            height: 4,
            bytes_per_pixel: 2,
            fps_mode: FpsMode::Fixed(20),
        };
        let decoded = StreamFileHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded.fps_mode, FpsMode::Fixed(20));
        assert_eq!(decoded.record_len(), 32);
    }

    #[test]
    fn test_truncated_header_is_rejected() {
        let result = StreamFileHeader::decode(&[0u8; 10]);
        assert!(matches!(result, Err(PipelineError::MalformedStream(_))));
    }

    #[test]
    fn test_recording_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_depth.adep");

        let mut writer = StreamWriter::open_for_recording(&path, 0, WIDTH, HEIGHT, 2).unwrap();
        for k in 0..3u8 {
            writer.append_frame(50 + k as u32, frame_payload(k)).unwrap();
        }
        let summary = writer.finish().unwrap();

        let expected = (HEADER_LEN + 3 * (4 + FRAME_BYTES)) as u64;
        assert_eq!(summary.frames_written, 3);
        assert_eq!(summary.bytes_written, expected);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), expected);

        let header = *StreamFileReader::open(&path).unwrap().header();
        assert_eq!(header.frame_count(expected), 3);
    }

    #[test]
    fn test_records_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordered.adep");

        let mut writer = StreamWriter::open_for_recording(&path, 0, WIDTH, HEIGHT, 2).unwrap();
        for k in 0..5u8 {
            writer.append_frame(k as u32 * 10, frame_payload(k)).unwrap();
        }
        writer.finish().unwrap();

        let reader = StreamFileReader::open(&path).unwrap();
        let frames: Vec<_> = reader.map(|frame| frame.unwrap()).collect();

        assert_eq!(frames.len(), 5);
        for (k, frame) in frames.iter().enumerate() {
            assert_eq!(frame.elapsed_ms, Some(k as u32 * 10));
            assert_eq!(frame.payload, frame_payload(k as u8));
        }
    }

    #[test]
    fn test_capture_writes_single_zero_timestamped_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot_photo_depth.adep");

        let mut writer = StreamWriter::open_for_capture(&path, 0, 4, 4, 2).unwrap();
        assert_eq!(writer.kind(), WriterKind::Capture);
        writer.append_frame(1234, vec![7u8; 32]).unwrap();
        assert!(matches!(
            writer.append_frame(0, vec![7u8; 32]),
            Err(PipelineError::WriterClosed)
        ));
        writer.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 4 + 32);
        assert_eq!(bytes[HEADER_LEN..HEADER_LEN + 4], 0u32.to_le_bytes());
    }

    #[test]
    fn test_payload_size_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            StreamWriter::open_for_recording(dir.path().join("bad.adep"), 0, 4, 4, 2).unwrap();

        let result = writer.append_frame(0, vec![0u8; 31]);
        assert!(matches!(
            result,
            Err(PipelineError::FrameSize { expected: 32, actual: 31 })
        ));
        assert_eq!(writer.frames_submitted(), 0);
    }

    #[test]
    fn test_sync_flushes_queued_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synced.adep");
        let mut writer = StreamWriter::open_for_recording(&path, 0, 4, 4, 2).unwrap();

        writer.append_frame(5, vec![1u8; 32]).unwrap();
        writer.sync().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), (HEADER_LEN + 36) as u64);
    }

    #[test]
    fn test_finish_detached_reports_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detached.adep");
        let mut writer = StreamWriter::open_for_capture(&path, 0, 4, 4, 2).unwrap();
        writer.append_frame(0, vec![3u8; 32]).unwrap();

        let (sender, receiver) = crossbeam_channel::bounded(1);
        writer.finish_detached(move |result| {
            sender.send(result).unwrap();
        });

        let summary = receiver.recv().unwrap().unwrap();
        assert_eq!(summary.frames_written, 1);
        assert_eq!(summary.path, path);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.adep");
        let result = StreamWriter::open_for_recording(path, 0, 4, 4, 2);
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_truncated_record_is_reported() {
        let header = StreamFileHeader::dynamic(0, 4, 4, 2);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 20]);

        let mut reader = StreamFileReader::from_reader(Cursor::new(bytes)).unwrap();
        assert!(matches!(reader.next_frame(), Err(PipelineError::MalformedStream(_))));
    }

    #[test]
    fn test_overflowing_geometry_is_rejected() {
        let header = StreamFileHeader::dynamic(0, u32::MAX, u32::MAX, 2);
        assert_eq!(header.checked_frame_bytes(), None);
        assert!(matches!(
            StreamFileHeader::decode(&header.encode()),
            Err(PipelineError::MalformedStream(_))
        ));

        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        let result = StreamFileReader::from_reader(Cursor::new(bytes));
        assert!(matches!(result, Err(PipelineError::MalformedStream(_))));
    }

    #[test]
    fn test_oversized_and_empty_geometry_is_rejected() {
        // one pixel row past the limit
        let width = (MAX_FRAME_BYTES / 2 / 1024) as u32 + 1;
        let oversized = StreamFileHeader::dynamic(0, width, 1024, 2);
        assert!(oversized.checked_frame_bytes().unwrap() > MAX_FRAME_BYTES);
        assert!(matches!(
            StreamFileHeader::decode(&oversized.encode()),
            Err(PipelineError::MalformedStream(_))
        ));

        let empty = StreamFileHeader::dynamic(0, 0, 205, 2);
        assert!(matches!(
            StreamFileHeader::decode(&empty.encode()),
            Err(PipelineError::MalformedStream(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let result =
            StreamWriter::create(dir.path().join("huge.adep"), oversized, WriterKind::Recording);
        assert!(matches!(result, Err(PipelineError::MalformedStream(_))));
    }

    #[test]
    fn test_full_queue_refuses_frames_without_writing_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bounded.adep");
        let header = StreamFileHeader::dynamic(0, WIDTH, HEIGHT, 2);
        let mut writer =
            StreamWriter::create_with_capacity(&path, header, WriterKind::Recording, 1).unwrap();

        let mut accepted = 0u64;
        for k in 0..200u32 {
            match writer.append_frame(k, frame_payload(k as u8)) {
                Ok(()) => accepted += 1,
                Err(PipelineError::QueueFull) => {}
                Err(e) => panic!("unexpected append error: {}", e),
            }
        }
        assert!(accepted >= 1);
        assert_eq!(writer.frames_submitted(), accepted);

        let summary = writer.finish().unwrap();
        let expected = HEADER_LEN as u64 + accepted * (4 + FRAME_BYTES as u64);
        assert_eq!(summary.frames_written, accepted);
        assert_eq!(summary.bytes_written, expected);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), expected);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_surfaces_from_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full_disk.adep");
        std::os::unix::fs::symlink("/dev/full", &path).unwrap();

        let mut writer = StreamWriter::open_for_recording(&path, 0, WIDTH, HEIGHT, 2).unwrap();
        writer.append_frame(10, frame_payload(0)).unwrap();
        writer.append_frame(20, frame_payload(1)).unwrap();

        assert!(matches!(writer.finish(), Err(PipelineError::Io(_))));
    }
}
