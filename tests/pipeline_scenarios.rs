use posevid::{
    AnimationConfig, AnimationSession, FontSource, FrameBgr24, FrameIndex, InMemorySink,
    PosevidError, RecordReader, SinkClose, posenet_keypoints,
};

fn header() -> String {
    let mut cols = vec!["frame".to_string()];
    for kp in posenet_keypoints() {
        cols.push(kp.x_column());
        cols.push(kp.y_column());
    }
    cols.join(",")
}

/// One CSV row with the given keypoints set and all others empty.
fn row(frame: i64, set: &[(&str, &str, &str)]) -> String {
    let mut cells = vec![frame.to_string()];
    for kp in posenet_keypoints() {
        match set.iter().find(|(name, _, _)| *name == kp.name) {
            Some((_, x, y)) => {
                cells.push((*x).to_string());
                cells.push((*y).to_string());
            }
            None => {
                cells.push(String::new());
                cells.push(String::new());
            }
        }
    }
    cells.join(",")
}

fn csv(rows: &[String]) -> String {
    let mut out = header();
    out.push('\n');
    for r in rows {
        out.push_str(r);
        out.push('\n');
    }
    out
}

fn unlabelled() -> AnimationConfig {
    AnimationConfig {
        should_label: false,
        ..AnimationConfig::default()
    }
}

fn run(cfg: AnimationConfig, input: &str) -> (posevid::RenderStats, InMemorySink) {
    let mut session = AnimationSession::new(cfg, Default::default()).unwrap();
    let records = RecordReader::from_reader(input.as_bytes(), &session.config().keypoints).unwrap();
    let mut sink = InMemorySink::new();
    let stats = session.render_records(records, &mut sink).unwrap();
    (stats, sink)
}

fn lit_pixels(frame: &FrameBgr24) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    for y in 0..frame.height {
        for x in 0..frame.width {
            if frame.pixel(x, y) != Some([0, 0, 0]) {
                out.push((x, y));
            }
        }
    }
    out
}

#[test]
fn single_nose_row_renders_one_gray_dot() {
    let input = csv(&[row(60, &[("nose", "100", "100")])]);
    let (stats, sink) = run(unlabelled(), &input);

    assert_eq!(stats.frames_written, 1);
    assert_eq!(stats.markers_drawn, 1);
    assert_eq!(sink.frames().len(), 1);

    let (idx, frame) = &sink.frames()[0];
    assert_eq!(*idx, FrameIndex(60));
    assert_eq!((frame.width, frame.height), (600, 600));
    assert_eq!(frame.pixel(100, 100), Some([214, 214, 214]));

    let lit = lit_pixels(frame);
    assert!(!lit.is_empty());
    for (x, y) in lit {
        assert!((94..=106).contains(&x) && (94..=106).contains(&y), "({x},{y})");
    }
}

#[test]
fn rows_before_start_frame_produce_no_frames() {
    let input = csv(&[row(59, &[("nose", "100", "100"), ("leftHip", "3", "4")])]);
    let (stats, sink) = run(unlabelled(), &input);
    assert_eq!(stats.rows_read, 1);
    assert_eq!(stats.rows_skipped, 1);
    assert!(sink.frames().is_empty());
    assert_eq!(sink.closed(), Some(SinkClose::Ended));
}

#[test]
fn header_only_input_is_an_empty_video_not_an_error() {
    let (stats, sink) = run(unlabelled(), &csv(&[]));
    assert_eq!(stats.frames_written, 0);
    assert!(sink.frames().is_empty());
    assert!(sink.config().is_some());
    assert_eq!(sink.closed(), Some(SinkClose::Ended));
}

#[test]
fn output_frame_count_matches_rows_at_or_after_start() {
    let frames = [0i64, 59, 60, 60, 61, 75, 200];
    let rows: Vec<String> = frames
        .iter()
        .map(|&f| row(f, &[("leftWrist", "10", "20")]))
        .collect();
    let (stats, sink) = run(unlabelled(), &csv(&rows));

    let expected: Vec<i64> = frames.iter().copied().filter(|&f| f >= 60).collect();
    let got: Vec<i64> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(got, expected);
    assert_eq!(stats.frames_written, expected.len() as u64);
    assert_eq!(stats.rows_skipped, 2);
}

#[test]
fn negative_frames_are_skipped_even_from_zero() {
    let cfg = AnimationConfig {
        start_frame: FrameIndex(0),
        ..unlabelled()
    };
    let rows = [
        row(-3, &[("nose", "10", "10")]),
        row(0, &[("nose", "10", "10")]),
    ];
    let (stats, sink) = run(cfg, &csv(&rows));
    assert_eq!(stats.rows_skipped, 1);
    assert_eq!(sink.frames().len(), 1);
    assert_eq!(sink.frames()[0].0, FrameIndex(0));
}

#[test]
fn excluded_keypoints_never_appear() {
    let input = csv(&[row(
        60,
        &[
            ("leftEye", "100", "100"),
            ("rightEye", "200", "200"),
            ("leftEar", "300", "300"),
            ("rightEar", "400", "400"),
        ],
    )]);
    let (stats, sink) = run(unlabelled(), &input);
    assert_eq!(stats.markers_drawn, 0);
    assert!(lit_pixels(&sink.frames()[0].1).is_empty());
}

#[test]
fn half_present_coordinates_draw_nothing() {
    let input = csv(&[
        row(60, &[("nose", "100", "")]),
        row(61, &[("nose", "", "100")]),
        row(62, &[("nose", "abc", "100")]),
    ]);
    let (stats, sink) = run(unlabelled(), &input);
    assert_eq!(stats.frames_written, 3);
    assert_eq!(stats.markers_drawn, 0);
    for (_, frame) in sink.frames() {
        assert!(lit_pixels(frame).is_empty());
    }
}

#[test]
fn keypoint_colors_arrive_in_bgr_order() {
    let input = csv(&[row(
        60,
        &[("leftWrist", "50", "50"), ("leftAnkle", "150", "150")],
    )]);
    let (_, sink) = run(unlabelled(), &input);
    let frame = &sink.frames()[0].1;
    // RED (255,0,0) and TEAL (33,207,201) as b,g,r.
    assert_eq!(frame.pixel(50, 50), Some([0, 0, 255]));
    assert_eq!(frame.pixel(150, 150), Some([201, 207, 33]));
}

#[test]
fn conversion_is_deterministic_across_runs() {
    let input = csv(&[
        row(60, &[("nose", "100.25", "80.5"), ("rightKnee", "300", "420")]),
        row(61, &[("nose", "101.75", "81"), ("rightKnee", "299", "421.5")]),
    ]);
    let (_, a) = run(unlabelled(), &input);
    let (_, b) = run(unlabelled(), &input);
    assert_eq!(a.frames().len(), b.frames().len());
    for ((ia, fa), (ib, fb)) in a.frames().iter().zip(b.frames()) {
        assert_eq!(ia, ib);
        assert_eq!(fa, fb);
    }
}

#[test]
fn disabling_labels_leaves_only_dots() {
    let input = csv(&[row(60, &[("nose", "100", "100")])]);
    let (_, sink) = run(unlabelled(), &input);
    let outside_dot = lit_pixels(&sink.frames()[0].1)
        .into_iter()
        .filter(|&(x, y)| x > 106 || y > 106)
        .count();
    assert_eq!(outside_dot, 0);
}

#[test]
fn labels_add_glyph_pixels_when_a_font_is_available() {
    let cfg = AnimationConfig {
        font: FontSource::System("sans-serif".to_owned()),
        ..AnimationConfig::default()
    };
    let Ok(mut session) = AnimationSession::new(cfg, Default::default()) else {
        eprintln!("skipping: no usable system font");
        return;
    };
    let input = csv(&[row(60, &[("nose", "100", "100")])]);
    let records = RecordReader::from_reader(input.as_bytes(), &session.config().keypoints).unwrap();
    let mut sink = InMemorySink::new();
    session.render_records(records, &mut sink).unwrap();

    let frame = &sink.frames()[0].1;
    let text_pixels = lit_pixels(frame)
        .into_iter()
        .filter(|&(x, y)| x > 106 || y > 106)
        .count();
    assert!(text_pixels > 0);
}

#[test]
fn missing_input_file_fails_before_the_sink_opens() {
    let mut session = AnimationSession::new(unlabelled(), Default::default()).unwrap();
    let mut sink = InMemorySink::new();
    let err = session
        .render_csv(std::path::Path::new("target/no/such/input.csv"), &mut sink)
        .unwrap_err();
    assert!(matches!(err, PosevidError::Input(_)));
    assert!(sink.config().is_none());
    assert_eq!(sink.closed(), None);
}

#[test]
fn bad_frame_cell_aborts_after_partial_output() {
    let mut input = csv(&[row(60, &[("nose", "1", "1")])]);
    input.push_str(&row(0, &[]).replacen('0', "sixty", 1));
    input.push('\n');

    let mut session = AnimationSession::new(unlabelled(), Default::default()).unwrap();
    let records = RecordReader::from_reader(input.as_bytes(), &session.config().keypoints).unwrap();
    let mut sink = InMemorySink::new();
    let err = session.render_records(records, &mut sink).unwrap_err();
    assert!(matches!(err, PosevidError::Input(_)));
    assert_eq!(sink.frames().len(), 1);
    assert_eq!(sink.closed(), Some(SinkClose::Aborted));
}
