#![cfg(unix)]

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    time::{Duration, Instant},
};

use framepipe::{
    CommandLauncher, EncoderInvocation, EncoderLauncher, EncoderSession, EncoderSink, Fps,
    FrameBuffer, FramepipeError, OutputFormat, OutputSpec, Pattern, RowOrder, stream_pattern,
};

/// Stand-in encoder: writes its argv to `<out>.args` and everything it reads on stdin to `<out>`,
/// where `<out>` is the last argument of the invocation.
struct EchoEncoder;

impl EncoderLauncher for EchoEncoder {
    fn program(&self) -> &OsStr {
        OsStr::new("ffmpeg")
    }

    fn launch(&self, invocation: &EncoderInvocation) -> std::io::Result<Child> {
        Command::new("sh")
            .arg("-c")
            .arg(r#"for out; do :; done; printf '%s\n' "$@" > "$out.args"; exec cat > "$out""#)
            .arg("sh")
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
    }
}

/// Stand-in encoder that exits immediately without reading its input.
struct DeadEncoder;

impl EncoderLauncher for DeadEncoder {
    fn program(&self) -> &OsStr {
        OsStr::new("ffmpeg")
    }

    fn launch(&self, _invocation: &EncoderInvocation) -> std::io::Result<Child> {
        Command::new("sh")
            .args(["-c", "exit 0"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
    }
}

fn out_dir(name: &str) -> PathBuf {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
    let dir = PathBuf::from("target").join("encoder_session").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn gif_spec(dir: &Path, width: u32, height: u32) -> OutputSpec {
    OutputSpec::new(width, height, Fps::integer(25).unwrap(), OutputFormat::Gif)
        .with_out_path(dir.join("output.gif"))
}

/// Frame whose row `y` is filled with byte `seed + y`.
fn marked_frame(width: u32, height: u32, seed: u8) -> Vec<u8> {
    (0..height)
        .flat_map(|y| std::iter::repeat_n(seed.wrapping_add(y as u8), width as usize * 4))
        .collect()
}

#[test]
fn start_yields_running_session_with_expected_argv() {
    let dir = out_dir("start");
    let mut session = EncoderSession::start_with(gif_spec(&dir, 64, 48), &EchoEncoder).unwrap();
    assert!(session.is_running().unwrap());
    assert!(session.pid().is_some());
    assert_eq!(session.resolution().to_string(), "64x48");
    session.end().unwrap();

    let args = std::fs::read_to_string(dir.join("output.gif.args")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(&args[..3], ["-loglevel", "verbose", "-y"]);
    assert!(args.windows(2).any(|w| w == ["-s", "64x48"]));
    assert!(args.windows(2).any(|w| w == ["-i", "-"]));
    assert!(args.contains(&framepipe::GIF_PALETTE_FILTER));
}

#[test]
fn frames_round_trip_in_submission_order() {
    let dir = out_dir("round_trip");
    let (w, h) = (5, 4);
    let mut session = EncoderSession::start_with(gif_spec(&dir, w, h), &EchoEncoder).unwrap();

    let mut expected = Vec::new();
    for i in 0..6u8 {
        let data = marked_frame(w, h, i * 16);
        let frame = FrameBuffer::new(w, h, &data).unwrap();
        if i % 2 == 0 {
            session.send_frame(&frame).unwrap();
            expected.extend_from_slice(&data);
        } else {
            session.send_frame_flipped(&frame).unwrap();
            for row in data.chunks_exact(w as usize * 4).rev() {
                expected.extend_from_slice(row);
            }
        }
    }

    let report = session.end().unwrap();
    assert_eq!(report.frames, 6);
    assert_eq!(report.bytes, 6 * u64::from(w * h * 4));
    assert_eq!(std::fs::read(dir.join("output.gif")).unwrap(), expected);
}

#[test]
fn flipped_frame_arrives_last_row_first() {
    let dir = out_dir("flipped");
    let (w, h) = (3, 7);
    let data = marked_frame(w, h, 0);
    let mut session = EncoderSession::start_with(gif_spec(&dir, w, h), &EchoEncoder).unwrap();
    session
        .send_frame_flipped(&FrameBuffer::new(w, h, &data).unwrap())
        .unwrap();
    session.end().unwrap();

    let received = std::fs::read(dir.join("output.gif")).unwrap();
    let markers: Vec<u8> = received.chunks_exact(w as usize * 4).map(|r| r[0]).collect();
    assert_eq!(markers, [6u8, 5, 4, 3, 2, 1, 0]);
}

#[test]
fn mismatched_frames_are_rejected_without_writing() {
    let dir = out_dir("mismatch");
    let mut session = EncoderSession::start_with(gif_spec(&dir, 8, 8), &EchoEncoder).unwrap();

    let small = vec![0u8; 4 * 8 * 4];
    let frame = FrameBuffer::new(4, 8, &small).unwrap();
    for result in [session.send_frame(&frame), session.send_frame_flipped(&frame)] {
        assert!(matches!(result, Err(FramepipeError::Validation(_))));
    }
    assert!(FrameBuffer::new(8, 8, &small).is_err());

    // The stream is still usable after a rejected frame.
    let good = vec![7u8; 8 * 8 * 4];
    session
        .send_frame(&FrameBuffer::new(8, 8, &good).unwrap())
        .unwrap();
    let report = session.end().unwrap();
    assert_eq!(report.frames, 1);
    assert_eq!(std::fs::read(dir.join("output.gif")).unwrap(), good);
}

#[cfg(target_os = "linux")]
#[test]
fn end_reaps_the_encoder() {
    let dir = out_dir("reap");
    let session = EncoderSession::start_with(gif_spec(&dir, 2, 2), &EchoEncoder).unwrap();
    let pid = session.pid().unwrap();
    assert!(Path::new(&format!("/proc/{pid}")).exists());
    session.end().unwrap();
    assert!(!Path::new(&format!("/proc/{pid}")).exists());
}

#[cfg(target_os = "linux")]
#[test]
fn dropping_an_open_session_reaps_the_encoder() {
    let dir = out_dir("drop");
    let session = EncoderSession::start_with(gif_spec(&dir, 2, 2), &EchoEncoder).unwrap();
    let pid = session.pid().unwrap();
    drop(session);
    assert!(!Path::new(&format!("/proc/{pid}")).exists());
}

#[test]
fn dead_encoder_surfaces_broken_pipe_and_still_ends() {
    let dir = out_dir("dead");
    let mut session = EncoderSession::start_with(gif_spec(&dir, 64, 64), &DeadEncoder).unwrap();
    let data = vec![0u8; 64 * 64 * 4];
    let frame = FrameBuffer::new(64, 64, &data).unwrap();

    let mut failure = None;
    for _ in 0..256 {
        if let Err(e) = session.send_frame(&frame) {
            failure = Some(e);
            break;
        }
    }
    let failure = failure.expect("writes to an exited encoder must fail");
    assert!(failure.is_broken_pipe(), "unexpected error: {failure}");

    // A partial frame may be in the pipe; further frames are refused.
    assert!(matches!(
        session.send_frame(&frame),
        Err(FramepipeError::Transport { .. })
    ));
    let deadline = Instant::now() + Duration::from_secs(5);
    while session.is_running().unwrap() {
        assert!(Instant::now() < deadline, "encoder did not exit");
        std::thread::sleep(Duration::from_millis(10));
    }
    session.end().unwrap();
}

#[test]
fn missing_encoder_binary_is_a_setup_error() {
    let dir = out_dir("missing");
    let err = EncoderSession::start_with(
        gif_spec(&dir, 2, 2),
        &CommandLauncher::new("framepipe-no-such-encoder"),
    )
    .unwrap_err();
    assert!(matches!(err, FramepipeError::Setup(_)), "{err}");
    assert!(err.to_string().contains("not found"));
}

#[test]
fn failed_launch_leaves_no_new_output_directory() {
    let dir = out_dir("missing_nested");
    let spec = OutputSpec::new(2, 2, Fps::integer(25).unwrap(), OutputFormat::Gif)
        .with_out_path(dir.join("renders/today/output.gif"));
    let err = EncoderSession::start_with(spec, &CommandLauncher::new("framepipe-no-such-encoder"))
        .unwrap_err();
    assert!(matches!(err, FramepipeError::Setup(_)), "{err}");
    assert!(!dir.join("renders").exists());
}

#[test]
fn existing_output_is_kept_without_overwrite() {
    let dir = out_dir("no_overwrite");
    std::fs::write(dir.join("output.gif"), b"keep").unwrap();
    let spec = gif_spec(&dir, 2, 2).with_overwrite(false);
    let err = EncoderSession::start_with(spec, &EchoEncoder).unwrap_err();
    assert!(matches!(err, FramepipeError::Validation(_)));
    assert_eq!(std::fs::read(dir.join("output.gif")).unwrap(), b"keep");
}

#[test]
fn ten_color_frames_at_64x64_through_a_sink() {
    let dir = out_dir("scenario");
    let mut sink = EncoderSink::new(EchoEncoder);
    let sent = stream_pattern(
        &mut sink,
        gif_spec(&dir, 64, 64),
        Pattern::ColorCycle,
        10,
        RowOrder::TopDown,
    )
    .unwrap();
    assert_eq!(sent, 10);

    let report = sink.report().unwrap();
    assert_eq!(report.frames, 10);
    assert!(report.output.exists());

    let received = std::fs::read(&report.output).unwrap();
    let frame_len = 64 * 64 * 4;
    assert_eq!(received.len(), 10 * frame_len);
    for (i, frame) in received.chunks_exact(frame_len).enumerate() {
        let palette = framepipe::pattern::PALETTE;
        let color = palette[i % palette.len()];
        assert!(frame.chunks_exact(4).all(|px| px == color), "frame {i}");
    }
}
